// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Role, User},
};

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    // Busca um usuário pelo seu e-mail (comparação exata, como foi gravado)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY email ASC"
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // Cria um novo usuário, com tratamento de erro específico para e-mails duplicados.
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Não há FK nos leads: quem apontava pra esse usuário passa a ver "Unassigned"
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
