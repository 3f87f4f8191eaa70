// src/services/user_service.rs

use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Caller, Role, User, UserRef},
    services::auth::AuthService,
};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    auth: AuthService,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, auth: AuthService) -> Self {
        Self { repo, auth }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.repo.list_all().await
    }

    // Dropdown de responsáveis do formulário de lead
    pub async fn list_sales_agents(&self) -> Result<Vec<User>, AppError> {
        self.repo.list_by_role(Role::SalesAgent).await
    }

    pub async fn create_user(
        &self,
        caller: &Caller,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let password_hash = self.auth.hash_password(password).await?;
        let user = self.repo.create_user(email, &password_hash, role).await?;

        tracing::info!(admin = %caller.id, user_id = %user.id, role = role.as_str(), "Usuário criado");
        Ok(user)
    }

    pub async fn update_role(&self, caller: &Caller, id: Uuid, role: Role) -> Result<User, AppError> {
        if caller.id == id {
            return Err(AppError::forbidden("Você não pode alterar o seu próprio papel."));
        }

        let user = self
            .repo
            .update_role(id, role)
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;

        tracing::info!(admin = %caller.id, user_id = %id, role = role.as_str(), "Papel alterado");
        Ok(user)
    }

    pub async fn delete_user(&self, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        if caller.id == id {
            return Err(AppError::forbidden("Você não pode excluir a sua própria conta."));
        }

        if !self.repo.delete_user(id).await? {
            return Err(AppError::NotFound("Usuário"));
        }

        tracing::info!(admin = %caller.id, user_id = %id, "Usuário excluído");
        Ok(())
    }

    /// "Populate" de referências: ids que não existem mais simplesmente não aparecem
    /// no mapa, e quem consome trata como "Unassigned".
    pub async fn resolve_refs(&self, mut ids: Vec<Uuid>) -> Result<HashMap<Uuid, UserRef>, AppError> {
        ids.sort_unstable();
        ids.dedup();

        let users = self.repo.find_by_ids(&ids).await?;
        Ok(users.iter().map(|u| (u.id, UserRef::from(u))).collect())
    }
}
