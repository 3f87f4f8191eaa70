// src/db/lead_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LeadRepository,
    models::crm::{Lead, LeadFilter, NewLead},
};

const LEAD_COLUMNS: &str = "id, name, email, phone, status, source, created_by, assigned_to, \
                            next_follow_up_date, created_at, updated_at";

#[derive(Clone)]
pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn insert(&self, lead: &NewLead) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            INSERT INTO leads (name, email, phone, status, source, created_by, assigned_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.status)
        .bind(&lead.source)
        .bind(lead.created_by)
        .bind(lead.assigned_to)
        .fetch_one(&self.pool)
        .await?;

        Ok(lead)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let leads = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM leads WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    // O filtro de visibilidade vira WHERE; a ordenação final fica com o serviço
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let leads = match filter {
            LeadFilter::All => {
                sqlx::query_as::<_, Lead>(&format!(
                    "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            LeadFilter::AssignedTo(user_id) => {
                sqlx::query_as::<_, Lead>(&format!(
                    "SELECT {LEAD_COLUMNS} FROM leads WHERE assigned_to = $1 ORDER BY created_at DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            LeadFilter::AssignedToAny(user_ids) => {
                if user_ids.is_empty() {
                    return Ok(Vec::new());
                }
                sqlx::query_as::<_, Lead>(&format!(
                    "SELECT {LEAD_COLUMNS} FROM leads WHERE assigned_to = ANY($1) ORDER BY created_at DESC"
                ))
                .bind(user_ids.as_slice())
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(leads)
    }

    async fn update(&self, lead: &Lead) -> Result<Option<Lead>, AppError> {
        let updated = sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE leads
            SET name = $2, email = $3, phone = $4, status = $5, source = $6,
                assigned_to = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.status)
        .bind(&lead.source)
        .bind(lead.assigned_to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    // Hard delete. As atividades ficam (trilha de auditoria), sem cascade.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
