// src/db.rs

// Os serviços dependem só destes traits; a implementação de produção é Postgres (sqlx).
// Nos testes de integração entra uma implementação em memória.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::Config,
    models::{
        auth::{Role, User},
        crm::{Activity, Lead, LeadFilter, NewActivity, NewLead},
    },
};

pub mod activity_repo;
pub mod lead_repo;
pub mod user_repo;

pub use activity_repo::PgActivityRepository;
pub use lead_repo::PgLeadRepository;
pub use user_repo::PgUserRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError>;
    async fn list_all(&self) -> Result<Vec<User>, AppError>;
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AppError>;
    /// Falha com `EmailAlreadyExists` se o e-mail já estiver em uso.
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User, AppError>;
    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, AppError>;
    /// `false` quando o id não existe.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn insert(&self, lead: &NewLead) -> Result<Lead, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, AppError>;
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError>;
    /// Grava os campos editáveis (name, email, phone, status, source, assigned_to).
    /// `created_by` e `next_follow_up_date` nunca são tocados aqui.
    async fn update(&self, lead: &Lead) -> Result<Option<Lead>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Janela fechada sobre `next_follow_up_date`; `from = None` é aberta à esquerda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpWindow {
    pub from: Option<NaiveDate>,
    pub to: NaiveDate,
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Insere a atividade e, se ela trouxer `next_follow_up_date`, sobrescreve o campo
    /// do lead. As duas escritas são atômicas.
    async fn record(&self, activity: &NewActivity) -> Result<Activity, AppError>;
    async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<Activity>, AppError>;
    /// `created_by = None` não restringe o criador (visão do admin).
    async fn list_follow_ups(
        &self,
        created_by: Option<Uuid>,
        window: FollowUpWindow,
    ) -> Result<Vec<Activity>, AppError>;
}

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}
