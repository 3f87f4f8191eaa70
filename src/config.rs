// src/config.rs

use std::{env, sync::Arc};

use anyhow::{anyhow, Context};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sqlx::PgPool;

use crate::{
    db::{
        ActivityRepository, LeadRepository, PgActivityRepository, PgLeadRepository,
        PgUserRepository, UserRepository,
    },
    services::{
        activity_service::ActivityService, auth::AuthService, lead_service::LeadService,
        rbac_service::RbacService, report_service::ReportService, user_service::UserService,
    },
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    /// Fuso que define o "hoje" dos follow-ups e o mês dos relatórios.
    pub utc_offset: FixedOffset,
    pub allow_registration: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value.parse().context("DATABASE_MAX_CONNECTIONS inválido")?,
            None => 5,
        };
        let jwt_expiry_hours = match lookup("JWT_EXPIRY_HOURS") {
            Some(value) => value.parse().context("JWT_EXPIRY_HOURS inválido")?,
            None => 24,
        };
        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(value) => value.parse().context("BCRYPT_COST inválido")?,
            None => bcrypt::DEFAULT_COST,
        };
        let utc_offset = match lookup("CRM_UTC_OFFSET") {
            Some(value) => parse_utc_offset(&value)?,
            None => FixedOffset::east_opt(0).context("offset UTC")?,
        };
        let allow_registration = match lookup("ALLOW_REGISTRATION") {
            Some(value) => value.parse().context("ALLOW_REGISTRATION deve ser true ou false")?,
            None => true,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            jwt_secret,
            jwt_expiry_hours,
            bcrypt_cost,
            utc_offset,
            allow_registration,
        })
    }

    /// Data local de hoje, no fuso configurado.
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.utc_offset).date_naive()
    }
}

// Aceita "+05:30", "-03:00" ou "Z"
fn parse_utc_offset(value: &str) -> anyhow::Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).context("offset UTC");
    }

    value
        .parse::<FixedOffset>()
        .map_err(|e| anyhow!("CRM_UTC_OFFSET inválido: '{value}' (use +HH:MM): {e}"))
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub rbac_service: RbacService,
    pub lead_service: LeadService,
    pub activity_service: ActivityService,
    pub report_service: ReportService,
}

impl AppState {
    pub fn with_pool(config: Config, db_pool: PgPool) -> Self {
        Self::from_repositories(
            config,
            Arc::new(PgUserRepository::new(db_pool.clone())),
            Arc::new(PgLeadRepository::new(db_pool.clone())),
            Arc::new(PgActivityRepository::new(db_pool)),
        )
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_repositories(
        config: Config,
        user_repo: Arc<dyn UserRepository>,
        lead_repo: Arc<dyn LeadRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
    ) -> Self {
        let config = Arc::new(config);

        let auth_service = AuthService::new(user_repo.clone(), &config);
        let user_service = UserService::new(user_repo.clone(), auth_service.clone());
        let rbac_service = RbacService::new(user_repo);
        let lead_service = LeadService::new(lead_repo.clone(), user_service.clone(), rbac_service.clone());
        let activity_service = ActivityService::new(
            activity_repo,
            lead_repo.clone(),
            user_service.clone(),
            rbac_service.clone(),
            config.utc_offset,
        );
        let report_service = ReportService::new(
            lead_repo,
            user_service.clone(),
            rbac_service.clone(),
            config.utc_offset,
        );

        Self {
            config,
            auth_service,
            user_service,
            rbac_service,
            lead_service,
            activity_service,
            report_service,
        }
    }
}
