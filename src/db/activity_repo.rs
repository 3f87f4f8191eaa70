// src/db/activity_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, FollowUpWindow},
    models::crm::{Activity, NewActivity},
};

const ACTIVITY_COLUMNS: &str = "id, lead_id, activity_type, activity_date_time, outcome, notes, \
                                next_follow_up_date, created_by, created_at";

#[derive(Clone)]
pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn record(&self, activity: &NewActivity) -> Result<Activity, AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        // Insert da atividade + follow-up do lead: ou grava os dois, ou nenhum.
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Activity>(&format!(
            r#"
            INSERT INTO activities (
                lead_id, activity_type, activity_date_time, outcome, notes,
                next_follow_up_date, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(activity.lead_id)
        .bind(activity.activity_type)
        .bind(activity.activity_date_time)
        .bind(&activity.outcome)
        .bind(&activity.notes)
        .bind(activity.next_follow_up_date)
        .bind(activity.created_by)
        .fetch_one(&mut *tx)
        .await?;

        // Sem data nova, o follow-up atual do lead fica como está
        if let Some(follow_up) = activity.next_follow_up_date {
            sqlx::query("UPDATE leads SET next_follow_up_date = $2, updated_at = NOW() WHERE id = $1")
                .bind(activity.lead_id)
                .bind(follow_up)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        Ok(created)
    }

    async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<Activity>, AppError> {
        let activities = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE lead_id = $1 ORDER BY activity_date_time DESC"
        ))
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }

    async fn list_follow_ups(
        &self,
        created_by: Option<Uuid>,
        window: FollowUpWindow,
    ) -> Result<Vec<Activity>, AppError> {
        let activities = sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activities
            WHERE next_follow_up_date IS NOT NULL
              AND ($1::uuid IS NULL OR created_by = $1)
              AND ($2::date IS NULL OR next_follow_up_date >= $2)
              AND next_follow_up_date <= $3
            ORDER BY next_follow_up_date ASC, activity_date_time ASC
            "#
        ))
        .bind(created_by)
        .bind(window.from)
        .bind(window.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }
}
