// src/services/activity_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{FixedOffset, NaiveDate};
use uuid::Uuid;

use crate::{
    common::{error::AppError, validation},
    db::{ActivityRepository, FollowUpWindow, LeadRepository},
    models::{
        auth::{Caller, Role},
        crm::{
            Activity, ActivityView, CreateActivityPayload, FollowUpBadge, FollowUpEntry,
            LeadSummary, NewActivity,
        },
    },
    services::{
        rbac_service::{self, Action, RbacService},
        user_service::UserService,
    },
};

/// Baldes da tela de follow-ups (nível cross-lead; o selo da linha do tempo é outra coisa).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpBucket {
    Today,
    Overdue,
}

impl FollowUpBucket {
    /// today: data == hoje. overdue: data < hoje. Datas só com dia, então o intervalo
    /// [início do dia, fim do dia] vira igualdade.
    pub fn window(self, today: NaiveDate) -> FollowUpWindow {
        match self {
            FollowUpBucket::Today => FollowUpWindow {
                from: Some(today),
                to: today,
            },
            FollowUpBucket::Overdue => FollowUpWindow {
                from: None,
                to: today.pred_opt().unwrap_or(NaiveDate::MIN),
            },
        }
    }

    pub fn contains(self, follow_up: NaiveDate, today: NaiveDate) -> bool {
        match self {
            FollowUpBucket::Today => follow_up == today,
            FollowUpBucket::Overdue => follow_up < today,
        }
    }
}

#[derive(Clone)]
pub struct ActivityService {
    repo: Arc<dyn ActivityRepository>,
    lead_repo: Arc<dyn LeadRepository>,
    users: UserService,
    rbac: RbacService,
    utc_offset: FixedOffset,
}

impl ActivityService {
    pub fn new(
        repo: Arc<dyn ActivityRepository>,
        lead_repo: Arc<dyn LeadRepository>,
        users: UserService,
        rbac: RbacService,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            repo,
            lead_repo,
            users,
            rbac,
            utc_offset,
        }
    }

    pub async fn add_activity(
        &self,
        caller: &Caller,
        lead_id: Uuid,
        payload: CreateActivityPayload,
    ) -> Result<Activity, AppError> {
        // 1. Validação antes de qualquer leitura/escrita
        let activity_type = payload
            .activity_type
            .ok_or_else(|| AppError::invalid_field("activityType", "O tipo da atividade é obrigatório."))?;
        // Sem fuso ("2026-10-18T10:30" do datetime-local) vale o fuso configurado
        let activity_date_time = payload
            .activity_date_time
            .ok_or_else(|| AppError::invalid_field("activityDateTime", "A data/hora da atividade é obrigatória."))?
            .to_utc(self.utc_offset);
        let outcome = validation::required_text("outcome", payload.outcome.as_deref())?;
        let notes = validation::required_text("notes", payload.notes.as_deref())?;

        // 2. O lead precisa existir
        let lead = self
            .lead_repo
            .find_by_id(lead_id)
            .await?
            .ok_or(AppError::NotFound("Lead"))?;

        // 3. Papel + escopo (agente só registra nos leads dele)
        rbac_service::ensure(caller, Action::LogActivity)?;
        let filter = self.rbac.visibility_filter(caller).await?;
        rbac_service::ensure_visible(&filter, &lead)?;

        // 4 e 5. Grava a atividade e, se veio data, o follow-up do lead (atômico no repo)
        let new_activity = NewActivity {
            lead_id,
            activity_type,
            activity_date_time,
            outcome,
            notes,
            next_follow_up_date: payload.next_follow_up_date.map(|t| t.local_date(self.utc_offset)),
            created_by: caller.id,
        };

        self.repo.record(&new_activity).await
    }

    /// Linha do tempo do lead: mais recente primeiro, com o selo Today/Upcoming/Past.
    pub async fn list_activities_for_lead(
        &self,
        caller: &Caller,
        lead_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<ActivityView>, AppError> {
        let lead = self
            .lead_repo
            .find_by_id(lead_id)
            .await?
            .ok_or(AppError::NotFound("Lead"))?;
        let filter = self.rbac.visibility_filter(caller).await?;
        rbac_service::ensure_visible(&filter, &lead)?;

        let mut activities = self.repo.list_for_lead(lead_id).await?;
        activities.sort_by(|a, b| b.activity_date_time.cmp(&a.activity_date_time));

        let creators: Vec<Uuid> = activities.iter().map(|a| a.created_by).collect();
        let refs = self.users.resolve_refs(creators).await?;

        Ok(activities
            .into_iter()
            .map(|activity| ActivityView {
                follow_up_badge: FollowUpBadge::classify(activity.next_follow_up_date, today),
                created_by: refs.get(&activity.created_by).cloned(),
                id: activity.id,
                lead_id: activity.lead_id,
                activity_type: activity.activity_type,
                activity_date_time: activity.activity_date_time,
                outcome: activity.outcome,
                notes: activity.notes,
                next_follow_up_date: activity.next_follow_up_date,
                created_at: activity.created_at,
            })
            .collect())
    }

    /// Follow-ups de um balde. Admin vê todos; os demais só as atividades que eles
    /// mesmos criaram (escopo pelo criador, não pelo responsável do lead).
    pub async fn follow_ups(
        &self,
        caller: &Caller,
        bucket: FollowUpBucket,
        today: NaiveDate,
    ) -> Result<Vec<FollowUpEntry>, AppError> {
        let created_by = match caller.role {
            Role::Admin => None,
            Role::SalesManager | Role::SalesAgent => Some(caller.id),
        };

        let activities: Vec<Activity> = self
            .repo
            .list_follow_ups(created_by, bucket.window(today))
            .await?
            .into_iter()
            .filter(|a| a.next_follow_up_date.is_some_and(|d| bucket.contains(d, today)))
            .collect();

        let mut lead_ids: Vec<Uuid> = activities.iter().map(|a| a.lead_id).collect();
        lead_ids.sort_unstable();
        lead_ids.dedup();

        let leads: HashMap<Uuid, LeadSummary> = self
            .lead_repo
            .find_by_ids(&lead_ids)
            .await?
            .iter()
            .map(|lead| (lead.id, LeadSummary::from(lead)))
            .collect();

        // Atividades órfãs (lead apagado) ficam de fora, sem erro
        let mut entries: Vec<FollowUpEntry> = activities
            .into_iter()
            .filter_map(|activity| {
                let lead = leads.get(&activity.lead_id)?.clone();
                Some(FollowUpEntry { activity, lead })
            })
            .collect();

        // Mais próximo primeiro
        entries.sort_by(|a, b| {
            a.activity
                .next_follow_up_date
                .cmp(&b.activity.next_follow_up_date)
                .then(a.activity.activity_date_time.cmp(&b.activity.activity_date_time))
        });

        Ok(entries)
    }
}
