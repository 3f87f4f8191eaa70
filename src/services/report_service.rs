// src/services/report_service.rs

use std::{collections::{BTreeMap, HashMap}, sync::Arc};

use chrono::{Datelike, FixedOffset};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LeadRepository,
    models::{
        auth::{Caller, UserRef},
        crm::{Lead, LeadFilter, LeadStatus},
        dashboard::{LeadSummaryStats, MonthlyEntry, TeamPerformanceEntry},
    },
    services::{rbac_service::RbacService, user_service::UserService},
};

const UNASSIGNED: &str = "Unassigned";

#[derive(Clone)]
pub struct ReportService {
    repo: Arc<dyn LeadRepository>,
    users: UserService,
    rbac: RbacService,
    utc_offset: FixedOffset,
}

impl ReportService {
    pub fn new(
        repo: Arc<dyn LeadRepository>,
        users: UserService,
        rbac: RbacService,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            repo,
            users,
            rbac,
            utc_offset,
        }
    }

    // 1. Cards do dashboard, no escopo de quem pede
    pub async fn summary(&self, caller: &Caller) -> Result<LeadSummaryStats, AppError> {
        let filter = self.rbac.visibility_filter(caller).await?;
        let leads = self.repo.list(&filter).await?;
        Ok(summarize(&leads))
    }

    // 2. Leads criados por mês. Mesmo filtro da listagem, inclusive para o gerente.
    pub async fn monthly(&self, caller: &Caller) -> Result<Vec<MonthlyEntry>, AppError> {
        let filter = self.rbac.visibility_filter(caller).await?;
        let leads = self.repo.list(&filter).await?;
        Ok(monthly_counts(&leads, self.utc_offset))
    }

    // 3. Desempenho do time: global de propósito, ignora o escopo de quem pede.
    pub async fn team_performance(&self) -> Result<Vec<TeamPerformanceEntry>, AppError> {
        let leads = self.repo.list(&LeadFilter::All).await?;
        let assignees: Vec<Uuid> = leads.iter().filter_map(|l| l.assigned_to).collect();
        let refs = self.users.resolve_refs(assignees).await?;
        Ok(team_performance(&leads, &refs))
    }
}

pub fn summarize(leads: &[Lead]) -> LeadSummaryStats {
    let mut stats = LeadSummaryStats::default();
    for lead in leads {
        stats.total += 1;
        match lead.status {
            LeadStatus::New => stats.new += 1,
            LeadStatus::Contacted => stats.contacted += 1,
            LeadStatus::Followup => stats.followup += 1,
            LeadStatus::NoConnect => stats.no_connect += 1,
            LeadStatus::Converted => stats.converted += 1,
        }
    }
    stats
}

/// Agrupa pelo mês (1..=12) de `created_at` no fuso configurado; só meses com leads,
/// em ordem crescente. Anos diferentes caem no mesmo mês.
pub fn monthly_counts(leads: &[Lead], utc_offset: FixedOffset) -> Vec<MonthlyEntry> {
    let mut months: BTreeMap<u32, u64> = BTreeMap::new();
    for lead in leads {
        let month = lead.created_at.with_timezone(&utc_offset).month();
        *months.entry(month).or_default() += 1;
    }

    months
        .into_iter()
        .map(|(month, count)| MonthlyEntry { month, count })
        .collect()
}

/// Sem responsável e responsável apagado caem juntos na linha "Unassigned".
pub fn team_performance(leads: &[Lead], refs: &HashMap<Uuid, UserRef>) -> Vec<TeamPerformanceEntry> {
    let mut groups: HashMap<Option<Uuid>, (u64, u64)> = HashMap::new();
    for lead in leads {
        let key = lead.assigned_to.filter(|id| refs.contains_key(id));
        let (total, converted) = groups.entry(key).or_default();
        *total += 1;
        if lead.status == LeadStatus::Converted {
            *converted += 1;
        }
    }

    let mut entries: Vec<TeamPerformanceEntry> = groups
        .into_iter()
        .map(|(key, (total, converted))| {
            let assignee = key.and_then(|id| refs.get(&id).cloned());
            TeamPerformanceEntry {
                display_name: assignee
                    .as_ref()
                    .map(|user| user.email.clone())
                    .unwrap_or_else(|| UNASSIGNED.to_string()),
                assignee,
                total,
                converted,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.converted
            .cmp(&a.converted)
            .then(b.total.cmp(&a.total))
            .then(a.display_name.cmp(&b.display_name))
    });
    entries
}
