// src/models/dashboard.rs

use serde::Serialize;

use crate::models::auth::UserRef;

// 1. Resumo (os cards do topo)
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummaryStats {
    pub total: u64,
    pub new: u64,
    pub contacted: u64,
    pub followup: u64,
    pub no_connect: u64,
    pub converted: u64,
}

// 2. Gráfico mensal (leads criados por mês, 1..=12)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyEntry {
    pub month: u32,
    pub count: u64,
}

// 3. Desempenho do time (por responsável)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPerformanceEntry {
    /// `None` junta leads sem responsável e responsáveis que já foram apagados.
    pub assignee: Option<UserRef>,
    pub display_name: String,
    pub total: u64,
    pub converted: u64,
}
