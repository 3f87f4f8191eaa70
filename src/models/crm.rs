// src/models/crm.rs

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::auth::UserRef;

// --- ENUMS ---

// Mapeia o CREATE TYPE lead_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Followup,
    NoConnect,
    Converted,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Followup,
        LeadStatus::NoConnect,
        LeadStatus::Converted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Followup => "followup",
            LeadStatus::NoConnect => "no_connect",
            LeadStatus::Converted => "converted",
        }
    }

    /// Aceita o valor exato do enum ("no_connect"), ignorando caixa e espaços.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

// Mapeia o CREATE TYPE activity_type do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Whatsapp,
    Email,
    Meeting,
}

// =========================================================================
//  LEADS
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: LeadStatus,
    pub source: String,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub next_follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lead já validado, pronto para o INSERT.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: LeadStatus,
    pub source: String,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
}

/// Lead com createdBy / assignedTo resolvidos para a identidade do usuário.
/// Referência para usuário apagado vira `null` ("Unassigned" na tela).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: LeadStatus,
    pub source: String,
    pub created_by: Option<UserRef>,
    pub assigned_to: Option<UserRef>,
    pub next_follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Predicado de visibilidade sobre `assigned_to`.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadFilter {
    All,
    AssignedTo(Uuid),
    AssignedToAny(Vec<Uuid>),
}

impl LeadFilter {
    pub fn allows(&self, lead: &Lead) -> bool {
        match self {
            LeadFilter::All => true,
            LeadFilter::AssignedTo(id) => lead.assigned_to == Some(*id),
            LeadFilter::AssignedToAny(ids) => lead
                .assigned_to
                .is_some_and(|assignee| ids.contains(&assignee)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
}

// `createdBy` não existe aqui de propósito: o serde descarta o campo se vier no JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    // ausente = mantém, null = remove a atribuição
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

/// Busca da listagem: substring sem caixa em nome/email/telefone/status
/// AND status exato opcional.
#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
}

impl LeadQuery {
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(status) = self.status {
            if lead.status != status {
                return false;
            }
        }

        let term = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => term.to_lowercase(),
            _ => return true,
        };

        [
            lead.name.as_str(),
            lead.email.as_str(),
            lead.phone.as_str(),
            lead.status.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BulkUploadResult {
    pub inserted: usize,
    pub skipped: usize,
}

// =========================================================================
//  ATIVIDADES
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub activity_type: ActivityType,
    pub activity_date_time: DateTime<Utc>,
    pub outcome: String,
    pub notes: String,
    pub next_follow_up_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub lead_id: Uuid,
    pub activity_type: ActivityType,
    pub activity_date_time: DateTime<Utc>,
    pub outcome: String,
    pub notes: String,
    pub next_follow_up_date: Option<NaiveDate>,
    pub created_by: Uuid,
}

// Tudo Option: campo faltando tem que virar 400 com a mensagem certa, não 422 do serde.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityPayload {
    pub activity_type: Option<ActivityType>,
    #[serde(default, deserialize_with = "client_timestamp")]
    pub activity_date_time: Option<ClientTimestamp>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "client_timestamp")]
    pub next_follow_up_date: Option<ClientTimestamp>,
}

/// Data/hora como o front manda: ISO com fuso, o valor cru do
/// `<input type="datetime-local">` ("2026-10-18T10:30") ou só a data.
/// Sem fuso, vale o fuso configurado do CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTimestamp {
    Instant(DateTime<Utc>),
    Local(NaiveDateTime),
    Date(NaiveDate),
}

impl ClientTimestamp {
    const LOCAL_FORMATS: [&'static str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(ClientTimestamp::Instant(dt.with_timezone(&Utc)));
        }
        if let Some(naive) = Self::LOCAL_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        {
            return Some(ClientTimestamp::Local(naive));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(ClientTimestamp::Date)
    }

    /// Instante em UTC; data pura vira a meia-noite local.
    pub fn to_utc(self, offset: FixedOffset) -> DateTime<Utc> {
        let local = match self {
            ClientTimestamp::Instant(dt) => return dt,
            ClientTimestamp::Local(naive) => naive,
            ClientTimestamp::Date(date) => date.and_time(chrono::NaiveTime::MIN),
        };
        local.and_utc() - TimeDelta::seconds(offset.local_minus_utc().into())
    }

    /// Dia do calendário no fuso configurado.
    pub fn local_date(self, offset: FixedOffset) -> NaiveDate {
        match self {
            ClientTimestamp::Instant(dt) => dt.with_timezone(&offset).date_naive(),
            ClientTimestamp::Local(naive) => naive.date(),
            ClientTimestamp::Date(date) => date,
        }
    }
}

/// Selo da linha do tempo do lead. Não confundir com os baldes today/overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FollowUpBadge {
    Today,
    Upcoming,
    Past,
}

impl FollowUpBadge {
    pub fn classify(follow_up: Option<NaiveDate>, today: NaiveDate) -> Option<Self> {
        let date = follow_up?;
        Some(match date.cmp(&today) {
            std::cmp::Ordering::Equal => FollowUpBadge::Today,
            std::cmp::Ordering::Greater => FollowUpBadge::Upcoming,
            std::cmp::Ordering::Less => FollowUpBadge::Past,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub activity_type: ActivityType,
    pub activity_date_time: DateTime<Utc>,
    pub outcome: String,
    pub notes: String,
    pub next_follow_up_date: Option<NaiveDate>,
    pub created_by: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub follow_up_badge: Option<FollowUpBadge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

impl From<&Lead> for LeadSummary {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id,
            name: lead.name.clone(),
            phone: lead.phone.clone(),
        }
    }
}

/// Item das telas de follow-up (atividade + lead "populado").
#[derive(Debug, Clone, Serialize)]
pub struct FollowUpEntry {
    #[serde(flatten)]
    pub activity: Activity,
    pub lead: LeadSummary,
}

// --- Helpers de desserialização ---

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// "" conta como ausente (campo de data limpo no formulário)
fn client_timestamp<'de, D>(deserializer: D) -> Result<Option<ClientTimestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let raw = match raw.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    ClientTimestamp::parse(raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("data inválida: '{raw}'")))
}
