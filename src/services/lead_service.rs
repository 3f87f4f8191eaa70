// src/services/lead_service.rs

use std::{collections::HashMap, sync::Arc};

use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::{error::AppError, validation},
    db::LeadRepository,
    models::{
        auth::{Caller, UserRef},
        crm::{
            BulkUploadResult, CreateLeadPayload, Lead, LeadQuery, LeadStatus, LeadView, NewLead,
            UpdateLeadPayload,
        },
    },
    services::{
        rbac_service::{self, RbacService},
        user_service::UserService,
    },
};

#[derive(Clone)]
pub struct LeadService {
    repo: Arc<dyn LeadRepository>,
    users: UserService,
    rbac: RbacService,
}

impl LeadService {
    pub fn new(repo: Arc<dyn LeadRepository>, users: UserService, rbac: RbacService) -> Self {
        Self { repo, users, rbac }
    }

    // =========================================================================
    //  CRUD
    // =========================================================================

    pub async fn create_lead(&self, caller: &Caller, payload: CreateLeadPayload) -> Result<LeadView, AppError> {
        let new_lead = NewLead {
            name: validation::lead_name(payload.name.as_deref())?,
            email: validation::lead_email(payload.email.as_deref())?,
            phone: validation::lead_phone(payload.phone.as_deref())?,
            status: payload.status.unwrap_or_default(),
            source: validation::lead_source(payload.source.as_deref()),
            created_by: caller.id,
            // Sem responsável explícito, o lead fica com quem criou
            assigned_to: Some(payload.assigned_to.unwrap_or(caller.id)),
        };

        let lead = self.repo.insert(&new_lead).await?;
        self.to_view(lead).await
    }

    /// Atualização parcial dos campos editáveis. `created_by` nunca muda.
    pub async fn update_lead(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateLeadPayload,
    ) -> Result<LeadView, AppError> {
        let mut lead = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("Lead"))?;

        if let Some(name) = payload.name.as_deref() {
            lead.name = validation::lead_name(Some(name))?;
        }
        if let Some(email) = payload.email.as_deref() {
            lead.email = validation::lead_email(Some(email))?;
        }
        if let Some(phone) = payload.phone.as_deref() {
            lead.phone = validation::lead_phone(Some(phone))?;
        }
        if let Some(status) = payload.status {
            lead.status = status;
        }
        if let Some(source) = payload.source.as_deref() {
            lead.source = validation::lead_source(Some(source));
        }
        if let Some(assigned_to) = payload.assigned_to {
            lead.assigned_to = assigned_to;
        }

        // Último a escrever vence; não há versão/lock otimista
        let updated = self.repo.update(&lead).await?.ok_or(AppError::NotFound("Lead"))?;

        tracing::debug!(lead_id = %id, user_id = %caller.id, "Lead atualizado");
        self.to_view(updated).await
    }

    pub async fn delete_lead(&self, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound("Lead"));
        }

        tracing::info!(lead_id = %id, user_id = %caller.id, "Lead excluído");
        Ok(())
    }

    pub async fn list_leads(&self, caller: &Caller, query: &LeadQuery) -> Result<Vec<LeadView>, AppError> {
        let filter = self.rbac.visibility_filter(caller).await?;
        let mut leads: Vec<Lead> = self
            .repo
            .list(&filter)
            .await?
            .into_iter()
            .filter(|lead| query.matches(lead))
            .collect();

        // Mais recentes primeiro
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.to_views(leads).await
    }

    pub async fn get_lead(&self, caller: &Caller, id: Uuid) -> Result<LeadView, AppError> {
        let lead = self.find_visible(caller, id).await?;
        self.to_view(lead).await
    }

    /// Busca o lead e aplica o escopo de quem pede: 404 se não existe, 403 se existe
    /// mas está fora do filtro.
    pub async fn find_visible(&self, caller: &Caller, id: Uuid) -> Result<Lead, AppError> {
        let lead = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("Lead"))?;
        let filter = self.rbac.visibility_filter(caller).await?;
        rbac_service::ensure_visible(&filter, &lead)?;
        Ok(lead)
    }

    // =========================================================================
    //  UPLOAD EM MASSA (CSV)
    // =========================================================================

    /// Processa linha a linha, sem transação envolvendo o arquivo inteiro: o que já
    /// entrou fica mesmo se uma linha posterior der erro de banco. Linhas inválidas ou
    /// com e-mail repetido só contam como `skipped`.
    pub async fn bulk_upload(&self, caller: &Caller, csv_bytes: &[u8]) -> Result<BulkUploadResult, AppError> {
        let rows = parse_csv(csv_bytes)?;
        let mut result = BulkUploadResult::default();

        for row in rows {
            let new_lead = match row.and_then(|row| row.into_new_lead(caller.id)) {
                Ok(new_lead) => new_lead,
                Err(reason) => {
                    tracing::debug!("Linha do CSV ignorada: {}", reason);
                    result.skipped += 1;
                    continue;
                }
            };

            if self.repo.email_exists(&new_lead.email).await? {
                result.skipped += 1;
                continue;
            }

            self.repo.insert(&new_lead).await?;
            result.inserted += 1;
        }

        tracing::info!(
            user_id = %caller.id,
            inserted = result.inserted,
            skipped = result.skipped,
            "Upload de CSV concluído"
        );
        Ok(result)
    }

    // =========================================================================
    //  POPULATE
    // =========================================================================

    async fn to_view(&self, lead: Lead) -> Result<LeadView, AppError> {
        let mut views = self.to_views(vec![lead]).await?;
        views.pop().ok_or(AppError::NotFound("Lead"))
    }

    pub async fn to_views(&self, leads: Vec<Lead>) -> Result<Vec<LeadView>, AppError> {
        let ids: Vec<Uuid> = leads
            .iter()
            .flat_map(|l| [Some(l.created_by), l.assigned_to])
            .flatten()
            .collect();
        let refs = self.users.resolve_refs(ids).await?;

        Ok(leads.into_iter().map(|lead| lead_view(lead, &refs)).collect())
    }
}

fn lead_view(lead: Lead, refs: &HashMap<Uuid, UserRef>) -> LeadView {
    LeadView {
        id: lead.id,
        created_by: refs.get(&lead.created_by).cloned(),
        assigned_to: lead.assigned_to.and_then(|id| refs.get(&id).cloned()),
        name: lead.name,
        email: lead.email,
        phone: lead.phone,
        status: lead.status,
        source: lead.source,
        next_follow_up_date: lead.next_follow_up_date,
        created_at: lead.created_at,
        updated_at: lead.updated_at,
    }
}

// --- CSV ---

/// Colunas reconhecidas do arquivo (cabeçalho sem diferenciar caixa; colunas extras são ignoradas).
#[derive(Debug, Deserialize)]
struct CsvLeadRow {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    status: Option<String>,
    source: Option<String>,
}

impl CsvLeadRow {
    fn into_new_lead(self, caller_id: Uuid) -> Result<NewLead, String> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => LeadStatus::New,
            Some(raw) => LeadStatus::parse(raw).ok_or_else(|| format!("status desconhecido '{raw}'"))?,
        };

        Ok(NewLead {
            email: validation::lead_email(self.email.as_deref()).map_err(|e| e.to_string())?,
            name: validation::lead_name(self.name.as_deref()).map_err(|e| e.to_string())?,
            phone: validation::lead_phone(self.phone.as_deref()).map_err(|e| e.to_string())?,
            status,
            source: validation::lead_source(self.source.as_deref()),
            created_by: caller_id,
            assigned_to: Some(caller_id),
        })
    }
}

/// Um resultado por registro; registro malformado vira `Err` e é contado como ignorado.
fn parse_csv(bytes: &[u8]) -> Result<Vec<Result<CsvLeadRow, String>>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| AppError::InvalidBody(format!("CSV inválido: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .collect();

    if !headers.iter().any(|h| h == "email") {
        return Err(AppError::InvalidBody("O CSV precisa de uma coluna 'email'.".into()));
    }
    reader.set_headers(headers);

    Ok(reader
        .deserialize::<CsvLeadRow>()
        .map(|row| row.map_err(|e| e.to_string()))
        .collect())
}
