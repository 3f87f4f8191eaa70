// src/services/rbac_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::{
        auth::{Caller, Role},
        crm::{Lead, LeadFilter},
    },
};

/// Tudo que um papel pode (ou não) fazer. Tabela fechada, sem strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewLeads,
    CreateLead,
    EditLead,
    DeleteLead,
    ManageUsers,
    ViewReports,
    LogActivity,
    ListAgents,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::ViewLeads => "visualizar leads",
            Action::CreateLead => "criar leads",
            Action::EditLead => "editar leads",
            Action::DeleteLead => "excluir leads",
            Action::ManageUsers => "gerenciar usuários",
            Action::ViewReports => "visualizar relatórios",
            Action::LogActivity => "registrar atividades",
            Action::ListAgents => "listar vendedores",
        }
    }
}

pub fn can_perform(role: Role, action: Action) -> bool {
    use Action::*;

    match role {
        Role::Admin => true,
        Role::SalesManager => !matches!(action, DeleteLead | ManageUsers),
        Role::SalesAgent => matches!(action, ViewLeads | LogActivity),
    }
}

pub fn ensure(caller: &Caller, action: Action) -> Result<(), AppError> {
    if can_perform(caller.role, action) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "O papel '{}' não pode {}.",
            caller.role.as_str(),
            action.describe()
        )))
    }
}

/// Lead existe mas está fora do escopo de quem pediu: sempre 403 (o 404 fica
/// reservado para o lead que não existe).
pub fn ensure_visible(filter: &LeadFilter, lead: &Lead) -> Result<(), AppError> {
    if filter.allows(lead) {
        Ok(())
    } else {
        Err(AppError::forbidden("Você não tem acesso a este lead."))
    }
}

#[derive(Clone)]
pub struct RbacService {
    user_repo: Arc<dyn UserRepository>,
}

impl RbacService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Predicado de visibilidade dos leads:
    /// agente → só os atribuídos a ele; gerente → os atribuídos a qualquer sales_agent;
    /// admin → tudo.
    pub async fn visibility_filter(&self, caller: &Caller) -> Result<LeadFilter, AppError> {
        match caller.role {
            Role::Admin => Ok(LeadFilter::All),
            Role::SalesAgent => Ok(LeadFilter::AssignedTo(caller.id)),
            Role::SalesManager => {
                let agents = self.user_repo.list_by_role(Role::SalesAgent).await?;
                Ok(LeadFilter::AssignedToAny(agents.into_iter().map(|a| a.id).collect()))
            }
        }
    }
}
