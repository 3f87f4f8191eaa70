// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::Caller,
    services::rbac_service::{self, Action},
};

/// 1. O Trait que liga um tipo a uma ação da tabela de papéis
pub trait ActionDef: Send + Sync + 'static {
    fn action() -> Action;
}

/// 2. O Extractor (Guardião): 403 se o papel de quem chamou não pode executar a ação
pub struct RequireAction<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireAction<T>
where
    T: ActionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Posto pelo auth_guard; sem ele a requisição nem é autenticada
        let caller = parts.extensions.get::<Caller>().ok_or(AppError::InvalidToken)?;

        rbac_service::ensure(caller, T::action())?;

        Ok(RequireAction(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS AÇÕES (TIPOS)
// ---

pub struct PermLeadCreate;
impl ActionDef for PermLeadCreate {
    fn action() -> Action { Action::CreateLead }
}

pub struct PermLeadEdit;
impl ActionDef for PermLeadEdit {
    fn action() -> Action { Action::EditLead }
}

pub struct PermLeadDelete;
impl ActionDef for PermLeadDelete {
    fn action() -> Action { Action::DeleteLead }
}

pub struct PermManageUsers;
impl ActionDef for PermManageUsers {
    fn action() -> Action { Action::ManageUsers }
}

pub struct PermViewReports;
impl ActionDef for PermViewReports {
    fn action() -> Action { Action::ViewReports }
}

pub struct PermListAgents;
impl ActionDef for PermListAgents {
    fn action() -> Action { Action::ListAgents }
}
