// src/handlers.rs

pub mod activities;
pub mod auth;
pub mod crm;
pub mod dashboard;
pub mod followups;
pub mod users;
