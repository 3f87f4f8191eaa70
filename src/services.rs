// src/services.rs

pub mod activity_service;
pub mod auth;
pub mod lead_service;
pub mod rbac_service;
pub mod report_service;
pub mod user_service;
