// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};

use crate::{config::AppState, handlers, middleware::auth::auth_guard};

pub fn create_router(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/sales-agents", get(handlers::users::list_sales_agents))
        .route(
            "/",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/{id}",
            put(handlers::users::update_user_role).delete(handlers::users::delete_user),
        );

    let lead_routes = Router::new()
        .route(
            "/",
            post(handlers::crm::create_lead).get(handlers::crm::list_leads),
        )
        .route("/bulk-upload", post(handlers::crm::bulk_upload))
        // Relatórios
        .route("/stats/summary", get(handlers::dashboard::summary))
        .route("/stats/monthly", get(handlers::dashboard::monthly))
        .route("/stats/team", get(handlers::dashboard::team))
        .route(
            "/{id}",
            get(handlers::crm::get_lead)
                .put(handlers::crm::update_lead)
                .delete(handlers::crm::delete_lead),
        );

    let activity_routes = Router::new().route(
        "/{lead_id}",
        post(handlers::activities::add_activity).get(handlers::activities::list_activities),
    );

    let followup_routes = Router::new()
        .route("/today", get(handlers::followups::today))
        .route("/overdue", get(handlers::followups::overdue));

    // Tudo fora de /auth exige um Bearer válido
    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/leads", lead_routes)
        .nest("/activities", activity_routes)
        .nest("/followups", followup_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .with_state(app_state)
}
