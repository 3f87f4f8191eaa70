mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use common::{body_json, TestApp};
use crm_backend::models::auth::Role;
use serde_json::{json, Value};
use uuid::Uuid;

/// `assignee = None` cria o lead e depois tira o responsável (na criação ele cairia em quem criou).
async fn lead_for(app: &TestApp, token: &str, email: &str, assignee: Option<Uuid>) -> Result<Uuid> {
    let lead = app
        .create_lead(
            token,
            json!({ "name": email, "email": email, "phone": "9876543210", "assignedTo": assignee }),
        )
        .await?;
    if assignee.is_none() {
        let response = app
            .put_json(&format!("/api/leads/{lead}"), &json!({ "assignedTo": null }), Some(token))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    Ok(lead)
}

async fn convert(app: &TestApp, token: &str, lead: Uuid) -> Result<()> {
    let response = app
        .put_json(&format!("/api/leads/{lead}"), &json!({ "status": "converted" }), Some(token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn summary_counts_only_visible_leads() -> Result<()> {
    let app = TestApp::new();
    let (_admin, admin_token) = app.user_with_token("admin@crm.test", Role::Admin).await?;
    let (agent, agent_token) = app.user_with_token("agent@crm.test", Role::SalesAgent).await?;
    let (other, _) = app.user_with_token("other@crm.test", Role::SalesAgent).await?;

    let a1 = lead_for(&app, &admin_token, "a1@x.com", Some(agent.id)).await?;
    lead_for(&app, &admin_token, "a2@x.com", Some(agent.id)).await?;
    lead_for(&app, &admin_token, "o1@x.com", Some(other.id)).await?;
    convert(&app, &admin_token, a1).await?;

    let body = body_json(app.get("/api/leads/stats/summary", Some(&agent_token)).await?).await?;
    assert_eq!(
        body,
        json!({ "total": 2, "new": 1, "contacted": 0, "followup": 0, "noConnect": 0, "converted": 1 })
    );

    let body = body_json(app.get("/api/leads/stats/summary", Some(&admin_token)).await?).await?;
    assert_eq!(body["total"], 3);
    assert_eq!(body["new"], 2);
    Ok(())
}

#[tokio::test]
async fn monthly_groups_by_creation_month_ascending() -> Result<()> {
    let app = TestApp::new();
    let (_admin, admin_token) = app.user_with_token("admin@crm.test", Role::Admin).await?;
    let (_manager, manager_token) = app.user_with_token("manager@crm.test", Role::SalesManager).await?;
    let (agent, _) = app.user_with_token("agent@crm.test", Role::SalesAgent).await?;

    let march = lead_for(&app, &admin_token, "m1@x.com", Some(agent.id)).await?;
    let march_again = lead_for(&app, &admin_token, "m2@x.com", Some(agent.id)).await?;
    let january = lead_for(&app, &admin_token, "j1@x.com", Some(agent.id)).await?;
    let hidden = lead_for(&app, &admin_token, "h1@x.com", None).await?;

    app.store
        .set_lead_created_at(march, Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap())
        .await;
    // Outro ano, mesmo mês
    app.store
        .set_lead_created_at(march_again, Utc.with_ymd_and_hms(2025, 3, 28, 12, 0, 0).unwrap())
        .await;
    app.store
        .set_lead_created_at(january, Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap())
        .await;
    app.store
        .set_lead_created_at(hidden, Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap())
        .await;

    let body = body_json(app.get("/api/leads/stats/monthly", Some(&manager_token)).await?).await?;
    assert_eq!(
        body,
        json!([{ "month": 1, "count": 1 }, { "month": 3, "count": 2 }])
    );

    let body = body_json(app.get("/api/leads/stats/monthly", Some(&admin_token)).await?).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn team_performance_is_for_admin_and_manager() -> Result<()> {
    let app = TestApp::new();
    let (_agent, agent_token) = app.user_with_token("agent@crm.test", Role::SalesAgent).await?;
    let (_manager, manager_token) = app.user_with_token("manager@crm.test", Role::SalesManager).await?;

    let response = app.get("/api/leads/stats/team", Some(&agent_token)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/api/leads/stats/team", Some(&manager_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn team_performance_merges_unassigned_and_deleted_assignees() -> Result<()> {
    let app = TestApp::new();
    let (admin, admin_token) = app.user_with_token("admin@crm.test", Role::Admin).await?;
    let (_manager, manager_token) = app.user_with_token("manager@crm.test", Role::SalesManager).await?;
    let (star, _) = app.user_with_token("star@crm.test", Role::SalesAgent).await?;
    let (busy, _) = app.user_with_token("busy@crm.test", Role::SalesAgent).await?;
    let (gone, _) = app.user_with_token("gone@crm.test", Role::SalesAgent).await?;

    let s1 = lead_for(&app, &admin_token, "s1@x.com", Some(star.id)).await?;
    convert(&app, &admin_token, s1).await?;
    for email in ["b1@x.com", "b2@x.com", "b3@x.com"] {
        lead_for(&app, &admin_token, email, Some(busy.id)).await?;
    }
    lead_for(&app, &admin_token, "g1@x.com", Some(gone.id)).await?;
    lead_for(&app, &admin_token, "u1@x.com", None).await?;
    // Lead do próprio admin: global, entra mesmo fora do escopo do gerente
    lead_for(&app, &admin_token, "ad@x.com", Some(admin.id)).await?;

    let response = app.delete(&format!("/api/users/{}", gone.id), Some(&admin_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(app.get("/api/leads/stats/team", Some(&manager_token)).await?).await?;
    let rows: Vec<(Value, Value, Value)> = body
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|r| (r["displayName"].clone(), r["total"].clone(), r["converted"].clone()))
                .collect()
        })
        .unwrap_or_default();

    assert_eq!(
        rows,
        vec![
            (json!("star@crm.test"), json!(1), json!(1)),
            (json!("busy@crm.test"), json!(3), json!(0)),
            (json!("Unassigned"), json!(2), json!(0)),
            (json!("admin@crm.test"), json!(1), json!(0)),
        ]
    );
    assert_eq!(body[2]["assignee"], Value::Null);
    assert_eq!(body[0]["assignee"]["id"], star.id.to_string());
    Ok(())
}
