// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    login = { "/api/auth/login", true },
    refresh = { "/api/auth/refresh", true },
    refresh_with_query = { "/api/auth/refresh?source=timer", true },
    logout = { "/api/auth/logout", false },
    users_me = { "/api/users/me", false },
    tasks = { "/api/tasks/42", false },
    login_lookalike = { "/api/auth/login-history", false },
)]
fn credential_exempt_routes(path: &str, exempt: bool) {
    assert_eq!(ApiRequest::post(path).is_credential_exempt(), exempt);
}

#[test]
fn route_strips_query() -> anyhow::Result<()> {
    let req = ApiRequest::get("/api/tasks?status=RUNNING");
    assert_eq!(req.route(), "/api/tasks");
    assert_eq!(ApiRequest::get("/api/tasks").route(), "/api/tasks");
    Ok(())
}

#[test]
fn retry_is_a_new_value() -> anyhow::Result<()> {
    let original = ApiRequest::post("/api/tasks")
        .json(&serde_json::json!({ "name": "finetune" }))?
        .query("dry_run", "false")
        .with_bearer("old");
    let retry = original.clone().into_retry("new");

    assert_eq!(original.bearer.as_deref(), Some("old"));
    assert!(!original.retried);
    assert_eq!(retry.bearer.as_deref(), Some("new"));
    assert!(retry.retried);
    assert_eq!(retry.body, original.body);
    assert_eq!(retry.query, original.query);
    assert_eq!(retry.method, Method::POST);
    Ok(())
}

#[test]
fn response_json_and_status() -> anyhow::Result<()> {
    let ok = ApiResponse::json_value(200, &serde_json::json!({ "id": "t-1" }));
    assert!(ok.is_success());
    let value: serde_json::Value = ok.json()?;
    assert_eq!(value["id"], "t-1");

    let empty = ApiResponse::new(204, "");
    let value: Option<serde_json::Value> = empty.json()?;
    assert!(value.is_none());

    let garbage = ApiResponse::new(200, "<html>");
    let decoded: Result<serde_json::Value, _> = garbage.json();
    assert!(matches!(decoded, Err(SessionError::Decode(_))));
    Ok(())
}

#[test]
fn error_for_status_passes_through_failures() -> anyhow::Result<()> {
    let resp = ApiResponse::new(500, r#"{"message":"db down"}"#);
    assert_eq!(
        resp.error_for_status(),
        Err(SessionError::Http { status: 500, message: "db down".into() })
    );
    assert!(ApiResponse::new(401, "").is_unauthorized());
    assert!(ApiResponse::new(201, "{}").error_for_status().is_ok());
    Ok(())
}

#[test]
fn base_url_trailing_slash_is_trimmed() -> anyhow::Result<()> {
    let transport = ReqwestTransport::new("http://localhost:8080/", Duration::from_secs(1));
    assert_eq!(transport.base_url(), "http://localhost:8080");
    assert_eq!(transport.url("/api/users/me"), "http://localhost:8080/api/users/me");
    Ok(())
}
