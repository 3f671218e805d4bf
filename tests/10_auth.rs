mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new().get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["storage"], "memory");
    Ok(())
}

#[tokio::test]
async fn sign_up_then_sign_in_returns_tokens() -> Result<()> {
    let session = common::sign_up("Olena").await?;
    assert!(!session.token.is_empty());

    let (status, body) = common::call(&session, Method::GET, "/api/user/me", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], session.staff_id.as_str());
    assert!(body["data"].get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn configured_admin_can_sign_in() -> Result<()> {
    let admin = common::admin().await?;
    let (status, body) = common::call(&admin, Method::GET, "/api/user/me", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], common::ADMIN_EMAIL);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/sign-in"))
        .json(&json!({ "email": common::ADMIN_EMAIL, "password": "not-it" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn duplicate_emails_conflict() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/sign-up"))
        .json(&json!({
            "first_name": "Copy",
            "last_name": "Cat",
            "email": common::ADMIN_EMAIL.to_uppercase(),
            "password": "whatever",
            "sex": "male"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/api/user/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/api/user/me"))
        .bearer_auth("not-a-token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn missing_permissions_are_forbidden() -> Result<()> {
    let admin = common::admin().await?;
    let limited = common::sign_up("Limited").await?;
    common::restrict(&admin, &limited, &["event-get-by-id"]).await?;

    let (status, body) = common::call(
        &limited,
        Method::POST,
        "/api/event",
        Some(json!({ "name": "Not allowed" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}
