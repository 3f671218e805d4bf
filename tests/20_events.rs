mod common;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

async fn create_event(session: &common::Session, body: Value) -> Result<Value> {
    let (status, body) = common::call(session, Method::POST, "/api/event", Some(body)).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "event creation failed: {} {}", status, body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn created_events_list_their_creator() -> Result<()> {
    let creator = common::sign_up("Creator").await?;
    let event = create_event(&creator, json!({ "name": "Hackathon" })).await?;
    let id = event["id"].as_str().context("event id")?;

    let (status, body) = common::call(&creator, Method::GET, &format!("/api/event/{}", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event_type"], "public");
    assert_eq!(body["data"]["staff"][0]["staff_role"], "creator");
    assert_eq!(body["data"]["staff"][0]["status"], "accepted");

    let (status, body) = common::call(&creator, Method::GET, "/api/event/staff/creator", None).await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .context("events")?
        .iter()
        .filter_map(|e| e["id"].as_str())
        .collect();
    assert!(ids.contains(&id));
    Ok(())
}

#[tokio::test]
async fn invitations_are_answered_by_the_invitee() -> Result<()> {
    let creator = common::sign_up("Host").await?;
    let guest = common::sign_up("Guest").await?;
    let event = create_event(&creator, json!({ "name": "Retreat" })).await?;
    let id = event["id"].as_str().context("event id")?;

    let (status, body) = common::call(
        &creator,
        Method::POST,
        &format!("/api/event/invite/{}", id),
        Some(json!([{ "staff_id": guest.staff_id }])),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"][0]["status"], "none");

    let (status, body) = common::call(&guest, Method::GET, "/api/event/invitation", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["event"]["id"], id);

    let (status, _) = common::call(
        &guest,
        Method::POST,
        &format!("/api/event/invitation/{}", id),
        Some(json!({ "status": "accepted" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // A second invite for the same staff member is a conflict
    let (status, _) = common::call(
        &creator,
        Method::POST,
        &format!("/api/event/invite/{}", id),
        Some(json!([{ "staff_id": guest.staff_id }])),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn inviting_as_creator_is_rejected() -> Result<()> {
    let creator = common::sign_up("Owner").await?;
    let other = common::sign_up("Other").await?;
    let event = create_event(&creator, json!({ "name": "Workshop" })).await?;
    let id = event["id"].as_str().context("event id")?;

    let (status, body) = common::call(
        &creator,
        Method::POST,
        &format!("/api/event/invite/{}", id),
        Some(json!([{ "staff_id": other.staff_id, "staff_role": "creator" }])),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn end_date_must_follow_creation() -> Result<()> {
    let creator = common::sign_up("Planner").await?;
    let (status, body) = common::call(
        &creator,
        Method::POST,
        "/api/event",
        Some(json!({
            "name": "Backwards",
            "creation_date": "2030-01-02T00:00:00Z",
            "end_date": "2030-01-01T00:00:00Z"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    Ok(())
}

#[tokio::test]
async fn unknown_events_are_not_found() -> Result<()> {
    let session = common::sign_up("Seeker").await?;
    let (status, body) = common::call(
        &session,
        Method::GET,
        "/api/event/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}
