mod common;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

const FAR_FUTURE: &str = "2099-01-01T00:00:00Z";
const FURTHER_FUTURE: &str = "2099-02-01T00:00:00Z";

async fn stepped_event(creator: &common::Session) -> Result<Value> {
    let (status, body) = common::call(
        creator,
        Method::POST,
        "/api/event",
        Some(json!({
            "name": "Quest",
            "steps": [
                { "name": "warm-up", "max_score": 50, "end_date": FAR_FUTURE },
                { "name": "final", "max_score": 100, "end_date": FURTHER_FUTURE }
            ]
        })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "event creation failed: {} {}", status, body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn completing_a_step_moves_staff_to_the_next_level() -> Result<()> {
    let creator = common::sign_up("Judge").await?;
    let player = common::sign_up("Player").await?;
    let event = stepped_event(&creator).await?;
    let event_id = event["id"].as_str().context("event id")?;
    let first = event["steps"][0]["id"].as_str().context("first step")?;
    let second = event["steps"][1]["id"].as_str().context("second step")?;
    assert_eq!(event["steps"][0]["level"], 1);
    assert_eq!(event["steps"][1]["level"], 2);

    let (status, _) = common::call(
        &creator,
        Method::PUT,
        &format!("/api/event/step/assign/{}", first),
        Some(json!([{ "staff_id": player.staff_id }])),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::call(
        &creator,
        Method::PUT,
        &format!("/api/event/step/status/{}", first),
        Some(json!({ "staff_id": player.staff_id, "accomplishment": "done", "score": 40 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["advanced_to"], second);

    let (status, body) = common::call(
        &creator,
        Method::GET,
        &format!("/api/user/step/{}", second),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], player.staff_id.as_str());

    let (status, body) = common::call(
        &player,
        Method::GET,
        &format!("/api/event/score/{}", event_id),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 40);
    Ok(())
}

#[tokio::test]
async fn scores_above_the_maximum_are_rejected() -> Result<()> {
    let creator = common::sign_up("Strict").await?;
    let player = common::sign_up("Eager").await?;
    let event = stepped_event(&creator).await?;
    let first = event["steps"][0]["id"].as_str().context("first step")?;

    common::call(
        &creator,
        Method::PUT,
        &format!("/api/event/step/assign/{}", first),
        Some(json!([{ "staff_id": player.staff_id }])),
    )
    .await?;

    let (status, body) = common::call(
        &creator,
        Method::PUT,
        &format!("/api/event/step/status/{}", first),
        Some(json!({ "staff_id": player.staff_id, "accomplishment": "done", "score": 51 })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["score"].is_string());
    Ok(())
}

#[tokio::test]
async fn canceled_steps_can_no_longer_change() -> Result<()> {
    let creator = common::sign_up("Editor").await?;
    let event = stepped_event(&creator).await?;
    let event_id = event["id"].as_str().context("event id")?;

    let (status, body) = common::call(
        &creator,
        Method::POST,
        "/api/event/step",
        Some(json!({ "event_id": event_id, "name": "bonus", "end_date": FURTHER_FUTURE })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["level"], 3);
    let bonus = body["data"]["id"].as_str().context("bonus step")?.to_string();

    let (status, body) = common::call(&creator, Method::PUT, &format!("/api/event/step/cancel/{}", bonus), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "canceled");

    let (status, body) = common::call(
        &creator,
        Method::PUT,
        &format!("/api/event/step/{}", bonus),
        Some(json!({ "name": "renamed" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    Ok(())
}
