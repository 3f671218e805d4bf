mod common;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::json;

async fn step_with_prize(creator: &common::Session, count: i32) -> Result<String> {
    let (status, body) = common::call(
        creator,
        Method::POST,
        "/api/event",
        Some(json!({
            "name": "Awards night",
            "steps": [{ "name": "only", "max_score": 10, "end_date": "2099-01-01T00:00:00Z" }]
        })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "event creation failed: {} {}", status, body);
    let step_id = body["data"]["steps"][0]["id"].as_str().context("step id")?.to_string();

    let (status, body) = common::call(
        creator,
        Method::POST,
        "/api/prize",
        Some(json!({
            "step_id": step_id,
            "name": "Golden cup",
            "type": "medal",
            "status": "legendary",
            "count": count,
            "data": "https://cdn.acheer.test/cup.png"
        })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "prize creation failed: {} {}", status, body);
    assert_eq!(body["data"]["current_count"], count);
    Ok(body["data"]["id"].as_str().context("prize id")?.to_string())
}

#[tokio::test]
async fn the_last_unit_goes_to_one_staff_member() -> Result<()> {
    let creator = common::sign_up("Sponsor").await?;
    let winner = common::sign_up("Winner").await?;
    let runner_up = common::sign_up("Runner").await?;
    let prize_id = step_with_prize(&creator, 1).await?;

    let (status, body) = common::call(
        &creator,
        Method::POST,
        &format!("/api/prize/give/{}", prize_id),
        Some(json!({ "staff_id": winner.staff_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["current_count"], 0);

    let (status, body) = common::call(
        &creator,
        Method::POST,
        &format!("/api/prize/give/{}", prize_id),
        Some(json!({ "staff_id": runner_up.staff_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EXHAUSTED");

    let (status, body) = common::call(
        &winner,
        Method::GET,
        &format!("/api/user/prizes/{}", winner.staff_id),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn medals_need_an_image() -> Result<()> {
    let creator = common::sign_up("Designer").await?;
    let (status, body) = common::call(
        &creator,
        Method::POST,
        "/api/event",
        Some(json!({
            "name": "Gallery",
            "steps": [{
                "name": "paint",
                "end_date": "2099-01-01T00:00:00Z",
                "prizes": [{ "name": "Blank", "type": "medal", "status": "common", "count": 3 }]
            }]
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["data"].is_string());
    Ok(())
}

#[tokio::test]
async fn prizes_are_listed_by_type() -> Result<()> {
    let creator = common::sign_up("Curator").await?;
    let prize_id = step_with_prize(&creator, 5).await?;

    let (status, body) = common::call(&creator, Method::GET, "/api/prize/type/medal", None).await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .context("prizes")?
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert!(ids.contains(&prize_id.as_str()));

    let (status, _) = common::call(&creator, Method::GET, "/api/prize/type/trophy", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
