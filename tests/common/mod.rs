#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub const ADMIN_EMAIL: &str = "admin@acheer.test";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // The in-memory store keeps every test binary independent of Postgres
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_acheer-api"));
        cmd.arg("--memory")
            .env("PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("JWT_SECRET", "integration-test-secret")
            .env("BOOTSTRAP_ADMIN_EMAIL", ADMIN_EMAIL)
            .env("BOOTSTRAP_ADMIN_PASSWORD", ADMIN_PASSWORD)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// A signed-in caller: its token and staff id.
pub struct Session {
    pub token: String,
    pub staff_id: String,
}

pub async fn sign_in(email: &str, password: &str) -> Result<Session> {
    let server = ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/sign-in"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "sign-in failed: {}", res.status());
    session_from(res.json().await?)
}

pub async fn admin() -> Result<Session> {
    sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Registers a fresh account with a unique email.
pub async fn sign_up(first_name: &str) -> Result<Session> {
    let server = ensure_server().await?;
    let email = format!("{}.{}@acheer.test", first_name.to_lowercase(), uuid_like());
    let res = reqwest::Client::new()
        .post(server.url("/auth/sign-up"))
        .json(&json!({
            "first_name": first_name,
            "last_name": "Tester",
            "email": email,
            "password": "secret-password",
            "sex": "female"
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "sign-up failed: {}", res.status());
    session_from(res.json().await?)
}

fn session_from(body: Value) -> Result<Session> {
    let token = body["data"]["token"].as_str().context("token missing")?.to_string();
    let staff_id = body["data"]["staff"]["id"].as_str().context("staff id missing")?.to_string();
    Ok(Session { token, staff_id })
}

fn uuid_like() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:x}{:x}", nanos, std::process::id())
}

/// Sends an authenticated request and returns the status with the parsed body.
pub async fn call(
    session: &Session,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let server = ensure_server().await?;
    let mut req = reqwest::Client::new()
        .request(method, server.url(path))
        .bearer_auth(&session.token);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let res = req.send().await?;
    let status = res.status();
    let body = res.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}

/// Gives `session` a fresh position holding only `permissions`.
pub async fn restrict(admin: &Session, session: &Session, permissions: &[&str]) -> Result<()> {
    let (status, body) = call(
        admin,
        reqwest::Method::POST,
        "/api/user/position",
        Some(json!({ "name": format!("limited-{}", uuid_like()), "permissions": permissions })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "position creation failed: {} {}", status, body);
    let position_id = body["data"]["id"].as_str().context("position id")?.to_string();

    let (status, body) = call(
        admin,
        reqwest::Method::PUT,
        &format!("/api/user/position/give/{}", position_id),
        Some(json!([{ "staff_id": session.staff_id }])),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "position grant failed: {} {}", status, body);
    Ok(())
}
