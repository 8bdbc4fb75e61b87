#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use potencialize_api::app::{app, AppState};
use potencialize_api::auth::issue_pair;
use potencialize_api::database::MemoryStore;
use potencialize_api::schema::registry::USERS;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

pub const TENANT: &str = "main";
pub const USERNAME: &str = "consultora";
pub const PASSWORD: &str = "s3nha-forte";

/// In-process server over a fresh in-memory store, with one seeded user
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub user_id: i64,
    pub access: String,
    pub refresh: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.access)
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.authed(self.client.get(self.url(path))).send().await?)
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response> {
        Ok(self.authed(self.client.post(self.url(path))).json(&body).send().await?)
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Response> {
        Ok(self.authed(self.client.put(self.url(path))).json(&body).send().await?)
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Response> {
        Ok(self.authed(self.client.patch(self.url(path))).json(&body).send().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        Ok(self.authed(self.client.delete(self.url(path))).send().await?)
    }

    /// Unauthenticated request builder
    pub fn anonymous(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST and return the created representation, failing on anything but 201
    pub async fn create(&self, path: &str, body: Value) -> Result<Value> {
        let res = self.post(path, body).await?;
        let status = res.status();
        let body: Value = res.json().await?;
        anyhow::ensure!(status == StatusCode::CREATED, "POST {} returned {}: {}", path, status, body);
        Ok(body)
    }

    pub async fn client_profile(&self, company: &str, cnpj: &str) -> Result<Value> {
        self.create(
            "/api/clients/profiles/",
            json!({
                "company_name": company,
                "cnpj": cnpj,
                "responsible_name": "Marina",
                "responsible_phone": "11988887777",
            }),
        )
        .await
    }

    pub async fn project(&self, title: &str, client: &Value) -> Result<Value> {
        self.create(
            "/api/projects/projects/",
            json!({ "title": title, "project_type": "Assessoria", "client": client["id"] }),
        )
        .await
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let state = AppState::new(Arc::new(MemoryStore::new()));
    let user = state
        .service
        .create(TENANT, None, &USERS, json!({ "username": USERNAME, "password": PASSWORD, "email": "consultora@potencialize.com.br" }))
        .await
        .map_err(|e| anyhow::anyhow!("seeding user failed: {}", e))?;
    let user_id = user["id"].as_i64().context("seeded user has no id")?;
    let pair = issue_pair(user_id, USERNAME, TENANT)?;

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let router = app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let server = TestServer {
        base_url,
        state,
        user_id,
        access: pair.access,
        refresh: pair.refresh,
        client: reqwest::Client::new(),
    };
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
