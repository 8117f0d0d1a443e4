//! Engine API client
//!
//! `ConsoleApi` is the seam between the console and the remote engine: the
//! session only ever talks to this trait, so tests can drive it with a fake.
//! `HttpApiClient` is the production implementation over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::errors::{ApiError, ApiResult};
use super::types::{
    CommandReply, EngineStatus, KpiEnvelope, KpiSnapshot, Leader, LeaderEnvelope, LogEntry,
    LogsEnvelope, RiskStatsEnvelope, Settings, SettingsEnvelope, StatusEnvelope,
    StrategyEnvelope, StrategyStatus, UsageEnvelope, UsageSnapshot, WalletSnapshot,
};
use crate::config::ApiConfig;

/// Max idle connections per host in connection pool
const HTTP_POOL_MAX_IDLE: usize = 4;
/// How long idle connections stay in the pool (seconds)
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 60;
/// Longest error body echoed back into an `ApiError::Rejected`
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Liveness probes hit once at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    JsOk,
    Ping,
    Test,
}

impl Probe {
    pub const ALL: [Probe; 3] = [Probe::JsOk, Probe::Ping, Probe::Test];

    pub fn path(&self) -> &'static str {
        match self {
            Probe::JsOk => "/api/js-ok",
            Probe::Ping => "/api/ping",
            Probe::Test => "/api/test",
        }
    }
}

/// Every endpoint the console consumes
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn probe(&self, probe: Probe) -> ApiResult<Value>;

    async fn settings(&self) -> ApiResult<Settings>;
    async fn wallet(&self) -> ApiResult<WalletSnapshot>;
    async fn kpi(&self) -> ApiResult<KpiSnapshot>;
    async fn leader(&self) -> ApiResult<Leader>;
    async fn risk_stats(&self) -> ApiResult<RiskStatsEnvelope>;
    async fn status(&self) -> ApiResult<Option<EngineStatus>>;
    async fn logs_since(&self, cursor: u64) -> ApiResult<Vec<LogEntry>>;
    async fn usage(&self) -> ApiResult<Option<UsageSnapshot>>;
    async fn strategy_status(&self) -> ApiResult<Option<StrategyStatus>>;

    async fn rpc_check(&self) -> ApiResult<Value>;
    async fn start(&self) -> ApiResult<CommandReply>;
    async fn stop(&self) -> ApiResult<CommandReply>;
    async fn set_mode(&self, mode: &str) -> ApiResult<Value>;
    async fn set_opensea_key(&self, key: &str) -> ApiResult<Value>;
    async fn set_chain(&self, chain: &str) -> ApiResult<Value>;
    async fn set_balance_source(&self, source: &str) -> ApiResult<Value>;
    async fn patch_contracts(&self, contracts: &[String]) -> ApiResult<Value>;
    async fn set_risk_profile(&self, profile: &str) -> ApiResult<Value>;
    async fn set_strategy(&self, mode: &str, strategy: Option<&str>) -> ApiResult<Value>;
}

/// reqwest-backed implementation of [`ConsoleApi`]
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    http: Client,
    base_url: Url,
    timeout_ms: u64,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base url '{}': {}", config.base_url, e)))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE)
            .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Transport(format!("http client build failed: {}", e)))?;

        tracing::info!(
            phase = "init",
            base_url = %base_url,
            timeout_ms = config.timeout_ms,
            connect_timeout_ms = config.connect_timeout_ms,
            "HTTP client configured"
        );

        Ok(Self {
            http,
            base_url,
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("bad path '{}': {}", path, e)))
    }

    fn map_transport(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} (body: {})", e, truncate(&text))))
    }

    async fn get_value(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        let response = self
            .http
            .get(self.url(path)?)
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.read_body(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        decode(self.get_value(path, &[]).await?)
    }

    async fn post_json(&self, path: &str, body: Value) -> ApiResult<Value> {
        let response = self
            .http
            .post(self.url(path)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.read_body(response).await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    // A null body (empty response) decodes through an empty object so that
    // envelopes fall back to their defaults.
    let value = if value.is_null() { json!({}) } else { value };
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}…", cut)
    }
}

/// Prefer the server's `{ "error": ... }` message over the raw body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("detail"))
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
        })
        .unwrap_or_else(|| truncate(body.trim()))
}

#[async_trait]
impl ConsoleApi for HttpApiClient {
    async fn probe(&self, probe: Probe) -> ApiResult<Value> {
        self.get_value(probe.path(), &[]).await
    }

    async fn settings(&self) -> ApiResult<Settings> {
        Ok(self.get_json::<SettingsEnvelope>("/api/settings").await?.settings)
    }

    async fn wallet(&self) -> ApiResult<WalletSnapshot> {
        self.get_json("/api/wallet").await
    }

    async fn kpi(&self) -> ApiResult<KpiSnapshot> {
        Ok(self.get_json::<KpiEnvelope>("/api/kpi").await?.kpi)
    }

    async fn leader(&self) -> ApiResult<Leader> {
        Ok(self.get_json::<LeaderEnvelope>("/api/leader").await?.leader)
    }

    async fn risk_stats(&self) -> ApiResult<RiskStatsEnvelope> {
        self.get_json("/api/risk_stats").await
    }

    async fn status(&self) -> ApiResult<Option<EngineStatus>> {
        Ok(self.get_json::<StatusEnvelope>("/api/status").await?.status)
    }

    async fn logs_since(&self, cursor: u64) -> ApiResult<Vec<LogEntry>> {
        let value = self
            .get_value("/api/logs", &[("since", cursor.to_string())])
            .await?;
        Ok(decode::<LogsEnvelope>(value)?.logs)
    }

    async fn usage(&self) -> ApiResult<Option<UsageSnapshot>> {
        Ok(self.get_json::<UsageEnvelope>("/api/moralis_usage").await?.usage)
    }

    async fn strategy_status(&self) -> ApiResult<Option<StrategyStatus>> {
        Ok(self
            .get_json::<StrategyEnvelope>("/api/strategy_status")
            .await?
            .strategy)
    }

    async fn rpc_check(&self) -> ApiResult<Value> {
        self.post_json("/api/rpc_check", json!({})).await
    }

    async fn start(&self) -> ApiResult<CommandReply> {
        Ok(CommandReply::from_body(self.post_json("/api/start", json!({})).await?))
    }

    async fn stop(&self) -> ApiResult<CommandReply> {
        Ok(CommandReply::from_body(self.post_json("/api/stop", json!({})).await?))
    }

    async fn set_mode(&self, mode: &str) -> ApiResult<Value> {
        self.post_json("/api/mode_set", json!({ "MODE": mode })).await
    }

    async fn set_opensea_key(&self, key: &str) -> ApiResult<Value> {
        self.post_json("/api/opensea_set", json!({ "OPENSEA_API_KEY": key }))
            .await
    }

    async fn set_chain(&self, chain: &str) -> ApiResult<Value> {
        self.post_json("/api/chain_set", json!({ "chain": chain })).await
    }

    async fn set_balance_source(&self, source: &str) -> ApiResult<Value> {
        self.post_json("/api/balance_source_set", json!({ "source": source }))
            .await
    }

    async fn patch_contracts(&self, contracts: &[String]) -> ApiResult<Value> {
        self.post_json("/api/patch", json!({ "CONTRACTS": contracts }))
            .await
    }

    async fn set_risk_profile(&self, profile: &str) -> ApiResult<Value> {
        self.post_json("/api/risk_mode_set", json!({ "profile": profile }))
            .await
    }

    async fn set_strategy(&self, mode: &str, strategy: Option<&str>) -> ApiResult<Value> {
        let body = match strategy {
            Some(name) => json!({ "mode": mode, "strategy": name }),
            None => json!({ "mode": mode }),
        };
        self.post_json("/api/strategy_set", body).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::EngineState;

    fn client_for(server: &mockito::Server) -> HttpApiClient {
        let config = ApiConfig {
            base_url: server.url(),
            timeout_ms: 2_000,
            connect_timeout_ms: 1_000,
        };
        HttpApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_logs_since_sends_cursor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/logs")
            .match_query(mockito::Matcher::UrlEncoded("since".into(), "41".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"logs":[{"id":42,"line":"[ENGINE] started"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let logs = client.logs_since(41).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, 42);
        assert_eq!(logs[0].line, "[ENGINE] started");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_envelope_decoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/status")
            .with_status(200)
            .with_body(r#"{"ok":true,"status":{"state":"idle","stop_reason":"manual"}}"#)
            .create_async()
            .await;

        let status = client_for(&server).status().await.unwrap().unwrap();
        assert_eq!(status.state, EngineState::Idle);
        assert_eq!(status.stop_reason.as_deref(), Some("manual"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_uses_error_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/risk_mode_set")
            .match_body(mockito::Matcher::Json(json!({"profile": "yolo"})))
            .with_status(400)
            .with_body(r#"{"ok":false,"error":"bad profile"}"#)
            .create_async()
            .await;

        let result = client_for(&server).set_risk_profile("yolo").await;
        match result {
            Err(ApiError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad profile");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/moralis_usage")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let result = client_for(&server).usage().await;
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_start_reply_carries_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/start")
            .with_status(200)
            .with_body(r#"{"ok":true,"status":{"state":"running","uptime_seconds":0}}"#)
            .create_async()
            .await;

        let reply = client_for(&server).start().await.unwrap();
        assert_eq!(reply.status.unwrap().state, EngineState::Running);
        assert_eq!(reply.body["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_patch_contracts_body() {
        let mut server = mockito::Server::new_async().await;
        let addr = "0x67f4732266c7300cca593c814d46bee72e40659f".to_string();
        let mock = server
            .mock("POST", "/api/patch")
            .match_body(mockito::Matcher::Json(json!({"CONTRACTS": [addr.clone()]})))
            .with_status(200)
            .with_body(r#"{"ok":true,"applied":{"CONTRACTS":"[]"}}"#)
            .create_async()
            .await;

        client_for(&server).patch_contracts(&[addr]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            connect_timeout_ms: 200,
        };
        let client = HttpApiClient::new(&config).unwrap();
        let result = client.probe(Probe::Ping).await;
        assert!(matches!(
            result,
            Err(ApiError::Transport(_)) | Err(ApiError::Timeout(_))
        ));
    }

    #[test]
    fn test_rejection_message_falls_back_to_body() {
        assert_eq!(rejection_message("Internal Server Error"), "Internal Server Error");
        assert_eq!(rejection_message(r#"{"detail":"nope"}"#), "nope");
    }
}
