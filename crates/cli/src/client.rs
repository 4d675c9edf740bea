//! API client for communicating with the hostwatch agent

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use hostwatch_lib::anomaly::{Baseline, ScoreBand};
use hostwatch_lib::{KnownApp, Sample};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the agent's HTTP API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        self.get("api/v1/status").await
    }

    pub async fn known_apps(&self) -> Result<BTreeMap<String, KnownApp>> {
        self.get("api/v1/known-apps").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub learning: bool,
    pub learning_collected: usize,
    pub learning_required: usize,
    pub baseline: Option<Baseline>,
    pub known_apps: BTreeMap<String, KnownApp>,
    pub recent_scores: Vec<ScoreView>,
    pub trend: TrendView,
    pub history_len: usize,
    pub last_sample: Option<Sample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreView {
    pub score: f64,
    pub band: ScoreBand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendView {
    InsufficientData,
    Window {
        cpu: DeltaView,
        ram: DeltaView,
        /// Seconds
        window: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaView {
    pub direction: String,
    pub magnitude: f64,
}

impl DeltaView {
    pub fn arrow(&self) -> &'static str {
        if self.direction == "up" {
            "↑"
        } else {
            "↓"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_BODY: &str = r#"{
        "learning": false,
        "learning_collected": 10,
        "learning_required": 10,
        "baseline": {
            "mean_cpu": 20.0, "mean_ram": 30.0,
            "std_cpu": 2.0, "std_ram": 1.0,
            "anomaly_threshold": -0.15
        },
        "known_apps": {
            "blender": {
                "cpu_impact": 12.0, "ram_impact": 1.0,
                "first_seen": "2024-03-01T12:00:00+00:00"
            }
        },
        "recent_scores": [{"score": -0.2, "band": "unusual"}],
        "trend": {
            "kind": "window",
            "cpu": {"direction": "up", "magnitude": 12.0},
            "ram": {"direction": "down", "magnitude": 0.5},
            "window": 55
        },
        "history_len": 11,
        "last_sample": null
    }"#;

    #[tokio::test]
    async fn test_status_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(STATUS_BODY)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let status = client.status().await.unwrap();

        mock.assert_async().await;
        assert!(!status.learning);
        assert_eq!(
            status.baseline,
            Some(Baseline {
                mean_cpu: 20.0,
                mean_ram: 30.0,
                std_cpu: 2.0,
                std_ram: 1.0,
                anomaly_threshold: -0.15,
            })
        );
        assert_eq!(status.recent_scores[0].band, ScoreBand::Unusual);
        assert!(status.known_apps.contains_key("blender"));
        match status.trend {
            TrendView::Window { cpu, window, .. } => {
                assert_eq!(cpu.arrow(), "↑");
                assert_eq!(window, 55);
            }
            TrendView::InsufficientData => panic!("expected a trend window"),
        }
    }

    #[tokio::test]
    async fn test_known_apps_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/known-apps")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let apps = client.known_apps().await.unwrap();
        assert!(apps.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/status")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
