//! Readiness checks for the external collaborators: the WebDriver server and
//! the application under test. Neither is started or stopped here.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Deserialize)]
struct StatusResponse {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    message: String,
}

/// Poll `<webdriver_url>/status` until the server reports ready
pub async fn wait_for_driver(webdriver_url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let status_url = format!("{}/status", webdriver_url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(&status_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<StatusResponse>().await {
                Ok(status) if status.value.ready => {
                    info!("WebDriver server ready at {}", webdriver_url);
                    return Ok(());
                }
                Ok(status) => {
                    warn!("WebDriver server not ready: {}", status.value.message);
                }
                Err(e) => {
                    warn!("Unreadable WebDriver status: {}", e);
                }
            },
            Ok(resp) => {
                warn!("WebDriver status returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for WebDriver server at {}...", webdriver_url);
                }
                // Connection refused is expected while the driver is starting
                if !e.is_connect() {
                    warn!("WebDriver status error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(250)).await;
    }

    Err(E2eError::DriverNotReady(attempts))
}

/// Check that the application answers at `base_url`
pub async fn check_app(base_url: &str) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    match client.get(base_url).send().await {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => {
            warn!("Application returned {} at {}", resp.status(), base_url);
            Err(E2eError::AppUnreachable(base_url.to_string()))
        }
        Err(e) => {
            warn!("Application request failed: {}", e);
            Err(E2eError::AppUnreachable(base_url.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_payload() {
        let raw = r#"{
            "value": {
                "ready": true,
                "message": "ChromeDriver ready for new sessions.",
                "build": {"version": "124.0"}
            }
        }"#;
        let status: StatusResponse = serde_json::from_str(raw).unwrap();
        assert!(status.value.ready);
    }

    #[test]
    fn test_status_payload_defaults_to_not_ready() {
        let status: StatusResponse = serde_json::from_str(r#"{"value":{}}"#).unwrap();
        assert!(!status.value.ready);
    }

    #[tokio::test]
    async fn test_unreachable_driver_times_out() {
        // Nothing listens on the discard port
        let result = wait_for_driver("http://127.0.0.1:9", Duration::from_millis(300)).await;
        assert!(matches!(result, Err(E2eError::DriverNotReady(n)) if n >= 1));
    }
}
