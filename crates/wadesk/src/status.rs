// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wadesk status` command implementation.
//!
//! Asks the gateway health endpoint of a running instance for uptime,
//! active sessions and open UI connections.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wadesk_config::WadeskConfig;
use wadesk_core::WadeskError;

/// Health endpoint response from the gateway.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    uptime_secs: u64,
    #[serde(default)]
    active_sessions: usize,
    #[serde(default)]
    connections: usize,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub active_sessions: Option<usize>,
    pub connections: Option<usize>,
    pub endpoint: String,
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// The gateway binds `0.0.0.0` by default; probe it through loopback.
fn health_url(config: &WadeskConfig) -> String {
    let host = match config.server.host.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        host => host,
    };
    format!("http://{host}:{}/health", config.server.port)
}

async fn probe(url: &str) -> Option<HealthResponse> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .ok()?;
    let resp = client.get(url).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.json().await.ok()
}

/// Run the `wadesk status` command. An unreachable instance is reported, not an error.
pub async fn run_status(config: &WadeskConfig, json: bool) -> Result<(), WadeskError> {
    let endpoint = health_url(config);
    let report = match probe(&endpoint).await {
        Some(health) => StatusResponse {
            running: true,
            status: health.status,
            uptime_human: Some(format_uptime(health.uptime_secs)),
            uptime_secs: Some(health.uptime_secs),
            active_sessions: Some(health.active_sessions),
            connections: Some(health.connections),
            endpoint,
        },
        None => StatusResponse {
            running: false,
            status: "not running".to_string(),
            uptime_secs: None,
            uptime_human: None,
            active_sessions: None,
            connections: None,
            endpoint,
        },
    };

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| WadeskError::Internal(format!("failed to render status: {e}")))?;
        println!("{out}");
    } else {
        print_status(&report);
    }
    Ok(())
}

fn print_status(report: &StatusResponse) {
    println!();
    println!("  wadesk status");
    println!("  {}", "-".repeat(35));
    if report.running {
        println!(
            "    State:       [OK] {} (uptime: {})",
            report.status,
            report.uptime_human.as_deref().unwrap_or("?")
        );
        println!("    Sessions:    {}", report.active_sessions.unwrap_or(0));
        println!("    Connections: {}", report.connections.unwrap_or(0));
    } else {
        println!("    State:       [FAIL] not running");
        println!("    Endpoint:    {}", report.endpoint);
        println!();
        println!("  Start with: wadesk serve");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uptime_units() {
        assert_eq!(format_uptime(120), "2m");
        assert_eq!(format_uptime(3720), "1h 2m");
        assert_eq!(format_uptime(90060), "1d 1h 1m");
    }

    #[test]
    fn wildcard_hosts_probe_loopback() {
        let mut config = WadeskConfig::default();
        config.server.host = "0.0.0.0".into();
        config.server.port = 8080;
        assert_eq!(health_url(&config), "http://127.0.0.1:8080/health");
        config.server.host = "10.0.0.5".into();
        assert_eq!(health_url(&config), "http://10.0.0.5:8080/health");
    }

    #[tokio::test]
    async fn unreachable_instance_is_not_running() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(probe(&format!("http://127.0.0.1:{port}/health")).await.is_none());
    }

    #[test]
    fn health_response_accepts_gateway_body() {
        let health: HealthResponse = serde_json::from_str(
            r#"{"status":"ok","version":"0.1.0","uptime_secs":5,"active_sessions":2,"connections":1}"#,
        )
        .unwrap();
        assert_eq!(health.active_sessions, 2);
        assert_eq!(health.connections, 1);
    }
}
