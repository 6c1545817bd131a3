//! HTTP surface the host runtime calls
//!
//! Challenges arrive as `ChallengePayload` documents posted to
//! `/apis/<group>/v1alpha1/<solver>`; the answer is the same document with
//! its `response` filled in. A failed challenge is still a 200 with
//! `success: false`, so the runtime can surface the message.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::constants::{CHALLENGE_API_VERSION, CHALLENGE_KIND};
use crate::metrics::gather_metrics;
use crate::solver::{ChallengeRequest, Solver};

//==============================================================================
// Types
//==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePayload {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ChallengeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChallengeResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub uid: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChallengeStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeStatus {
    pub message: String,
}

impl ChallengePayload {
    fn answer(uid: String, outcome: Result<()>) -> Self {
        let response = match outcome {
            Ok(()) => ChallengeResponse {
                uid,
                success: true,
                status: None,
            },
            Err(e) => ChallengeResponse {
                uid,
                success: false,
                status: Some(ChallengeStatus {
                    message: format!("{:#}", e),
                }),
            },
        };
        Self {
            api_version: CHALLENGE_API_VERSION.to_string(),
            kind: CHALLENGE_KIND.to_string(),
            request: None,
            response: Some(response),
        }
    }
}

//==============================================================================
// Router
//==============================================================================

/// Builds the webhook routes for `solver` under the given API group
pub fn router(group_name: &str, solver: Arc<dyn Solver>) -> Router {
    let challenge_path = format!("/apis/{}/v1alpha1/{}", group_name, solver.name());
    Router::new()
        .route(&challenge_path, post(handle_challenge))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(solver)
}

/// Serves `router` until `shutdown` is cancelled
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr().context("listener address")?;
    info!("Webhook listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("webhook server failed")?;
    info!("Webhook stopped");
    Ok(())
}

async fn handle_challenge(
    State(solver): State<Arc<dyn Solver>>,
    Json(payload): Json<ChallengePayload>,
) -> (StatusCode, Json<ChallengePayload>) {
    let Some(request) = payload.request else {
        let answer = ChallengePayload::answer(
            String::new(),
            Err(anyhow::anyhow!("challenge payload carries no request")),
        );
        return (StatusCode::BAD_REQUEST, Json(answer));
    };

    let outcome = match request.action.as_str() {
        "Present" => solver.present(&request).await,
        "CleanUp" => solver.clean_up(&request).await,
        other => Err(anyhow::anyhow!("unknown challenge action {:?}", other)),
    };
    if let Err(e) = &outcome {
        error!("{} {} failed: {:#}", request.action, request.resolved_fqdn, e);
    }

    (StatusCode::OK, Json(ChallengePayload::answer(request.uid, outcome)))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics() -> String {
    gather_metrics()
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSolver {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Solver for RecordingSolver {
        fn name(&self) -> &str {
            "hostingde"
        }

        async fn present(&self, challenge: &ChallengeRequest) -> Result<()> {
            self.calls.lock().unwrap().push(format!("present {}", challenge.resolved_fqdn));
            if self.fail {
                anyhow::bail!("hostingde: provider said no");
            }
            Ok(())
        }

        async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<()> {
            self.calls.lock().unwrap().push(format!("cleanup {}", challenge.resolved_fqdn));
            Ok(())
        }
    }

    fn payload(action: &str) -> ChallengePayload {
        ChallengePayload {
            api_version: CHALLENGE_API_VERSION.to_string(),
            kind: CHALLENGE_KIND.to_string(),
            request: Some(ChallengeRequest {
                uid: "uid-1".to_string(),
                action: action.to_string(),
                resolved_fqdn: "_acme-challenge.example.com.".to_string(),
                key: "abc123".to_string(),
                ..Default::default()
            }),
            response: None,
        }
    }

    #[tokio::test]
    async fn test_dispatches_actions() {
        let solver = Arc::new(RecordingSolver::default());
        for action in ["Present", "CleanUp"] {
            let (status, Json(answer)) =
                handle_challenge(State(solver.clone() as Arc<dyn Solver>), Json(payload(action))).await;
            assert_eq!(status, StatusCode::OK);
            let response = answer.response.unwrap();
            assert_eq!(response.uid, "uid-1");
            assert!(response.success);
            assert!(response.status.is_none());
        }
        assert_eq!(
            *solver.calls.lock().unwrap(),
            vec![
                "present _acme-challenge.example.com.".to_string(),
                "cleanup _acme-challenge.example.com.".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported_in_response() {
        let solver: Arc<dyn Solver> = Arc::new(RecordingSolver {
            fail: true,
            ..Default::default()
        });
        let (status, Json(answer)) = handle_challenge(State(solver), Json(payload("Present"))).await;
        assert_eq!(status, StatusCode::OK);
        let response = answer.response.unwrap();
        assert!(!response.success);
        assert_eq!(response.status.unwrap().message, "hostingde: provider said no");
    }

    #[tokio::test]
    async fn test_unknown_action_fails() {
        let solver = Arc::new(RecordingSolver::default());
        let (status, Json(answer)) =
            handle_challenge(State(solver.clone() as Arc<dyn Solver>), Json(payload("Refresh"))).await;
        assert_eq!(status, StatusCode::OK);
        let response = answer.response.unwrap();
        assert!(!response.success);
        assert!(response.status.unwrap().message.contains("Refresh"));
        assert!(solver.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_request_is_bad_request() {
        let solver: Arc<dyn Solver> = Arc::new(RecordingSolver::default());
        let (status, Json(answer)) = handle_challenge(State(solver), Json(ChallengePayload::default())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!answer.response.unwrap().success);
    }

    #[tokio::test]
    async fn test_served_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let solver: Arc<dyn Solver> = Arc::new(RecordingSolver::default());
        let server = tokio::spawn(serve(listener, router("acme.example.com", solver), shutdown.clone()));

        let http = reqwest::Client::new();
        let health = http
            .get(format!("http://{}/healthz", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(health, "ok");

        let answer: ChallengePayload = http
            .post(format!("http://{}/apis/acme.example.com/v1alpha1/hostingde", addr))
            .json(&payload("Present"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(answer.response.unwrap().success);
        assert_eq!(answer.kind, CHALLENGE_KIND);

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }
}
