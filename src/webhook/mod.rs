pub mod types;

pub use types::PullRequestEvent;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::github::{GitHubClient, GitHubError, PullRequestRef};
use crate::review::{self, CompletionModel, ReviewError};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("malformed pull_request payload: {0}")]
    MalformedEvent(String),

    #[error("failed to fetch changed files: {0}")]
    Fetch(#[source] GitHubError),

    #[error("failed to synthesize review: {0}")]
    Synthesis(#[source] ReviewError),

    #[error("failed to publish review comment: {0}")]
    Publish(#[source] GitHubError),
}

/// Shared, read-only state handed to every delivery: the two outbound
/// clients and the optional webhook secret. Deliveries never share mutable
/// state with each other.
pub struct AppState {
    pub github: GitHubClient,
    pub model: Arc<dyn CompletionModel>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(
        github: GitHubClient,
        model: impl CompletionModel + 'static,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            github,
            model: Arc::new(model),
            webhook_secret,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Entry point for one webhook delivery.
///
/// Only `pull_request` events with action `opened` are processed; everything
/// else is acknowledged with 200 so the sender does not treat "not
/// interested" as a delivery failure. An accepted delivery runs the pipeline
/// fetch -> synthesize -> publish and any failure maps to a generic 500 with
/// no internal detail in the body.
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|value| value.to_str().ok());
        if !signature.is_some_and(|sig| verify_signature(secret, &body, sig)) {
            warn!("rejecting delivery with missing or invalid signature");
            return (StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let event = headers
        .get("x-github-event")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "discarding delivery with unparseable body");
            return (StatusCode::BAD_REQUEST, "invalid JSON body");
        }
    };

    let action = payload
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if event != "pull_request" || action != "opened" {
        info!(event, action, "ignoring event");
        return (StatusCode::OK, "ignored");
    }

    let pr = match extract_pull_request_ref(payload) {
        Ok(pr) => pr,
        Err(err) => {
            error!(error = %err, "rejecting malformed pull_request payload");
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    };

    match review_opened_pr(&state, &pr).await {
        Ok(()) => (StatusCode::OK, "review posted"),
        Err(err) => {
            error!(
                owner = %pr.owner,
                repo = %pr.repo,
                pr = pr.number,
                error = %err,
                "failed to process pull request"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

/// Extract and validate the PR coordinates from an accepted payload. No
/// downstream call is made until all three are known to be usable.
fn extract_pull_request_ref(payload: Value) -> Result<PullRequestRef, ProcessError> {
    let event: PullRequestEvent = serde_json::from_value(payload)
        .map_err(|err| ProcessError::MalformedEvent(err.to_string()))?;

    let owner = event.repository.owner.login;
    let repo = event.repository.name;
    let number = event.pull_request.number;

    if owner.is_empty() || repo.is_empty() {
        return Err(ProcessError::MalformedEvent(
            "repository owner and name must be non-empty".to_string(),
        ));
    }
    if number == 0 {
        return Err(ProcessError::MalformedEvent(
            "pull request number must be positive".to_string(),
        ));
    }

    Ok(PullRequestRef {
        owner,
        repo,
        number,
    })
}

/// Run the pipeline for one opened pull request: fetch the changed files,
/// synthesize the review, publish the comment.
///
/// The stages run strictly in order and the first failure aborts the rest,
/// so a comment is only ever posted for a fully generated review.
#[instrument(skip(state, pr), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
async fn review_opened_pr(state: &AppState, pr: &PullRequestRef) -> Result<(), ProcessError> {
    info!("processing opened pull request");

    let files = state
        .github
        .list_changed_files(pr)
        .await
        .map_err(ProcessError::Fetch)?;
    info!(files = files.len(), "fetched changed files");

    let review_text = review::synthesize_review(state.model.as_ref(), &files)
        .await
        .map_err(ProcessError::Synthesis)?;
    info!(review_bytes = review_text.len(), "synthesized review");

    state
        .github
        .post_issue_comment(pr, &review_text)
        .await
        .map_err(ProcessError::Publish)?;
    info!("review comment posted");

    Ok(())
}

type HmacSha256 = Hmac<Sha256>;

/// Verify an `x-hub-signature-256` header value (`sha256=<hex>`) against the
/// raw request body.
fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Some(signature_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&signature_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opened_payload() -> Value {
        json!({
            "action": "opened",
            "pull_request": { "number": 42 },
            "repository": { "name": "widgets", "owner": { "login": "acme" } }
        })
    }

    #[test]
    fn test_extract_valid_payload() {
        let pr = extract_pull_request_ref(opened_payload()).unwrap();
        assert_eq!(pr.owner, "acme");
        assert_eq!(pr.repo, "widgets");
        assert_eq!(pr.number, 42);
    }

    #[test]
    fn test_extract_rejects_missing_pull_request_object() {
        let payload = json!({
            "action": "opened",
            "number": 42,
            "repository": { "name": "widgets", "owner": { "login": "acme" } }
        });
        assert!(matches!(
            extract_pull_request_ref(payload),
            Err(ProcessError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_extract_rejects_zero_pr_number() {
        let mut payload = opened_payload();
        payload["pull_request"]["number"] = json!(0);
        assert!(matches!(
            extract_pull_request_ref(payload),
            Err(ProcessError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_extract_rejects_empty_owner() {
        let mut payload = opened_payload();
        payload["repository"]["owner"]["login"] = json!("");
        assert!(matches!(
            extract_pull_request_ref(payload),
            Err(ProcessError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_signature_roundtrip() {
        let secret = "hush";
        let body = br#"{"action":"opened"}"#;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify_signature(secret, body, &signature));
        assert!(!verify_signature("wrong", body, &signature));
        assert!(!verify_signature(secret, b"tampered", &signature));
    }

    #[test]
    fn test_signature_rejects_malformed_header() {
        assert!(!verify_signature("hush", b"body", "not-prefixed"));
        assert!(!verify_signature("hush", b"body", "sha256=nothex"));
        assert!(!verify_signature("hush", b"body", "sha256="));
    }
}
