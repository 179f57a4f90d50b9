pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::github::FileChange;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion response contained no content")]
    EmptyCompletion,
}

impl ReviewError {
    /// Transport failures and 5xx statuses qualify for a retry; a response
    /// without content or a 4xx status does not.
    fn is_retryable(&self) -> bool {
        match self {
            ReviewError::Request(err) => match err.status() {
                Some(status) => status.is_server_error(),
                None => err.is_timeout() || err.is_connect(),
            },
            ReviewError::EmptyCompletion => false,
        }
    }
}

/// Instruction sent with every review request.
const REVIEW_INSTRUCTION: &str = "You are a code reviewer reviewing a pull request with some code \
     changes. Write a markdown summary for the pull request.";

/// The completion-model seam.
///
/// The review pipeline only needs one instruction, one input, and one
/// markdown answer, so any chat or single-prompt completion backend can sit
/// behind this trait. Tests substitute a canned implementation.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Request one completion for `input` under the given instruction,
    /// suspending until the full response has arrived.
    async fn complete(&self, instruction: &str, input: &str) -> Result<String, ReviewError>;
}

/// Build the diff block handed to the model: one labeled section per file,
/// in the order the files were fetched, so identical input always produces
/// an identical prompt.
///
/// A file without patch text (binary or renamed-only change) keeps its
/// section with an empty diff so the model still sees that the file changed.
pub fn build_diff_text(files: &[FileChange]) -> String {
    files
        .iter()
        .map(|file| {
            format!(
                "File: {}\nDiff:\n{}",
                file.filename,
                file.patch.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Produce a markdown review for the changed files.
///
/// An empty file list is sent to the model as an empty diff block rather
/// than skipping the call.
pub async fn synthesize_review(
    model: &dyn CompletionModel,
    files: &[FileChange],
) -> Result<String, ReviewError> {
    let diff_text = build_diff_text(files);
    debug!(
        files = files.len(),
        prompt_bytes = diff_text.len(),
        "requesting review completion"
    );
    model.complete(REVIEW_INSTRUCTION, &diff_text).await
}
