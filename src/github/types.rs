use serde::Deserialize;

/// Coordinates of the pull request that every downstream API call targets.
///
/// Built from a validated webhook payload; owner and repo are non-empty and
/// the number is positive by the time a value of this type exists.
#[derive(Debug, Clone)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// One changed file as reported by the pull-request files endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FileChange {
    /// Path of the file within the repository
    pub filename: String,
    /// Unified diff for the file. Absent for binary files and renames
    /// without content changes.
    pub patch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_change_with_patch() {
        let file: FileChange = serde_json::from_str(
            r#"{"filename": "src/main.rs", "patch": "+line", "status": "modified"}"#,
        )
        .unwrap();
        assert_eq!(file.filename, "src/main.rs");
        assert_eq!(file.patch.as_deref(), Some("+line"));
    }

    #[test]
    fn test_file_change_without_patch() {
        // Binary files come back without a patch field at all.
        let file: FileChange =
            serde_json::from_str(r#"{"filename": "logo.png", "status": "added"}"#).unwrap();
        assert_eq!(file.filename, "logo.png");
        assert!(file.patch.is_none());
    }
}
