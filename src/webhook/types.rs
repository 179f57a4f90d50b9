use serde::Deserialize;

/// The accepted `pull_request` payload shape: the provider's own webhook
/// schema, with the PR number nested under the `pull_request` object.
///
/// Payloads carrying the identifiers anywhere else (for example a bare
/// top-level number without a `pull_request` object) fail deserialization
/// and are treated as malformed rather than guessed at.
#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequestInfo,
    pub repository: Repository,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: User,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_payload() {
        let payload = json!({
            "action": "opened",
            "pull_request": { "number": 42, "title": "Add widgets" },
            "repository": { "name": "widgets", "owner": { "login": "acme" } },
            "sender": { "login": "alice" }
        });
        let event: PullRequestEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.action, "opened");
        assert_eq!(event.pull_request.number, 42);
        assert_eq!(event.repository.name, "widgets");
        assert_eq!(event.repository.owner.login, "acme");
    }

    #[test]
    fn test_reject_top_level_number_shape() {
        // Identifiers outside the pull_request object are not supported.
        let payload = json!({
            "action": "opened",
            "number": 42,
            "repository": { "name": "widgets", "owner": { "login": "acme" } }
        });
        assert!(serde_json::from_value::<PullRequestEvent>(payload).is_err());
    }

    #[test]
    fn test_reject_missing_repository() {
        let payload = json!({
            "action": "opened",
            "pull_request": { "number": 42 }
        });
        assert!(serde_json::from_value::<PullRequestEvent>(payload).is_err());
    }
}
