use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle status of a remote run.
///
/// `Done` and `Failed` are terminal; every other status (including `Unknown`,
/// which absorbs statuses added by newer servers) is still moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Initializing,
    Processing,
    PostProcessing,
    Done,
    Failed,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether no further transition can happen from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Initializing => "initializing",
            Self::Processing => "processing",
            Self::PostProcessing => "post_processing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work a run performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    #[default]
    Run,
    Plan,
}

/// A run record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub repository: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub target_branch: Option<String>,
    #[serde(default)]
    pub run_type: RunType,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Free-form result fields the server attaches to finished runs.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl Run {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Human-readable duration from creation to completion (or now).
    pub fn elapsed(&self) -> String {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        format_duration(end.signed_duration_since(self.created_at).num_seconds())
    }
}

/// Format a duration in seconds into a short string (e.g. "2m 5s").
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// One page of runs plus the server-side total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunPage {
    pub runs: Vec<Run>,
    pub total: usize,
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Input for `create_run`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub repository: String,
    pub title: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
    pub run_type: RunType,
}

impl CreateRunRequest {
    /// Check required fields before anything goes over the wire.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_repository(&self.repository)?;
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingField("prompt"));
        }
        Ok(())
    }
}

/// Input for a bulk create: one prompt fanned out to several repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRunRequest {
    pub repositories: Vec<String>,
    pub title: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
    pub run_type: RunType,
}

impl BulkRunRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.repositories.is_empty() {
            return Err(ValidationError::MissingField("repositories"));
        }
        for repo in &self.repositories {
            validate_repository(repo)?;
        }
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingField("prompt"));
        }
        Ok(())
    }
}

/// Outcome of a bulk create. Failures carry the repository and server message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRunResult {
    pub created: Vec<Run>,
    #[serde(default)]
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub repository: String,
    pub message: String,
}

/// Repositories are written `owner/name`.
fn validate_repository(repo: &str) -> Result<(), ValidationError> {
    let repo = repo.trim();
    if repo.is_empty() {
        return Err(ValidationError::MissingField("repository"));
    }
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidRepository(repo.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(RunStatus::Done.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Initializing.is_terminal());
        assert!(!RunStatus::Processing.is_terminal());
        assert!(!RunStatus::PostProcessing.is_terminal());
        assert!(!RunStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: RunStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, RunStatus::Unknown);
    }

    #[test]
    fn test_run_deserializes_with_optional_fields_missing() {
        let json = r#"{
            "id": "run-1",
            "repository": "acme/widgets",
            "status": "post_processing",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:01:00Z"
        }"#;
        let run: Run = serde_json::from_str(json).unwrap();
        assert_eq!(run.status, RunStatus::PostProcessing);
        assert_eq!(run.run_type, RunType::Run);
        assert!(run.pr_url.is_none());
        assert!(!run.is_terminal());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(-3), "0s");
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
    }

    #[test]
    fn test_create_request_requires_repository_and_prompt() {
        let mut req = CreateRunRequest::default();
        assert_eq!(req.validate(), Err(ValidationError::MissingField("repository")));

        req.repository = "acme/widgets".to_string();
        assert_eq!(req.validate(), Err(ValidationError::MissingField("prompt")));

        req.prompt = "fix the flaky test".to_string();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_malformed_repository() {
        let req = CreateRunRequest {
            repository: "widgets".to_string(),
            prompt: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(
            req.validate(),
            Err(ValidationError::InvalidRepository("widgets".to_string()))
        );

        let req = CreateRunRequest {
            repository: "a/b/c".to_string(),
            prompt: "x".to_string(),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_bulk_request_validates_every_repository() {
        let req = BulkRunRequest {
            repositories: vec!["acme/one".to_string(), "bad".to_string()],
            prompt: "bump deps".to_string(),
            ..Default::default()
        };
        assert_eq!(
            req.validate(),
            Err(ValidationError::InvalidRepository("bad".to_string()))
        );

        let empty = BulkRunRequest {
            prompt: "bump deps".to_string(),
            ..Default::default()
        };
        assert_eq!(empty.validate(), Err(ValidationError::MissingField("repositories")));
    }
}
