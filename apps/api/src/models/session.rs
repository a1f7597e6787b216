use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::JobSnapshot;
use super::ranking_config::RankingConfig;
use super::screening::ScreeningResult;

const LABEL_MAX_CHARS: usize = 48;
pub const DEFAULT_LABEL: &str = "New conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Unit of work dispatched by the Phase Router within one turn.
/// Variant order is the canonical execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    JobDescription,
    Screening,
    Discussion,
}

impl Phase {
    /// Accepts snake, kebab and spaced spellings plus short aliases.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "job_description" | "jd" => Some(Phase::JobDescription),
            "screening" | "screen" => Some(Phase::Screening),
            "discussion" | "discuss" => Some(Phase::Discussion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::JobDescription => "job_description",
            Phase::Screening => "screening",
            Phase::Discussion => "discussion",
        }
    }
}

/// Append-only conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            phase: None,
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn assistant(phase: Phase, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            phase: Some(phase),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn error(phase: Option<Phase>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            phase,
            timestamp: Utc::now(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub messages: Vec<Message>,
    pub job_snapshot: Option<JobSnapshot>,
    pub ranking_config: RankingConfig,
    pub screening_result: Option<ScreeningResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            job_snapshot: None,
            ranking_config: RankingConfig::default(),
            screening_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// First user message on one line, truncated with an ellipsis.
    pub fn label(&self) -> String {
        let Some(first) = self.messages.iter().find(|m| m.role == Role::User) else {
            return DEFAULT_LABEL.to_string();
        };
        let line = first.content.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            return DEFAULT_LABEL.to_string();
        }
        if line.chars().count() <= LABEL_MAX_CHARS {
            line
        } else {
            let head: String = line.chars().take(LABEL_MAX_CHARS - 1).collect();
            format!("{}…", head.trim_end())
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            label: self.label(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// At most `n` messages preceding index `end`, oldest first.
    pub fn history_before(&self, end: usize, n: usize) -> &[Message] {
        let end = end.min(self.messages.len());
        let start = end.saturating_sub(n);
        &self.messages[start..end]
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Index entry for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial session update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub append_messages: Vec<Message>,
    pub job_snapshot: Option<Option<JobSnapshot>>,
    pub ranking_config: Option<RankingConfig>,
    pub screening_result: Option<Option<ScreeningResult>>,
}

impl SessionPatch {
    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            append_messages: messages,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.append_messages.is_empty()
            && self.job_snapshot.is_none()
            && self.ranking_config.is_none()
            && self.screening_result.is_none()
    }

    /// Folds the patch into `session`. Messages are only ever appended.
    pub fn apply(self, session: &mut Session) {
        session.messages.extend(self.append_messages);
        if let Some(snapshot) = self.job_snapshot {
            session.job_snapshot = snapshot;
        }
        if let Some(config) = self.ranking_config {
            session.ranking_config = config;
        }
        if let Some(screening) = self.screening_result {
            session.screening_result = screening;
        }
        session.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_truncates_first_user_message() {
        let mut session = Session::new();
        assert_eq!(session.label(), DEFAULT_LABEL);

        session
            .messages
            .push(Message::assistant(Phase::Discussion, "hello"));
        session.messages.push(Message::user(
            "I need a Senior Python Developer\nwith 5+ years of Django and AWS experience",
        ));
        let label = session.label();
        assert!(label.starts_with("I need a Senior Python Developer with"));
        assert!(label.ends_with('…'));
        assert!(label.chars().count() <= 48);
    }

    #[test]
    fn test_patch_clears_and_appends() {
        let mut session = Session::new();
        session.job_snapshot = Some(JobSnapshot::default());
        let patch = SessionPatch {
            append_messages: vec![Message::user("again")],
            job_snapshot: Some(None),
            ..Default::default()
        };
        patch.apply(&mut session);
        assert!(session.job_snapshot.is_none());
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn test_history_before_excludes_the_current_message() {
        let mut session = Session::new();
        for text in ["one", "two", "three", "four"] {
            session.messages.push(Message::user(text));
        }
        let contents = |msgs: &[Message]| msgs.iter().map(|m| m.content.clone()).collect::<Vec<_>>();

        assert_eq!(contents(session.history_before(3, 20)), vec!["one", "two", "three"]);
        assert_eq!(contents(session.history_before(3, 2)), vec!["two", "three"]);
        assert!(session.history_before(0, 20).is_empty());
        assert_eq!(session.history_before(99, 20).len(), 4);
    }

    #[test]
    fn test_phase_parse_accepts_variants() {
        assert_eq!(Phase::parse("Job-Description"), Some(Phase::JobDescription));
        assert_eq!(Phase::parse("screen"), Some(Phase::Screening));
        assert_eq!(Phase::parse("summarize"), None);
    }

    #[test]
    fn test_error_flag_is_omitted_when_false() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("is_error").is_none());
        assert_eq!(json["role"], "user");
    }
}
