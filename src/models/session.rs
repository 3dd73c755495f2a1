//! Completed breathing sessions and the in-memory log that holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SeverityLevel;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSession {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Recommended duration for the severity, not wall time spent.
    pub duration_secs: u32,
    pub severity: SeverityLevel,
    pub completed_cycles: u32,
}

impl ExerciseSession {
    pub fn new(severity: SeverityLevel, completed_cycles: u32, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            duration_secs: severity.recommended_duration_secs(),
            severity,
            completed_cycles,
        }
    }
}

/// Append-only, lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    sessions: Vec<ExerciseSession>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, session: ExerciseSession) {
        self.sessions.push(session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn last(&self) -> Option<&ExerciseSession> {
        self.sessions.last()
    }

    pub fn to_vec(&self) -> Vec<ExerciseSession> {
        self.sessions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_duration_comes_from_severity() {
        let session = ExerciseSession::new(SeverityLevel::Severe, 3, Utc::now());
        assert_eq!(session.duration_secs, 420);
        assert_eq!(session.completed_cycles, 3);
        assert!(Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn log_keeps_insertion_order() {
        let mut log = SessionLog::new();
        assert!(log.is_empty());

        log.append(ExerciseSession::new(SeverityLevel::Mild, 2, Utc::now()));
        log.append(ExerciseSession::new(SeverityLevel::Moderate, 5, Utc::now()));

        let sessions = log.to_vec();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].severity, SeverityLevel::Mild);
        assert_eq!(log.last().map(|s| s.completed_cycles), Some(5));
    }

    #[test]
    fn serializes_camel_case() {
        let session = ExerciseSession::new(SeverityLevel::Mild, 1, Utc::now());
        let json = serde_json::to_value(&session).expect("serialize session");
        assert_eq!(json["completedCycles"], 1);
        assert_eq!(json["durationSecs"], 180);
        assert_eq!(json["severity"], "mild");
    }
}
