//! Caller-side intake session.
//!
//! Enforces the obligations the display layer carries: one extraction
//! outstanding at a time, no blank submissions, the outcome applied
//! exactly once, and no stale record left visible next to a failure.
//! Pure state transitions; the CLI drives the actual extraction call
//! between `submit` and `resolve_*`.

use crate::record::HealthRecord;

/// Where the session is in its single-shot flow.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeState {
    /// Waiting for a narrative.
    Ready,
    /// An extraction is outstanding; resubmission is refused.
    Processing,
    /// The last extraction produced a record.
    Success(HealthRecord),
    /// The last extraction failed; no record is retained.
    Failed(String),
}

/// A submission that was not accepted. The session state is unchanged.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRefused {
    #[error("a request is already being processed")]
    Busy,
    #[error("the narrative is empty")]
    BlankNarrative,
}

/// One user's intake flow. Holds the narrative being processed and at
/// most one extracted record.
#[derive(Debug, Clone, Default)]
pub struct IntakeSession {
    state: IntakeState,
    /// Narrative of the in-flight or last-resolved submission.
    narrative: Option<String>,
}

impl Default for IntakeState {
    fn default() -> Self {
        Self::Ready
    }
}

impl IntakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    /// The narrative under (or after) processing, when one was accepted.
    pub fn narrative(&self) -> Option<&str> {
        self.narrative.as_deref()
    }

    /// The extracted record, present only in the success state.
    pub fn record(&self) -> Option<&HealthRecord> {
        match &self.state {
            IntakeState::Success(record) => Some(record),
            _ => None,
        }
    }

    /// Accept a narrative for extraction. Refused while processing and
    /// for blank input; a new submission otherwise replaces any previous
    /// outcome.
    pub fn submit(&mut self, narrative: &str) -> Result<(), SubmitRefused> {
        if self.state == IntakeState::Processing {
            return Err(SubmitRefused::Busy);
        }
        if narrative.trim().is_empty() {
            return Err(SubmitRefused::BlankNarrative);
        }
        self.narrative = Some(narrative.to_string());
        self.state = IntakeState::Processing;
        Ok(())
    }

    /// Apply a successful extraction outcome.
    pub fn resolve_success(&mut self, record: HealthRecord) {
        self.state = IntakeState::Success(record);
    }

    /// Apply a failed extraction outcome. Drops any record so failure is
    /// never displayed next to stale data.
    pub fn resolve_failure(&mut self, message: impl Into<String>) {
        self.state = IntakeState::Failed(message.into());
    }

    /// Return to the input state, dropping the narrative and any record.
    pub fn reset(&mut self) {
        self.state = IntakeState::Ready;
        self.narrative = None;
    }

    /// The visible status line for the current state.
    pub fn status_line(&self) -> String {
        match &self.state {
            IntakeState::Ready => "Ready".to_string(),
            IntakeState::Processing => {
                "Processing: Sending narrative to the model...".to_string()
            }
            IntakeState::Success(_) => "Success: Data extracted.".to_string(),
            IntakeState::Failed(message) => {
                format!("Error: Failed to process data. {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_in_processing() -> IntakeSession {
        let mut session = IntakeSession::new();
        session.submit("I had toast for breakfast.").unwrap();
        session
    }

    // ── Submission gates ──

    #[test]
    fn fresh_session_is_ready() {
        let session = IntakeSession::new();
        assert_eq!(*session.state(), IntakeState::Ready);
        assert_eq!(session.status_line(), "Ready");
        assert!(session.record().is_none());
        assert!(session.narrative().is_none());
    }

    #[test]
    fn submit_moves_to_processing_and_keeps_the_narrative() {
        let session = session_in_processing();
        assert_eq!(*session.state(), IntakeState::Processing);
        assert_eq!(session.narrative(), Some("I had toast for breakfast."));
        assert_eq!(
            session.status_line(),
            "Processing: Sending narrative to the model..."
        );
    }

    #[test]
    fn blank_narrative_is_refused() {
        let mut session = IntakeSession::new();
        assert_eq!(session.submit(""), Err(SubmitRefused::BlankNarrative));
        assert_eq!(session.submit("   \n\t"), Err(SubmitRefused::BlankNarrative));
        assert_eq!(*session.state(), IntakeState::Ready);
    }

    #[test]
    fn resubmission_while_processing_is_refused() {
        let mut session = session_in_processing();
        assert_eq!(session.submit("another one"), Err(SubmitRefused::Busy));
        assert_eq!(session.narrative(), Some("I had toast for breakfast."));
    }

    // ── Resolution ──

    #[test]
    fn success_exposes_the_record() {
        let mut session = session_in_processing();
        session.resolve_success(HealthRecord::default());
        assert_eq!(session.status_line(), "Success: Data extracted.");
        assert!(session.record().is_some());
    }

    #[test]
    fn failure_clears_any_record_and_carries_the_message() {
        let mut session = session_in_processing();
        session.resolve_success(HealthRecord::default());

        session.submit("a second narrative").unwrap();
        session.resolve_failure("Failed to communicate with the model to process data.");

        assert!(session.record().is_none(), "no stale record next to a failure");
        assert_eq!(
            session.status_line(),
            "Error: Failed to process data. Failed to communicate with the model to process data."
        );
    }

    #[test]
    fn new_submission_is_allowed_after_either_outcome() {
        let mut session = session_in_processing();
        session.resolve_failure("nope");
        assert!(session.submit("try again").is_ok());

        session.resolve_success(HealthRecord::default());
        assert!(session.submit("and again").is_ok());
        assert!(session.record().is_none(), "new submission drops the old record");
    }

    // ── Reset ──

    #[test]
    fn reset_returns_to_ready_and_drops_everything() {
        let mut session = session_in_processing();
        session.resolve_success(HealthRecord::default());
        session.reset();
        assert_eq!(*session.state(), IntakeState::Ready);
        assert!(session.record().is_none());
        assert!(session.narrative().is_none());
    }
}
