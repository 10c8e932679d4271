//! Wizard inputs and the transition log.
//!
//! RULE: the host drives the wizard ONLY through FlowEvent.
//! Every accepted event is recorded in the transition log with the
//! steps it moved between.

use crate::{
    sanitize::sanitize_input,
    step::FlowStep,
    survey::{CancelReason, SurveyQuestion, UsageSurvey},
    types::SessionId,
};
use serde::{Deserialize, Serialize};

/// Everything a screen can ask the controller to do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    // ── Opening question ───────────────────────────
    AnswerJobFound {
        found: bool,
    },

    // ── Job-found branch ───────────────────────────
    SetSurveyAnswer {
        question: SurveyQuestion,
        value: String,
    },
    Continue,
    SubmitFeedback {
        text: String,
    },
    SubmitVisa {
        has_lawyer: bool,
        #[serde(default)]
        visa_type: String,
    },
    Finish,

    // ── Downsell branch ────────────────────────────
    AcceptOffer,
    DeclineOffer,
    ContinueToReason {
        usage: UsageSurvey,
    },
    AcceptOfferWithReason {
        reason: Option<CancelReason>,
        #[serde(default)]
        details: String,
    },
    CompleteCancellation {
        reason: Option<CancelReason>,
        #[serde(default)]
        details: String,
    },
    Complete,
    BackToJobs,

    // ── Navigation ─────────────────────────────────
    Back,
    Close,
}

impl FlowEvent {
    /// Stable name used in logs and the event_type column.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AnswerJobFound { .. } => "answer_job_found",
            Self::SetSurveyAnswer { .. } => "set_survey_answer",
            Self::Continue => "continue",
            Self::SubmitFeedback { .. } => "submit_feedback",
            Self::SubmitVisa { .. } => "submit_visa",
            Self::Finish => "finish",
            Self::AcceptOffer => "accept_offer",
            Self::DeclineOffer => "decline_offer",
            Self::ContinueToReason { .. } => "continue_to_reason",
            Self::AcceptOfferWithReason { .. } => "accept_offer_with_reason",
            Self::CompleteCancellation { .. } => "complete_cancellation",
            Self::Complete => "complete",
            Self::BackToJobs => "back_to_jobs",
            Self::Back => "back",
            Self::Close => "close",
        }
    }

    /// Copy with every free-text field passed through `sanitize_input`.
    pub fn sanitized(&self) -> Self {
        match self {
            Self::SetSurveyAnswer { question, value } => Self::SetSurveyAnswer {
                question: *question,
                value: sanitize_input(value),
            },
            Self::SubmitFeedback { text } => Self::SubmitFeedback { text: sanitize_input(text) },
            Self::SubmitVisa { has_lawyer, visa_type } => Self::SubmitVisa {
                has_lawyer: *has_lawyer,
                visa_type: sanitize_input(visa_type),
            },
            Self::ContinueToReason { usage } => Self::ContinueToReason {
                usage: UsageSurvey {
                    roles_applied: sanitize_input(&usage.roles_applied),
                    companies_emailed: sanitize_input(&usage.companies_emailed),
                    companies_interviewed: usage.companies_interviewed.as_deref().map(sanitize_input),
                },
            },
            Self::AcceptOfferWithReason { reason, details } => Self::AcceptOfferWithReason {
                reason: *reason,
                details: sanitize_input(details),
            },
            Self::CompleteCancellation { reason, details } => Self::CompleteCancellation {
                reason: *reason,
                details: sanitize_input(details),
            },
            other => other.clone(),
        }
    }
}

/// Result of one accepted event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlowOutcome {
    Moved { from: FlowStep, to: FlowStep },
    Stayed { step: FlowStep },
    Closed { from: FlowStep },
}

impl FlowOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// The transition log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionLogEntry {
    pub id: Option<i64>,
    pub session_id: SessionId,
    pub seq: u64,
    pub from_step: String,
    /// "closed" when the event closed the modal.
    pub to_step: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized FlowEvent
    pub persisted: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_parse_from_host_json() {
        let e: FlowEvent =
            serde_json::from_str(r#"{"event":"answer_job_found","found":true}"#).unwrap();
        assert_eq!(e, FlowEvent::AnswerJobFound { found: true });

        let e: FlowEvent = serde_json::from_str(
            r#"{"event":"set_survey_answer","question":"rolesApplied","value":"20+"}"#,
        )
        .unwrap();
        assert_eq!(
            e,
            FlowEvent::SetSurveyAnswer {
                question: SurveyQuestion::RolesApplied,
                value: "20+".into()
            }
        );

        let e: FlowEvent = serde_json::from_str(
            r#"{"event":"complete_cancellation","reason":"too-expensive"}"#,
        )
        .unwrap();
        assert_eq!(
            e,
            FlowEvent::CompleteCancellation {
                reason: Some(CancelReason::TooExpensive),
                details: String::new()
            }
        );
    }

    #[test]
    fn sanitized_strips_free_text_only() {
        let e = FlowEvent::SubmitFeedback { text: "ok<script>x()</script> ".into() };
        assert_eq!(e.sanitized(), FlowEvent::SubmitFeedback { text: "ok".into() });
        assert_eq!(FlowEvent::Continue.sanitized(), FlowEvent::Continue);
    }

    #[test]
    fn name_matches_serde_tag() {
        let events = [
            FlowEvent::Continue,
            FlowEvent::Back,
            FlowEvent::SubmitVisa { has_lawyer: true, visa_type: "O-1".into() },
            FlowEvent::ContinueToReason { usage: UsageSurvey::default() },
        ];
        for e in events {
            let json = serde_json::to_value(&e).unwrap();
            assert_eq!(json["event"], e.name());
        }
    }
}
