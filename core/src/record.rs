//! Row shapes for the `cancellations` and `subscriptions` tables.

use crate::{
    error::FlowError,
    types::{SubscriptionId, UserId},
    variant::DownsellVariant,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One user's cancellation attempt for one subscription.
/// Built up step by step; any outcome field may still be NULL if the
/// user abandoned the flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationRecord {
    pub id:                     String,
    pub user_id:                UserId,
    pub subscription_id:        SubscriptionId,
    pub downsell_variant:       DownsellVariant,
    pub survey_answers:         Option<String>, // JSON-serialized SurveyAnswers
    pub feedback:               Option<String>,
    pub accepted_downsell:      Option<bool>,
    pub has_immigration_lawyer: Option<bool>,
    pub visa_type:              Option<String>,
    pub reason:                 Option<String>,
    pub reason_details:         Option<String>,
    pub completed:              bool,
    pub created_at:             String,
    pub updated_at:             String,
}

/// A partial update. `None` leaves the stored column untouched.
/// `reason_details` is written together with `reason`: `Some(None)` clears it.
/// The variant is not part of a patch: once stored it never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CancellationPatch {
    pub survey_answers:         Option<String>,
    pub feedback:               Option<String>,
    pub accepted_downsell:      Option<bool>,
    pub has_immigration_lawyer: Option<bool>,
    pub visa_type:              Option<String>,
    pub reason:                 Option<String>,
    pub reason_details:         Option<Option<String>>,
    pub completed:              Option<bool>,
}

impl CancellationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Column names this patch will write, for logging.
    pub fn touched_columns(&self) -> Vec<&'static str> {
        let mut cols = Vec::new();
        if self.survey_answers.is_some()         { cols.push("survey_answers"); }
        if self.feedback.is_some()               { cols.push("feedback"); }
        if self.accepted_downsell.is_some()      { cols.push("accepted_downsell"); }
        if self.has_immigration_lawyer.is_some() { cols.push("has_immigration_lawyer"); }
        if self.visa_type.is_some()              { cols.push("visa_type"); }
        if self.reason.is_some()                 { cols.push("reason"); }
        if self.reason_details.is_some()         { cols.push("reason_details"); }
        if self.completed.is_some()              { cols.push("completed"); }
        cols
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PendingCancellation,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PendingCancellation => "pending_cancellation",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "pending_cancellation" => Ok(Self::PendingCancellation),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(FlowError::CorruptRow {
                column: "subscriptions.status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionRecord {
    pub id:                  SubscriptionId,
    pub user_id:             UserId,
    pub monthly_price_cents: i64,
    pub status:              SubscriptionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_touches_nothing() {
        let patch = CancellationPatch::default();
        assert!(patch.is_empty());
        assert!(patch.touched_columns().is_empty());
    }

    #[test]
    fn touched_columns_lists_set_fields() {
        let patch = CancellationPatch {
            accepted_downsell: Some(true),
            completed: Some(false),
            ..Default::default()
        };
        assert_eq!(patch.touched_columns(), vec!["accepted_downsell", "completed"]);
    }

    #[test]
    fn clearing_details_still_touches_the_column() {
        let patch = CancellationPatch {
            reason: Some("too-expensive".into()),
            reason_details: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(patch.touched_columns(), vec!["reason", "reason_details"]);
    }

    #[test]
    fn unknown_status_is_a_corrupt_row() {
        assert_eq!(
            "pending_cancellation".parse::<SubscriptionStatus>().ok(),
            Some(SubscriptionStatus::PendingCancellation)
        );
        assert!(matches!(
            "paused".parse::<SubscriptionStatus>(),
            Err(FlowError::CorruptRow { .. })
        ));
    }
}
