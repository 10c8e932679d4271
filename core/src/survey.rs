//! Survey answers, cancellation reasons, and the input checks each screen
//! applies before it lets the user move on.

use serde::{Deserialize, Serialize};

// ── Job-found survey ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SurveyQuestion {
    FoundJobWithMigrateMate,
    RolesApplied,
    CompaniesEmailed,
    CompaniesInterviewed,
}

impl SurveyQuestion {
    pub const ALL: [SurveyQuestion; 4] = [
        Self::FoundJobWithMigrateMate,
        Self::RolesApplied,
        Self::CompaniesEmailed,
        Self::CompaniesInterviewed,
    ];

    pub fn prompt(&self) -> &'static str {
        match self {
            Self::FoundJobWithMigrateMate => "Did you find this job with MigrateMate?*",
            Self::RolesApplied => "How many roles did you apply for through Migrate Mate?*",
            Self::CompaniesEmailed => "How many companies did you email directly?*",
            Self::CompaniesInterviewed => "How many different companies did you interview with?*",
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self {
            Self::FoundJobWithMigrateMate => &["Yes", "No"],
            Self::RolesApplied => &["0", "1 - 5", "6 - 20", "20+"],
            Self::CompaniesEmailed => &["0", "1-5", "6-20", "20+"],
            Self::CompaniesInterviewed => &["0", "1-2", "3-5", "5+"],
        }
    }
}

/// Answers to the four survey questions. Empty string means unanswered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    pub found_job_with_migrate_mate: String,
    pub roles_applied: String,
    pub companies_emailed: String,
    pub companies_interviewed: String,
}

impl SurveyAnswers {
    pub fn get(&self, question: SurveyQuestion) -> &str {
        match question {
            SurveyQuestion::FoundJobWithMigrateMate => &self.found_job_with_migrate_mate,
            SurveyQuestion::RolesApplied => &self.roles_applied,
            SurveyQuestion::CompaniesEmailed => &self.companies_emailed,
            SurveyQuestion::CompaniesInterviewed => &self.companies_interviewed,
        }
    }

    pub fn set(&mut self, question: SurveyQuestion, value: String) {
        let slot = match question {
            SurveyQuestion::FoundJobWithMigrateMate => &mut self.found_job_with_migrate_mate,
            SurveyQuestion::RolesApplied => &mut self.roles_applied,
            SurveyQuestion::CompaniesEmailed => &mut self.companies_emailed,
            SurveyQuestion::CompaniesInterviewed => &mut self.companies_interviewed,
        };
        *slot = value;
    }

    pub fn answered_count(&self) -> usize {
        SurveyQuestion::ALL
            .iter()
            .filter(|q| !self.get(**q).is_empty())
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.answered_count() == SurveyQuestion::ALL.len()
    }

    pub fn found_job_with_us(&self) -> bool {
        self.found_job_with_migrate_mate == "Yes"
    }
}

// ── Offer-declined usage survey ─────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageSurvey {
    pub roles_applied: String,
    pub companies_emailed: String,
    #[serde(default)]
    pub companies_interviewed: Option<String>,
}

impl UsageSurvey {
    /// Interview count is optional on this screen.
    pub fn is_complete(&self) -> bool {
        !self.roles_applied.is_empty() && !self.companies_emailed.is_empty()
    }
}

// ── Cancellation reasons ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CancelReason {
    TooExpensive,
    PlatformNotHelpful,
    NotEnoughRelevantJobs,
    DecidedNotToMove,
    Other,
}

impl CancelReason {
    pub const ALL: [CancelReason; 5] = [
        Self::TooExpensive,
        Self::PlatformNotHelpful,
        Self::NotEnoughRelevantJobs,
        Self::DecidedNotToMove,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooExpensive => "too-expensive",
            Self::PlatformNotHelpful => "platform-not-helpful",
            Self::NotEnoughRelevantJobs => "not-enough-relevant-jobs",
            Self::DecidedNotToMove => "decided-not-to-move",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TooExpensive => "Too expensive",
            Self::PlatformNotHelpful => "Platform not helpful",
            Self::NotEnoughRelevantJobs => "Not enough relevant jobs",
            Self::DecidedNotToMove => "Decided not to move",
            Self::Other => "Other",
        }
    }

    /// "Too expensive" asks for a price instead of a written explanation.
    pub fn needs_details(&self) -> bool {
        !matches!(self, Self::TooExpensive)
    }

    pub fn follow_up_question(&self) -> &'static str {
        match self {
            Self::TooExpensive => "What would be the maximum you would be willing to pay?*",
            Self::PlatformNotHelpful => "What can we change to make the platform more helpful?*",
            Self::NotEnoughRelevantJobs => "In which way can we make the jobs more relevant?*",
            Self::DecidedNotToMove => "What changed for you to decide to not move?*",
            Self::Other => "What would have helped you the most?*",
        }
    }
}

// ── Guards ──────────────────────────────────────────────────────────

pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

pub fn feedback_is_valid(text: &str, min_chars: usize) -> bool {
    char_count(text) >= min_chars
}

/// A reason must be picked; reasons that need elaboration also need
/// `min_chars` of non-blank detail.
pub fn reason_is_complete(reason: Option<CancelReason>, details: &str, min_chars: usize) -> bool {
    match reason {
        None => false,
        Some(r) if r.needs_details() => char_count(details.trim()) >= min_chars,
        Some(_) => true,
    }
}

pub fn visa_type_given(visa_type: &str) -> bool {
    !visa_type.trim().is_empty()
}
