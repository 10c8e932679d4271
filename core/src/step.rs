//! Wizard positions and the fixed back-navigation map.

use crate::survey::SurveyAnswers;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FlowStep {
    Initial,
    Congrats,
    Feedback,
    YesWithMM,
    NoWithoutMM,
    NoHelpWithVisa,
    VisaHelp,
    Downsell,
    OfferAccept1,
    OfferDeclined,
    CancelReason,
    CancelComplete,
}

impl FlowStep {
    pub const ALL: [FlowStep; 12] = [
        Self::Initial,
        Self::Congrats,
        Self::Feedback,
        Self::YesWithMM,
        Self::NoWithoutMM,
        Self::NoHelpWithVisa,
        Self::VisaHelp,
        Self::Downsell,
        Self::OfferAccept1,
        Self::OfferDeclined,
        Self::CancelReason,
        Self::CancelComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Congrats => "congrats",
            Self::Feedback => "feedback",
            Self::YesWithMM => "yesWithMM",
            Self::NoWithoutMM => "noWithoutMM",
            Self::NoHelpWithVisa => "noHelpWithVisa",
            Self::VisaHelp => "visaHelp",
            Self::Downsell => "downsell",
            Self::OfferAccept1 => "offerAccept1",
            Self::OfferDeclined => "offerDeclined",
            Self::CancelReason => "cancelReason",
            Self::CancelComplete => "cancelComplete",
        }
    }

    /// Where `Back` goes. The visa-help screen is reachable from both
    /// job-found branches, so the survey answer picks which one.
    pub fn previous(&self, answers: &SurveyAnswers) -> Option<FlowStep> {
        let prev = match self {
            Self::Initial => return None,
            Self::Congrats => Self::Initial,
            Self::Feedback => Self::Congrats,
            Self::YesWithMM | Self::NoWithoutMM => Self::Feedback,
            Self::NoHelpWithVisa => Self::NoWithoutMM,
            Self::VisaHelp if answers.found_job_with_us() => Self::YesWithMM,
            Self::VisaHelp => Self::NoWithoutMM,
            Self::Downsell => Self::Initial,
            Self::OfferDeclined => Self::Downsell,
            Self::CancelReason => Self::OfferDeclined,
            Self::OfferAccept1 => Self::Downsell,
            Self::CancelComplete => Self::CancelReason,
        };
        Some(prev)
    }

    /// "Step N of 3" shown in the modal header; `None` on the opening question.
    pub fn progress(&self) -> Option<Progress> {
        let current = match self {
            Self::Initial => return None,
            Self::Congrats => 1,
            Self::Feedback | Self::YesWithMM | Self::NoWithoutMM | Self::Downsell => 2,
            _ => 3,
        };
        Some(Progress { current, total: 3 })
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub current: u8,
    pub total: u8,
}
