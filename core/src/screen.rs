//! Per-step view models.
//!
//! A `Screen` is a pure function of the wizard state: copy, choices, and
//! which actions are currently usable. Renderers (the runner, a web host)
//! draw it and send back the `FlowEvent` named by the chosen action.

use crate::{
    config::{FlowConfig, OfferTerms},
    step::{FlowStep, Progress},
    survey::{CancelReason, SurveyAnswers, SurveyQuestion},
    types::Cents,
    variant::DownsellVariant,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Screen {
    pub step:       FlowStep,
    pub heading:    String,
    pub body:       Vec<String>,
    pub progress:   Option<Progress>,
    pub show_back:  bool,
    pub offer:      Option<OfferView>,
    pub questions:  Vec<QuestionView>,
    pub reasons:    Vec<ReasonView>,
    pub text_input: Option<TextInputView>,
    pub actions:    Vec<ActionView>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OfferView {
    pub variant:          DownsellVariant,
    pub label:            String,
    pub original_price:   String,
    pub discounted_price: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionView {
    pub question: Option<SurveyQuestion>,
    pub prompt:   &'static str,
    pub options:  &'static [&'static str],
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReasonView {
    pub reason:        CancelReason,
    pub label:         &'static str,
    pub follow_up:     &'static str,
    pub needs_details: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextInputView {
    pub prompt:    String,
    pub min_chars: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionView {
    /// `FlowEvent` tag this action sends.
    pub event:   &'static str,
    pub label:   String,
    pub enabled: bool,
}

impl ActionView {
    fn new(event: &'static str, label: impl Into<String>) -> Self {
        Self { event, label: label.into(), enabled: true }
    }

    fn enabled_if(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Screen {
    fn base(step: FlowStep, heading: &str) -> Self {
        Self {
            step,
            heading: heading.to_string(),
            body: Vec::new(),
            progress: step.progress(),
            show_back: step != FlowStep::Initial,
            offer: None,
            questions: Vec::new(),
            reasons: Vec::new(),
            text_input: None,
            actions: Vec::new(),
        }
    }

    fn lines(mut self, lines: &[&str]) -> Self {
        self.body.extend(lines.iter().map(|l| l.to_string()));
        self
    }

    pub fn action(&self, event: &str) -> Option<&ActionView> {
        self.actions.iter().find(|a| a.event == event)
    }

    pub fn render(
        step: FlowStep,
        variant: DownsellVariant,
        answers: &SurveyAnswers,
        config: &FlowConfig,
    ) -> Self {
        let terms = config.offer_for(variant);
        match step {
            FlowStep::Initial => {
                let mut s = Self::base(step, "Hey mate, quick one before you go.").lines(&[
                    "Have you found a job yet?",
                    "Whatever your answer, we just want to help you take the next step. \
                     With visa support, or by hearing how we can do better.",
                ]);
                s.actions = vec![
                    ActionView::new("answer_job_found", "Yes, I've found a job"),
                    ActionView::new("answer_job_found", "Not yet - I'm still looking"),
                ];
                s
            }

            FlowStep::Congrats => {
                let mut s = Self::base(step, "Congrats on the new role! 🎉");
                s.questions = SurveyQuestion::ALL
                    .iter()
                    .map(|q| QuestionView {
                        question: Some(*q),
                        prompt: q.prompt(),
                        options: q.options(),
                        selected: Some(answers.get(*q))
                            .filter(|a| !a.is_empty())
                            .map(str::to_string),
                    })
                    .collect();
                s.actions = vec![ActionView::new("continue", "Continue")
                    .enabled_if(answers.is_complete())];
                s
            }

            FlowStep::Feedback => {
                let mut s = Self::base(
                    step,
                    "What's one thing you wish we could've helped you with?",
                )
                .lines(&[
                    "We're always looking to improve, your thoughts can help us make \
                     Migrate Mate more useful for others.*",
                ]);
                s.text_input = Some(TextInputView {
                    prompt: format!("Min {} characters", config.min_feedback_chars),
                    min_chars: config.min_feedback_chars,
                });
                s.actions = vec![ActionView::new("submit_feedback", "Continue")];
                s
            }

            FlowStep::YesWithMM | FlowStep::NoWithoutMM => {
                let (heading, intro): (&str, &[&str]) = if step == FlowStep::YesWithMM {
                    ("We helped you land the job, now let's help you secure your visa.", &[])
                } else {
                    (
                        "You landed the job! That's what we live for.",
                        &["Even if it wasn't through Migrate Mate, let us help get your visa sorted."],
                    )
                };
                let mut s = Self::base(step, heading).lines(intro);
                s.questions = vec![QuestionView {
                    question: None,
                    prompt: "Is your company providing an immigration lawyer to help with your visa?",
                    options: &["Yes", "No"],
                    selected: None,
                }];
                s.text_input = Some(TextInputView {
                    prompt: "Which visa will you be applying for?*".into(),
                    min_chars: 1,
                });
                s.actions = vec![ActionView::new("submit_visa", "Complete cancellation")];
                s
            }

            FlowStep::NoHelpWithVisa => {
                let mut s = Self::base(step, "All done, your cancellation's been processed.")
                    .lines(&[
                        "We're stoked to hear you've landed a job and sorted your visa.",
                        "Big congrats from the team. 🙌",
                    ]);
                s.actions = vec![ActionView::new("finish", "Finish")];
                s
            }

            FlowStep::VisaHelp => {
                let mut s = Self::base(step, "Your cancellation's all sorted, mate, no more charges.")
                    .lines(&[
                        "I'll be reaching out soon to help with the visa side of things.",
                        "We've got your back, whether it's questions, paperwork, or just \
                         figuring out your options.",
                    ]);
                s.actions = vec![ActionView::new("finish", "Finish")];
                s
            }

            FlowStep::Downsell => {
                let mut s = Self::base(
                    step,
                    "We built this to help you land the job, this makes it a little easier.",
                )
                .lines(&[
                    "We've been there and we're here to help you.",
                    &format!("Here's {} until you find a job.", terms.label),
                    "You won't be charged until your next billing date.",
                ]);
                s.offer = Some(offer_view(variant, &terms));
                s.actions = vec![
                    ActionView::new("accept_offer", accept_label(&terms)),
                    ActionView::new("decline_offer", "No thanks"),
                ];
                s
            }

            FlowStep::OfferDeclined => {
                let mut s = Self::base(step, "Help us understand how you were using Migrate Mate.");
                s.questions = [
                    SurveyQuestion::RolesApplied,
                    SurveyQuestion::CompaniesEmailed,
                    SurveyQuestion::CompaniesInterviewed,
                ]
                .iter()
                .map(|q| QuestionView {
                    question: Some(*q),
                    prompt: q.prompt(),
                    options: q.options(),
                    selected: None,
                })
                .collect();
                s.offer = Some(offer_view(variant, &terms));
                s.actions = vec![
                    ActionView::new("accept_offer", accept_label(&terms)),
                    ActionView::new("continue_to_reason", "Continue"),
                ];
                s
            }

            FlowStep::CancelReason => {
                let mut s = Self::base(step, "What's the main reason for cancelling?")
                    .lines(&["Please take a minute to let us know why:"]);
                s.reasons = CancelReason::ALL
                    .iter()
                    .map(|r| ReasonView {
                        reason: *r,
                        label: r.label(),
                        follow_up: r.follow_up_question(),
                        needs_details: r.needs_details(),
                    })
                    .collect();
                s.text_input = Some(TextInputView {
                    prompt: format!("Min {} characters", config.min_detail_chars),
                    min_chars: config.min_detail_chars,
                });
                s.offer = Some(offer_view(variant, &terms));
                s.actions = vec![
                    ActionView::new("accept_offer_with_reason", accept_label(&terms)),
                    ActionView::new("complete_cancellation", "Complete cancellation"),
                ];
                s
            }

            FlowStep::OfferAccept1 => {
                let mut s = Self::base(step, "Great choice, mate!").lines(&[
                    "You're still on the path to your dream role. Let's make it happen together!",
                    &format!(
                        "You've got {} days left on your current plan. Starting from your next \
                         billing date, your monthly payment will be {}.",
                        config.days_left_on_plan,
                        format_price(terms.discounted_price_cents)
                    ),
                    "You can cancel anytime before then.",
                ]);
                s.offer = Some(offer_view(variant, &terms));
                s.actions = vec![ActionView::new("complete", "Land your dream role")];
                s
            }

            FlowStep::CancelComplete => {
                let mut s = Self::base(step, "Sorry to see you go, mate.").lines(&[
                    "Thanks for being with us, and you're always welcome back.",
                    "Your subscription is set to end at the close of your billing period. \
                     You'll still have full access until then. No further charges after that.",
                    "Changed your mind? You can reactivate anytime before your end date.",
                ]);
                s.actions = vec![ActionView::new("back_to_jobs", "Back to Jobs")];
                s
            }
        }
    }
}

fn offer_view(variant: DownsellVariant, terms: &OfferTerms) -> OfferView {
    OfferView {
        variant,
        label: terms.label.clone(),
        original_price: format_price(terms.original_price_cents),
        discounted_price: format_price(terms.discounted_price_cents),
    }
}

fn accept_label(terms: &OfferTerms) -> String {
    format!(
        "Get {} | {} {}",
        terms.label,
        format_price(terms.discounted_price_cents),
        format_price(terms.original_price_cents)
    )
}

/// "$25" for whole dollars, "$19.50" otherwise.
pub fn format_price(cents: Cents) -> String {
    if cents % 100 == 0 {
        format!("${}", cents / 100)
    } else {
        format!("${}.{:02}", cents / 100, cents % 100)
    }
}
