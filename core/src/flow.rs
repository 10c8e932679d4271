//! The cancellation wizard controller.
//!
//! One `CancellationFlow` lives for as long as the host's modal is open.
//! It owns the current step, the A/B variant, and the survey answers,
//! and it is the only thing that writes to the backend.
//!
//! HANDLING ORDER (every event):
//!   1. Plan: check the event is legal on the current step and that its
//!      guard passes. Nothing is mutated.
//!   2. Persist: merge the planned patch into the cancellation row, then
//!      move the subscription status.
//!   3. Apply: update local state and the current step.
//!   4. Log: append the transition to the transition log.
//!
//! A failed write in step 2 stops here under `PersistFailurePolicy::Block`;
//! under `Advance` it is logged and steps 3-4 still run.

use crate::{
    config::{FlowConfig, PersistFailurePolicy},
    error::{FlowError, FlowResult},
    event::{FlowEvent, FlowOutcome, TransitionLogEntry},
    record::{CancellationPatch, SubscriptionStatus},
    sanitize::{sanitize_input, validate_uuid},
    screen::Screen,
    step::FlowStep,
    store::FlowBackend,
    survey::{
        feedback_is_valid, reason_is_complete, visa_type_given, CancelReason, SurveyAnswers,
        SurveyQuestion, UsageSurvey,
    },
    types::{SessionId, SubscriptionId, UserId},
    variant::{variant_for_user, DownsellVariant},
};

pub struct CancellationFlow<'a, B: FlowBackend> {
    backend:          &'a B,
    config:           FlowConfig,
    session_id:       SessionId,
    user_id:          UserId,
    subscription_id:  SubscriptionId,
    /// False when the ids are malformed: the flow still runs, nothing is written.
    persistent:       bool,
    current_step:     FlowStep,
    downsell_variant: DownsellVariant,
    /// False when assignment fell back to A; the fallback is never written.
    variant_stored:   bool,
    survey_answers:   SurveyAnswers,
    is_form_valid:    bool,
    usage_survey:     Option<UsageSurvey>,
    closed:           bool,
    seq:              u64,
}

/// Where a planned event leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Target {
    Step(FlowStep),
    #[default]
    Stay,
    Close,
}

/// Everything an event will do, decided before anything changes.
#[derive(Debug, Default)]
struct Plan {
    target: Target,
    patch:  Option<CancellationPatch>,
    status: Option<SubscriptionStatus>,
    local:  Option<LocalChange>,
}

#[derive(Debug)]
enum LocalChange {
    SurveyAnswer(SurveyQuestion, String),
    Usage(UsageSurvey),
}

impl Plan {
    fn to(target: Target) -> Self {
        Self { target, ..Default::default() }
    }

    fn with_patch(mut self, patch: CancellationPatch) -> Self {
        self.patch = Some(patch);
        self
    }

    fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn with_local(mut self, change: LocalChange) -> Self {
        self.local = Some(change);
        self
    }
}

impl<'a, B: FlowBackend> CancellationFlow<'a, B> {
    /// Open the wizard for one (user, subscription) pair and settle the
    /// downsell variant. Never fails: backend trouble falls back to A.
    pub fn open(
        backend: &'a B,
        config: FlowConfig,
        user_id: &str,
        subscription_id: &str,
    ) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let persistent = validate_uuid(user_id) && validate_uuid(subscription_id);

        let (downsell_variant, variant_stored) = if persistent {
            assign_variant(backend, &session_id, user_id, subscription_id)
        } else {
            log::warn!(
                "session={session_id} flow: malformed ids (user={user_id:?}, subscription={subscription_id:?}); \
                 variant A, nothing will be persisted"
            );
            (DownsellVariant::A, false)
        };

        log::info!(
            "session={session_id} flow: opened for user={user_id} subscription={subscription_id} variant={downsell_variant}"
        );

        Self {
            backend,
            config,
            session_id,
            user_id: user_id.to_string(),
            subscription_id: subscription_id.to_string(),
            persistent,
            current_step: FlowStep::Initial,
            downsell_variant,
            variant_stored,
            survey_answers: SurveyAnswers::default(),
            is_form_valid: false,
            usage_survey: None,
            closed: false,
            seq: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn subscription_id(&self) -> &str { &self.subscription_id }
    pub fn current_step(&self) -> FlowStep { self.current_step }
    pub fn downsell_variant(&self) -> DownsellVariant { self.downsell_variant }
    pub fn survey_answers(&self) -> &SurveyAnswers { &self.survey_answers }
    pub fn usage_survey(&self) -> Option<&UsageSurvey> { self.usage_survey.as_ref() }
    pub fn is_form_valid(&self) -> bool { self.is_form_valid }
    pub fn is_closed(&self) -> bool { self.closed }
    pub fn is_persistent(&self) -> bool { self.persistent }
    pub fn config(&self) -> &FlowConfig { &self.config }

    /// View model for the current step.
    pub fn screen(&self) -> Screen {
        Screen::render(
            self.current_step,
            self.downsell_variant,
            &self.survey_answers,
            &self.config,
        )
    }

    // ── Event handling ────────────────────────────────────────────

    pub fn handle(&mut self, event: FlowEvent) -> FlowResult<FlowOutcome> {
        if self.closed {
            return Err(FlowError::SessionClosed);
        }

        let from = self.current_step;
        let plan = self.plan(&event)?;
        let persisted = self.persist(&plan, &event)?;
        let outcome = self.apply(plan, from);
        self.log_transition(&event, &outcome, persisted);

        match outcome {
            FlowOutcome::Moved { from, to } => log::info!(
                "session={} flow: {from} -> {to} via {}",
                self.session_id,
                event.name()
            ),
            FlowOutcome::Closed { from } => log::info!(
                "session={} flow: closed from {from} via {}",
                self.session_id,
                event.name()
            ),
            FlowOutcome::Stayed { step } => log::debug!(
                "session={} flow: {} on {step}",
                self.session_id,
                event.name()
            ),
        }

        Ok(outcome)
    }

    fn plan(&self, event: &FlowEvent) -> FlowResult<Plan> {
        use FlowEvent as E;
        use FlowStep as S;

        let step = self.current_step;
        let plan = match (step, event) {
            (_, E::Close) => Plan::to(Target::Close),

            (_, E::Back) => match step.previous(&self.survey_answers) {
                Some(prev) => Plan::to(Target::Step(prev)),
                None => return Err(self.invalid(event)),
            },

            // ── Opening question ───────────────────────────────
            (S::Initial, E::AnswerJobFound { found }) => {
                let next = if *found { S::Congrats } else { S::Downsell };
                Plan::to(Target::Step(next))
                    .with_patch(reopened())
                    .with_status(SubscriptionStatus::PendingCancellation)
            }

            // ── Job-found branch ───────────────────────────────
            (S::Congrats, E::SetSurveyAnswer { question, value }) => Plan::to(Target::Stay)
                .with_local(LocalChange::SurveyAnswer(*question, sanitize_input(value))),

            (S::Congrats, E::Continue) => {
                let answers = sanitized_answers(&self.survey_answers);
                if !answers.is_complete() {
                    return Err(self.rejected(format!(
                        "{} of 4 survey answers given",
                        answers.answered_count()
                    )));
                }
                Plan::to(Target::Step(S::Feedback)).with_patch(CancellationPatch {
                    survey_answers: Some(serde_json::to_string(&answers)?),
                    ..Default::default()
                })
            }

            (S::Feedback, E::SubmitFeedback { text }) => {
                let feedback = sanitize_input(text);
                if !feedback_is_valid(&feedback, self.config.min_feedback_chars) {
                    return Err(self.rejected(format!(
                        "feedback needs at least {} characters",
                        self.config.min_feedback_chars
                    )));
                }
                let next = if self.survey_answers.found_job_with_us() {
                    S::YesWithMM
                } else {
                    S::NoWithoutMM
                };
                Plan::to(Target::Step(next)).with_patch(CancellationPatch {
                    feedback: Some(feedback),
                    ..Default::default()
                })
            }

            (S::YesWithMM | S::NoWithoutMM, E::SubmitVisa { has_lawyer, visa_type }) => {
                let visa = sanitize_input(visa_type);
                if !visa_type_given(&visa) {
                    // No visa named: nothing to route on, finish the cancellation.
                    return Ok(Plan::to(Target::Close)
                        .with_patch(CancellationPatch {
                            has_immigration_lawyer: Some(*has_lawyer),
                            ..finished()
                        })
                        .with_status(SubscriptionStatus::Cancelled));
                }
                let patch = CancellationPatch {
                    has_immigration_lawyer: Some(*has_lawyer),
                    visa_type: Some(visa),
                    ..Default::default()
                };
                match (step == S::YesWithMM, *has_lawyer) {
                    // Found through us and a lawyer is sorted: nothing left to help with.
                    (true, true) => Plan::to(Target::Close)
                        .with_patch(CancellationPatch {
                            completed: Some(true),
                            accepted_downsell: Some(false),
                            ..patch
                        })
                        .with_status(SubscriptionStatus::Cancelled),
                    (false, true) => Plan::to(Target::Step(S::NoHelpWithVisa)).with_patch(patch),
                    (_, false) => Plan::to(Target::Step(S::VisaHelp)).with_patch(patch),
                }
            }

            (S::VisaHelp, E::Finish) => Plan::to(Target::Close)
                .with_patch(finished())
                .with_status(SubscriptionStatus::Cancelled),

            (S::NoHelpWithVisa, E::Finish) => Plan::to(Target::Close)
                .with_patch(CancellationPatch {
                    has_immigration_lawyer: Some(false),
                    ..finished()
                })
                .with_status(SubscriptionStatus::Cancelled),

            // ── Downsell branch ────────────────────────────────
            (S::Downsell | S::OfferDeclined, E::AcceptOffer) => {
                Plan::to(Target::Step(S::OfferAccept1))
                    .with_patch(CancellationPatch {
                        accepted_downsell: Some(true),
                        ..reopened()
                    })
                    .with_status(SubscriptionStatus::Active)
            }

            (S::Downsell, E::DeclineOffer) => Plan::to(Target::Step(S::OfferDeclined)),

            (S::OfferDeclined, E::ContinueToReason { usage }) => {
                if !usage.is_complete() {
                    return Err(self.rejected(
                        "roles applied and companies emailed are required".into(),
                    ));
                }
                Plan::to(Target::Step(S::CancelReason)).with_local(LocalChange::Usage(usage.clone()))
            }

            (S::CancelReason, E::AcceptOfferWithReason { reason, details }) => {
                let Some(reason) = reason else {
                    return Err(self.rejected("select a reason for cancelling".into()));
                };
                Plan::to(Target::Step(S::OfferAccept1))
                    .with_patch(CancellationPatch {
                        accepted_downsell: Some(true),
                        completed: Some(false),
                        ..reason_patch(*reason, details)
                    })
                    .with_status(SubscriptionStatus::Active)
            }

            (S::CancelReason, E::CompleteCancellation { reason, details }) => {
                let Some(reason) = *reason else {
                    return Err(self.rejected("select a reason for cancelling".into()));
                };
                let min = self.config.min_detail_chars;
                if !reason_is_complete(Some(reason), &sanitize_input(details), min) {
                    return Err(self.rejected(format!("details need at least {min} characters")));
                }
                Plan::to(Target::Step(S::CancelComplete))
                    .with_patch(CancellationPatch {
                        completed: Some(true),
                        accepted_downsell: Some(false),
                        ..reason_patch(reason, details)
                    })
                    .with_status(SubscriptionStatus::Cancelled)
            }

            (S::OfferAccept1, E::Complete) => Plan::to(Target::Close),
            (S::CancelComplete, E::BackToJobs) => Plan::to(Target::Close),

            _ => return Err(self.invalid(event)),
        };
        Ok(plan)
    }

    /// Run the plan's writes. Returns whether they all landed.
    fn persist(&self, plan: &Plan, event: &FlowEvent) -> FlowResult<bool> {
        if plan.patch.is_none() && plan.status.is_none() {
            return Ok(true);
        }
        if !self.persistent {
            return Ok(false);
        }

        match self.write(plan) {
            Ok(landed) => Ok(landed),
            Err(e) => {
                log::error!(
                    "session={} flow: write for {} on {} failed: {e}",
                    self.session_id,
                    event.name(),
                    self.current_step
                );
                match self.config.persist_failure_policy {
                    PersistFailurePolicy::Block => Err(e),
                    PersistFailurePolicy::Advance => Ok(false),
                }
            }
        }
    }

    /// Returns false when the status write matched no subscription.
    fn write(&self, plan: &Plan) -> FlowResult<bool> {
        if let Some(patch) = &plan.patch {
            log::debug!(
                "session={} flow: upsert {:?}",
                self.session_id,
                patch.touched_columns()
            );
            // A row created now takes the user's bucket, never the fallback.
            let variant = if self.variant_stored {
                self.downsell_variant
            } else {
                variant_for_user(&self.user_id)
            };
            self.backend
                .upsert_cancellation(&self.user_id, &self.subscription_id, variant, patch)?;
        }
        match plan.status {
            Some(status) => self
                .backend
                .set_subscription_status(&self.subscription_id, status),
            None => Ok(true),
        }
    }

    fn apply(&mut self, plan: Plan, from: FlowStep) -> FlowOutcome {
        match plan.local {
            Some(LocalChange::SurveyAnswer(question, value)) => {
                self.survey_answers.set(question, value);
            }
            Some(LocalChange::Usage(usage)) => self.usage_survey = Some(usage),
            None => {}
        }

        let outcome = match plan.target {
            Target::Step(to) => {
                self.current_step = to;
                FlowOutcome::Moved { from, to }
            }
            Target::Stay => FlowOutcome::Stayed { step: from },
            Target::Close => {
                self.closed = true;
                FlowOutcome::Closed { from }
            }
        };

        if self.current_step == FlowStep::Congrats {
            self.is_form_valid = self.survey_answers.is_complete();
        }
        outcome
    }

    fn log_transition(&mut self, event: &FlowEvent, outcome: &FlowOutcome, persisted: bool) {
        if !self.persistent {
            return;
        }
        self.seq += 1;
        let (from_step, to_step) = match outcome {
            FlowOutcome::Moved { from, to } => (from.as_str(), to.as_str()),
            FlowOutcome::Stayed { step } => (step.as_str(), step.as_str()),
            FlowOutcome::Closed { from } => (from.as_str(), "closed"),
        };
        let payload = match serde_json::to_string(&event.sanitized()) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("session={} flow: cannot encode {}: {e}", self.session_id, event.name());
                return;
            }
        };
        let entry = TransitionLogEntry {
            id: None,
            session_id: self.session_id.clone(),
            seq: self.seq,
            from_step: from_step.to_string(),
            to_step: to_step.to_string(),
            event_type: event.name().to_string(),
            payload,
            persisted,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        // The transition log is an audit trail; losing an entry never blocks the user.
        if let Err(e) = self.backend.append_transition(&entry) {
            log::warn!("session={} flow: transition log write failed: {e}", self.session_id);
        }
    }

    fn invalid(&self, event: &FlowEvent) -> FlowError {
        FlowError::InvalidTransition {
            step: self.current_step.to_string(),
            event: event.name().to_string(),
        }
    }

    fn rejected(&self, reason: String) -> FlowError {
        log::debug!(
            "session={} flow: {} rejected input: {reason}",
            self.session_id,
            self.current_step
        );
        FlowError::GuardRejected {
            step: self.current_step.to_string(),
            reason,
        }
    }
}

/// Stored variant wins; otherwise bucket by user id and store it.
/// The flag is false when the backend failed and A is a session-only fallback.
fn assign_variant<B: FlowBackend>(
    backend: &B,
    session_id: &str,
    user_id: &str,
    subscription_id: &str,
) -> (DownsellVariant, bool) {
    let assigned = backend
        .stored_variant(user_id, subscription_id)
        .and_then(|stored| match stored {
            Some(v) => {
                log::debug!("session={session_id} flow: reusing stored variant {v}");
                Ok(v)
            }
            None => {
                let computed = variant_for_user(user_id);
                backend.insert_variant_if_absent(user_id, subscription_id, computed)
            }
        });

    match assigned {
        Ok(v) => (v, true),
        Err(e) => {
            log::error!("session={session_id} flow: variant assignment failed, using A: {e}");
            (DownsellVariant::A, false)
        }
    }
}

fn sanitized_answers(answers: &SurveyAnswers) -> SurveyAnswers {
    SurveyAnswers {
        found_job_with_migrate_mate: sanitize_input(&answers.found_job_with_migrate_mate),
        roles_applied: sanitize_input(&answers.roles_applied),
        companies_emailed: sanitize_input(&answers.companies_emailed),
        companies_interviewed: sanitize_input(&answers.companies_interviewed),
    }
}

/// Patch for writes that move the subscription off `cancelled`.
/// A record stays completed only while its subscription is cancelled.
fn reopened() -> CancellationPatch {
    CancellationPatch {
        completed: Some(false),
        ..Default::default()
    }
}

/// Patch for writes that cancel the subscription. A cancelled user has
/// not taken the offer, whatever they clicked earlier in the session.
fn finished() -> CancellationPatch {
    CancellationPatch {
        completed: Some(true),
        accepted_downsell: Some(false),
        ..Default::default()
    }
}

fn reason_patch(reason: CancelReason, details: &str) -> CancellationPatch {
    let details = sanitize_input(details);
    CancellationPatch {
        reason: Some(reason.as_str().to_string()),
        reason_details: Some((!details.is_empty()).then_some(details)),
        ..Default::default()
    }
}
