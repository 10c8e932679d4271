use cancelflow_core::{
    record::{SubscriptionRecord, SubscriptionStatus},
    survey::{SurveyAnswers, SurveyQuestion},
    CancellationFlow, FlowBackend, FlowConfig, FlowEvent, FlowOutcome, FlowStep, FlowStore,
};

// ── Test helpers ────────────────────────────────────────────────────────────

const USER: &str = "3f2b8c1e-9a4d-4e7b-8c2a-1d5e6f7a8b9c";
const SUB: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

fn make_store() -> FlowStore {
    let store = FlowStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
        .insert_subscription(&SubscriptionRecord {
            id: SUB.into(),
            user_id: USER.into(),
            monthly_price_cents: 2500,
            status: SubscriptionStatus::Active,
        })
        .expect("seed subscription");
    store
}

/// Answer yes, fill the survey, continue, and submit valid feedback.
fn through_feedback(flow: &mut CancellationFlow<'_, FlowStore>, found_with_us: bool) {
    flow.handle(FlowEvent::AnswerJobFound { found: true }).unwrap();
    let answers = [
        (SurveyQuestion::FoundJobWithMigrateMate, if found_with_us { "Yes" } else { "No" }),
        (SurveyQuestion::RolesApplied, "6 - 20"),
        (SurveyQuestion::CompaniesEmailed, "1-5"),
        (SurveyQuestion::CompaniesInterviewed, "3-5"),
    ];
    for (question, value) in answers {
        flow.handle(FlowEvent::SetSurveyAnswer { question, value: value.into() })
            .unwrap();
    }
    flow.handle(FlowEvent::Continue).unwrap();
    flow.handle(FlowEvent::SubmitFeedback {
        text: "More interview prep for senior roles please".into(),
    })
    .unwrap();
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Answering "yes" moves to the survey and marks the subscription as pending.
#[test]
fn yes_answer_opens_survey_and_marks_pending() {
    let store = make_store();
    let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);

    let outcome = flow.handle(FlowEvent::AnswerJobFound { found: true }).unwrap();

    assert_eq!(
        outcome,
        FlowOutcome::Moved { from: FlowStep::Initial, to: FlowStep::Congrats }
    );
    assert_eq!(
        store.subscription_status(SUB).unwrap(),
        Some(SubscriptionStatus::PendingCancellation)
    );
}

/// Continuing past the survey stores the answers as JSON on the row.
#[test]
fn survey_answers_are_persisted_as_json() {
    let store = make_store();
    let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    through_feedback(&mut flow, true);

    let record = store.cancellation(USER, SUB).unwrap().expect("row exists");
    let answers: SurveyAnswers =
        serde_json::from_str(record.survey_answers.as_deref().unwrap()).unwrap();

    assert_eq!(answers.found_job_with_migrate_mate, "Yes");
    assert_eq!(answers.roles_applied, "6 - 20");
    assert_eq!(answers.companies_interviewed, "3-5");
    assert_eq!(
        record.feedback.as_deref(),
        Some("More interview prep for senior roles please")
    );
    assert!(!record.completed, "Nothing completed yet");
}

/// Feedback routes on the first survey answer.
#[test]
fn feedback_branches_on_found_with_us() {
    let store = make_store();
    let mut yes = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    through_feedback(&mut yes, true);
    assert_eq!(yes.current_step(), FlowStep::YesWithMM);

    let mut no = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    through_feedback(&mut no, false);
    assert_eq!(no.current_step(), FlowStep::NoWithoutMM);
}

/// Found through us with a lawyer arranged: the flow completes and closes.
#[test]
fn yes_with_lawyer_completes_and_closes() {
    let store = make_store();
    let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    through_feedback(&mut flow, true);

    let outcome = flow
        .handle(FlowEvent::SubmitVisa { has_lawyer: true, visa_type: "H-1B".into() })
        .unwrap();

    assert!(outcome.is_closed());
    assert!(flow.is_closed());
    let record = store.cancellation(USER, SUB).unwrap().unwrap();
    assert_eq!(record.has_immigration_lawyer, Some(true));
    assert_eq!(record.visa_type.as_deref(), Some("H-1B"));
    assert!(record.completed);
    assert_eq!(
        store.subscription_status(SUB).unwrap(),
        Some(SubscriptionStatus::Cancelled)
    );
}

/// Without a lawyer, either branch goes to the visa-help screen; Finish completes.
#[test]
fn no_lawyer_goes_to_visa_help_then_finishes() {
    for found_with_us in [true, false] {
        let store = make_store();
        let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
        through_feedback(&mut flow, found_with_us);

        flow.handle(FlowEvent::SubmitVisa { has_lawyer: false, visa_type: "O-1".into() })
            .unwrap();
        assert_eq!(flow.current_step(), FlowStep::VisaHelp);

        let record = store.cancellation(USER, SUB).unwrap().unwrap();
        assert_eq!(record.has_immigration_lawyer, Some(false));
        assert!(!record.completed, "Visa help screen is not the end yet");

        let outcome = flow.handle(FlowEvent::Finish).unwrap();
        assert_eq!(outcome, FlowOutcome::Closed { from: FlowStep::VisaHelp });
        let record = store.cancellation(USER, SUB).unwrap().unwrap();
        assert!(record.completed);
        assert_eq!(
            store.subscription_status(SUB).unwrap(),
            Some(SubscriptionStatus::Cancelled)
        );
    }
}

/// Found elsewhere with a lawyer: the "all sorted" screen, then finish.
#[test]
fn found_elsewhere_with_lawyer_goes_to_no_help_screen() {
    let store = make_store();
    let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    through_feedback(&mut flow, false);

    flow.handle(FlowEvent::SubmitVisa { has_lawyer: true, visa_type: "TN".into() })
        .unwrap();
    assert_eq!(flow.current_step(), FlowStep::NoHelpWithVisa);

    flow.handle(FlowEvent::Finish).unwrap();
    let record = store.cancellation(USER, SUB).unwrap().unwrap();
    assert!(record.completed);
    assert_eq!(record.has_immigration_lawyer, Some(false));
    assert_eq!(record.visa_type.as_deref(), Some("TN"));
}

/// A blank visa type skips the branch screens and completes immediately.
#[test]
fn blank_visa_completes_without_branching() {
    let store = make_store();
    let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    through_feedback(&mut flow, false);

    let outcome = flow
        .handle(FlowEvent::SubmitVisa { has_lawyer: false, visa_type: "   ".into() })
        .unwrap();

    assert_eq!(outcome, FlowOutcome::Closed { from: FlowStep::NoWithoutMM });
    let record = store.cancellation(USER, SUB).unwrap().unwrap();
    assert!(record.completed);
    assert_eq!(record.visa_type, None);
}

/// A job-found completion never reports the downsell as accepted.
#[test]
fn job_found_completion_clears_earlier_acceptance() {
    let store = make_store();
    let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    flow.handle(FlowEvent::AnswerJobFound { found: false }).unwrap();
    flow.handle(FlowEvent::AcceptOffer).unwrap();
    flow.handle(FlowEvent::Back).unwrap();
    flow.handle(FlowEvent::Back).unwrap();
    assert_eq!(flow.current_step(), FlowStep::Initial);

    through_feedback(&mut flow, true);
    flow.handle(FlowEvent::SubmitVisa { has_lawyer: true, visa_type: "H-1B".into() })
        .unwrap();

    let record = store.cancellation(USER, SUB).unwrap().unwrap();
    assert!(record.completed);
    assert_eq!(record.accepted_downsell, Some(false));
}

/// Markup in free text is stripped before it reaches the row.
#[test]
fn free_text_is_sanitized_before_storage() {
    let store = make_store();
    let mut flow = CancellationFlow::open(&store, FlowConfig::default_test(), USER, SUB);
    through_feedback(&mut flow, true);

    flow.handle(FlowEvent::SubmitVisa {
        has_lawyer: false,
        visa_type: "<script>steal()</script>E-3 <b onclick=x>".into(),
    })
    .unwrap();

    let record = store.cancellation(USER, SUB).unwrap().unwrap();
    assert_eq!(record.visa_type.as_deref(), Some("E-3 <b x>"));
}
