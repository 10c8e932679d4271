use cancelflow_core::{
    event::TransitionLogEntry,
    record::{CancellationPatch, CancellationRecord, SubscriptionRecord, SubscriptionStatus},
    variant::variant_for_user,
    CancellationFlow, DownsellVariant, FlowBackend, FlowConfig, FlowError, FlowEvent, FlowResult,
    FlowStep, FlowStore, PersistFailurePolicy,
};
use std::cell::Cell;

// ── Test helpers ────────────────────────────────────────────────────────────

const USER: &str = "0e37df36-f698-41f1-8d0b-3f1d2f0a6c11";
const SUB: &str = "5a0f6c2b-3d6e-4c7a-9f1e-2b8d4c6a0e13";

/// Wraps a real store and fails chosen writes on demand.
struct FlakyBackend {
    inner: FlowStore,
    fail_upserts: Cell<bool>,
    fail_status: Cell<bool>,
    fail_variant: Cell<bool>,
}

impl FlakyBackend {
    fn new() -> Self {
        let inner = FlowStore::in_memory().expect("in-memory store");
        inner.migrate().expect("migration");
        inner
            .insert_subscription(&SubscriptionRecord {
                id: SUB.into(),
                user_id: USER.into(),
                monthly_price_cents: 2500,
                status: SubscriptionStatus::Active,
            })
            .expect("seed subscription");
        Self {
            inner,
            fail_upserts: Cell::new(false),
            fail_status: Cell::new(false),
            fail_variant: Cell::new(false),
        }
    }

    fn outage(what: &str) -> FlowError {
        FlowError::Other(anyhow::anyhow!("simulated outage: {what}"))
    }
}

impl FlowBackend for FlakyBackend {
    fn stored_variant(&self, user_id: &str, subscription_id: &str) -> FlowResult<Option<DownsellVariant>> {
        if self.fail_variant.get() {
            return Err(Self::outage("variant read"));
        }
        self.inner.stored_variant(user_id, subscription_id)
    }

    fn insert_variant_if_absent(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
    ) -> FlowResult<DownsellVariant> {
        self.inner.insert_variant_if_absent(user_id, subscription_id, variant)
    }

    fn upsert_cancellation(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
        patch: &CancellationPatch,
    ) -> FlowResult<()> {
        if self.fail_upserts.get() {
            return Err(Self::outage("upsert"));
        }
        self.inner.upsert_cancellation(user_id, subscription_id, variant, patch)
    }

    fn cancellation(&self, user_id: &str, subscription_id: &str) -> FlowResult<Option<CancellationRecord>> {
        self.inner.cancellation(user_id, subscription_id)
    }

    fn subscription_status(&self, subscription_id: &str) -> FlowResult<Option<SubscriptionStatus>> {
        self.inner.subscription_status(subscription_id)
    }

    fn set_subscription_status(&self, subscription_id: &str, status: SubscriptionStatus) -> FlowResult<bool> {
        if self.fail_status.get() {
            return Err(Self::outage("status"));
        }
        self.inner.set_subscription_status(subscription_id, status)
    }

    fn append_transition(&self, entry: &TransitionLogEntry) -> FlowResult<()> {
        self.inner.append_transition(entry)
    }
}

fn config(policy: PersistFailurePolicy) -> FlowConfig {
    FlowConfig { persist_failure_policy: policy, ..FlowConfig::default_test() }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Under Block a failed write surfaces as an error and the step does not move.
#[test]
fn block_policy_keeps_user_on_screen() {
    let backend = FlakyBackend::new();
    let mut flow = CancellationFlow::open(&backend, config(PersistFailurePolicy::Block), USER, SUB);
    flow.handle(FlowEvent::AnswerJobFound { found: false }).unwrap();

    backend.fail_upserts.set(true);
    let err = flow.handle(FlowEvent::AcceptOffer).unwrap_err();
    assert!(matches!(err, FlowError::Other(_)));
    assert_eq!(flow.current_step(), FlowStep::Downsell);

    // Retrying after the outage clears goes through.
    backend.fail_upserts.set(false);
    flow.handle(FlowEvent::AcceptOffer).unwrap();
    assert_eq!(flow.current_step(), FlowStep::OfferAccept1);
    let record = backend.cancellation(USER, SUB).unwrap().unwrap();
    assert_eq!(record.accepted_downsell, Some(true));
}

/// Under Advance the user moves on and the transition is logged as not persisted.
#[test]
fn advance_policy_moves_on_and_flags_log() {
    let backend = FlakyBackend::new();
    let mut flow = CancellationFlow::open(&backend, config(PersistFailurePolicy::Advance), USER, SUB);
    flow.handle(FlowEvent::AnswerJobFound { found: false }).unwrap();

    backend.fail_upserts.set(true);
    flow.handle(FlowEvent::AcceptOffer).unwrap();

    assert_eq!(flow.current_step(), FlowStep::OfferAccept1);
    let record = backend.cancellation(USER, SUB).unwrap().unwrap();
    assert_eq!(record.accepted_downsell, None);

    let log = backend.inner.transitions_for_session(flow.session_id()).unwrap();
    let last = log.last().expect("transition logged");
    assert_eq!(last.event_type, "accept_offer");
    assert!(!last.persisted);
    assert!(log[0].persisted);
}

/// A status failure after a successful patch leaves the patch in place.
#[test]
fn status_failure_after_patch_leaves_partial_record() {
    let backend = FlakyBackend::new();
    let mut flow = CancellationFlow::open(&backend, config(PersistFailurePolicy::Block), USER, SUB);
    flow.handle(FlowEvent::AnswerJobFound { found: false }).unwrap();

    backend.fail_status.set(true);
    assert!(flow.handle(FlowEvent::AcceptOffer).is_err());

    let record = backend.cancellation(USER, SUB).unwrap().unwrap();
    assert_eq!(record.accepted_downsell, Some(true));
    assert_eq!(
        backend.subscription_status(SUB).unwrap(),
        Some(SubscriptionStatus::PendingCancellation)
    );
    assert_eq!(flow.current_step(), FlowStep::Downsell);
}

/// Events that write nothing are unaffected by an outage.
#[test]
fn events_without_writes_ignore_outage() {
    let backend = FlakyBackend::new();
    let mut flow = CancellationFlow::open(&backend, config(PersistFailurePolicy::Block), USER, SUB);
    flow.handle(FlowEvent::AnswerJobFound { found: false }).unwrap();

    backend.fail_upserts.set(true);
    backend.fail_status.set(true);
    flow.handle(FlowEvent::DeclineOffer).unwrap();
    flow.handle(FlowEvent::Back).unwrap();
    assert_eq!(flow.current_step(), FlowStep::Downsell);
}

/// A failed variant lookup falls back to A for the session only.
/// Once the outage clears the user is back in their own bucket.
#[test]
fn variant_lookup_failure_falls_back_to_a() {
    let backend = FlakyBackend::new();
    assert_eq!(variant_for_user(USER), DownsellVariant::B);
    backend.fail_variant.set(true);

    let mut flow = CancellationFlow::open(&backend, config(PersistFailurePolicy::Block), USER, SUB);

    assert_eq!(flow.downsell_variant(), DownsellVariant::A);
    assert_eq!(flow.current_step(), FlowStep::Initial);
    assert!(backend.inner.variant_for_pair(USER, SUB).unwrap().is_none());

    flow.handle(FlowEvent::AnswerJobFound { found: false }).unwrap();
    assert_eq!(
        backend.inner.variant_for_pair(USER, SUB).unwrap(),
        Some(DownsellVariant::B)
    );

    backend.fail_variant.set(false);
    let reopened = CancellationFlow::open(&backend, config(PersistFailurePolicy::Block), USER, SUB);
    assert_eq!(reopened.downsell_variant(), DownsellVariant::B);
}
