//! Seeded random walks through the wizard.
//!
//! RULE: walks never touch a platform RNG. Every choice flows from a
//! `FlowRng` seeded from a single u64, so a seed replays the same walk.
//!
//! Walks deliberately send some bad input (short feedback, missing
//! reasons) so guard rejections are exercised alongside the happy paths.

use crate::{
    error::{FlowError, FlowResult},
    event::FlowEvent,
    flow::CancellationFlow,
    step::FlowStep,
    store::FlowBackend,
    survey::{CancelReason, SurveyQuestion, UsageSurvey},
};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for driving walks.
pub struct FlowRng {
    inner: Pcg64Mcg,
}

impl FlowRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// A v4 UUID built from this stream, for synthetic user and subscription ids.
    pub fn next_uuid(&mut self) -> uuid::Uuid {
        use rand::RngCore;
        let mut bytes = [0u8; 16];
        self.inner.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub events_sent: u32,
    pub rejected:    u32,
    pub final_step:  Option<FlowStep>,
    pub closed:      bool,
    pub path:        Vec<FlowStep>,
}

/// Drive `flow` with random events until it closes or `max_events` is spent.
/// Guard rejections are counted and the walk continues; any other error ends it.
pub fn random_walk<B: FlowBackend>(
    flow: &mut CancellationFlow<'_, B>,
    rng: &mut FlowRng,
    max_events: u32,
) -> FlowResult<WalkSummary> {
    let mut summary = WalkSummary {
        path: vec![flow.current_step()],
        ..Default::default()
    };

    while !flow.is_closed() && summary.events_sent < max_events {
        let event = next_event(flow.current_step(), rng);
        summary.events_sent += 1;
        match flow.handle(event) {
            Ok(_) => {
                if summary.path.last() != Some(&flow.current_step()) {
                    summary.path.push(flow.current_step());
                }
            }
            Err(FlowError::GuardRejected { .. }) => summary.rejected += 1,
            Err(e) => return Err(e),
        }
    }

    summary.final_step = Some(flow.current_step());
    summary.closed = flow.is_closed();
    Ok(summary)
}

/// An event that is legal on `step`, with randomised payload.
pub fn next_event(step: FlowStep, rng: &mut FlowRng) -> FlowEvent {
    // A small chance of navigating away from any screen.
    if step != FlowStep::Initial && rng.chance(0.08) {
        return FlowEvent::Back;
    }
    if rng.chance(0.01) {
        return FlowEvent::Close;
    }

    match step {
        FlowStep::Initial => FlowEvent::AnswerJobFound { found: rng.chance(0.5) },

        FlowStep::Congrats => {
            // Continue regardless of progress; an incomplete form exercises the guard.
            if rng.chance(0.3) {
                FlowEvent::Continue
            } else {
                let question = *rng.pick(&SurveyQuestion::ALL);
                FlowEvent::SetSurveyAnswer {
                    question,
                    value: rng.pick(question.options()).to_string(),
                }
            }
        }

        FlowStep::Feedback => FlowEvent::SubmitFeedback { text: some_text(rng, 25) },

        FlowStep::YesWithMM | FlowStep::NoWithoutMM => FlowEvent::SubmitVisa {
            has_lawyer: rng.chance(0.5),
            visa_type: if rng.chance(0.85) {
                rng.pick(&["H-1B", "O-1", "TN", "E-3", "Green card"]).to_string()
            } else {
                String::new()
            },
        },

        FlowStep::VisaHelp | FlowStep::NoHelpWithVisa => FlowEvent::Finish,

        FlowStep::Downsell => {
            if rng.chance(0.35) {
                FlowEvent::AcceptOffer
            } else {
                FlowEvent::DeclineOffer
            }
        }

        FlowStep::OfferDeclined => {
            if rng.chance(0.2) {
                FlowEvent::AcceptOffer
            } else {
                FlowEvent::ContinueToReason {
                    usage: UsageSurvey {
                        roles_applied: maybe_option(rng, SurveyQuestion::RolesApplied),
                        companies_emailed: maybe_option(rng, SurveyQuestion::CompaniesEmailed),
                        companies_interviewed: None,
                    },
                }
            }
        }

        FlowStep::CancelReason => {
            let reason = if rng.chance(0.9) {
                Some(*rng.pick(&CancelReason::ALL))
            } else {
                None
            };
            let details = some_text(rng, 25);
            if rng.chance(0.25) {
                FlowEvent::AcceptOfferWithReason { reason, details }
            } else {
                FlowEvent::CompleteCancellation { reason, details }
            }
        }

        FlowStep::OfferAccept1 => FlowEvent::Complete,
        FlowStep::CancelComplete => FlowEvent::BackToJobs,
    }
}

/// Text that clears `min` characters most of the time and falls one short otherwise.
fn some_text(rng: &mut FlowRng, min: usize) -> String {
    let len = if rng.chance(0.8) {
        min + rng.next_u64_below(40) as usize
    } else {
        min.saturating_sub(1)
    };
    "walk feedback text ".chars().cycle().take(len).collect()
}

fn maybe_option(rng: &mut FlowRng, question: SurveyQuestion) -> String {
    if rng.chance(0.9) {
        rng.pick(question.options()).to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = FlowRng::new(7);
        let mut b = FlowRng::new(7);
        for _ in 0..50 {
            assert_eq!(a.next_u64_below(1000), b.next_u64_below(1000));
        }
        assert_eq!(a.next_uuid(), b.next_uuid());
    }

    #[test]
    fn generated_uuids_are_v4() {
        let mut rng = FlowRng::new(99);
        let id = rng.next_uuid();
        assert_eq!(id.get_version_num(), 4);
        assert!(crate::sanitize::validate_uuid(&id.to_string()));
    }

    #[test]
    fn generated_events_are_legal_for_their_step() {
        let mut rng = FlowRng::new(3);
        for _ in 0..200 {
            let e = next_event(FlowStep::CancelComplete, &mut rng);
            assert!(matches!(e, FlowEvent::BackToJobs | FlowEvent::Back | FlowEvent::Close));
        }
    }

    #[test]
    fn short_text_is_one_below_minimum() {
        let mut rng = FlowRng::new(11);
        let lens: Vec<usize> = (0..100).map(|_| some_text(&mut rng, 25).chars().count()).collect();
        assert!(lens.iter().all(|l| *l >= 24));
        assert!(lens.contains(&24));
    }
}
