use crate::{types::Cents, variant::DownsellVariant};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Offer pricing ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferTerms {
    pub label: String,
    pub original_price_cents: Cents,
    pub discounted_price_cents: Cents,
}

// ── Failure handling ────────────────────────────────────────────────

/// What the wizard does when a write to the backend fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistFailurePolicy {
    /// Surface the error and stay on the current step.
    #[default]
    Block,
    /// Log the error and move on as if the write succeeded.
    Advance,
}

// ── Top-level config ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub min_feedback_chars: usize,
    pub min_detail_chars: usize,
    #[serde(default)]
    pub persist_failure_policy: PersistFailurePolicy,
    pub offers: HashMap<DownsellVariant, OfferTerms>,
    pub days_left_on_plan: u32,
}

impl FlowConfig {
    /// Load from a JSON file (see data/flow_config.json).
    /// In tests, use FlowConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: FlowConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for variant in [DownsellVariant::A, DownsellVariant::B] {
            let terms = self
                .offers
                .get(&variant)
                .ok_or_else(|| anyhow::anyhow!("No offer terms for variant {variant}"))?;
            if terms.discounted_price_cents > terms.original_price_cents {
                anyhow::bail!(
                    "Variant {variant} discount price {} exceeds original {}",
                    terms.discounted_price_cents,
                    terms.original_price_cents
                );
            }
        }
        Ok(())
    }

    /// Offer terms for a variant. Falls back to variant A's terms, then to
    /// the built-in defaults, so a partial config never panics a screen.
    pub fn offer_for(&self, variant: DownsellVariant) -> OfferTerms {
        self.offers
            .get(&variant)
            .or_else(|| self.offers.get(&DownsellVariant::A))
            .cloned()
            .unwrap_or_else(|| default_offer(variant))
    }

    pub fn default_test() -> Self {
        let offers = [DownsellVariant::A, DownsellVariant::B]
            .into_iter()
            .map(|v| (v, default_offer(v)))
            .collect();
        Self {
            min_feedback_chars: 25,
            min_detail_chars: 25,
            persist_failure_policy: PersistFailurePolicy::Block,
            offers,
            days_left_on_plan: 28,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::default_test()
    }
}

fn default_offer(variant: DownsellVariant) -> OfferTerms {
    match variant {
        DownsellVariant::A => OfferTerms {
            label: "50% off".into(),
            original_price_cents: 3900,
            discounted_price_cents: 1950,
        },
        DownsellVariant::B => OfferTerms {
            label: "50% off".into(),
            original_price_cents: 2500,
            discounted_price_cents: 1250,
        },
    }
}
