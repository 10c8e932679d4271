//! cancelflow-core: the subscription-cancellation wizard.
//!
//! The host opens a `CancellationFlow` when the user clicks "cancel",
//! renders `flow.screen()`, and feeds user actions back as `FlowEvent`s.
//! Everything the wizard learns is merged into one `cancellations` row per
//! (user, subscription) through a `FlowBackend`.

pub mod config;
pub mod error;
pub mod event;
pub mod flow;
pub mod record;
pub mod sanitize;
pub mod screen;
pub mod step;
pub mod store;
pub mod survey;
pub mod types;
pub mod variant;
pub mod walker;

pub use config::{FlowConfig, PersistFailurePolicy};
pub use error::{FlowError, FlowResult};
pub use event::{FlowEvent, FlowOutcome};
pub use flow::CancellationFlow;
pub use step::FlowStep;
pub use store::{FlowBackend, FlowStore};
pub use variant::DownsellVariant;
