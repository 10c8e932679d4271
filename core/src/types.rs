//! Shared primitive types used across the wizard.

/// The host application's user identifier (expected to be a UUID).
pub type UserId = String;

/// The subscription being cancelled (expected to be a UUID).
pub type SubscriptionId = String;

/// One open-modal session. Generated per `CancellationFlow::open`.
pub type SessionId = String;

/// Money is carried in integer cents.
pub type Cents = i64;
