//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The flow calls backend methods and never executes SQL directly.

use crate::{
    error::FlowResult,
    event::TransitionLogEntry,
    record::{CancellationPatch, CancellationRecord, SubscriptionStatus},
    variant::DownsellVariant,
};
use rusqlite::Connection;

mod cancellation;
mod subscription;
mod transition_log;

/// The row store the wizard persists through.
///
/// `FlowStore` is the SQLite implementation; hosts backed by another
/// service implement this trait instead.
pub trait FlowBackend {
    /// The variant already assigned to this pair, if any.
    fn stored_variant(
        &self,
        user_id: &str,
        subscription_id: &str,
    ) -> FlowResult<Option<DownsellVariant>>;

    /// Insert `variant` unless the pair already has one.
    /// Returns whichever variant is stored afterwards.
    fn insert_variant_if_absent(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
    ) -> FlowResult<DownsellVariant>;

    /// Merge `patch` into the pair's row, creating it with `variant` if it
    /// does not exist yet. A stored variant is never overwritten.
    fn upsert_cancellation(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
        patch: &CancellationPatch,
    ) -> FlowResult<()>;

    fn cancellation(
        &self,
        user_id: &str,
        subscription_id: &str,
    ) -> FlowResult<Option<CancellationRecord>>;

    fn subscription_status(&self, subscription_id: &str) -> FlowResult<Option<SubscriptionStatus>>;

    /// Returns false when no subscription has that id.
    fn set_subscription_status(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> FlowResult<bool>;

    fn append_transition(&self, entry: &TransitionLogEntry) -> FlowResult<()>;
}

pub struct FlowStore {
    conn: Connection,
}

impl FlowStore {
    pub fn open(path: &str) -> FlowResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FlowResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FlowResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_transition_log.sql"))?;
        Ok(())
    }
}

impl FlowBackend for FlowStore {
    fn stored_variant(
        &self,
        user_id: &str,
        subscription_id: &str,
    ) -> FlowResult<Option<DownsellVariant>> {
        self.variant_for_pair(user_id, subscription_id)
    }

    fn insert_variant_if_absent(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
    ) -> FlowResult<DownsellVariant> {
        self.insert_cancellation_stub(user_id, subscription_id, variant)?;
        // Re-read: a row written by another session wins over ours.
        Ok(self
            .variant_for_pair(user_id, subscription_id)?
            .unwrap_or(variant))
    }

    fn upsert_cancellation(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
        patch: &CancellationPatch,
    ) -> FlowResult<()> {
        self.merge_cancellation(user_id, subscription_id, variant, patch)
    }

    fn cancellation(
        &self,
        user_id: &str,
        subscription_id: &str,
    ) -> FlowResult<Option<CancellationRecord>> {
        self.cancellation_for_pair(user_id, subscription_id)
    }

    fn subscription_status(&self, subscription_id: &str) -> FlowResult<Option<SubscriptionStatus>> {
        self.status_of(subscription_id)
    }

    fn set_subscription_status(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> FlowResult<bool> {
        self.update_status(subscription_id, status)
    }

    fn append_transition(&self, entry: &TransitionLogEntry) -> FlowResult<()> {
        self.insert_transition(entry)
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn bool_to_sql(b: bool) -> i64 {
    if b { 1 } else { 0 }
}
