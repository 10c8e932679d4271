use super::{now_rfc3339, FlowStore};
use crate::{
    error::FlowResult,
    record::{SubscriptionRecord, SubscriptionStatus},
};
use rusqlite::{params, OptionalExtension};

impl FlowStore {
    // ── Subscription ──────────────────────────────────────────────

    /// Seed a subscription row. Billing owns these in production; hosts
    /// and tests create them directly.
    pub fn insert_subscription(&self, sub: &SubscriptionRecord) -> FlowResult<()> {
        let now = now_rfc3339();
        self.conn.execute(
            "INSERT INTO subscriptions (id, user_id, monthly_price_cents, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                sub.id,
                sub.user_id,
                sub.monthly_price_cents,
                sub.status.as_str(),
                now,
            ],
        )?;
        Ok(())
    }

    pub fn subscription(&self, subscription_id: &str) -> FlowResult<Option<SubscriptionRecord>> {
        let row: Option<(String, String, i64, String)> = self
            .conn
            .query_row(
                "SELECT id, user_id, monthly_price_cents, status
                 FROM subscriptions WHERE id = ?1",
                params![subscription_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some((id, user_id, monthly_price_cents, status)) => Ok(Some(SubscriptionRecord {
                id,
                user_id,
                monthly_price_cents,
                status: status.parse()?,
            })),
            None => Ok(None),
        }
    }

    pub fn status_of(&self, subscription_id: &str) -> FlowResult<Option<SubscriptionStatus>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM subscriptions WHERE id = ?1",
                params![subscription_id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| s.parse()).transpose()
    }

    pub fn update_status(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> FlowResult<bool> {
        let changed = self.conn.execute(
            "UPDATE subscriptions SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now_rfc3339(), subscription_id],
        )?;
        if changed == 0 {
            log::warn!("store: no subscription {subscription_id} to mark {status}");
        }
        Ok(changed > 0)
    }

    pub fn subscription_count_by_status(&self, status: SubscriptionStatus) -> FlowResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?)
    }
}
