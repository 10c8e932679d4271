use super::{bool_to_sql, now_rfc3339, FlowStore};
use crate::{
    error::{FlowError, FlowResult},
    record::{CancellationPatch, CancellationRecord},
    variant::DownsellVariant,
};
use rusqlite::{params, OptionalExtension};

impl FlowStore {
    // ── Variant ───────────────────────────────────────────────────

    pub fn variant_for_pair(
        &self,
        user_id: &str,
        subscription_id: &str,
    ) -> FlowResult<Option<DownsellVariant>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT downsell_variant FROM cancellations
                 WHERE user_id = ?1 AND subscription_id = ?2",
                params![user_id, subscription_id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|v| parse_variant(&v)).transpose()
    }

    /// Create the pair's row holding only the variant. No-op if it exists.
    pub fn insert_cancellation_stub(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
    ) -> FlowResult<()> {
        let now = now_rfc3339();
        self.conn.execute(
            "INSERT INTO cancellations (
                id, user_id, subscription_id, downsell_variant, completed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
            ON CONFLICT(user_id, subscription_id) DO NOTHING",
            params![
                uuid::Uuid::new_v4().to_string(),
                user_id,
                subscription_id,
                variant.as_str(),
                now,
            ],
        )?;
        Ok(())
    }

    // ── Incremental record ────────────────────────────────────────

    /// Partial-field merge: columns the patch leaves as `None` keep their
    /// stored value, and the stored variant always survives.
    pub fn merge_cancellation(
        &self,
        user_id: &str,
        subscription_id: &str,
        variant: DownsellVariant,
        patch: &CancellationPatch,
    ) -> FlowResult<()> {
        let now = now_rfc3339();
        // `completed` is NOT NULL, so its insert value is defaulted and the
        // update reads the raw parameter instead of `excluded`.
        // `reason_details` may be cleared, so ?14 says whether the patch sets it.
        self.conn.execute(
            "INSERT INTO cancellations (
                id, user_id, subscription_id, downsell_variant,
                survey_answers, feedback, accepted_downsell, has_immigration_lawyer,
                visa_type, reason, reason_details, completed,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, COALESCE(?12, 0), ?13, ?13)
            ON CONFLICT(user_id, subscription_id) DO UPDATE SET
                survey_answers         = COALESCE(excluded.survey_answers, cancellations.survey_answers),
                feedback               = COALESCE(excluded.feedback, cancellations.feedback),
                accepted_downsell      = COALESCE(excluded.accepted_downsell, cancellations.accepted_downsell),
                has_immigration_lawyer = COALESCE(excluded.has_immigration_lawyer, cancellations.has_immigration_lawyer),
                visa_type              = COALESCE(excluded.visa_type, cancellations.visa_type),
                reason                 = COALESCE(excluded.reason, cancellations.reason),
                reason_details         = CASE WHEN ?14 THEN excluded.reason_details
                                              ELSE cancellations.reason_details END,
                completed              = COALESCE(?12, cancellations.completed),
                updated_at             = excluded.updated_at",
            params![
                uuid::Uuid::new_v4().to_string(),
                user_id,
                subscription_id,
                variant.as_str(),
                patch.survey_answers,
                patch.feedback,
                patch.accepted_downsell.map(bool_to_sql),
                patch.has_immigration_lawyer.map(bool_to_sql),
                patch.visa_type,
                patch.reason,
                patch.reason_details.as_ref().and_then(|d| d.as_deref()),
                patch.completed.map(bool_to_sql),
                now,
                patch.reason_details.is_some(),
            ],
        )?;
        Ok(())
    }

    pub fn cancellation_for_pair(
        &self,
        user_id: &str,
        subscription_id: &str,
    ) -> FlowResult<Option<CancellationRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, subscription_id, downsell_variant,
                        survey_answers, feedback, accepted_downsell, has_immigration_lawyer,
                        visa_type, reason, reason_details, completed,
                        created_at, updated_at
                 FROM cancellations
                 WHERE user_id = ?1 AND subscription_id = ?2",
                params![user_id, subscription_id],
                |row| {
                    Ok((
                        row.get::<_, String>(3)?,
                        CancellationRecord {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            subscription_id: row.get(2)?,
                            downsell_variant: DownsellVariant::A, // replaced below
                            survey_answers: row.get(4)?,
                            feedback: row.get(5)?,
                            accepted_downsell: row.get::<_, Option<i64>>(6)?.map(|v| v != 0),
                            has_immigration_lawyer: row
                                .get::<_, Option<i64>>(7)?
                                .map(|v| v != 0),
                            visa_type: row.get(8)?,
                            reason: row.get(9)?,
                            reason_details: row.get(10)?,
                            completed: row.get::<_, i64>(11)? != 0,
                            created_at: row.get(12)?,
                            updated_at: row.get(13)?,
                        },
                    ))
                },
            )
            .optional()?;

        match row {
            Some((raw_variant, mut record)) => {
                record.downsell_variant = parse_variant(&raw_variant)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // ── Reporting ─────────────────────────────────────────────────

    pub fn cancellation_count(&self) -> FlowResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM cancellations", [], |row| row.get(0))?)
    }

    pub fn completed_cancellation_count(&self) -> FlowResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM cancellations WHERE completed = 1",
            [],
            |row| row.get(0),
        )?)
    }

    pub fn accepted_downsell_count(&self) -> FlowResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM cancellations WHERE accepted_downsell = 1",
            [],
            |row| row.get(0),
        )?)
    }

    /// Row count per stored variant, A then B.
    pub fn variant_split(&self) -> FlowResult<(i64, i64)> {
        Ok(self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN downsell_variant = 'A' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN downsell_variant = 'B' THEN 1 ELSE 0 END), 0)
             FROM cancellations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
    }
}

fn parse_variant(raw: &str) -> FlowResult<DownsellVariant> {
    raw.parse().map_err(|_| FlowError::CorruptRow {
        column: "cancellations.downsell_variant",
        value: raw.to_string(),
    })
}
