use super::{bool_to_sql, FlowStore};
use crate::{error::FlowResult, event::TransitionLogEntry};
use rusqlite::params;

impl FlowStore {
    // ── Transition log ────────────────────────────────────────────

    pub fn insert_transition(&self, entry: &TransitionLogEntry) -> FlowResult<()> {
        self.conn.execute(
            "INSERT INTO flow_event_log (
                session_id, seq, from_step, to_step, event_type, payload, persisted, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.session_id,
                entry.seq as i64,
                entry.from_step,
                entry.to_step,
                entry.event_type,
                entry.payload,
                bool_to_sql(entry.persisted),
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn transitions_for_session(&self, session_id: &str) -> FlowResult<Vec<TransitionLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, seq, from_step, to_step, event_type, payload, persisted, created_at
             FROM flow_event_log WHERE session_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![session_id], |row| {
                Ok(TransitionLogEntry {
                    id: Some(row.get(0)?),
                    session_id: row.get(1)?,
                    seq: row.get::<_, i64>(2)? as u64,
                    from_step: row.get(3)?,
                    to_step: row.get(4)?,
                    event_type: row.get(5)?,
                    payload: row.get(6)?,
                    persisted: row.get::<_, i64>(7)? != 0,
                    created_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
