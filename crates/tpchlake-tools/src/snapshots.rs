//! Picking the two snapshots a change feed compares.

use duckdb::Connection;

use crate::error::{LakeError, Result};
use crate::session::LakeSession;

/// How many recent snapshots are considered.
pub const SNAPSHOT_WINDOW: usize = 10;

/// The pair of snapshot versions a change feed compares.
///
/// Discovery normally yields `from < to`. The fallback and single-end
/// overrides can produce the reverse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotRange {
    pub from: i64,
    pub to: i64,
}

/// Explicit versions supplied on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionOverrides {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// Most recent snapshot ids, newest first.
pub fn recent_snapshot_ids(conn: &Connection, alias: &str) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT snapshot_id FROM __ducklake_metadata_{}.ducklake_snapshot \
         ORDER BY snapshot_id DESC LIMIT {}",
        alias, SNAPSHOT_WINDOW
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<duckdb::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Choose the snapshot pair from `ids` (newest first).
///
/// The first two ids at which `table_visible` holds become `to` and `from`.
/// Missing ends fall back to the two newest ids.
pub fn select_range<F>(ids: &[i64], mut table_visible: F) -> Result<SnapshotRange>
where
    F: FnMut(i64) -> bool,
{
    if ids.len() < 2 {
        return Err(LakeError::NotEnoughSnapshots);
    }

    let mut to = None;
    let mut from = None;
    for &id in ids {
        if !table_visible(id) {
            continue;
        }
        if to.is_none() {
            to = Some(id);
        } else {
            from = Some(id);
            break;
        }
    }

    Ok(SnapshotRange {
        from: from.unwrap_or(ids[1]),
        to: to.unwrap_or(ids[0]),
    })
}

/// Resolve the range for `table`, honouring explicit overrides.
///
/// Discovery only runs when at least one end is not given.
pub fn resolve_range(
    session: &LakeSession,
    table: &str,
    overrides: VersionOverrides,
) -> Result<SnapshotRange> {
    if let (Some(from), Some(to)) = (overrides.from, overrides.to) {
        return Ok(SnapshotRange { from, to });
    }

    let ids = recent_snapshot_ids(session.connection(), session.alias())?;
    tracing::debug!(snapshots = ?ids, "Recent snapshots");

    let discovered = select_range(&ids, |id| {
        let probe = format!("SELECT COUNT(*) FROM {} AT (VERSION => {})", table, id);
        session
            .connection()
            .query_row(&probe, [], |row| row.get::<_, i64>(0))
            .is_ok()
    })?;

    let range = SnapshotRange {
        from: overrides.from.unwrap_or(discovered.from),
        to: overrides.to.unwrap_or(discovered.to),
    };
    if range.from > range.to {
        tracing::warn!(
            from = range.from,
            to = range.to,
            "Comparing a newer snapshot against an older one"
        );
    }
    Ok(range)
}
