//! SQLite alert store
//!
//! One row per alert. The base table carries the identity and target
//! columns; tracking columns are added with additive nullable ALTERs so a
//! database created by an older build upgrades in place and in-flight rows
//! degrade gracefully.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};

use crate::domain::{Alert, AlertPatch, AlertTargets, NewAlert, Outcome, TpLevel};
use crate::ports::store::{AlertStore, OutcomeSummary, StoreError};

const CREATE_ALERTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        network TEXT NOT NULL,
        pool_address TEXT NOT NULL,
        token_name TEXT NOT NULL,
        entry_price REAL NOT NULL,
        stop_loss_price REAL NOT NULL,
        tp1_price REAL NOT NULL,
        tp2_price REAL NOT NULL,
        tp3_price REAL NOT NULL,
        created_at TEXT NOT NULL
    )";

// Tracking columns, all nullable, applied additively on every open.
const TRACKING_COLUMNS: &[(&str, &str)] = &[
    ("price_1h_after", "REAL"),
    ("price_2h_after", "REAL"),
    ("price_4h_after", "REAL"),
    ("price_24h_after", "REAL"),
    ("price_max_reached", "REAL"),
    ("price_min_reached", "REAL"),
    ("highest_tp_reached", "TEXT"),
    ("sl_hit", "INTEGER DEFAULT 0"),
    ("time_to_tp1", "REAL"),
    ("time_to_tp2", "REAL"),
    ("time_to_tp3", "REAL"),
    ("time_to_sl", "REAL"),
    ("is_closed", "INTEGER DEFAULT 0"),
    ("closed_at", "TEXT"),
    ("final_outcome", "TEXT"),
    ("final_gain_percent", "REAL"),
];

const ALERT_COLUMNS: &str = "
    id, network, pool_address, token_name,
    entry_price, stop_loss_price, tp1_price, tp2_price, tp3_price, created_at,
    price_1h_after, price_2h_after, price_4h_after, price_24h_after,
    price_max_reached, price_min_reached,
    highest_tp_reached, sl_hit,
    time_to_tp1, time_to_tp2, time_to_tp3, time_to_sl,
    is_closed, closed_at, final_outcome, final_gain_percent";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Alert table on SQLite, safe to share across tasks.
#[derive(Clone)]
pub struct SqliteAlertStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAlertStore {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_ALERTS_TABLE, [])?;
        for (name, column_type) in TRACKING_COLUMNS {
            ensure_column(&conn, name, column_type);
        }
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at)",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Connection("connection mutex poisoned".to_string()))
    }
}

/// Additive migration: add the column if it is not there yet. A duplicate
/// column error means the schema is already current.
fn ensure_column(conn: &Connection, name: &str, column_type: &str) {
    let sql = format!("ALTER TABLE alerts ADD COLUMN {} {}", name, column_type);
    if let Err(e) = conn.execute(&sql, []) {
        tracing::trace!("column {} already present: {}", name, e);
    }
}

fn encode_time(t: DateTime<Utc>) -> String {
    // Fixed precision keeps lexicographic order equal to chronological order.
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("bad timestamp '{}': {}", raw, e)))
}

fn row_to_alert(row: &Row<'_>) -> Result<Alert, StoreError> {
    let targets = AlertTargets::new(
        row.get::<_, f64>("entry_price")?,
        row.get::<_, f64>("stop_loss_price")?,
        row.get::<_, f64>("tp1_price")?,
        row.get::<_, f64>("tp2_price")?,
        row.get::<_, f64>("tp3_price")?,
    )?;

    let created_at = decode_time(&row.get::<_, String>("created_at")?)?;
    let closed_at = row
        .get::<_, Option<String>>("closed_at")?
        .map(|raw| decode_time(&raw))
        .transpose()?;

    let highest_tp = row.get::<_, Option<String>>("highest_tp_reached")?;
    let highest_tp_reached = TpLevel::from_stored(highest_tp.as_deref())?;

    let final_outcome = row
        .get::<_, Option<String>>("final_outcome")?
        .map(|raw| Outcome::from_stored(&raw))
        .transpose()?;

    Ok(Alert {
        id: row.get("id")?,
        network: row.get("network")?,
        pool_address: row.get("pool_address")?,
        token_name: row.get("token_name")?,
        targets,
        created_at,
        price_1h_after: row.get("price_1h_after")?,
        price_2h_after: row.get("price_2h_after")?,
        price_4h_after: row.get("price_4h_after")?,
        price_24h_after: row.get("price_24h_after")?,
        price_max_reached: row.get("price_max_reached")?,
        price_min_reached: row.get("price_min_reached")?,
        highest_tp_reached,
        sl_hit: row.get::<_, Option<bool>>("sl_hit")?.unwrap_or(false),
        time_to_tp1: row.get("time_to_tp1")?,
        time_to_tp2: row.get("time_to_tp2")?,
        time_to_tp3: row.get("time_to_tp3")?,
        time_to_sl: row.get("time_to_sl")?,
        is_closed: row.get::<_, Option<bool>>("is_closed")?.unwrap_or(false),
        closed_at,
        final_outcome,
        final_gain_percent: row.get("final_gain_percent")?,
    })
}

/// Build the SET clause and values for the fields a patch touches.
fn patch_assignments(patch: &AlertPatch) -> (Vec<&'static str>, Vec<Value>) {
    let mut columns = Vec::new();
    let mut values = Vec::new();

    let mut push_f64 = |column: &'static str, v: Option<f64>| {
        if let Some(v) = v {
            columns.push(column);
            values.push(Value::Real(v));
        }
    };
    push_f64("price_1h_after", patch.price_1h_after);
    push_f64("price_2h_after", patch.price_2h_after);
    push_f64("price_4h_after", patch.price_4h_after);
    push_f64("price_24h_after", patch.price_24h_after);
    push_f64("price_max_reached", patch.price_max_reached);
    push_f64("price_min_reached", patch.price_min_reached);
    push_f64("time_to_tp1", patch.time_to_tp1);
    push_f64("time_to_tp2", patch.time_to_tp2);
    push_f64("time_to_tp3", patch.time_to_tp3);
    push_f64("time_to_sl", patch.time_to_sl);
    push_f64("final_gain_percent", patch.final_gain_percent);

    if let Some(level) = patch.highest_tp_reached {
        columns.push("highest_tp_reached");
        values.push(match level.as_str() {
            Some(s) => Value::Text(s.to_string()),
            None => Value::Null,
        });
    }
    if let Some(hit) = patch.sl_hit {
        columns.push("sl_hit");
        values.push(Value::Integer(hit as i64));
    }
    if let Some(closed) = patch.is_closed {
        columns.push("is_closed");
        values.push(Value::Integer(closed as i64));
    }
    if let Some(at) = patch.closed_at {
        columns.push("closed_at");
        values.push(Value::Text(encode_time(at)));
    }
    if let Some(outcome) = patch.final_outcome {
        columns.push("final_outcome");
        values.push(Value::Text(outcome.as_str().to_string()));
    }

    (columns, values)
}

#[async_trait]
impl AlertStore for SqliteAlertStore {
    async fn insert(&self, alert: &NewAlert) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO alerts (
                network, pool_address, token_name,
                entry_price, stop_loss_price, tp1_price, tp2_price, tp3_price,
                created_at, sl_hit, is_closed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0)",
            params![
                alert.network,
                alert.pool_address,
                alert.token_name,
                alert.targets.entry_price,
                alert.targets.stop_loss_price,
                alert.targets.tp1_price,
                alert.targets.tp2_price,
                alert.targets.tp3_price,
                encode_time(alert.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Alert>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM alerts WHERE id = ?1", ALERT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => Ok(Some(row_to_alert(row)?)),
            None => Ok(None),
        }
    }

    async fn get_open_alerts(&self, max_age_hours: f64) -> Result<Vec<Alert>, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::seconds((max_age_hours * 3600.0) as i64);
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM alerts
             WHERE (is_closed IS NULL OR is_closed = 0) AND created_at >= ?1
             ORDER BY id",
            ALERT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![encode_time(cutoff)])?;

        let mut alerts = Vec::new();
        while let Some(row) = rows.next()? {
            alerts.push(row_to_alert(row)?);
        }
        Ok(alerts)
    }

    async fn get_expired_open_alerts(
        &self,
        horizon_hours: f64,
    ) -> Result<Vec<Alert>, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::seconds((horizon_hours * 3600.0) as i64);
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM alerts
             WHERE (is_closed IS NULL OR is_closed = 0) AND created_at < ?1
             ORDER BY id",
            ALERT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![encode_time(cutoff)])?;

        let mut alerts = Vec::new();
        while let Some(row) = rows.next()? {
            alerts.push(row_to_alert(row)?);
        }
        Ok(alerts)
    }

    async fn apply_patch(&self, id: i64, patch: &AlertPatch) -> Result<(), StoreError> {
        let (columns, mut values) = patch_assignments(patch);
        if columns.is_empty() {
            return Ok(());
        }

        let set_clause = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE alerts SET {} WHERE id = ?{}",
            set_clause,
            columns.len() + 1
        );
        values.push(Value::Integer(id));

        let conn = self.lock()?;
        let updated = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn outcome_summary(&self) -> Result<OutcomeSummary, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT final_outcome, COUNT(*) FROM alerts GROUP BY final_outcome")?;
        let mut rows = stmt.query([])?;

        let mut summary = OutcomeSummary::default();
        while let Some(row) = rows.next()? {
            let outcome: Option<String> = row.get(0)?;
            let count: u64 = row.get(1)?;
            match outcome.as_deref() {
                None => summary.open += count,
                Some(raw) => match Outcome::from_stored(raw)? {
                    Outcome::WinTp1 => summary.win_tp1 += count,
                    Outcome::WinTp2 => summary.win_tp2 += count,
                    Outcome::WinTp3 => summary.win_tp3 += count,
                    Outcome::LossSl => summary.loss_sl += count,
                    Outcome::Timeout => summary.timeout += count,
                },
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier;
    use tempfile::tempdir;

    fn new_alert(pool: &str, created_at: DateTime<Utc>) -> NewAlert {
        NewAlert {
            network: "eth".to_string(),
            pool_address: pool.to_string(),
            token_name: "PEPE".to_string(),
            targets: AlertTargets::new(1.0, 0.90, 1.05, 1.10, 1.15).unwrap(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let store = SqliteAlertStore::open_in_memory().unwrap();
        let created = Utc::now();
        let id = store.insert(&new_alert("0xpool", created)).await.unwrap();

        let alert = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(alert.id, id);
        assert_eq!(alert.network, "eth");
        assert_eq!(alert.token_name, "PEPE");
        assert_eq!(alert.targets.tp3_price, 1.15);
        assert_eq!(alert.highest_tp_reached, TpLevel::None);
        assert!(!alert.is_closed);
        assert!(alert.price_max_reached.is_none());
        // Microsecond precision survives the roundtrip
        assert!((alert.created_at - created).num_milliseconds().abs() < 2);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = SqliteAlertStore::open_in_memory().unwrap();
        assert!(store.get_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_touches_only_set_columns() {
        let store = SqliteAlertStore::open_in_memory().unwrap();
        let id = store
            .insert(&new_alert("0xpool", Utc::now()))
            .await
            .unwrap();

        let patch = AlertPatch {
            price_max_reached: Some(1.08),
            price_min_reached: Some(0.99),
            highest_tp_reached: Some(TpLevel::Tp1),
            time_to_tp1: Some(0.7),
            ..Default::default()
        };
        store.apply_patch(id, &patch).await.unwrap();

        let alert = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(alert.price_max_reached, Some(1.08));
        assert_eq!(alert.price_min_reached, Some(0.99));
        assert_eq!(alert.highest_tp_reached, TpLevel::Tp1);
        assert_eq!(alert.time_to_tp1, Some(0.7));
        assert!(alert.price_1h_after.is_none());
        assert!(!alert.is_closed);
    }

    #[tokio::test]
    async fn test_close_patch_persists_terminal_fields() {
        let store = SqliteAlertStore::open_in_memory().unwrap();
        let id = store
            .insert(&new_alert("0xpool", Utc::now()))
            .await
            .unwrap();

        let now = Utc::now();
        let patch = AlertPatch {
            sl_hit: Some(true),
            time_to_sl: Some(1.5),
            ..Default::default()
        }
        .close(Outcome::LossSl, -12.5, now);
        store.apply_patch(id, &patch).await.unwrap();

        let alert = store.get_by_id(id).await.unwrap().unwrap();
        assert!(alert.is_closed);
        assert!(alert.sl_hit);
        assert_eq!(alert.final_outcome, Some(Outcome::LossSl));
        assert_eq!(alert.final_gain_percent, Some(-12.5));
        assert!(alert.closed_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_patch_is_noop() {
        let store = SqliteAlertStore::open_in_memory().unwrap();
        let id = store
            .insert(&new_alert("0xpool", Utc::now()))
            .await
            .unwrap();
        store.apply_patch(id, &AlertPatch::new()).await.unwrap();
        // Even for a missing id: nothing to write, nothing to fail
        store.apply_patch(999, &AlertPatch::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_patch_missing_id_errors() {
        let store = SqliteAlertStore::open_in_memory().unwrap();
        let patch = AlertPatch {
            sl_hit: Some(true),
            ..Default::default()
        };
        let result = store.apply_patch(999, &patch).await;
        assert!(matches!(result, Err(StoreError::NotFound(999))));
    }

    #[tokio::test]
    async fn test_open_alerts_filters_closed_and_old() {
        let store = SqliteAlertStore::open_in_memory().unwrap();

        let fresh = store
            .insert(&new_alert("0xfresh", Utc::now()))
            .await
            .unwrap();
        let old = store
            .insert(&new_alert(
                "0xold",
                Utc::now() - chrono::Duration::hours(49),
            ))
            .await
            .unwrap();
        let closed = store
            .insert(&new_alert("0xclosed", Utc::now()))
            .await
            .unwrap();
        let close = AlertPatch::new().close(Outcome::WinTp3, 15.0, Utc::now());
        store.apply_patch(closed, &close).await.unwrap();

        let open = store.get_open_alerts(48.0).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, fresh);

        let expired = store.get_expired_open_alerts(48.0).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, old);
    }

    #[tokio::test]
    async fn test_additive_migration_upgrades_old_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.db");

        // A database created before any tracking columns existed
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(CREATE_ALERTS_TABLE, []).unwrap();
            conn.execute(
                "INSERT INTO alerts (network, pool_address, token_name,
                    entry_price, stop_loss_price, tp1_price, tp2_price, tp3_price, created_at)
                 VALUES ('bsc', '0xlegacy', 'OLD', 1.0, 0.9, 1.05, 1.1, 1.15, ?1)",
                params![encode_time(Utc::now())],
            )
            .unwrap();
        }

        let store = SqliteAlertStore::open(&path).unwrap();
        let open = store.get_open_alerts(48.0).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].pool_address, "0xlegacy");
        assert_eq!(open[0].highest_tp_reached, TpLevel::None);
        assert!(!open[0].is_closed);

        // Re-opening is harmless
        let _again = SqliteAlertStore::open(&path).unwrap();
    }

    #[tokio::test]
    async fn test_outcome_summary_counts() {
        let store = SqliteAlertStore::open_in_memory().unwrap();

        let a = store.insert(&new_alert("0xa", Utc::now())).await.unwrap();
        let b = store.insert(&new_alert("0xb", Utc::now())).await.unwrap();
        let _open = store.insert(&new_alert("0xc", Utc::now())).await.unwrap();

        store
            .apply_patch(a, &AlertPatch::new().close(Outcome::WinTp3, 15.0, Utc::now()))
            .await
            .unwrap();
        store
            .apply_patch(b, &AlertPatch::new().close(Outcome::LossSl, -10.0, Utc::now()))
            .await
            .unwrap();

        let summary = store.outcome_summary().await.unwrap();
        assert_eq!(summary.open, 1);
        assert_eq!(summary.win_tp3, 1);
        assert_eq!(summary.loss_sl, 1);
        assert_eq!(summary.closed(), 2);
        assert_eq!(summary.wins(), 1);
    }

    #[tokio::test]
    async fn test_classifier_patch_persists_through_store() {
        // Full write path: classify against the stored record, persist,
        // re-read, classify again - second patch must be empty.
        let store = SqliteAlertStore::open_in_memory().unwrap();
        let id = store
            .insert(&new_alert("0xpool", Utc::now()))
            .await
            .unwrap();

        let alert = store.get_by_id(id).await.unwrap().unwrap();
        let patch = classifier::classify(&alert, 1.06, 0.25, Utc::now());
        assert!(!patch.is_empty());
        store.apply_patch(id, &patch).await.unwrap();

        let alert = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(alert.highest_tp_reached, TpLevel::Tp1);

        let repeat = classifier::classify(&alert, 1.06, 0.25, Utc::now());
        assert!(repeat.is_empty());
    }
}
