//! Graph build run log.

use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{QrgraphError, Result};
use crate::pipeline::GraphOutput;
use crate::records::RecordId;

/// What one build produced, as stored in `graph_runs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub node_count: usize,
    pub edge_count: usize,
    pub visited_count: usize,
    pub latency_ms: i64,
    pub error_message: Option<String>,
}

impl RunOutcome {
    pub fn from_result(result: &Result<GraphOutput>, latency_ms: i64) -> Self {
        match result {
            Ok(output) => Self {
                node_count: output.stats.nodes,
                edge_count: output.stats.edges,
                visited_count: output.stats.visited,
                latency_ms,
                error_message: None,
            },
            Err(e) => Self {
                latency_ms,
                error_message: Some(e.to_string()),
                ..Self::default()
            },
        }
    }

    pub fn success(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Insert one run row. Returns the generated run id (UUID).
pub fn insert_run(conn: &Connection, seeds: &[RecordId], outcome: &RunOutcome) -> Result<String> {
    let run_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now().to_rfc3339();
    let seeds_json = serde_json::to_string(seeds)?;

    conn.execute(
        r#"
        INSERT INTO graph_runs (
            run_id, timestamp, seeds_json, node_count, edge_count,
            visited_count, latency_ms, success, error_message
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            run_id,
            timestamp,
            seeds_json,
            outcome.node_count as i64,
            outcome.edge_count as i64,
            outcome.visited_count as i64,
            outcome.latency_ms,
            outcome.success(),
            outcome.error_message,
        ],
    )?;

    Ok(run_id)
}

/// Record a run on its own connection.
pub async fn record_run(db: &Db, seeds: &[RecordId], outcome: RunOutcome) -> Result<String> {
    let seeds = seeds.to_vec();
    db.with_connection(move |conn| insert_run(conn, &seeds, &outcome))
        .await
}

/// One row of the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run_id: String,
    pub timestamp: String,
    pub seeds_json: String,
    pub node_count: i64,
    pub edge_count: i64,
    pub latency_ms: i64,
    pub error_message: Option<String>,
}

impl RunRecord {
    pub fn success(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Most recent runs, newest first.
pub fn recent_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRecord>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, timestamp, seeds_json, node_count, edge_count, latency_ms, error_message \
         FROM graph_runs ORDER BY timestamp DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(RunRecord {
                run_id: row.get(0)?,
                timestamp: row.get(1)?,
                seeds_json: row.get(2)?,
                node_count: row.get(3)?,
                edge_count: row.get(4)?,
                latency_ms: row.get(5)?,
                error_message: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(QrgraphError::Database)?;
    Ok(rows)
}
