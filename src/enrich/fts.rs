//! FTS5 attachment search.

use std::collections::HashMap;

use rusqlite::{params, Connection};

use super::{AttachmentRef, AttachmentSource};
use crate::error::Result;
use crate::records::RecordId;

/// Map BM25 scores (negative, lower is better) to 0..1, higher is better.
pub fn normalize_bm25_score(raw_score: f64) -> f32 {
    if raw_score.is_nan() || raw_score.is_infinite() {
        return 0.0;
    }
    (1.0 / (1.0 + raw_score.exp())) as f32
}

/// Quote an id as a single FTS5 phrase so punctuation is not parsed as syntax.
fn phrase_query(id: &RecordId) -> String {
    format!("\"{}\"", id.as_str().replace('"', "\"\""))
}

/// Attachments whose owner id or text mentions the record id, ranked by BM25.
pub struct FtsAttachmentIndex<'c> {
    conn: &'c Connection,
}

impl<'c> FtsAttachmentIndex<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn search(&self, id: &RecordId, limit: usize) -> Result<Vec<AttachmentRef>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                attachment_id,
                file_name,
                snippet(attachments_fts, 3, '[', ']', '...', 12) AS snippet,
                bm25(attachments_fts) AS raw_score
            FROM attachments_fts
            WHERE attachments_fts MATCH ?1
            ORDER BY raw_score
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![phrase_query(id), limit as i64], |row| {
            Ok(AttachmentRef {
                attachment_id: row.get(0)?,
                file_name: row.get(1)?,
                snippet: row.get(2)?,
                score: normalize_bm25_score(row.get(3)?),
            })
        })?;

        let mut hits = Vec::new();
        for row in rows {
            hits.push(row?);
        }
        Ok(hits)
    }
}

impl AttachmentSource for FtsAttachmentIndex<'_> {
    fn fetch_attachments(&self, ids: &[RecordId], limit: usize) -> HashMap<RecordId, Vec<AttachmentRef>> {
        let mut out = HashMap::new();
        if limit == 0 {
            return out;
        }

        for id in ids {
            match self.search(id, limit) {
                Ok(hits) if !hits.is_empty() => {
                    out.insert(id.clone(), hits);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Attachment search failed for {}: {}", id, e),
            }
        }

        log::debug!("Attachment hits for {}/{} record(s)", out.len(), ids.len());
        out
    }
}
