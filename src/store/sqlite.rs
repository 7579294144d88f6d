//! SQLite-backed record store.

use std::collections::{BTreeSet, HashMap, HashSet};

use rusqlite::{Connection, ToSql};

use super::{RecordStore, ViewFilters, ViewPredicate, ViewRow};
use crate::records::{parse_related_csv, RawFields, RecordId, RecordSource};
use crate::Result;

/// Stay well under SQLITE_MAX_VARIABLE_NUMBER for `IN (...)` lists
const DETAIL_CHUNK_SIZE: usize = 500;

/// Record store borrowing one connection for its whole lifetime.
pub struct SqliteRecordStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRecordStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

/// SQL form of the `"100.0"` -> `"100"` id canonicalization.
///
/// Strips a non-empty all-zero fraction after the first `.`. This is a superset of
/// what `RecordId::parse` strips, so rows are re-checked in Rust after the query.
fn canonical_id_sql(column: &str) -> String {
    let t = format!("trim({})", column);
    format!(
        "CASE WHEN instr({t}, '.') > 1 AND length({t}) > instr({t}, '.') \
         AND rtrim(substr({t}, instr({t}, '.') + 1), '0') = '' \
         THEN substr({t}, 1, instr({t}, '.') - 1) ELSE {t} END",
        t = t
    )
}

/// Build the view query and its positional parameters.
fn build_view_query(
    view: RecordSource,
    predicate: &ViewPredicate,
    filters: &ViewFilters<'_>,
) -> (String, Vec<Box<dyn ToSql>>) {
    let mut params: Vec<Box<dyn ToSql>> = vec![
        Box::new(predicate.id_equals.as_str().to_string()),
        Box::new(predicate.parent_id_equals.as_str().to_string()),
    ];
    let mut match_clause = format!(
        "{} = ? OR {} = ?",
        canonical_id_sql("record_id"),
        canonical_id_sql("parent_id")
    );

    if let Some(related) = predicate.related_contains.as_ref().filter(|_| view.supports_related()) {
        // Token match: ",301,302," contains ",301," (or ",301." for "301.0")
        let tokens = "',' || REPLACE(REPLACE(COALESCE(related_records, ''), ';', ','), ' ', '') || ','";
        match_clause.push_str(&format!(
            " OR instr({tokens}, ',' || ? || ',') > 0 OR instr({tokens}, ',' || ? || '.') > 0",
            tokens = tokens
        ));
        params.push(Box::new(related.as_str().to_string()));
        params.push(Box::new(related.as_str().to_string()));
    }

    let mut query = format!(
        "SELECT record_id, parent_id, related_records FROM {} WHERE ({})",
        view.view_name(),
        match_clause
    );

    if let Some(range) = filters.date_range {
        query.push_str(" AND date(opened_date) BETWEEN ? AND ?");
        params.push(Box::new(range.start().format("%Y-%m-%d").to_string()));
        params.push(Box::new(range.end().format("%Y-%m-%d").to_string()));
    }

    if let Some(revisions) = filters.part_revisions.filter(|_| view.honors_part_revisions()) {
        let placeholders = revisions.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        query.push_str(&format!(" AND part_revision IN ({})", placeholders));
        for rev in revisions {
            params.push(Box::new(rev.clone()));
        }
    }

    (query, params)
}

/// Exact predicate check on canonical ids.
fn row_matches(row: &ViewRow, predicate: &ViewPredicate) -> bool {
    row.child.as_ref() == Some(&predicate.id_equals)
        || row.parent.as_ref() == Some(&predicate.parent_id_equals)
        || predicate
            .related_contains
            .as_ref()
            .is_some_and(|id| row.related.contains(id))
}

impl RecordStore for SqliteRecordStore<'_> {
    fn query_view(
        &self,
        view: RecordSource,
        predicate: &ViewPredicate,
        filters: &ViewFilters<'_>,
    ) -> Result<Vec<ViewRow>> {
        let (query, params) = build_view_query(view, predicate, filters);

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (child, parent, related) = row?;
            let row = ViewRow {
                child: RecordId::parse_opt(child.as_deref()),
                parent: RecordId::parse_opt(parent.as_deref()),
                related: if view.supports_related() {
                    parse_related_csv(related.as_deref())
                } else {
                    BTreeSet::new()
                },
            };
            if row_matches(&row, predicate) {
                out.push(row);
            }
        }

        log::trace!("{} rows from {} for {}", out.len(), view.view_name(), predicate.id_equals);
        Ok(out)
    }

    fn fetch_detail(&self, ids: &[RecordId]) -> Result<HashMap<RecordId, RawFields>> {
        let mut detail: HashMap<RecordId, RawFields> = HashMap::new();

        for source in RecordSource::ALL {
            for chunk in ids.chunks(DETAIL_CHUNK_SIZE) {
                let wanted: HashSet<&RecordId> = chunk.iter().collect();
                let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let query = format!(
                    "SELECT {} FROM {} WHERE {} IN ({})",
                    RawFields::columns(source),
                    source.table_name(),
                    canonical_id_sql(source.primary_key()),
                    placeholders
                );

                let mut stmt = self.conn.prepare(&query)?;
                let mut rows = stmt.query(rusqlite::params_from_iter(chunk.iter().map(|id| id.as_str())))?;

                while let Some(row) = rows.next()? {
                    let raw_id: Option<String> = row.get(0)?;
                    let Some(id) = RecordId::parse_opt(raw_id.as_deref()) else {
                        continue;
                    };
                    if !wanted.contains(&id) {
                        continue;
                    }
                    if detail.contains_key(&id) {
                        log::debug!("Record {} exists in several kinds; keeping the first", id);
                        continue;
                    }
                    let fields = RawFields::from_row(source, id.clone(), row)?;
                    detail.insert(id, fields);
                }
            }
        }

        Ok(detail)
    }
}
