//! Record store boundary: the three traversal views and bulk detail lookup.

mod sqlite;

pub use sqlite::SqliteRecordStore;

use std::collections::{BTreeSet, HashMap};

use crate::records::{DateRange, RawFields, RecordId, RecordSource};
use crate::Result;

/// Row predicate for one view query:
/// `id = candidate OR parent_id = candidate [OR related_records contains candidate]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPredicate {
    pub id_equals: RecordId,
    pub parent_id_equals: RecordId,
    /// Only meaningful for the 8D view
    pub related_contains: Option<RecordId>,
}

impl ViewPredicate {
    pub fn for_candidate(view: RecordSource, candidate: &RecordId) -> Self {
        Self {
            id_equals: candidate.clone(),
            parent_id_equals: candidate.clone(),
            related_contains: view.supports_related().then(|| candidate.clone()),
        }
    }
}

/// Optional row filters applied inside a view query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewFilters<'a> {
    pub date_range: Option<&'a DateRange>,
    pub part_revisions: Option<&'a [String]>,
}

impl<'a> ViewFilters<'a> {
    /// The date filter applies everywhere; the revision filter only to views that carry revisions.
    pub fn for_view(
        view: RecordSource,
        date_range: Option<&'a DateRange>,
        part_revisions: Option<&'a [String]>,
    ) -> Self {
        Self {
            date_range,
            part_revisions: part_revisions.filter(|_| view.honors_part_revisions()),
        }
    }
}

/// One relationship row returned by a view query.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    /// `None` when the row's own id is an invalid marker
    pub child: Option<RecordId>,
    pub parent: Option<RecordId>,
    /// Empty unless the row came from the 8D view
    pub related: BTreeSet<RecordId>,
}

/// Source of quality records.
pub trait RecordStore {
    /// Rows of `view` matching `predicate`, restricted by `filters`.
    fn query_view(
        &self,
        view: RecordSource,
        predicate: &ViewPredicate,
        filters: &ViewFilters<'_>,
    ) -> Result<Vec<ViewRow>>;

    /// Full detail for the given ids. Ids with no detail row are simply absent.
    fn fetch_detail(&self, ids: &[RecordId]) -> Result<HashMap<RecordId, RawFields>>;
}
