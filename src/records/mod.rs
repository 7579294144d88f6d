//! Record identifiers, record kinds, edge kinds and the per-run graph request.

mod fields;

pub use fields::{EightDFields, MrbeFields, NceFields, RawFields};

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::{QrgraphError, Result};

/// Canonical identifier of a quality record.
///
/// Only valid identifiers can be constructed: empty strings, the `-1` sentinel and
/// null-like spellings are rejected by [`RecordId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Parse and canonicalize a raw identifier. Returns `None` for invalid markers.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let canonical = strip_integral_fraction(trimmed);

        if canonical.is_empty() || canonical == "-1" {
            return None;
        }
        if ["none", "null", "nan"].iter().any(|m| canonical.eq_ignore_ascii_case(m)) {
            return None;
        }

        Some(RecordId(canonical.to_string()))
    }

    /// Parse an optional raw value (a nullable column).
    pub fn parse_opt(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "100.0" -> "100"; anything else is returned unchanged.
fn strip_integral_fraction(raw: &str) -> &str {
    if let Some((whole, frac)) = raw.split_once('.') {
        let digits = whole.strip_prefix('-').unwrap_or(whole);
        if !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !frac.is_empty()
            && frac.bytes().all(|b| b == b'0')
        {
            return whole;
        }
    }
    raw
}

fn related_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9 ._,;-]*$").expect("Invalid regex pattern"))
}

/// Split an 8D related-records field into identifiers.
///
/// Tokens are separated by `,` or `;`. A field with characters outside the id
/// alphabet is treated as malformed and contributes no related ids.
pub fn parse_related_csv(raw: Option<&str>) -> BTreeSet<RecordId> {
    let Some(raw) = raw else {
        return BTreeSet::new();
    };

    if !related_field_regex().is_match(raw) {
        log::warn!("Ignoring malformed related-records field: {:?}", raw);
        return BTreeSet::new();
    }

    raw.split([',', ';']).filter_map(RecordId::parse).collect()
}

/// The three record kinds, each backed by exactly one traversal view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RecordSource {
    #[serde(rename = "NCe")]
    Nce,
    #[serde(rename = "MRBe")]
    Mrbe,
    #[serde(rename = "8D")]
    EightD,
}

impl RecordSource {
    /// Query order used by traversal and detail fetch
    pub const ALL: [RecordSource; 3] = [RecordSource::Nce, RecordSource::Mrbe, RecordSource::EightD];

    pub fn label(self) -> &'static str {
        match self {
            RecordSource::Nce => "NCe",
            RecordSource::Mrbe => "MRBe",
            RecordSource::EightD => "8D",
        }
    }

    /// Traversal view exposing `record_id, parent_id, related_records, opened_date, part_revision`
    pub fn view_name(self) -> &'static str {
        match self {
            RecordSource::Nce => "v_nce",
            RecordSource::Mrbe => "v_mrbe",
            RecordSource::EightD => "v_8d",
        }
    }

    /// Base table carrying the kind-specific detail fields
    pub fn table_name(self) -> &'static str {
        match self {
            RecordSource::Nce => "nce_records",
            RecordSource::Mrbe => "mrbe_records",
            RecordSource::EightD => "eightd_records",
        }
    }

    pub fn primary_key(self) -> &'static str {
        match self {
            RecordSource::Nce => "nce_id",
            RecordSource::Mrbe => "mrbe_id",
            RecordSource::EightD => "eightd_id",
        }
    }

    /// Only 8D records cross-reference other records.
    pub fn supports_related(self) -> bool {
        matches!(self, RecordSource::EightD)
    }

    /// Only NCe records carry meaningful part-revision metadata.
    pub fn honors_part_revisions(self) -> bool {
        matches!(self, RecordSource::Nce)
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Relationship kind. Ordering (`Parent < Related < Root`) is the secondary tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Parent,
    Related,
    /// Synthetic self-loop keeping an isolated seed in the payload
    Root,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EdgeKind::Parent => "parent",
            EdgeKind::Related => "related",
            EdgeKind::Root => "root",
        })
    }
}

/// Inclusive opened-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(QrgraphError::InvalidInput(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Immutable description of one graph build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphRequest {
    seeds: Vec<RecordId>,
    date_range: Option<DateRange>,
    part_revisions: Option<Vec<String>>,
}

impl GraphRequest {
    /// Invalid seeds are dropped; duplicates collapse keeping first-seen order.
    pub fn new<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let seeds = seeds
            .into_iter()
            .filter_map(|s| RecordId::parse(s.as_ref()))
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Self {
            seeds,
            date_range: None,
            part_revisions: None,
        }
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Blank revisions are dropped; an empty list means "no revision filter".
    pub fn with_part_revisions<I, S>(mut self, revisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let revisions: Vec<String> = revisions
            .into_iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        self.part_revisions = if revisions.is_empty() { None } else { Some(revisions) };
        self
    }

    pub fn seeds(&self) -> &[RecordId] {
        &self.seeds
    }

    pub fn date_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    pub fn part_revisions(&self) -> Option<&[String]> {
        self.part_revisions.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> RecordId {
        RecordId::parse(s).unwrap()
    }

    #[test]
    fn test_invalid_markers_rejected() {
        for raw in ["", "   ", "-1", "-1.0", "None", "null", "NaN", "nan"] {
            assert!(RecordId::parse(raw).is_none(), "{:?} should be invalid", raw);
        }
        assert!(RecordId::parse_opt(None).is_none());
    }

    #[test]
    fn test_canonicalization() {
        assert_eq!(rid(" 100 ").as_str(), "100");
        assert_eq!(rid("100.0").as_str(), "100");
        assert_eq!(rid("100.00"), rid("100"));
        assert_eq!(rid("100.5").as_str(), "100.5");
        assert_eq!(rid("NCe-0042").as_str(), "NCe-0042");
    }

    #[test]
    fn test_parse_related_csv() {
        let related = parse_related_csv(Some("301, 302;303,,-1, None"));
        let ids: Vec<&str> = related.iter().map(|r| r.as_str()).collect();
        assert_eq!(ids, vec!["301", "302", "303"]);
    }

    #[test]
    fn test_parse_related_csv_malformed_is_empty() {
        assert!(parse_related_csv(Some("301, \"302")).is_empty());
        assert!(parse_related_csv(Some("301|302")).is_empty());
        assert!(parse_related_csv(None).is_empty());
    }

    #[test]
    fn test_source_capabilities() {
        assert!(RecordSource::EightD.supports_related());
        assert!(!RecordSource::Nce.supports_related());
        assert!(RecordSource::Nce.honors_part_revisions());
        assert!(!RecordSource::Mrbe.honors_part_revisions());
        assert!(!RecordSource::EightD.honors_part_revisions());
        assert_eq!(serde_json::to_string(&RecordSource::EightD).unwrap(), "\"8D\"");
        assert_eq!(serde_json::to_string(&EdgeKind::Related).unwrap(), "\"related\"");
    }

    #[test]
    fn test_request_normalization() {
        let req = GraphRequest::new(["100", "-1", "", "200", "100.0"])
            .with_part_revisions(["  ", ""]);
        assert_eq!(req.seeds(), &[rid("100"), rid("200")]);
        assert!(req.part_revisions().is_none());

        let req = req.with_part_revisions([" B "]);
        assert_eq!(req.part_revisions(), Some(&["B".to_string()][..]));
    }

    #[test]
    fn test_date_range_validation() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(DateRange::new(jan, feb).is_ok());
        assert!(DateRange::new(jan, jan).is_ok());
        assert!(matches!(DateRange::new(feb, jan), Err(QrgraphError::InvalidInput(_))));
    }
}
