//! Typed detail rows for each record kind.

use rusqlite::Row;
use serde::Serialize;
use serde_json::Value;

use super::{RecordId, RecordSource};
use crate::Result;

/// Non-conformance detail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NceFields {
    pub nce_id: RecordId,
    pub parent_id: Option<String>,
    pub opened_date: Option<String>,
    pub customer: Option<String>,
    pub part_number: Option<String>,
    pub part_revision: Option<String>,
    pub description: Option<String>,
    pub quantity_affected: Option<f64>,
    pub status: Option<String>,
}

impl NceFields {
    pub(crate) const COLUMNS: &'static str = "nce_id, parent_id, opened_date, customer, part_number, \
         part_revision, description, quantity_affected, status";

    fn from_row(id: RecordId, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            nce_id: id,
            parent_id: row.get("parent_id")?,
            opened_date: row.get("opened_date")?,
            customer: row.get("customer")?,
            part_number: row.get("part_number")?,
            part_revision: row.get("part_revision")?,
            description: row.get("description")?,
            quantity_affected: row.get("quantity_affected")?,
            status: row.get("status")?,
        })
    }
}

/// Material review board detail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MrbeFields {
    pub mrbe_id: RecordId,
    pub parent_id: Option<String>,
    pub opened_date: Option<String>,
    pub part_number: Option<String>,
    pub disposition: Option<String>,
    pub finding: Option<String>,
    pub quantity_rejected: Option<f64>,
    pub status: Option<String>,
}

impl MrbeFields {
    pub(crate) const COLUMNS: &'static str = "mrbe_id, parent_id, opened_date, part_number, \
         disposition, finding, quantity_rejected, status";

    fn from_row(id: RecordId, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            mrbe_id: id,
            parent_id: row.get("parent_id")?,
            opened_date: row.get("opened_date")?,
            part_number: row.get("part_number")?,
            disposition: row.get("disposition")?,
            finding: row.get("finding")?,
            quantity_rejected: row.get("quantity_rejected")?,
            status: row.get("status")?,
        })
    }
}

/// 8D investigation detail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EightDFields {
    pub eightd_id: RecordId,
    pub parent_id: Option<String>,
    pub related_records: Option<String>,
    pub opened_date: Option<String>,
    pub part_number: Option<String>,
    pub problem_statement: Option<String>,
    pub root_cause: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
}

impl EightDFields {
    pub(crate) const COLUMNS: &'static str = "eightd_id, parent_id, related_records, opened_date, \
         part_number, problem_statement, root_cause, summary, status";

    fn from_row(id: RecordId, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            eightd_id: id,
            parent_id: row.get("parent_id")?,
            related_records: row.get("related_records")?,
            opened_date: row.get("opened_date")?,
            part_number: row.get("part_number")?,
            problem_statement: row.get("problem_statement")?,
            root_cause: row.get("root_cause")?,
            summary: row.get("summary")?,
            status: row.get("status")?,
        })
    }
}

/// Detail for one record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawFields {
    Nce(NceFields),
    Mrbe(MrbeFields),
    EightD(EightDFields),
}

impl RawFields {
    /// Decode a base-table row of the given kind. The primary key must already be valid.
    pub(crate) fn from_row(source: RecordSource, id: RecordId, row: &Row<'_>) -> rusqlite::Result<Self> {
        match source {
            RecordSource::Nce => NceFields::from_row(id, row).map(RawFields::Nce),
            RecordSource::Mrbe => MrbeFields::from_row(id, row).map(RawFields::Mrbe),
            RecordSource::EightD => EightDFields::from_row(id, row).map(RawFields::EightD),
        }
    }

    pub(crate) fn columns(source: RecordSource) -> &'static str {
        match source {
            RecordSource::Nce => NceFields::COLUMNS,
            RecordSource::Mrbe => MrbeFields::COLUMNS,
            RecordSource::EightD => EightDFields::COLUMNS,
        }
    }

    pub fn source(&self) -> RecordSource {
        match self {
            RawFields::Nce(_) => RecordSource::Nce,
            RawFields::Mrbe(_) => RecordSource::Mrbe,
            RawFields::EightD(_) => RecordSource::EightD,
        }
    }

    pub fn record_id(&self) -> &RecordId {
        match self {
            RawFields::Nce(f) => &f.nce_id,
            RawFields::Mrbe(f) => &f.mrbe_id,
            RawFields::EightD(f) => &f.eightd_id,
        }
    }

    /// Identifying part field used in tree labels
    pub fn part_number(&self) -> Option<&str> {
        let part = match self {
            RawFields::Nce(f) => f.part_number.as_deref(),
            RawFields::Mrbe(f) => f.part_number.as_deref(),
            RawFields::EightD(f) => f.part_number.as_deref(),
        };
        part.map(str::trim).filter(|p| !p.is_empty())
    }

    /// Field map as a JSON value tree. Non-finite floats become `null`.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
