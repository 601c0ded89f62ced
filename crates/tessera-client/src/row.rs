//! Materialized row data.

use std::collections::BTreeMap;

use crate::chunk::WireCell;

/// Cells grouped by family name, then by column qualifier. Cells within a
/// column keep their arrival order.
pub(crate) type FamilyMap = BTreeMap<String, BTreeMap<Vec<u8>, Vec<Cell>>>;

/// One stored value together with its version timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    value: Vec<u8>,
    timestamp_micros: i64,
}

impl Cell {
    pub fn new(value: impl Into<Vec<u8>>, timestamp_micros: i64) -> Self {
        Self {
            value: value.into(),
            timestamp_micros,
        }
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn timestamp_micros(&self) -> i64 {
        self.timestamp_micros
    }
}

impl From<WireCell> for Cell {
    fn from(wire: WireCell) -> Self {
        Self {
            value: wire.value,
            timestamp_micros: wire.timestamp_micros,
        }
    }
}

/// A fully committed row: every cell the server sent for one row key.
///
/// Rows are only handed out once the stream commits them, so a `Row` never
/// exposes partially accumulated state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    row_key: Vec<u8>,
    families: FamilyMap,
}

impl Row {
    pub(crate) fn new(row_key: Vec<u8>, families: FamilyMap) -> Self {
        Self { row_key, families }
    }

    pub fn row_key(&self) -> &[u8] {
        &self.row_key
    }

    pub fn families(&self) -> &BTreeMap<String, BTreeMap<Vec<u8>, Vec<Cell>>> {
        &self.families
    }

    /// Cells for one column, or `None` if the row has no such column.
    pub fn cells(&self, family: &str, qualifier: &[u8]) -> Option<&[Cell]> {
        self.families
            .get(family)
            .and_then(|columns| columns.get(qualifier))
            .map(Vec::as_slice)
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn column_count(&self) -> usize {
        self.families.values().map(BTreeMap::len).sum()
    }

    pub fn cell_count(&self) -> usize {
        self.families
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// True for a row committed without any cell contents.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
