//! Field Mapper
//!
//! Binds source columns to canonical fields. Header text is matched against
//! the alias table first; required fields that are still unbound get a second
//! chance through a value-shape probe on the first data row. Header matches
//! always take priority because the probe only looks at unbound columns.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::schema::{AliasTable, CanonicalField};

/// Column index to canonical field, plus the required fields that could not
/// be located.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    columns: BTreeMap<usize, CanonicalField>,
    missing: BTreeSet<CanonicalField>,
    probed: BTreeSet<CanonicalField>,
}

impl FieldMapping {
    pub fn columns(&self) -> &BTreeMap<usize, CanonicalField> {
        &self.columns
    }

    pub fn column_for(&self, field: CanonicalField) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, f)| **f == field)
            .map(|(col, _)| *col)
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.column_for(field).is_some()
    }

    /// Required fields with no column.
    pub fn missing(&self) -> &BTreeSet<CanonicalField> {
        &self.missing
    }

    /// Fields bound by the value-shape probe rather than header text.
    pub fn probed(&self) -> &BTreeSet<CanonicalField> {
        &self.probed
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// A field the pipeline fills some other way (e.g. composite split) is no
    /// longer missing.
    pub fn mark_supplied(&mut self, field: CanonicalField) {
        self.missing.remove(&field);
    }
}

/// Map a header row to canonical fields.
///
/// The leftmost column wins when two headers resolve to the same field.
pub fn map_fields(
    header: &[String],
    first_data_row: Option<&[String]>,
    aliases: &AliasTable,
) -> FieldMapping {
    let mut mapping = FieldMapping::default();
    let mut bound: BTreeSet<CanonicalField> = BTreeSet::new();

    for (idx, cell) in header.iter().enumerate() {
        let Some(field) = aliases.match_header(cell) else {
            continue;
        };
        if bound.insert(field) {
            mapping.columns.insert(idx, field);
        } else {
            debug!(column = idx, header = %cell, %field, "field already bound, column dropped");
        }
    }

    if let Some(row) = first_data_row {
        for field in CanonicalField::REQUIRED {
            if bound.contains(&field) {
                continue;
            }
            let Some(shape) = aliases.entry(field).and_then(|e| e.shape) else {
                continue;
            };
            let hit = row
                .iter()
                .enumerate()
                .find(|(idx, value)| !mapping.columns.contains_key(idx) && shape.accepts(value));
            if let Some((idx, value)) = hit {
                debug!(column = idx, value = %value, %field, "bound by value shape");
                mapping.columns.insert(idx, field);
                mapping.probed.insert(field);
                bound.insert(field);
            }
        }
    }

    for field in CanonicalField::REQUIRED {
        if !bound.contains(&field) {
            warn!(%field, "required field not found in header");
            mapping.missing.insert(field);
        }
    }

    mapping
}
