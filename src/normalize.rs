//! Field normalization
//!
//! Maps the raw `treatment` and `converted` columns onto the canonical `{0, 1}`
//! encoding in two phases:
//!
//! 1. **Coerce**: every cell becomes a [`Cell`], either a number or
//!    [`Cell::Unparseable`]. Nothing fails here.
//! 2. **Validate**: the whole column set is checked at once, so a single error
//!    names every offending column and row instead of the first bad cell.
//!
//! Rows are never dropped: silently losing observations would bias the
//! proportion test downstream.

use crate::arm::{Arm, CONVERTED_COLUMN, TREATMENT_COLUMN};
use crate::schema::validate_schema;
use crate::storage::ExperimentTable;
use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, LargeStringArray, RecordBatch,
    StringArray,
};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Fixed label map for the `treatment` column.
///
/// Only these spellings are recognized; anything else goes through numeric
/// coercion and fails closed.
pub const TREATMENT_LABELS: [(&str, f64); 4] = [
    ("control", 0.0),
    ("Control", 0.0),
    ("treatment", 1.0),
    ("Treatment", 1.0),
];

/// Outcome of coercing one raw cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    /// Successfully coerced value
    Value(f64),
    /// Null, NaN or text that is not a number
    Unparseable,
}

impl Cell {
    fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            Self::Unparseable
        } else {
            Self::Value(value)
        }
    }

    fn parse(text: &str) -> Self {
        text.trim()
            .parse::<f64>()
            .map_or(Self::Unparseable, Self::from_f64)
    }

    /// Canonical `{0, 1}` code, `None` for any other value
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn binary_code(self) -> Option<i64> {
        match self {
            Self::Value(v) if v == 0.0 => Some(0),
            Self::Value(v) if v == 1.0 => Some(1),
            _ => None,
        }
    }
}

/// Coerce an arbitrary Arrow column into cells.
///
/// `labels` is consulted for text values before numeric parsing.
///
/// # Errors
///
/// Returns error only if a successful cast produces an unexpected array type.
pub fn coerce_column(column: &ArrayRef, labels: &[(&str, f64)]) -> Result<Vec<Cell>> {
    let data_type = column.data_type();

    if *data_type == DataType::Boolean {
        let array = column
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| Error::Other("Failed to downcast to BooleanArray".to_string()))?;
        return Ok(array
            .iter()
            .map(|v| v.map_or(Cell::Unparseable, |b| Cell::Value(if b { 1.0 } else { 0.0 })))
            .collect());
    }

    if data_type.is_numeric() {
        let cast = compute::cast(column, &DataType::Float64)?;
        let array = cast
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))?;
        return Ok(array
            .iter()
            .map(|v| v.map_or(Cell::Unparseable, Cell::from_f64))
            .collect());
    }

    let map_text = |text: &str| {
        labels
            .iter()
            .find(|(label, _)| *label == text)
            .map_or_else(|| Cell::parse(text), |(_, code)| Cell::Value(*code))
    };

    if *data_type == DataType::LargeUtf8 {
        let array = column
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .ok_or_else(|| Error::Other("Failed to downcast to LargeStringArray".to_string()))?;
        return Ok(array
            .iter()
            .map(|v| v.map_or(Cell::Unparseable, map_text))
            .collect());
    }

    // Utf8, Utf8View, dictionaries, dates... anything arrow can render as text
    let Ok(text) = compute::cast(column, &DataType::Utf8) else {
        tracing::debug!(?data_type, "column type cannot be coerced");
        return Ok(vec![Cell::Unparseable; column.len()]);
    };
    let array = text
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Other("Failed to downcast to StringArray".to_string()))?;
    Ok(array
        .iter()
        .map(|v| v.map_or(Cell::Unparseable, map_text))
        .collect())
}

/// Experiment table whose `treatment` and `converted` columns are canonical.
///
/// Both columns are non-null `Int64` holding only `0` or `1`. Every other
/// column is carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    batch: RecordBatch,
    treatment: Int64Array,
    converted: Int64Array,
}

impl NormalizedTable {
    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of trial records
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Canonical treatment codes
    #[must_use]
    pub const fn treatment(&self) -> &Int64Array {
        &self.treatment
    }

    /// Canonical conversion flags
    #[must_use]
    pub const fn converted(&self) -> &Int64Array {
        &self.converted
    }

    /// Column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Iterate `(arm, converted)` pairs in row order
    pub fn observations(&self) -> impl Iterator<Item = (Arm, bool)> + '_ {
        self.treatment
            .values()
            .iter()
            .zip(self.converted.values().iter())
            .filter_map(|(&t, &c)| Arm::from_code(t).map(|arm| (arm, c == 1)))
    }

    /// Release the table for further processing
    #[must_use]
    pub fn into_table(self) -> ExperimentTable {
        ExperimentTable::new(self.batch)
    }
}

/// Normalize `treatment` and `converted` into canonical `{0, 1}` columns.
///
/// Applying this to an already-normalized table yields the same table.
///
/// # Errors
///
/// - [`Error::MissingColumns`] if either required column is absent
/// - [`Error::NonNumericData`] if any cell cannot be coerced to a number
/// - [`Error::NonBinaryData`] if a coerced value is not `0` or `1`
pub fn normalize(table: &ExperimentTable) -> Result<NormalizedTable> {
    validate_schema(table)?;
    let batch = table.batch();

    let treatment_cells = coerce_required(table, TREATMENT_COLUMN, &TREATMENT_LABELS)?;
    let converted_cells = coerce_required(table, CONVERTED_COLUMN, &[])?;

    // Phase 2: completeness over the whole defect set
    let mut bad_columns = Vec::new();
    let mut bad_rows = BTreeSet::new();
    for (name, cells) in [
        (TREATMENT_COLUMN, &treatment_cells),
        (CONVERTED_COLUMN, &converted_cells),
    ] {
        let before = bad_rows.len();
        let mut column_bad = false;
        for (row, cell) in cells.iter().enumerate() {
            if *cell == Cell::Unparseable {
                column_bad = true;
                bad_rows.insert(row);
            }
        }
        if column_bad {
            tracing::debug!(
                column = name,
                new_rows = bad_rows.len() - before,
                "unconvertible values"
            );
            bad_columns.push(name.to_string());
        }
    }
    if !bad_columns.is_empty() {
        return Err(Error::NonNumericData {
            columns: bad_columns,
            rows: bad_rows.into_iter().collect(),
        });
    }

    let treatment = to_binary(&treatment_cells);
    let converted = to_binary(&converted_cells);
    let non_binary: Vec<String> = [
        (TREATMENT_COLUMN, treatment.is_none()),
        (CONVERTED_COLUMN, converted.is_none()),
    ]
    .into_iter()
    .filter(|(_, bad)| *bad)
    .map(|(name, _)| name.to_string())
    .collect();
    let (Some(treatment), Some(converted)) = (treatment, converted) else {
        return Err(Error::NonBinaryData {
            columns: non_binary,
        });
    };

    let schema = batch.schema();
    let mut fields: Vec<Field> = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let replacement = match field.name().as_str() {
            TREATMENT_COLUMN => Some(&treatment),
            CONVERTED_COLUMN => Some(&converted),
            _ => None,
        };
        if let Some(array) = replacement {
            fields.push(
                field
                    .as_ref()
                    .clone()
                    .with_data_type(DataType::Int64)
                    .with_nullable(false),
            );
            columns.push(Arc::new(array.clone()));
        } else {
            fields.push(field.as_ref().clone());
            columns.push(column.clone());
        }
    }

    let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    let batch = RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::StorageError(format!("Failed to build normalized batch: {e}")))?;

    tracing::debug!(rows = batch.num_rows(), "normalized experiment table");
    Ok(NormalizedTable {
        batch,
        treatment,
        converted,
    })
}

fn coerce_required(
    table: &ExperimentTable,
    name: &str,
    labels: &[(&str, f64)],
) -> Result<Vec<Cell>> {
    let column = table.column(name).ok_or_else(|| Error::MissingColumns {
        columns: vec![name.to_string()],
    })?;
    coerce_column(column, labels)
}

fn to_binary(cells: &[Cell]) -> Option<Int64Array> {
    cells
        .iter()
        .map(|cell| cell.binary_code())
        .collect::<Option<Vec<i64>>>()
        .map(Int64Array::from)
}
