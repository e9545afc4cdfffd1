//! In-memory columnar tables
//!
//! A `Table` is a schema plus zero or more record batches. Stages consume
//! one table and produce a new one; nothing mutates a table in place.

use crate::error::{Result, RuntimeError};
use arrow::array::{new_null_array, ArrayRef, RecordBatch};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

/// Schema plus record batches
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn empty(schema: SchemaRef) -> Self {
        Self::new(schema, Vec::new())
    }

    pub fn from_batch(batch: RecordBatch) -> Self {
        Self::new(batch.schema(), vec![batch])
    }

    /// Build a table from named columns of equal length.
    pub fn from_columns(columns: Vec<(&str, ArrayRef)>) -> Result<Self> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));
        let arrays = columns.into_iter().map(|(_, array)| array).collect();
        Ok(Self::from_batch(RecordBatch::try_new(schema, arrays)?))
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }

    /// All rows as one batch.
    pub fn to_batch(&self) -> Result<RecordBatch> {
        Ok(concat_batches(&self.schema, &self.batches)?)
    }

    /// One column with all rows concatenated.
    pub fn column(&self, name: &str) -> Result<ArrayRef> {
        let index = self
            .schema
            .index_of(name)
            .map_err(|_| RuntimeError::ColumnNotFound(name.to_string()))?;
        Ok(self.to_batch()?.column(index).clone())
    }

    /// Approximate in-memory footprint in bytes.
    pub fn memory_size(&self) -> usize {
        self.batches
            .iter()
            .map(RecordBatch::get_array_memory_size)
            .sum()
    }

    /// The first `rows` rows.
    pub fn head(&self, rows: usize) -> Table {
        let mut remaining = rows;
        let mut batches = Vec::new();
        for batch in &self.batches {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.num_rows());
            batches.push(batch.slice(0, take));
            remaining -= take;
        }
        Table::new(self.schema.clone(), batches)
    }

    /// Copy of this table without the named column.
    pub fn drop_column(&self, name: &str) -> Result<Table> {
        let index = self
            .schema
            .index_of(name)
            .map_err(|_| RuntimeError::ColumnNotFound(name.to_string()))?;
        let keep: Vec<usize> = (0..self.num_columns()).filter(|i| *i != index).collect();
        let schema = Arc::new(self.schema.project(&keep)?);
        let batches = self
            .batches
            .iter()
            .map(|batch| batch.project(&keep))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Table::new(schema, batches))
    }
}

/// Union tables whose schemas may differ.
///
/// Per column the widest type wins, missing columns are null-filled and the
/// column order follows first appearance.
pub fn concat_relaxed(tables: Vec<Table>) -> Result<Table> {
    let mut fields: Vec<(String, DataType)> = Vec::new();
    for table in &tables {
        for field in table.schema().fields() {
            match fields.iter_mut().find(|(name, _)| name == field.name()) {
                Some((_, data_type)) => *data_type = widen(data_type, field.data_type()),
                None => fields.push((field.name().to_string(), field.data_type().clone())),
            }
        }
    }

    let schema: SchemaRef = Arc::new(Schema::new(
        fields
            .iter()
            .map(|(name, data_type)| Field::new(name.as_str(), data_type.clone(), true))
            .collect::<Vec<_>>(),
    ));

    let mut batches = Vec::new();
    for table in tables {
        let source = table.schema().clone();
        for batch in table.into_batches() {
            let rows = batch.num_rows();
            let columns = fields
                .iter()
                .map(|(name, data_type)| -> Result<ArrayRef> {
                    match source.index_of(name) {
                        Ok(index) => Ok(cast(batch.column(index), data_type)?),
                        Err(_) => Ok(new_null_array(data_type, rows)),
                    }
                })
                .collect::<Result<Vec<ArrayRef>>>()?;
            batches.push(RecordBatch::try_new(schema.clone(), columns)?);
        }
    }

    Ok(Table::new(schema, batches))
}

/// Smallest type both inputs convert into without loss of range.
fn widen(a: &DataType, b: &DataType) -> DataType {
    use DataType::*;

    if a == b {
        return a.clone();
    }
    match (a, b) {
        (Null, other) | (other, Null) => other.clone(),
        (x, y) if x.is_integer() && y.is_integer() => {
            let wx = x.primitive_width().unwrap_or(8);
            let wy = y.primitive_width().unwrap_or(8);
            match (x.is_signed_integer(), y.is_signed_integer()) {
                (true, true) => signed_of_width(wx.max(wy)),
                (false, false) => unsigned_of_width(wx.max(wy)),
                (true, false) => mixed_sign_of_width(wx.max(wy * 2)),
                (false, true) => mixed_sign_of_width((wx * 2).max(wy)),
            }
        }
        (Float32, y) | (y, Float32) if y.is_integer() && y.primitive_width() <= Some(2) => Float32,
        (x, y) if x.is_numeric() && y.is_numeric() => Float64,
        _ => Utf8,
    }
}

fn signed_of_width(bytes: usize) -> DataType {
    match bytes {
        1 => DataType::Int8,
        2 => DataType::Int16,
        4 => DataType::Int32,
        _ => DataType::Int64,
    }
}

/// Signed type holding both a signed and an unsigned input. No signed
/// integer covers `UInt64`, so that case falls back to `Float64`.
fn mixed_sign_of_width(bytes: usize) -> DataType {
    if bytes > 8 {
        DataType::Float64
    } else {
        signed_of_width(bytes)
    }
}

fn unsigned_of_width(bytes: usize) -> DataType {
    match bytes {
        1 => DataType::UInt8,
        2 => DataType::UInt16,
        4 => DataType::UInt32,
        _ => DataType::UInt64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        Array, AsArray, Float32Array, Int16Array, Int64Array, Int8Array, StringArray, UInt64Array,
    };
    use arrow::datatypes::{Float64Type, Int16Type};

    #[test]
    fn test_widen() {
        assert_eq!(widen(&DataType::Int8, &DataType::Int32), DataType::Int32);
        assert_eq!(widen(&DataType::UInt8, &DataType::Int8), DataType::Int16);
        assert_eq!(widen(&DataType::Int64, &DataType::Float32), DataType::Float64);
        assert_eq!(widen(&DataType::Int8, &DataType::Float32), DataType::Float32);
        assert_eq!(widen(&DataType::Float32, &DataType::Utf8), DataType::Utf8);
        assert_eq!(widen(&DataType::Null, &DataType::Utf8), DataType::Utf8);
        assert_eq!(widen(&DataType::UInt32, &DataType::Int64), DataType::Int64);
        assert_eq!(widen(&DataType::Int8, &DataType::UInt64), DataType::Float64);
        assert_eq!(widen(&DataType::UInt64, &DataType::Int64), DataType::Float64);
    }

    #[test]
    fn test_concat_relaxed_keeps_large_unsigned_values() {
        let signed = Table::from_columns(vec![("n", Arc::new(Int64Array::from(vec![-1])) as ArrayRef)])
            .unwrap();
        let unsigned = Table::from_columns(vec![(
            "n",
            Arc::new(UInt64Array::from(vec![u64::MAX])) as ArrayRef,
        )])
        .unwrap();

        let merged = concat_relaxed(vec![signed, unsigned]).unwrap().to_batch().unwrap();
        let values = merged.column(0).as_primitive::<Float64Type>();
        assert_eq!(values.value(0), -1.0);
        assert_eq!(values.value(1), u64::MAX as f64);
    }

    #[test]
    fn test_concat_relaxed_widens_and_fills() {
        let a = Table::from_columns(vec![
            ("case_id", Arc::new(Int8Array::from(vec![1, 2])) as ArrayRef),
            ("amount", Arc::new(Float32Array::from(vec![1.5, 2.5])) as ArrayRef),
        ])
        .unwrap();
        let b = Table::from_columns(vec![
            ("case_id", Arc::new(Int16Array::from(vec![300])) as ArrayRef),
            ("status", Arc::new(StringArray::from(vec!["A"])) as ArrayRef),
            ("amount", Arc::new(Int64Array::from(vec![7])) as ArrayRef),
        ])
        .unwrap();

        let merged = concat_relaxed(vec![a, b]).unwrap();
        assert_eq!(merged.column_names(), vec!["case_id", "amount", "status"]);
        assert_eq!(merged.num_rows(), 3);

        let batch = merged.to_batch().unwrap();
        assert_eq!(batch.column(0).as_primitive::<Int16Type>().value(2), 300);
        assert_eq!(batch.column(1).as_primitive::<Float64Type>().value(2), 7.0);
        assert_eq!(batch.column(2).null_count(), 2);
    }

    #[test]
    fn test_concat_relaxed_keeps_empty_schemas() {
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, true)]));
        let merged = concat_relaxed(vec![Table::empty(schema)]).unwrap();
        assert_eq!(merged.num_rows(), 0);
        assert!(merged.has_column("x"));
    }

    #[test]
    fn test_head_and_drop_column() {
        let table = Table::from_columns(vec![
            ("a", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
            ("b", Arc::new(Int64Array::from(vec![4, 5, 6])) as ArrayRef),
        ])
        .unwrap();
        assert_eq!(table.head(2).num_rows(), 2);
        let dropped = table.drop_column("a").unwrap();
        assert_eq!(dropped.column_names(), vec!["b"]);
        assert!(matches!(
            table.drop_column("zz"),
            Err(RuntimeError::ColumnNotFound(_))
        ));
    }
}
