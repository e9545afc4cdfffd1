//! Column type narrowing
//!
//! Shrinks every column of a table to the smallest representation that
//! holds its values without loss. The per-column survey is independent per
//! column and runs on the rayon pool; casts are applied afterwards in column
//! order.

use crate::error::Result;
use crate::table::Table;
use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute::{cast, max, min};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Narrowest signed integer type whose open range contains `[min, max]`.
pub fn narrowest_int(min: i64, max: i64) -> DataType {
    if min > i8::MIN as i64 && max < i8::MAX as i64 {
        DataType::Int8
    } else if min > i16::MIN as i64 && max < i16::MAX as i64 {
        DataType::Int16
    } else if min > i32::MIN as i64 && max < i32::MAX as i64 {
        DataType::Int32
    } else {
        DataType::Int64
    }
}

/// Target type for one column, or `None` to keep it.
fn plan_column(array: &ArrayRef) -> Result<Option<DataType>> {
    let current = array.data_type();
    let target = match current {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let wide = cast(array, &DataType::Int64)?;
            let values = wide.as_primitive::<Int64Type>();
            match (min(values), max(values)) {
                (Some(lo), Some(hi)) => Some(narrowest_int(lo, hi)),
                _ => Some(DataType::Int8),
            }
        }
        DataType::Float64 => {
            let values = array.as_primitive::<Float64Type>();
            let lossless = values
                .iter()
                .flatten()
                .all(|v| v.is_nan() || (v as f32) as f64 == v);
            lossless.then_some(DataType::Float32)
        }
        DataType::Boolean => Some(DataType::Int8),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => Some(DataType::Utf8),
        _ => None,
    };

    // Signed integers never widen.
    Ok(target.filter(|t| {
        t != current
            && !(current.is_signed_integer() && t.primitive_width() >= current.primitive_width())
    }))
}

fn apply_plan(array: &ArrayRef, target: &DataType) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Date64 | DataType::Timestamp(_, _) if *target == DataType::Utf8 => {
            let days = cast(array, &DataType::Date32)?;
            Ok(cast(&days, target)?)
        }
        _ => Ok(cast(array, target)?),
    }
}

/// Narrow every column of `table`. The result holds a single batch.
pub fn narrow(table: Table) -> Result<Table> {
    let before = table.memory_size();
    let batch = table.to_batch()?;
    drop(table);

    let columns = batch.columns();
    let plans: Vec<Option<DataType>> = (0..columns.len())
        .into_par_iter()
        .map(|i| plan_column(&columns[i]))
        .collect::<Result<Vec<_>>>()?;

    let schema = batch.schema();
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays = Vec::with_capacity(columns.len());
    for ((field, array), plan) in schema.fields().iter().zip(columns).zip(&plans) {
        match plan {
            Some(target) => {
                arrays.push(apply_plan(array, target)?);
                fields.push(Field::new(field.name(), target.clone(), field.is_nullable()));
            }
            None => {
                arrays.push(array.clone());
                fields.push(field.as_ref().clone());
            }
        }
    }

    let narrowed = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    let after = narrowed.get_array_memory_size();
    debug!(
        columns = plans.len(),
        changed = plans.iter().filter(|p| p.is_some()).count(),
        "memory usage {:.4} MB -> {:.4} MB",
        megabytes(before),
        megabytes(after)
    );

    Ok(Table::from_batch(narrowed))
}

fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
