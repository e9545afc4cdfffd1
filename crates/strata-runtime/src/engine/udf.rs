//! Scalar functions registered with every engine session

use arrow::array::{Array, AsArray, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use chrono::NaiveDate;
use datafusion::common::{DataFusionError, ScalarValue};
use datafusion::logical_expr::{create_udf, ColumnarValue, ScalarUDF, Volatility};
use std::sync::Arc;

/// Name of the day-number function.
pub const TO_DAYS: &str = "to_days";

/// `to_days(text) -> int64`: days since 1970-01-01 of a `YYYY-MM-DD`
/// prefix, null when the text does not start with a valid date.
pub fn to_days() -> ScalarUDF {
    create_udf(
        TO_DAYS,
        vec![DataType::Utf8],
        DataType::Int64,
        Volatility::Immutable,
        Arc::new(to_days_impl),
    )
}

fn to_days_impl(args: &[ColumnarValue]) -> datafusion::error::Result<ColumnarValue> {
    match args {
        [ColumnarValue::Scalar(scalar)] => {
            let days = match scalar {
                ScalarValue::Utf8(Some(text))
                | ScalarValue::LargeUtf8(Some(text))
                | ScalarValue::Utf8View(Some(text)) => parse_days(text),
                _ => None,
            };
            Ok(ColumnarValue::Scalar(ScalarValue::Int64(days)))
        }
        [ColumnarValue::Array(array)] => {
            let text = cast(array, &DataType::Utf8)?;
            let days: Int64Array = text
                .as_string::<i32>()
                .iter()
                .map(|value| value.and_then(parse_days))
                .collect();
            debug_assert_eq!(days.len(), array.len());
            Ok(ColumnarValue::Array(Arc::new(days)))
        }
        _ => Err(DataFusionError::Execution(format!(
            "{} expects exactly one argument, got {}",
            TO_DAYS,
            args.len()
        ))),
    }
}

/// Day number of the leading `YYYY-MM-DD` in `text`.
pub fn parse_days(text: &str) -> Option<i64> {
    let head = text.get(..10)?;
    let date = NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    Some(date.signed_duration_since(epoch).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::StringArray;

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_days("1970-01-02"), Some(1));
        assert_eq!(parse_days("2020-10-19"), Some(18554));
        assert_eq!(parse_days("2019-01-01T00:00:00"), parse_days("2019-01-01"));
        assert_eq!(parse_days("-01-01"), None);
        assert_eq!(parse_days("2019.0-01-01"), None);
    }

    #[test]
    fn test_array_input() {
        let input = ColumnarValue::Array(Arc::new(StringArray::from(vec![
            Some("1970-01-11"),
            None,
            Some("garbage"),
        ])));
        let ColumnarValue::Array(out) = to_days_impl(&[input]).unwrap() else {
            panic!("expected an array");
        };
        let out = out.as_primitive::<arrow::datatypes::Int64Type>();
        assert_eq!(out.value(0), 10);
        assert!(out.is_null(1));
        assert!(out.is_null(2));
    }

    #[test]
    fn test_scalar_input() {
        let input = ColumnarValue::Scalar(ScalarValue::Utf8(Some("1970-01-03".into())));
        match to_days_impl(&[input]).unwrap() {
            ColumnarValue::Scalar(ScalarValue::Int64(Some(days))) => assert_eq!(days, 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
