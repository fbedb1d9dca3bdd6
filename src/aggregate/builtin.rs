//! Built-in aggregate functions
//!
//! Each function takes two non-null values and returns `None` when the pair
//! is not of a type the function supports.

use crate::types::ColumnValue;

/// Numeric addition at the column's width; integers wrap on overflow.
pub fn sum(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  match (a, b) {
    (ColumnValue::Int32(x), ColumnValue::Int32(y)) => Some(ColumnValue::Int32(x.wrapping_add(*y))),
    (ColumnValue::Int64(x), ColumnValue::Int64(y)) => Some(ColumnValue::Int64(x.wrapping_add(*y))),
    (ColumnValue::Float32(x), ColumnValue::Float32(y)) => Some(ColumnValue::Float32(*x + *y)),
    (ColumnValue::Float64(x), ColumnValue::Float64(y)) => Some(ColumnValue::Float64(*x + *y)),
    _ => None,
  }
}

/// Addition of two shorts stored widened to Int32, wrapping at 16 bits.
pub fn sum_short(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  match (a, b) {
    (ColumnValue::Int32(x), ColumnValue::Int32(y)) => {
      let x = i16::try_from(*x).ok()?;
      let y = i16::try_from(*y).ok()?;
      Some(ColumnValue::Int32(x.wrapping_add(y) as i32))
    }
    _ => None,
  }
}

pub fn max(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  comparable(a, b)?;
  Some(if b > a { b.clone() } else { a.clone() })
}

pub fn min(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  comparable(a, b)?;
  Some(if b < a { b.clone() } else { a.clone() })
}

/// Larger of two single bytes read as signed.
pub fn max_byte(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  let (x, y) = (signed_byte(a)?, signed_byte(b)?);
  Some(if y > x { b.clone() } else { a.clone() })
}

/// Smaller of two single bytes read as signed.
pub fn min_byte(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  let (x, y) = (signed_byte(a)?, signed_byte(b)?);
  Some(if y < x { b.clone() } else { a.clone() })
}

fn signed_byte(value: &ColumnValue) -> Option<i8> {
  match value {
    ColumnValue::Binary(bytes) if bytes.len() == 1 => Some(bytes[0] as i8),
    _ => None,
  }
}

fn comparable(a: &ColumnValue, b: &ColumnValue) -> Option<()> {
  let column_type = a.column_type()?;
  (column_type.is_ordered() && b.column_type() == Some(column_type)).then_some(())
}

/// Set union; the result is sorted and free of duplicates.
pub fn union(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  match (a, b) {
    (ColumnValue::Utf8Set(x), ColumnValue::Utf8Set(y)) => {
      let mut merged = Vec::with_capacity(x.len() + y.len());
      merged.extend_from_slice(x);
      merged.extend_from_slice(y);
      merged.sort_unstable();
      merged.dedup();
      Some(ColumnValue::Utf8Set(merged))
    }
    _ => None,
  }
}

/// Per-key sum of two count maps. Keys found in only one map keep their count.
pub fn merge_frequency_maps(a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
  match (a, b) {
    (ColumnValue::CountMap(x), ColumnValue::CountMap(y)) => {
      let mut merged = x.clone();
      for (key, count) in y {
        merged
          .entry(key.clone())
          .and_modify(|existing| *existing = existing.wrapping_add(*count))
          .or_insert(*count);
      }
      Some(ColumnValue::CountMap(merged))
    }
    _ => None,
  }
}

/// Keep the first value.
pub fn first(a: &ColumnValue, _b: &ColumnValue) -> ColumnValue {
  a.clone()
}
