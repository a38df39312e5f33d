//! Null-aware aggregates over record rows, with SQL semantics: `None` values
//! are skipped and an aggregate over no values is `None`.

use std::collections::HashSet;

/// Arithmetic mean of the present values, or `None` if there are none.
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Number of distinct present values.
pub fn distinct_count<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> usize {
    values.into_iter().flatten().collect::<HashSet<_>>().len()
}

/// `count_if(predicate) / count(*)`; `None` when there are no rows.
pub fn ratio<T>(rows: &[T], predicate: impl Fn(&T) -> bool) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let matching = rows.iter().filter(|row| predicate(row)).count();
    Some(matching as f64 / rows.len() as f64)
}
