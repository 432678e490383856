//! crates/lesson_studio_core/src/timing.rs
//!
//! Keeps a section's per-line timing array aligned with its line count.
//!
//! Alignment is positional: entry `i` belongs to line `i`. Inserting a line in
//! the middle of the text shifts every later timing down by one slot. That is
//! the observed behaviour of the console and is kept as-is.

use serde::{Deserialize, Deserializer};
use std::borrow::Cow;

/// Reconciles `current` against `line_count`.
///
/// When the length already matches, `current` itself is returned borrowed, so
/// callers can detect "nothing changed" by pointer and skip a state update.
/// Otherwise a new array of exactly `line_count` entries is built, keeping
/// existing values by index and filling new slots with `0`.
pub fn normalize(current: Option<&[f64]>, line_count: usize) -> Cow<'_, [f64]> {
    if line_count == 0 {
        return Cow::Borrowed(&[]);
    }
    let current = current.unwrap_or_default();
    if current.len() == line_count {
        return Cow::Borrowed(current);
    }
    let aligned = (0..line_count)
        .map(|i| current.get(i).copied().map_or(0.0, read_seconds))
        .collect();
    Cow::Owned(aligned)
}

/// Applies [`normalize`] to an owned array. Returns `false` when the array was
/// left untouched.
pub fn sync_in_place(timings: &mut Vec<f64>, line_count: usize) -> bool {
    if timings.len() == line_count {
        return false;
    }
    for value in timings.iter_mut() {
        *value = read_seconds(*value);
    }
    timings.resize(line_count, 0.0);
    true
}

/// Non-finite entries read as zero.
fn read_seconds(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Serde helper accepting `null` entries (and a missing or `null` array) as zeros.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.map_or(0.0, read_seconds))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_lines_means_no_timings() {
        assert!(normalize(Some(&[1.0, 2.0][..]), 0).is_empty());
        assert!(normalize(None, 0).is_empty());
    }

    #[test]
    fn matching_length_returns_the_same_slice() {
        let current = vec![0.5, 1.25, 3.0];
        let out = normalize(Some(current.as_slice()), 3);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert!(std::ptr::eq(out.as_ptr(), current.as_ptr()));
    }

    #[test]
    fn grows_with_zeros_and_shrinks_by_truncation() {
        assert_eq!(&*normalize(Some(&[1.0][..]), 3), &[1.0, 0.0, 0.0]);
        assert_eq!(&*normalize(Some(&[1.0, 2.0, 3.0][..]), 2), &[1.0, 2.0]);
        assert_eq!(&*normalize(None, 2), &[0.0, 0.0]);
    }

    #[test]
    fn non_finite_entries_read_as_zero_when_realigned() {
        let out = normalize(Some(&[f64::NAN, 2.0, f64::INFINITY][..]), 4);
        assert_eq!(&*out, &[0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn mid_text_insertion_shifts_positionally() {
        // "a\nc" timed [1, 3]; inserting "b" between keeps slot order, not content.
        let out = normalize(Some(&[1.0, 3.0][..]), 3);
        assert_eq!(&*out, &[1.0, 3.0, 0.0]);
    }

    #[test]
    fn sync_in_place_reports_changes() {
        let mut timings = vec![1.0, 2.0];
        assert!(!sync_in_place(&mut timings, 2));
        assert!(sync_in_place(&mut timings, 3));
        assert_eq!(timings, vec![1.0, 2.0, 0.0]);
        assert!(sync_in_place(&mut timings, 0));
        assert!(timings.is_empty());
    }

    #[test]
    fn lenient_deserialization() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "deserialize_lenient")]
            t: Vec<f64>,
        }
        let h: Holder = serde_json::from_str(r#"{"t":[1.5,null,2]}"#).unwrap();
        assert_eq!(h.t, vec![1.5, 0.0, 2.0]);
        let h: Holder = serde_json::from_str(r#"{"t":null}"#).unwrap();
        assert!(h.t.is_empty());
        let h: Holder = serde_json::from_str(r#"{}"#).unwrap();
        assert!(h.t.is_empty());
    }
}
