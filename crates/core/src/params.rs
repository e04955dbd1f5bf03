//! Lenient typed lookups into a `serde_json::Value` override object.
//!
//! Missing keys and mistyped values fall back to the supplied default. These
//! helpers never fail, so a partly valid override object still yields a
//! usable configuration.

use serde_json::Value;

/// Reads a number as `f32`. Integers are accepted.
pub fn param_f32(params: &Value, name: &str, default: f32) -> f32 {
    params
        .get(name)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Reads a non-negative integer as `usize`.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Reads an integer in 0..=255 as `u8`.
pub fn param_u8(params: &Value, name: &str, default: u8) -> u8 {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(default)
}

/// Reads a two-element numeric array `[lo, hi]`.
///
/// Falls back to `default` unless both entries are numbers and `lo <= hi`.
pub fn param_range(params: &Value, name: &str, default: [f32; 2]) -> [f32; 2] {
    let Some(items) = params.get(name).and_then(Value::as_array) else {
        return default;
    };
    match items.as_slice() {
        [lo, hi] => match (lo.as_f64(), hi.as_f64()) {
            (Some(lo), Some(hi)) if lo <= hi => [lo as f32, hi as f32],
            _ => default,
        },
        _ => default,
    }
}
