use once_cell::sync::Lazy;
use std::f32::consts::{PI, TAU};
use thiserror::Error;

use crate::api::FieldRun;

const LOOKUP_TABLE_SIZE: usize = 360;

/// Precomputed sine and cosine values for equally spaced angles around the circle.
static SIN_COS_TABLE: Lazy<[(f32, f32); LOOKUP_TABLE_SIZE]> = Lazy::new(|| {
    let mut arr = [(0.0f32, 0.0f32); LOOKUP_TABLE_SIZE];
    let step = TAU / LOOKUP_TABLE_SIZE as f32;
    for (i, slot) in arr.iter_mut().enumerate() {
        let angle = i as f32 * step;
        *slot = (angle.sin(), angle.cos());
    }
    arr
});

/// Fast sine and cosine using lookup table. Angle normalized via rem_euclid.
#[inline(always)]
pub fn fast_sin_cos(angle: f32) -> (f32, f32) {
    let frac = angle.rem_euclid(TAU) / TAU;
    let idx = ((frac * LOOKUP_TABLE_SIZE as f32) as usize) % LOOKUP_TABLE_SIZE;
    SIN_COS_TABLE[idx]
}

/// Brings an angle into the `(-PI, PI]` range.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

#[derive(Debug, Error, PartialEq)]
pub enum RunLengthError {
    #[error("decoded field holds {actual} cells, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("run {index} has a zero repeat count")]
    EmptyRun { index: usize },
}

/// Run-length encodes a row-major field buffer.
pub fn compress_field(data: &[f32]) -> Vec<FieldRun> {
    let mut runs: Vec<FieldRun> = Vec::new();
    for &value in data {
        match runs.last_mut() {
            Some(run) if run.value.to_bits() == value.to_bits() => run.count += 1,
            _ => runs.push(FieldRun { value, count: 1 }),
        }
    }
    runs
}

/// Expands runs back into a buffer of exactly `expected_len` cells.
///
/// The running total is checked before allocating so a corrupt count can't
/// blow up memory.
pub fn decompress_field(runs: &[FieldRun], expected_len: usize) -> Result<Vec<f32>, RunLengthError> {
    let mut total: usize = 0;
    for (index, run) in runs.iter().enumerate() {
        if run.count == 0 {
            return Err(RunLengthError::EmptyRun { index });
        }
        total = total.saturating_add(run.count as usize);
    }
    if total != expected_len {
        return Err(RunLengthError::LengthMismatch {
            expected: expected_len,
            actual: total,
        });
    }

    let mut data = Vec::with_capacity(expected_len);
    for run in runs {
        data.extend(std::iter::repeat(run.value).take(run.count as usize));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_sin_cos_accuracy() {
        let angles = [0.0, PI / 4.0, PI / 2.0, PI, -PI / 2.0, 2.5 * PI, 10.0 * PI];
        for &angle in &angles {
            let (fast_sin, fast_cos) = fast_sin_cos(angle);
            assert!(
                (fast_sin - angle.sin()).abs() < 0.02,
                "Sin value inaccurate for angle: {}",
                angle
            );
            assert!(
                (fast_cos - angle.cos()).abs() < 0.02,
                "Cos value inaccurate for angle: {}",
                angle
            );
        }
    }

    #[test]
    fn test_wrap_angle_range() {
        for &angle in &[0.0, PI, -PI, 3.0 * PI, -2.5 * PI, 7.0] {
            let wrapped = wrap_angle(angle);
            assert!(wrapped > -PI - 1e-5 && wrapped <= PI + 1e-5, "{} -> {}", angle, wrapped);
            assert!((wrapped.sin() - angle.sin()).abs() < 1e-4);
            assert!((wrapped.cos() - angle.cos()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_compress_field_merges_repeats() {
        let data = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let runs = compress_field(&data);
        assert_eq!(
            runs,
            vec![
                FieldRun { value: 0.0, count: 3 },
                FieldRun { value: 1.0, count: 2 },
                FieldRun { value: 0.0, count: 1 },
            ]
        );
        assert_eq!(decompress_field(&runs, data.len()).unwrap(), data.to_vec());
    }

    #[test]
    fn test_decompress_field_rejects_short_data() {
        let runs = [FieldRun { value: 2.0, count: 4 }];
        assert_eq!(
            decompress_field(&runs, 5),
            Err(RunLengthError::LengthMismatch { expected: 5, actual: 4 })
        );
    }

    #[test]
    fn test_decompress_field_rejects_empty_run() {
        let runs = [FieldRun { value: 2.0, count: 4 }, FieldRun { value: 1.0, count: 0 }];
        assert_eq!(decompress_field(&runs, 4), Err(RunLengthError::EmptyRun { index: 1 }));
    }
}
