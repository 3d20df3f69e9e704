//! Small vector helpers used by the node catalogue.

/// Euclidean length of `values`, accumulated in `f64`.
#[inline]
pub fn length(values: &[f32]) -> f32 {
    values
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt() as f32
}

/// Writes the unit vector of `input` into `output`.
///
/// Vectors whose length is at or below `cutoff` produce all zeros rather
/// than amplifying noise. Returns the input length.
pub fn normalise(input: &[f32], output: &mut [f32], cutoff: f32) -> f32 {
    let len = length(input);
    if len <= cutoff {
        output.iter_mut().for_each(|o| *o = 0.0);
    } else {
        for (o, &i) in output.iter_mut().zip(input) {
            *o = i / len;
        }
    }
    len
}

/// Clamps to the unit interval. NaN maps to 0.
#[inline]
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
