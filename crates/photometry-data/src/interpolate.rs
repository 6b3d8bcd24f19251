use crate::PhotometricDistribution;

/// Indices of the table entries bracketing `target`.
///
/// Queries outside the table clamp to the nearest end (`low == high`); there
/// is no wraparound between the last and first horizontal plane.
fn bracket(angles: &[f64], target: f64) -> (usize, usize) {
    let last = angles.len() - 1;
    if target <= angles[0] {
        return (0, 0);
    }
    if target >= angles[last] {
        return (last, last);
    }
    angles
        .windows(2)
        .position(|pair| target >= pair[0] && target <= pair[1])
        .map_or((last, last), |i| (i, i + 1))
}

/// Fractional position of `target` between `low` and `high`, in [0, 1].
fn fraction(target: f64, low: f64, high: f64) -> f64 {
    let span = high - low;
    let span = if span == 0.0 { 1.0 } else { span };
    ((target - low) / span).clamp(0.0, 1.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Candela toward (`horizontal_deg`, `vertical_deg`), bilinearly interpolated.
///
/// `vertical_deg` is measured from nadir. The horizontal angle is wrapped into
/// [0, 360) before lookup. Returns 0 when either angle table is empty; rows or
/// columns missing from a malformed table read as 0.
pub fn intensity(dist: &PhotometricDistribution, horizontal_deg: f64, vertical_deg: f64) -> f64 {
    let h_angles = &dist.horizontal_angles;
    let v_angles = &dist.vertical_angles;
    if h_angles.is_empty() || v_angles.is_empty() {
        return 0.0;
    }

    let horizontal = horizontal_deg.rem_euclid(360.0);
    let (h_lo, h_hi) = bracket(h_angles, horizontal);
    let (v_lo, v_hi) = bracket(v_angles, vertical_deg);

    let at = |h: usize, v: usize| -> f64 {
        dist.candela
            .get(h)
            .and_then(|row| row.get(v))
            .copied()
            .unwrap_or(0.0)
    };

    let h_t = fraction(horizontal, h_angles[h_lo], h_angles[h_hi]);
    let v_t = fraction(vertical_deg, v_angles[v_lo], v_angles[v_hi]);

    // Along the horizontal axis at both vertical bounds, then vertically.
    let near = lerp(at(h_lo, v_lo), at(h_hi, v_lo), h_t);
    let far = lerp(at(h_lo, v_hi), at(h_hi, v_hi), h_t);
    lerp(near, far, v_t)
}
