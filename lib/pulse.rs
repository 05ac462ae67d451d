//! Control pulse shapes.

use ndarray as nd;
use crate::error::{ Error, Result };

/// Build a trapezoidal control field with a given time-integrated area.
///
/// The field ramps linearly from zero up to `c_max` in increments of at most
/// `delta_c` per step, holds a plateau, and ramps back down to zero. The
/// plateau level is chosen (at or below `c_max`) so that
/// `Σ values[k] * delta_t == area` exactly.
///
/// Returns `(values, times)` on a uniform grid of spacing `delta_t`, with
/// `times.len() == values.len() + 1`, suitable for
/// [`NoiseProcess::set_control`][crate::noise::NoiseProcess::set_control].
///
/// Fails if any argument is not strictly positive, if `delta_c > c_max`, or
/// if `area` is smaller than the area under the two ramps alone.
pub fn max_field(area: f64, c_max: f64, delta_c: f64, delta_t: f64)
    -> Result<(nd::Array1<f64>, nd::Array1<f64>)>
{
    let check = |name: &'static str, value: f64| -> Result<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidParameter { name, value })
        }
    };
    check("area", area)?;
    check("c_max", c_max)?;
    check("delta_c", delta_c)?;
    check("delta_t", delta_t)?;
    let n = (c_max / delta_c).floor() as usize;
    if n == 0 {
        return Err(Error::InvalidParameter { name: "delta_c", value: delta_c });
    }
    let ramp_up: nd::Array1<f64> = nd::Array1::linspace(0.0, c_max, n + 1);
    let ramp_area = 2.0 * ramp_up.sum() * delta_t;
    let remaining = area - ramp_area;
    if remaining < 0.0 {
        return Err(Error::InvalidParameter { name: "area", value: area });
    }
    let n_plateau = (remaining / (c_max * delta_t)).ceil() as usize;
    let level
        = if n_plateau > 0 { remaining / (n_plateau as f64 * delta_t) } else { 0.0 };
    let values: nd::Array1<f64>
        = ramp_up.iter().copied()
        .chain(std::iter::repeat(level).take(n_plateau))
        .chain(ramp_up.iter().rev().copied())
        .collect();
    let n_values = values.len();
    let times: nd::Array1<f64>
        = (0..=n_values).map(|k| k as f64 * delta_t).collect();
    Ok((values, times))
}
