//! Plain-text output of process matrices.
//!
//! The format is
//! ```text
//! <name>
//!
//! <t_final>
//!
//! [
//! 	[(re,im), (re,im), ...],
//! 	[(re,im), (re,im), ...]
//! ]
//! ```
//! with a blank line at the end. Entries are rounded to
//! `|ceil(log10(tolerance))| + 1` decimal places.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ Error, Result };

/// Number of decimal places kept for a given tolerance.
pub fn precision(tolerance: f64) -> Result<i32> {
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return Err(Error::InvalidParameter { name: "tolerance", value: tolerance });
    }
    Ok(tolerance.log10().ceil().abs() as i32 + 1)
}

fn round_to(x: f64, digits: i32) -> f64 {
    let scale = 10.0_f64.powi(digits);
    // + 0.0 turns -0.0 into 0.0
    (x * scale).round() / scale + 0.0
}

/// Render a process matrix in the text format above.
pub fn format_process_matrix(
    name: &str,
    t_final: f64,
    chi: &nd::Array2<C64>,
    tolerance: f64,
) -> Result<String>
{
    let digits = precision(tolerance)?;
    let rows: Vec<String>
        = chi.rows().into_iter()
        .map(|row| {
            let entries: Vec<String>
                = row.iter()
                .map(|z| {
                    format!(
                        "({:?},{:?})",
                        round_to(z.re, digits),
                        round_to(z.im, digits),
                    )
                })
                .collect();
            format!("[{}]", entries.join(", "))
        })
        .collect();
    Ok(format!(
        "{}\n\n{:?}\n\n[\n\t{}\n]\n\n",
        name, t_final, rows.join(",\n\t"),
    ))
}
