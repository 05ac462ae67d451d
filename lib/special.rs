//! Special functions needed to build closed-form correlation functions.

use num_complex::Complex64 as C64;

/// Euler-Mascheroni constant γ.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Crossover between the power series and the continued fraction.
const SERIES_MAX: f64 = 2.0;

const MAX_ITER: usize = 200;
const EPS: f64 = 1e-15;
const FPMIN: f64 = 1e-300;

/// Unnormalized sinc function, `sin(x) / x`, with `sinc(0) = 1`.
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-8 { 1.0 - x * x / 6.0 } else { x.sin() / x }
}

/// Cosine integral
/// ```text
/// Ci(x) = γ + ln(x) + \int_0^x (cos(t) - 1) / t dt
/// ```
/// evaluated at `|x|`. Returns negative infinity at zero.
pub fn cosine_integral(x: f64) -> f64 {
    let x = x.abs();
    if x == 0.0 {
        f64::NEG_INFINITY
    } else if x <= SERIES_MAX {
        ci_series(x)
    } else {
        ci_continued_fraction(x)
    }
}

// Ci(x) = γ + ln(x) + Σ_{k=1}^∞ (-1)^k x^{2k} / (2k (2k)!)
fn ci_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut sum: f64 = 0.0;
    // x^{2k} / (2k)!
    let mut fact: f64 = 1.0;
    let mut term: f64;
    for k in 1..=MAX_ITER {
        let m = (2 * k) as f64;
        fact *= -x2 / ((m - 1.0) * m);
        term = fact / m;
        sum += term;
        if term.abs() < EPS * sum.abs().max(FPMIN) { break; }
    }
    EULER_GAMMA + x.ln() + sum
}

// modified Lentz evaluation of E1(ix), from which
// Ci(x) = -Re[E1(ix)]
fn ci_continued_fraction(x: f64) -> f64 {
    let mut b = C64::new(1.0, x);
    let mut c = C64::from(1.0 / FPMIN);
    let mut d = b.inv();
    let mut h = d;
    let mut a: f64;
    let mut del: C64;
    for i in 2..=MAX_ITER {
        a = -(((i - 1) * (i - 1)) as f64);
        b += 2.0;
        d = (a * d + b).inv();
        c = b + a / c;
        del = c * d;
        h *= del;
        if (del.re - 1.0).abs() + del.im.abs() < EPS { break; }
    }
    h *= C64::new(x.cos(), -x.sin());
    -h.re
}
