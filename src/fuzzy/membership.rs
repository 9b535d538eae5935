use serde::{Deserialize, Serialize};

/// Shape of a fuzzy set, evaluated in closed form at any scalar.
///
/// Values match a sampled-universe evaluation at the sample points exactly;
/// between samples the closed form is used instead of linear interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MembershipFunction {
    /// 0 below `a`, ramp up to `b`, 1 on `[b, c]`, ramp down to `d`, 0 above.
    Trapezoidal { a: f64, b: f64, c: f64, d: f64 },
    /// 0 at or below `a`, peak 1 at `b`, 0 at or above `c`.
    Triangular { a: f64, b: f64, c: f64 },
    /// Quadratic S-curve from 0 at `a` to 1 at `b`.
    SCurve { a: f64, b: f64 },
    /// Quadratic Z-curve from 1 at `a` to 0 at `b`.
    ZCurve { a: f64, b: f64 },
    /// `exp(-(x - mean)² / (2 sigma²))`
    Gaussian { mean: f64, sigma: f64 },
}

impl MembershipFunction {
    /// Degree of membership of `x`, always in `[0, 1]`. `NaN` maps to 0.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        let degree = match *self {
            MembershipFunction::Trapezoidal { a, b, c, d } => trapezoid(x, a, b, c, d),
            MembershipFunction::Triangular { a, b, c } => trapezoid(x, a, b, b, c),
            MembershipFunction::SCurve { a, b } => s_curve(x, a, b),
            MembershipFunction::ZCurve { a, b } => 1.0 - s_curve(x, a, b),
            MembershipFunction::Gaussian { mean, sigma } => {
                (-(x - mean).powi(2) / (2.0 * sigma * sigma)).exp()
            }
        };
        if degree.is_nan() {
            0.0
        } else {
            degree.clamp(0.0, 1.0)
        }
    }

    /// Check parameter ordering and finiteness.
    pub fn validate(&self) -> Result<(), String> {
        let params: Vec<f64> = match *self {
            MembershipFunction::Trapezoidal { a, b, c, d } => vec![a, b, c, d],
            MembershipFunction::Triangular { a, b, c } => vec![a, b, c],
            MembershipFunction::SCurve { a, b } | MembershipFunction::ZCurve { a, b } => {
                vec![a, b]
            }
            MembershipFunction::Gaussian { mean, sigma } => {
                if !mean.is_finite() || !sigma.is_finite() {
                    return Err(format!("{} parameters must be finite", self.kind()));
                }
                if sigma <= 0.0 {
                    return Err(format!(
                        "gaussian sigma must be > 0, got {}. Example: sigma = 15.0",
                        sigma
                    ));
                }
                return Ok(());
            }
        };

        if params.iter().any(|p| !p.is_finite()) {
            return Err(format!("{} parameters must be finite", self.kind()));
        }
        if params.windows(2).any(|w| w[0] > w[1]) {
            return Err(format!(
                "{} parameters must be non-decreasing, got {:?}",
                self.kind(),
                params
            ));
        }
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MembershipFunction::Trapezoidal { .. } => "trapezoidal",
            MembershipFunction::Triangular { .. } => "triangular",
            MembershipFunction::SCurve { .. } => "s_curve",
            MembershipFunction::ZCurve { .. } => "z_curve",
            MembershipFunction::Gaussian { .. } => "gaussian",
        }
    }
}

fn trapezoid(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if x < a || x > d {
        0.0
    } else if x >= b && x <= c {
        1.0
    } else if x < b {
        // a <= x < b, so b > a
        (x - a) / (b - a)
    } else {
        // c < x <= d, so d > c
        (d - x) / (d - c)
    }
}

fn s_curve(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        0.0
    } else if x >= b {
        1.0
    } else if x <= (a + b) / 2.0 {
        2.0 * ((x - a) / (b - a)).powi(2)
    } else {
        1.0 - 2.0 * ((x - b) / (b - a)).powi(2)
    }
}
