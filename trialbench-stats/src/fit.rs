//! Scaling Fits
//!
//! Ordinary least squares over transformed coordinates:
//!
//! | model         | x        | y        | reads as                  |
//! |---------------|----------|----------|---------------------------|
//! | `power-law`   | log10(x) | log10(y) | y ≈ 10^b · x^slope        |
//! | `linear`      | x        | y        | y ≈ slope · x + b         |
//! | `exponential` | x        | log10(y) | y ≈ 10^b · 10^(slope · x) |
//!
//! Points whose transformed coordinates are not finite (non-positive values
//! under a logarithm, NaN, infinities) are dropped before fitting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of points for any fit
pub const MIN_FIT_POINTS: usize = 2;

/// Model relating a scaling parameter to a measured quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitModel {
    /// Straight line in log-log space; the slope is the scaling exponent
    PowerLaw,
    /// Straight line in linear space
    Linear,
    /// Straight line in semi-log space
    Exponential,
}

impl FitModel {
    /// Map a raw point into the space the model is linear in
    fn transform(self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (tx, ty) = match self {
            FitModel::PowerLaw => {
                if x <= 0.0 || y <= 0.0 {
                    return None;
                }
                (x.log10(), y.log10())
            }
            FitModel::Linear => (x, y),
            FitModel::Exponential => {
                if y <= 0.0 {
                    return None;
                }
                (x, y.log10())
            }
        };
        (tx.is_finite() && ty.is_finite()).then_some((tx, ty))
    }
}

impl std::fmt::Display for FitModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitModel::PowerLaw => write!(f, "power-law"),
            FitModel::Linear => write!(f, "linear"),
            FitModel::Exponential => write!(f, "exponential"),
        }
    }
}

impl std::str::FromStr for FitModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "power-law" | "powerlaw" | "log-log" => Ok(FitModel::PowerLaw),
            "linear" => Ok(FitModel::Linear),
            "exponential" | "semi-log" => Ok(FitModel::Exponential),
            _ => Err(format!("Unknown fit model: {}", s)),
        }
    }
}

/// Result of a fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Model the fit was computed under
    pub model: FitModel,
    /// Slope in the transformed space
    pub slope: f64,
    /// Intercept in the transformed space
    pub intercept: f64,
    /// Coefficient of determination; undefined when y has no spread
    pub r_squared: Option<f64>,
    /// Number of points that survived the transform
    pub points: usize,
}

impl FitResult {
    /// Predict y at `x` under the fitted model
    pub fn predict(&self, x: f64) -> f64 {
        match self.model {
            FitModel::PowerLaw => 10f64.powf(self.intercept) * x.powf(self.slope),
            FitModel::Linear => self.slope * x + self.intercept,
            FitModel::Exponential => 10f64.powf(self.intercept + self.slope * x),
        }
    }
}

/// Errors produced by fitting
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("Insufficient data: {points} usable point(s), need at least {required}")]
    InsufficientData { points: usize, required: usize },

    #[error("Fit is singular: all x values are equal")]
    Singular,

    #[error("Length mismatch: {xs} x values, {ys} y values")]
    LengthMismatch { xs: usize, ys: usize },
}

/// Fit `ys` against `xs` under `model`, requiring at least `min_points`
/// usable points (never fewer than two).
pub fn fit(
    xs: &[f64],
    ys: &[f64],
    model: FitModel,
    min_points: usize,
) -> Result<FitResult, FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }

    let required = min_points.max(MIN_FIT_POINTS);
    let (tx, ty): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter_map(|(&x, &y)| model.transform(x, y))
        .unzip();

    if tx.len() < required {
        return Err(FitError::InsufficientData {
            points: tx.len(),
            required,
        });
    }

    let (slope, intercept, r_squared) = least_squares(&tx, &ty)?;

    Ok(FitResult {
        model,
        slope,
        intercept,
        r_squared,
        points: tx.len(),
    })
}

/// Power-law (log-log) fit
pub fn fit_power_law(xs: &[f64], ys: &[f64]) -> Result<FitResult, FitError> {
    fit(xs, ys, FitModel::PowerLaw, MIN_FIT_POINTS)
}

/// Linear fit
pub fn fit_linear(xs: &[f64], ys: &[f64]) -> Result<FitResult, FitError> {
    fit(xs, ys, FitModel::Linear, MIN_FIT_POINTS)
}

/// Exponential (semi-log) fit
pub fn fit_exponential(xs: &[f64], ys: &[f64]) -> Result<FitResult, FitError> {
    fit(xs, ys, FitModel::Exponential, MIN_FIT_POINTS)
}

/// OLS on centered sums: returns `(slope, intercept, r²)`
fn least_squares(xs: &[f64], ys: &[f64]) -> Result<(f64, f64, Option<f64>), FitError> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let scale = xs.iter().fold(0.0f64, |acc, x| acc.max(x.abs())).max(1.0);
    // Spread at the rounding level of the mean counts as zero.
    if sxx <= (f64::EPSILON * scale).powi(2) * n {
        return Err(FitError::Singular);
    }

    let slope = sxy / sxx;
    if !slope.is_finite() {
        return Err(FitError::Singular);
    }
    let intercept = mean_y - slope * mean_x;

    let r_squared = if syy > 0.0 {
        let ss_res: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
            .sum();
        Some(1.0 - ss_res / syy)
    } else {
        None
    };

    Ok((slope, intercept, r_squared))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_law_recovers_exponent() {
        let xs = [10.0, 100.0, 1000.0];
        let ys = [5.0, 50.0, 500.0];
        let result = fit_power_law(&xs, &ys).unwrap();

        assert!((result.slope - 1.0).abs() < 1e-9);
        assert!((result.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(result.points, 3);
    }

    #[test]
    fn test_power_law_quadratic() {
        let xs = [2.0, 4.0, 8.0, 16.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x * x).collect();
        let result = fit_power_law(&xs, &ys).unwrap();

        assert!((result.slope - 2.0).abs() < 1e-9);
        assert!((result.intercept - 3f64.log10()).abs() < 1e-9);
        assert!((result.predict(32.0) - 3072.0).abs() < 1e-6);
    }

    #[test]
    fn test_scaling_y_shifts_intercept_only() {
        let xs = [10.0, 20.0, 40.0, 80.0];
        let ys = [1.0, 3.9, 17.0, 62.0];
        let scaled: Vec<f64> = ys.iter().map(|y| y * 7.0).collect();

        let base = fit_power_law(&xs, &ys).unwrap();
        let shifted = fit_power_law(&xs, &scaled).unwrap();

        assert!((base.slope - shifted.slope).abs() < 1e-9);
        assert!((shifted.intercept - base.intercept - 7f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn test_linear_fit() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let result = fit_linear(&xs, &ys).unwrap();

        assert!((result.slope - 2.0).abs() < 1e-12);
        assert!((result.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_fit() {
        // y = 4^-k, the Miller-Rabin error bound
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys: Vec<f64> = xs.iter().map(|k| 4f64.powf(-k)).collect();
        let result = fit_exponential(&xs, &ys).unwrap();

        assert!((result.slope + 4f64.log10()).abs() < 1e-9);
        assert!(result.intercept.abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_points_are_dropped() {
        let xs = [0.0, 10.0, 100.0, 1000.0];
        let ys = [1.0, 0.0, 50.0, 500.0];
        let result = fit_power_law(&xs, &ys).unwrap();

        assert_eq!(result.points, 2);
        assert!((result.slope - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_is_insufficient() {
        assert_eq!(
            fit_power_law(&[10.0], &[5.0]),
            Err(FitError::InsufficientData {
                points: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_all_points_filtered_is_insufficient() {
        let err = fit_power_law(&[1.0, 2.0], &[0.0, -1.0]).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { points: 0, .. }));
    }

    #[test]
    fn test_min_points_is_respected() {
        let err = fit(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], FitModel::Linear, 4).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientData {
                points: 3,
                required: 4
            }
        );
        // a request below two is raised to two
        assert!(fit(&[1.0, 2.0], &[1.0, 2.0], FitModel::Linear, 0).is_ok());
    }

    #[test]
    fn test_equal_x_is_singular() {
        assert_eq!(
            fit_linear(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]),
            Err(FitError::Singular)
        );
    }

    #[test]
    fn test_large_closely_spaced_x_is_not_singular() {
        let base = 1e6;
        let result = fit_linear(&[base, base + 1.0, base + 2.0], &[1.0, 2.0, 3.0]).unwrap();

        assert!((result.slope - 1.0).abs() < 1e-9);
        assert_eq!(result.points, 3);
    }

    #[test]
    fn test_flat_y_has_undefined_r_squared() {
        let result = fit_linear(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(result.slope, 0.0);
        assert!(result.r_squared.is_none());
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            fit_linear(&[1.0, 2.0], &[1.0]),
            Err(FitError::LengthMismatch { xs: 2, ys: 1 })
        );
    }

    #[test]
    fn test_model_parsing() {
        assert_eq!("power-law".parse::<FitModel>().unwrap(), FitModel::PowerLaw);
        assert_eq!(
            "Exponential".parse::<FitModel>().unwrap(),
            FitModel::Exponential
        );
        assert!("cubic".parse::<FitModel>().is_err());
        assert_eq!(FitModel::PowerLaw.to_string(), "power-law");
    }
}
