const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const BETA_MAX_ITERATIONS: usize = 300;
const BETA_EPSILON: f64 = 3.0e-14;
const BETA_FLOOR: f64 = 1.0e-300;

pub struct Math {}
impl Math {
    pub fn mean(nums: &[f64]) -> Option<f64> {
        if nums.is_empty() {
            return None;
        }
        let sum: f64 = nums.iter().sum();
        Some(sum / nums.len() as f64)
    }

    /// population standard deviation
    pub fn standard_deviation(nums: &[f64]) -> Option<f64> {
        let mean = Math::mean(nums)?;
        let mut sum = 0.0;
        for num in nums {
            sum += (num - mean).powi(2);
        }

        Some((sum / nums.len() as f64).sqrt())
    }

    /// std divided by mean, `None` for fewer than two values or a zero mean
    pub fn coefficient_of_variation(nums: &[f64]) -> Option<f64> {
        if nums.len() < 2 {
            return None;
        }
        let mean = Math::mean(nums)?;
        if mean == 0.0 {
            return None;
        }
        Some(Math::standard_deviation(nums)? / mean.abs())
    }

    /// # ordinary least squares slope of `ys` over `xs`
    /// `None` when there are fewer than two points or every x is equal.
    pub fn linear_regression_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return None;
        }

        let mean_x = Math::mean(xs)?;
        let mean_y = Math::mean(ys)?;

        let mut covariance = 0.0;
        let mut variance_x = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            covariance += (x - mean_x) * (y - mean_y);
            variance_x += (x - mean_x).powi(2);
        }

        if variance_x == 0.0 {
            return None;
        }
        Some(covariance / variance_x)
    }

    /// # pearson correlation coefficient
    /// `None` when either series is constant or there are fewer than three
    /// paired values.
    pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
        if xs.len() != ys.len() || xs.len() < 3 {
            return None;
        }

        let mean_x = Math::mean(xs)?;
        let mean_y = Math::mean(ys)?;

        let mut covariance = 0.0;
        let mut variance_x = 0.0;
        let mut variance_y = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            covariance += (x - mean_x) * (y - mean_y);
            variance_x += (x - mean_x).powi(2);
            variance_y += (y - mean_y).powi(2);
        }

        if variance_x == 0.0 || variance_y == 0.0 {
            return None;
        }

        Some((covariance / (variance_x * variance_y).sqrt()).clamp(-1.0, 1.0))
    }

    /// # two sided p-value of a pearson coefficient
    /// uses student's t distribution with `samples - 2` degrees of freedom.
    pub fn pearson_p_value(r: f64, samples: usize) -> Option<f64> {
        if samples < 3 || !r.is_finite() {
            return None;
        }
        let degrees_of_freedom = (samples - 2) as f64;
        if r.abs() >= 1.0 {
            return Some(0.0);
        }

        let t = r * (degrees_of_freedom / (1.0 - r * r)).sqrt();
        let x = degrees_of_freedom / (degrees_of_freedom + t * t);
        Some(Math::regularized_incomplete_beta(degrees_of_freedom / 2.0, 0.5, x).clamp(0.0, 1.0))
    }

    /// # percentile rank of `value` in `population`
    /// `(less + 0.5 * equal) / n * 100`, 0 for an empty population
    pub fn percentile_rank(value: f64, population: &[f64]) -> f64 {
        if population.is_empty() {
            return 0.0;
        }

        let less = population.iter().filter(|other| **other < value).count() as f64;
        let equal = population.iter().filter(|other| **other == value).count() as f64;
        (less + 0.5 * equal) / population.len() as f64 * 100.0
    }

    /// lanczos approximation of ln(gamma(x))
    pub fn ln_gamma(x: f64) -> f64 {
        if x < 0.5 {
            let pi = std::f64::consts::PI;
            return (pi / (pi * x).sin()).ln() - Math::ln_gamma(1.0 - x);
        }

        let x = x - 1.0;
        let mut sum = LANCZOS_COEFFICIENTS[0];
        for (i, coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
            sum += coefficient / (x + i as f64);
        }
        let t = x + LANCZOS_G + 0.5;

        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
    }

    pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let front = (Math::ln_gamma(a + b) - Math::ln_gamma(a) - Math::ln_gamma(b)
            + a * x.ln()
            + b * (1.0 - x).ln())
        .exp();

        if x < (a + 1.0) / (a + b + 2.0) {
            front * Math::beta_continued_fraction(a, b, x) / a
        } else {
            1.0 - front * Math::beta_continued_fraction(b, a, 1.0 - x) / b
        }
    }

    // modified lentz evaluation
    fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
        let floor = |value: f64| if value.abs() < BETA_FLOOR { BETA_FLOOR } else { value };

        let mut c = 1.0;
        let mut d = 1.0 / floor(1.0 - (a + b) * x / (a + 1.0));
        let mut h = d;

        for m in 1..=BETA_MAX_ITERATIONS {
            let m = m as f64;
            let m2 = 2.0 * m;

            let even = m * (b - m) * x / ((a - 1.0 + m2) * (a + m2));
            d = 1.0 / floor(1.0 + even * d);
            c = floor(1.0 + even / c);
            h *= d * c;

            let odd = -(a + m) * (a + b + m) * x / ((a + m2) * (a + 1.0 + m2));
            d = 1.0 / floor(1.0 + odd * d);
            c = floor(1.0 + odd / c);
            let delta = d * c;
            h *= delta;

            if (delta - 1.0).abs() < BETA_EPSILON {
                break;
            }
        }

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn descriptive_statistics() {
        let laps = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(Math::mean(&laps), Some(5.0));
        assert_eq!(Math::standard_deviation(&laps), Some(2.0));
        assert_eq!(Math::coefficient_of_variation(&laps), Some(0.4));

        assert_eq!(Math::mean(&[]), None);
        assert_eq!(Math::standard_deviation(&[]), None);
        assert_eq!(Math::coefficient_of_variation(&[3.0]), None);
    }

    #[test]
    fn regression_slope() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [10.0, 9.5, 9.0, 8.5];
        assert!(close(Math::linear_regression_slope(&xs, &ys).unwrap(), -0.5, 1e-12));
        assert_eq!(Math::linear_regression_slope(&[1.0, 1.0], &[2.0, 3.0]), None);
        assert_eq!(Math::linear_regression_slope(&[1.0], &[2.0]), None);
    }

    #[test]
    fn pearson_coefficient() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(Math::pearson(&xs, &[2.0, 4.0, 6.0, 8.0, 10.0]).unwrap(), 1.0, 1e-12));
        assert!(close(Math::pearson(&xs, &[5.0, 4.0, 3.0, 2.0, 1.0]).unwrap(), -1.0, 1e-12));
        assert_eq!(Math::pearson(&xs, &[3.0; 5]), None);
    }

    #[test]
    fn p_value_matches_t_table() {
        // t(8) = 2.306 is the two sided 5% critical value
        let p = Math::pearson_p_value(0.632, 10).unwrap();
        assert!(close(p, 0.05, 0.002), "p = {}", p);

        assert!(close(Math::pearson_p_value(0.0, 10).unwrap(), 1.0, 1e-9));
        assert_eq!(Math::pearson_p_value(1.0, 10), Some(0.0));
        assert_eq!(Math::pearson_p_value(0.5, 2), None);
    }

    #[test]
    fn ln_gamma_of_integers() {
        // gamma(5) = 24
        assert!(close(Math::ln_gamma(5.0), 24.0_f64.ln(), 1e-10));
        assert!(close(Math::ln_gamma(1.0), 0.0, 1e-10));
        // gamma(0.5) = sqrt(pi)
        assert!(close(Math::ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn percentile_rank_counts_ties_half() {
        let field = [0.1, 0.45, 0.45, 0.9];
        assert_eq!(Math::percentile_rank(0.1, &field), 12.5);
        assert_eq!(Math::percentile_rank(0.45, &field), 50.0);
        assert_eq!(Math::percentile_rank(1.0, &field), 100.0);
        assert_eq!(Math::percentile_rank(1.0, &[]), 0.0);
    }
}
