//! Technical indicators implementation
//!
//! Every indicator returns one value per input position. Positions inside a
//! warm-up window are `None` rather than NaN, so downstream code cannot
//! confuse "not enough history" with a computed value.

/// Simple Moving Average
///
/// Undefined unless every value in the trailing window is defined.
pub fn sma(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    for i in (period - 1)..values.len() {
        let window = &values[(i + 1 - period)..=i];
        let sum: Option<f64> = window.iter().copied().sum();
        result[i] = sum.map(|s| s / period as f64);
    }

    result
}

/// Exponential Moving Average
///
/// `EMA[t] = α·x[t] + (1 − α)·EMA[t − 1]` with `α = 2 / (period + 1)`, seeded
/// by the simple average of the first `period` defined values. Leading
/// undefined input shifts the seed; an undefined value after the seed ends
/// the series.
pub fn ema(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 {
        return result;
    }

    let Some(first) = values.iter().position(Option::is_some) else {
        return result;
    };
    let seed_end = first + period - 1;
    if seed_end >= values.len() {
        return result;
    }

    let seed: Option<f64> = values[first..=seed_end].iter().copied().sum();
    let Some(seed) = seed else {
        return result;
    };

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed / period as f64;
    result[seed_end] = Some(prev);

    for i in (seed_end + 1)..values.len() {
        match values[i] {
            Some(x) => {
                prev = alpha * x + (1.0 - alpha) * prev;
                result[i] = Some(prev);
            }
            None => break,
        }
    }

    result
}

/// Continuous rate of change: `ln(values[t] / values[t − period])`.
///
/// Undefined for the first `period` positions and wherever either operand
/// is not strictly positive.
pub fn log_momentum(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];

    for i in period..values.len() {
        let (now, then) = (values[i], values[i - period]);
        if now > 0.0 && then > 0.0 {
            result[i] = Some((now / then).ln());
        }
    }

    result
}

/// Convergence line and signal (MACD)
#[derive(Debug, Clone)]
pub struct MacdResult {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdResult {
    let closes: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    let ema_fast = ema(&closes, fast);
    let ema_slow = ema(&closes, slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal = ema(&line, signal);

    MacdResult { line, signal }
}

/// Stochastic Oscillator
#[derive(Debug, Clone)]
pub struct StochasticResult {
    /// %K
    pub fast_k: Vec<Option<f64>>,
    /// SMA of %K
    pub fast_d: Vec<Option<f64>>,
    /// SMA of %D
    pub slow_d: Vec<Option<f64>>,
}

/// `%K = 100 · (close − lowest low) / (highest high − lowest low)` over the
/// trailing `k_period` bars. A flat range leaves %K undefined.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticResult {
    let n = closes.len();
    let mut fast_k = vec![None; n];

    if k_period > 0 && n >= k_period && highs.len() == n && lows.len() == n {
        for i in (k_period - 1)..n {
            let start = i + 1 - k_period;
            let highest = highs[start..=i].iter().copied().fold(f64::MIN, f64::max);
            let lowest = lows[start..=i].iter().copied().fold(f64::MAX, f64::min);
            let range = highest - lowest;

            if range > 0.0 {
                fast_k[i] = Some(100.0 * (closes[i] - lowest) / range);
            }
        }
    }

    let fast_d = sma(&fast_k, d_period);
    let slow_d = sma(&fast_d, d_period);

    StochasticResult {
        fast_k,
        fast_d,
        slow_d,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn defined(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_sma() {
        let result = sma(&defined(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);

        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_relative_eq!(result[2].unwrap(), 2.0);
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_sma_window_with_gap_is_undefined() {
        let values = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let result = sma(&values, 3);

        assert!(result[2].is_none());
        assert!(result[3].is_none());
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_ema_seeded_by_sma() {
        let result = ema(&defined(&[2.0, 4.0, 6.0, 8.0]), 3);

        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_relative_eq!(result[2].unwrap(), 4.0);
        // alpha = 0.5
        assert_relative_eq!(result[3].unwrap(), 6.0);
    }

    #[test]
    fn test_ema_of_linear_series_lags_by_half_window() {
        let values: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let result = ema(&defined(&values), 7);

        for (t, v) in result.iter().enumerate() {
            if t < 6 {
                assert!(v.is_none());
            } else {
                assert_relative_eq!(v.unwrap(), t as f64 - 3.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_ema_skips_leading_undefined() {
        let values = vec![None, None, Some(1.0), Some(3.0), Some(5.0)];
        let result = ema(&values, 2);

        assert!(result[2].is_none());
        assert_relative_eq!(result[3].unwrap(), 2.0);
        assert!(result[4].is_some());
    }

    #[test]
    fn test_log_momentum() {
        let volumes = [100.0, 200.0, 400.0, 100.0];
        let result = log_momentum(&volumes, 2);

        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_relative_eq!(result[2].unwrap(), 4.0f64.ln());
        assert_relative_eq!(result[3].unwrap(), 0.5f64.ln());
    }

    #[test]
    fn test_macd_of_linear_close_is_constant() {
        let closes: Vec<f64> = (0..80).map(|i| 50.0 + i as f64).collect();
        let result = macd(&closes, 7, 30, 9);

        assert!(result.line[28].is_none());
        assert_relative_eq!(result.line[29].unwrap(), 11.5, epsilon = 1e-9);
        assert!(result.signal[36].is_none());
        assert_relative_eq!(result.signal[37].unwrap(), 11.5, epsilon = 1e-9);
    }

    #[test]
    fn test_stochastic_flat_range_is_undefined() {
        let flat = vec![10.0; 20];
        let result = stochastic(&flat, &flat, &flat, 14, 3);
        assert!(result.fast_k.iter().all(Option::is_none));
        assert!(result.slow_d.iter().all(Option::is_none));
    }

    #[test]
    fn test_stochastic_position_in_range() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();

        let result = stochastic(&highs, &lows, &closes, 14, 3);

        assert!(result.fast_k[12].is_none());
        assert_relative_eq!(result.fast_k[13].unwrap(), 100.0 * 14.0 / 15.0, epsilon = 1e-9);
        assert!(result.fast_d[14].is_none());
        assert!(result.fast_d[15].is_some());
        assert!(result.slow_d[16].is_none());
        assert_relative_eq!(result.slow_d[17].unwrap(), 100.0 * 14.0 / 15.0, epsilon = 1e-9);
    }
}
