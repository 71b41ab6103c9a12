//! Feature engineering engine

use super::indicators::{log_momentum, macd, stochastic};
use super::schema::{Feature, FeatureSchema, N_FEATURES};
use crate::config::PipelineConfig;
use crate::data::PriceSeries;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Indicator values attached to one record. `None` inside a warm-up window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub momentum: Option<f64>,
    pub convergence_line: Option<f64>,
    pub convergence_signal: Option<f64>,
    pub fast_k: Option<f64>,
    pub fast_d: Option<f64>,
    pub slow_d: Option<f64>,
}

impl IndicatorSet {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Momentum => self.momentum,
            Feature::ConvergenceLine => self.convergence_line,
            Feature::ConvergenceSignal => self.convergence_signal,
            Feature::FastK => self.fast_k,
            Feature::FastD => self.fast_d,
            Feature::SlowD => self.slow_d,
        }
    }

    /// Values laid out per `schema`, or `None` if any is undefined
    pub fn to_vector(&self, schema: &FeatureSchema) -> Option<[f64; N_FEATURES]> {
        if schema.len() != N_FEATURES {
            return None;
        }
        let mut out = [0.0; N_FEATURES];
        for (slot, &feature) in out.iter_mut().zip(schema.features.iter()) {
            *slot = self.get(feature)?;
        }
        Some(out)
    }

    pub fn is_complete(&self) -> bool {
        self.momentum.is_some()
            && self.convergence_line.is_some()
            && self.convergence_signal.is_some()
            && self.fast_k.is_some()
            && self.fast_d.is_some()
            && self.slow_d.is_some()
    }
}

/// Window lengths of the three indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub momentum_window: usize,
    pub fast_ema_period: usize,
    pub slow_ema_period: usize,
    pub signal_period: usize,
    pub stochastic_k_period: usize,
    pub stochastic_d_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for IndicatorParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            momentum_window: config.momentum_window,
            fast_ema_period: config.fast_ema_period,
            slow_ema_period: config.slow_ema_period,
            signal_period: config.signal_period,
            stochastic_k_period: config.stochastic_k_period,
            stochastic_d_period: config.stochastic_d_period,
        }
    }
}

impl IndicatorParams {
    /// Index of the first record at which `feature` is defined
    pub fn warmup(&self, feature: Feature) -> usize {
        let long_ema = self.fast_ema_period.max(self.slow_ema_period);
        match feature {
            Feature::Momentum => self.momentum_window,
            Feature::ConvergenceLine => long_ema - 1,
            Feature::ConvergenceSignal => long_ema + self.signal_period - 2,
            Feature::FastK => self.stochastic_k_period - 1,
            Feature::FastD => self.stochastic_k_period + self.stochastic_d_period - 2,
            Feature::SlowD => self.stochastic_k_period + 2 * self.stochastic_d_period - 3,
        }
    }

    /// Records lost at the start of every series
    pub fn required_lookback(&self) -> usize {
        FeatureSchema::v1()
            .features
            .iter()
            .map(|&f| self.warmup(f))
            .max()
            .unwrap_or(0)
    }
}

/// Computes the indicator set of every record of a series
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Compute indicators; the output has one entry per bar.
    ///
    /// Fails if dates are not strictly ascending or if a volume that enters a
    /// momentum ratio is not positive.
    pub fn compute(&self, series: &PriceSeries) -> Result<Vec<IndicatorSet>> {
        let bars = series.bars();
        let n = bars.len();
        let p = &self.params;

        // `from_bars` and `repair` already order the bars; a deserialized
        // series has not been through either.
        for pair in bars.windows(2) {
            if pair[0].date >= pair[1].date {
                return Err(Error::UnorderedDates {
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }

        // A volume is used as numerator from index `window`, as denominator up to `n - window`.
        for (t, bar) in bars.iter().enumerate() {
            let in_ratio = t >= p.momentum_window || t + p.momentum_window < n;
            if in_ratio && bar.volume <= 0.0 {
                return Err(Error::NonPositiveVolume {
                    date: bar.date,
                    volume: bar.volume,
                });
            }
        }

        let closes = series.closes();
        let momentum = log_momentum(&series.volumes(), p.momentum_window);
        let convergence = macd(&closes, p.fast_ema_period, p.slow_ema_period, p.signal_period);
        let stoch = stochastic(
            &series.highs(),
            &series.lows(),
            &closes,
            p.stochastic_k_period,
            p.stochastic_d_period,
        );

        let sets: Vec<IndicatorSet> = (0..n)
            .map(|i| IndicatorSet {
                momentum: momentum[i],
                convergence_line: convergence.line[i],
                convergence_signal: convergence.signal[i],
                fast_k: stoch.fast_k[i],
                fast_d: stoch.fast_d[i],
                slow_d: stoch.slow_d[i],
            })
            .collect();

        debug!(
            records = n,
            complete = sets.iter().filter(|s| s.is_complete()).count(),
            "Computed indicators"
        );

        Ok(sets)
    }
}
