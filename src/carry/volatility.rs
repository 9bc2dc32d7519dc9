//! Volatility estimator
//!
//! Blended short/long rolling standard deviation of simple daily returns of
//! the front contract:
//!
//! `daily_std = w_s * std_30(r) + w_l * std_2560(r)`, `r[t] = p[t]/p[t-1] - 1`
//!
//! A window only produces a value when every row in it holds a defined
//! return, so the blended value stays `NaN` until the long window is full.
//! Weights are not renormalized during warm-up.

use crate::config::VolatilityConfig;

/// Simple percent returns. Row 0 has no predecessor and is `NaN`.
pub fn pct_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return out;
    }
    out.push(f64::NAN);
    for pair in prices.windows(2) {
        let r = pair[1] / pair[0] - 1.0;
        out.push(if r.is_finite() { r } else { f64::NAN });
    }
    out
}

/// Windowed sample variance with O(1) add/remove.
#[derive(Debug, Clone)]
struct WelfordWindow {
    n: usize,
    mean: f64,
    m2: f64,
}

impl WelfordWindow {
    fn new() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    #[inline]
    fn add(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    #[inline]
    fn remove(&mut self, x: f64) {
        self.n -= 1;
        if self.n == 0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let delta = x - self.mean;
        self.mean -= delta / self.n as f64;
        self.m2 -= delta * (x - self.mean);
    }

    #[inline]
    fn sample_std(&self) -> f64 {
        if self.n < 2 {
            return f64::NAN;
        }
        // Streaming removal can leave a tiny negative residue.
        (self.m2.max(0.0) / (self.n - 1) as f64).sqrt()
    }
}

/// Rolling sample standard deviation over `window` rows.
///
/// Output is `NaN` unless all `window` rows ending at `i` are defined. A
/// window of identical values yields exactly `0.0`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window < 2 {
        return out;
    }

    let mut acc = WelfordWindow::new();
    let mut equal_run = 0usize;

    for (i, &x) in values.iter().enumerate() {
        if x.is_finite() {
            acc.add(x);
            equal_run = if i > 0 && values[i - 1] == x { equal_run + 1 } else { 1 };
        } else {
            equal_run = 0;
        }

        if i >= window {
            let old = values[i - window];
            if old.is_finite() {
                acc.remove(old);
            }
        }

        if acc.n == window {
            out[i] = if equal_run >= window {
                0.0
            } else {
                acc.sample_std()
            };
        }
    }

    out
}

/// Blended daily standard deviation of front-contract returns.
pub fn blended_daily_std(front_prices: &[f64], config: &VolatilityConfig) -> Vec<f64> {
    let returns = pct_returns(front_prices);
    let short = rolling_std(&returns, config.short_window);
    let long = rolling_std(&returns, config.long_window);

    short
        .iter()
        .zip(long.iter())
        .map(|(s, l)| config.short_weight * s + config.long_weight * l)
        .collect()
}
