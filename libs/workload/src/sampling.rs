use std::f64::consts::PI;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use churn_api::OperationKind;

use crate::error::ConfigError;
use crate::faker::Faker;

// ═══════════════════════════════════════════════════════════════
//  Strategy
// ═══════════════════════════════════════════════════════════════

/// How one integer quantity (batch size or delay in ms) is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    /// `floor(u * (max - min + 1)) + min`.
    Uniform { min: i64, max: i64 },
    /// Box–Muller normal draw, rounded and clamped to `[min, max]`.
    Normal { mean: f64, stddev: f64, min: i64, max: i64 },
}

impl Strategy {
    pub fn bounds(&self) -> (i64, i64) {
        match *self {
            Strategy::Uniform { min, max } | Strategy::Normal { min, max, .. } => (min, max),
        }
    }

    pub fn sample(&self, faker: &mut dyn Faker) -> i64 {
        match *self {
            Strategy::Uniform { min, max } => uniform(faker.unit(), min, max),
            Strategy::Normal { mean, stddev, min, max } => {
                let u1 = open_unit(faker);
                let u2 = open_unit(faker);
                clamp_round(mean + stddev * box_muller(u1, u2), min, max)
            }
        }
    }

    /// `floor` is the smallest admissible lower bound (1 for batches,
    /// 0 for delays).
    pub fn validate(&self, what: &str, floor: i64) -> Result<(), ConfigError> {
        let (min, max) = self.bounds();
        if min > max {
            return Err(ConfigError::InvertedBounds { what: what.into(), min, max });
        }
        if min < floor {
            return Err(ConfigError::BelowFloor { what: what.into(), floor, min });
        }
        if let Strategy::Normal { stddev, .. } = *self {
            if !(stddev >= 0.0) {
                return Err(ConfigError::NegativeStddev { what: what.into(), stddev });
            }
        }
        Ok(())
    }
}

/// Uniform integer in `[min, max]` from `u ∈ [0, 1)`.
///
/// The span is computed in `i128`, so any `min <= max` pair is safe.
pub fn uniform(u: f64, min: i64, max: i64) -> i64 {
    let span = (i128::from(max) - i128::from(min) + 1) as f64;
    let offset = (u * span).floor() as i128;
    (i128::from(min) + offset).clamp(i128::from(min), i128::from(max)) as i64
}

/// Standard normal deviate from two independent uniforms in `(0, 1)`.
pub fn box_muller(u1: f64, u2: f64) -> f64 {
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Round to the nearest integer, then clamp to `[min, max]`.
pub fn clamp_round(raw: f64, min: i64, max: i64) -> i64 {
    if raw.is_nan() {
        return min;
    }
    (raw.round() as i64).clamp(min, max)
}

/// Draw in `(0, 1)`: `ln(0)` would be infinite.
fn open_unit(faker: &mut dyn Faker) -> f64 {
    loop {
        let u = faker.unit();
        if u > 0.0 {
            return u;
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  SamplingPolicy
// ═══════════════════════════════════════════════════════════════

/// Batch and delay strategies of one operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationSampling {
    pub batch: Strategy,
    /// Delay in milliseconds.
    pub delay: Strategy,
}

/// Размеры батчей и паузы между ними для каждого вида операции.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingPolicy {
    pub insert: OperationSampling,
    pub update: OperationSampling,
    pub delete: OperationSampling,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            insert: OperationSampling {
                batch: Strategy::Normal { mean: 5.0, stddev: 2.0, min: 1, max: 15 },
                delay: Strategy::Normal { mean: 200.0, stddev: 50.0, min: 100, max: 400 },
            },
            update: OperationSampling {
                batch: Strategy::Normal { mean: 3.0, stddev: 1.5, min: 1, max: 10 },
                delay: Strategy::Normal { mean: 300.0, stddev: 75.0, min: 150, max: 600 },
            },
            delete: OperationSampling {
                batch: Strategy::Normal { mean: 2.0, stddev: 1.0, min: 1, max: 8 },
                delay: Strategy::Normal { mean: 500.0, stddev: 100.0, min: 300, max: 800 },
            },
        }
    }
}

impl SamplingPolicy {
    /// Flat uniform draws, smaller batches than the default.
    pub fn uniform() -> Self {
        Self {
            insert: OperationSampling {
                batch: Strategy::Uniform { min: 1, max: 5 },
                delay: Strategy::Uniform { min: 100, max: 500 },
            },
            update: OperationSampling {
                batch: Strategy::Uniform { min: 1, max: 3 },
                delay: Strategy::Uniform { min: 200, max: 800 },
            },
            delete: OperationSampling {
                batch: Strategy::Uniform { min: 1, max: 2 },
                delay: Strategy::Uniform { min: 500, max: 1000 },
            },
        }
    }

    pub fn for_op(&self, op: OperationKind) -> &OperationSampling {
        match op {
            OperationKind::Insert => &self.insert,
            OperationKind::Update => &self.update,
            OperationKind::Delete => &self.delete,
        }
    }

    pub fn batch_size(&self, op: OperationKind, faker: &mut dyn Faker) -> usize {
        self.for_op(op).batch.sample(faker).max(1) as usize
    }

    pub fn delay(&self, op: OperationKind, faker: &mut dyn Faker) -> Duration {
        Duration::from_millis(self.for_op(op).delay.sample(faker).max(0) as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for op in OperationKind::ALL {
            let s = self.for_op(op);
            s.batch.validate(&format!("{op}.batch"), 1)?;
            s.delay.validate(&format!("{op}.delay"), 0)?;
        }
        Ok(())
    }
}
