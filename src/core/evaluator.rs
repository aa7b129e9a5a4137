//! Threshold crossing detection
//!
//! Each subscription carries the set of thresholds it has already been
//! alerted on. A threshold fires the first time the derived value meets or
//! exceeds it and never again for that subscription, even if the value
//! falls back and re-crosses. Kinds are evaluated independently and a kind
//! whose value is unavailable this cycle is left untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ThresholdConfig;
use crate::core::derive::DerivedValues;

/// Bonding-curve progress at which a token leaves the launch venue
pub const GRADUATION_THRESHOLD: f64 = 100.0;

/// Metric a threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    BondingCurve,
    MarketCap,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::BondingCurve => write!(f, "bonding_curve"),
            AlertKind::MarketCap => write!(f, "market_cap"),
        }
    }
}

/// Process-wide ascending threshold sequences
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    bonding_curve: Vec<f64>,
    market_cap: Vec<f64>,
}

impl ThresholdSet {
    /// Build from validated configuration, adding the graduation threshold
    /// to the bonding-curve sequence when it is not configured explicitly.
    pub fn from_config(config: &ThresholdConfig) -> Self {
        let mut bonding_curve = config.bonding_curve.clone();
        if !bonding_curve.contains(&GRADUATION_THRESHOLD) {
            let at = bonding_curve.partition_point(|t| *t < GRADUATION_THRESHOLD);
            bonding_curve.insert(at, GRADUATION_THRESHOLD);
        }
        Self {
            bonding_curve,
            market_cap: config.market_cap.clone(),
        }
    }

    pub fn for_kind(&self, kind: AlertKind) -> &[f64] {
        match kind {
            AlertKind::BondingCurve => &self.bonding_curve,
            AlertKind::MarketCap => &self.market_cap,
        }
    }
}

/// Thresholds already alerted on, per kind. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertedThresholds {
    bonding_curve: Vec<f64>,
    market_cap: Vec<f64>,
}

impl AlertedThresholds {
    pub fn contains(&self, kind: AlertKind, threshold: f64) -> bool {
        self.for_kind(kind).contains(&threshold)
    }

    pub fn for_kind(&self, kind: AlertKind) -> &[f64] {
        match kind {
            AlertKind::BondingCurve => &self.bonding_curve,
            AlertKind::MarketCap => &self.market_cap,
        }
    }

    fn insert(&mut self, kind: AlertKind, threshold: f64) {
        let set = match kind {
            AlertKind::BondingCurve => &mut self.bonding_curve,
            AlertKind::MarketCap => &mut self.market_cap,
        };
        if !set.contains(&threshold) {
            set.push(threshold);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bonding_curve.is_empty() && self.market_cap.is_empty()
    }
}

/// A threshold newly met this cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    pub kind: AlertKind,
    pub threshold: f64,
    pub current_value: f64,
}

impl Crossing {
    pub fn is_graduation(&self) -> bool {
        self.kind == AlertKind::BondingCurve && self.threshold >= GRADUATION_THRESHOLD
    }
}

/// Result of one evaluation: new crossings in ascending threshold order per
/// kind (bonding curve first), plus the updated alerted set.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub crossings: Vec<Crossing>,
    pub alerted: AlertedThresholds,
}

impl Evaluation {
    pub fn graduated(&self) -> bool {
        self.crossings.iter().any(Crossing::is_graduation)
    }
}

/// Compares derived values against the configured thresholds
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    thresholds: ThresholdSet,
}

impl ThresholdEvaluator {
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn evaluate(&self, alerted: &AlertedThresholds, derived: &DerivedValues) -> Evaluation {
        let mut updated = alerted.clone();
        let mut crossings = Vec::new();

        for (kind, value) in [
            (AlertKind::BondingCurve, derived.progress),
            (AlertKind::MarketCap, derived.market_cap),
        ] {
            // Data gap: no event and no state change for this kind
            let Some(current_value) = value else { continue };
            if !current_value.is_finite() {
                continue;
            }

            for &threshold in self.thresholds.for_kind(kind) {
                if current_value >= threshold && !updated.contains(kind, threshold) {
                    updated.insert(kind, threshold);
                    crossings.push(Crossing {
                        kind,
                        threshold,
                        current_value,
                    });
                }
            }
        }

        Evaluation {
            crossings,
            alerted: updated,
        }
    }
}
