//! Batch-simulation configuration and its validation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_FRAME_SECONDS;
use crate::course::{CourseData, GroundCondition};
use crate::health::PolicyKind;
use crate::horse::HorseParameters;

/// Errors returned when validating a [`SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("recovery {index} at {position:.1} m comes before the previous one at {previous:.1} m")]
    RecoveryOrder {
        index: usize,
        position: f64,
        previous: f64,
    },
    #[error("sample count must be at least 1")]
    NoSamples,
}

/// A scripted stamina recovery, applied when the runner first reaches `position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryEvent {
    pub position: f64,
    /// Fraction of max HP restored.
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub horse: HorseParameters,
    #[serde(default)]
    pub course: CourseData,
    #[serde(default)]
    pub ground: GroundCondition,
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default)]
    pub accuracy_mode: bool,
    #[serde(default = "SimulationConfig::default_simulate_stamina")]
    pub simulate_stamina: bool,
    #[serde(default = "SimulationConfig::default_frame_seconds")]
    pub frame_seconds: f64,
    #[serde(default)]
    pub recoveries: Vec<RecoveryEvent>,
    #[serde(default = "SimulationConfig::default_samples")]
    pub samples: usize,
    #[serde(default = "SimulationConfig::default_seed")]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horse: HorseParameters::default(),
            course: CourseData::default(),
            ground: GroundCondition::default(),
            policy: PolicyKind::default(),
            accuracy_mode: false,
            simulate_stamina: Self::default_simulate_stamina(),
            frame_seconds: Self::default_frame_seconds(),
            recoveries: Vec::new(),
            samples: Self::default_samples(),
            seed: Self::default_seed(),
        }
    }
}

impl SimulationConfig {
    const MIN_DISTANCE: f64 = 1000.0;
    const MAX_DISTANCE: f64 = 4000.0;

    #[must_use]
    pub const fn default_simulate_stamina() -> bool {
        true
    }

    #[must_use]
    pub const fn default_frame_seconds() -> f64 {
        DEFAULT_FRAME_SECONDS
    }

    #[must_use]
    pub const fn default_samples() -> usize {
        100
    }

    #[must_use]
    pub const fn default_seed() -> u64 {
        1337
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        if !(self.frame_seconds > 0.0 && self.frame_seconds <= 1.0) {
            return Err(ConfigError::RangeViolation {
                field: "frame_seconds",
                min: 0.0,
                max: 1.0,
                value: self.frame_seconds,
            });
        }
        if !(Self::MIN_DISTANCE..=Self::MAX_DISTANCE).contains(&self.course.distance) {
            return Err(ConfigError::RangeViolation {
                field: "course.distance",
                min: Self::MIN_DISTANCE,
                max: Self::MAX_DISTANCE,
                value: self.course.distance,
            });
        }
        self.validate_horse()?;
        self.validate_recoveries()
    }

    fn validate_horse(&self) -> Result<(), ConfigError> {
        let stats = [
            ("horse.speed", self.horse.speed),
            ("horse.stamina", self.horse.stamina),
            ("horse.power", self.horse.power),
            ("horse.guts", self.horse.guts),
        ];
        for (field, value) in stats {
            // Also rejects NaN.
            if !(value >= 1.0) {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 1.0,
                    value,
                });
            }
        }
        if !(self.horse.wisdom >= 0.0) {
            return Err(ConfigError::MinViolation {
                field: "horse.wisdom",
                min: 0.0,
                value: self.horse.wisdom,
            });
        }
        Ok(())
    }

    fn validate_recoveries(&self) -> Result<(), ConfigError> {
        let mut previous = f64::NEG_INFINITY;
        for (index, event) in self.recoveries.iter().enumerate() {
            if !(event.pct > 0.0 && event.pct <= 1.0) {
                return Err(ConfigError::RangeViolation {
                    field: "recoveries.pct",
                    min: 0.0,
                    max: 1.0,
                    value: event.pct,
                });
            }
            if !(0.0..=self.course.distance).contains(&event.position) {
                return Err(ConfigError::RangeViolation {
                    field: "recoveries.position",
                    min: 0.0,
                    max: self.course.distance,
                    value: event.position,
                });
            }
            if event.position < previous {
                return Err(ConfigError::RecoveryOrder {
                    index,
                    position: event.position,
                    previous,
                });
            }
            previous = event.position;
        }
        Ok(())
    }
}
