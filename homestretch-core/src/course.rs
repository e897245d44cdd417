//! Course description, going and race phases.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Turf,
    Dirt,
}

impl Surface {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Turf => 0,
            Self::Dirt => 1,
        }
    }
}

/// Going of the track surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundCondition {
    #[default]
    Firm,
    Good,
    Soft,
    Heavy,
}

impl GroundCondition {
    pub const ALL: [Self; 4] = [Self::Firm, Self::Good, Self::Soft, Self::Heavy];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Firm => 0,
            Self::Good => 1,
            Self::Soft => 2,
            Self::Heavy => 3,
        }
    }
}

/// Race segment. Ordered, so `phase >= Phase::LateRace` reads as "late race or later".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    EarlyRace,
    MidRace,
    LateRace,
    LastSpurt,
}

impl Phase {
    pub const ALL: [Self; 4] = [
        Self::EarlyRace,
        Self::MidRace,
        Self::LateRace,
        Self::LastSpurt,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::EarlyRace => 0,
            Self::MidRace => 1,
            Self::LateRace => 2,
            Self::LastSpurt => 3,
        }
    }

    /// Late race and last spurt: guts-modified consumption and spurt logic apply.
    #[must_use]
    pub const fn is_late(self) -> bool {
        matches!(self, Self::LateRace | Self::LastSpurt)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EarlyRace => "Early race",
            Self::MidRace => "Mid race",
            Self::LateRace => "Late race",
            Self::LastSpurt => "Last spurt",
        }
    }
}

/// Gradient section. `slope` is in hundredths of a percent; negative is downhill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slope {
    pub start: f64,
    pub length: f64,
    pub slope: i32,
}

impl Slope {
    #[must_use]
    pub fn contains(&self, pos: f64) -> bool {
        pos >= self.start && pos < self.start + self.length
    }
}

/// Immutable course description shared by every runner in a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseData {
    pub distance: f64,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub slopes: Vec<Slope>,
}

impl Default for CourseData {
    fn default() -> Self {
        Self::flat(2000.0, Surface::Turf)
    }
}

impl CourseData {
    #[must_use]
    pub fn flat(distance: f64, surface: Surface) -> Self {
        Self {
            distance,
            surface,
            slopes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_slope(mut self, slope: Slope) -> Self {
        self.slopes.push(slope);
        self
    }

    /// Course base speed in m/s; 20.0 at 2000 m and 1 m/s slower per extra kilometre.
    #[must_use]
    pub fn base_speed(&self) -> f64 {
        20.0 - (self.distance - 2000.0) / 1000.0
    }

    #[must_use]
    pub fn phase_start(&self, phase: Phase) -> f64 {
        match phase {
            Phase::EarlyRace => 0.0,
            Phase::MidRace => self.distance / 6.0,
            Phase::LateRace => self.distance * 2.0 / 3.0,
            Phase::LastSpurt => self.distance * 5.0 / 6.0,
        }
    }

    #[must_use]
    pub fn phase_end(&self, phase: Phase) -> f64 {
        match phase {
            Phase::EarlyRace => self.distance / 6.0,
            Phase::MidRace => self.distance * 2.0 / 3.0,
            Phase::LateRace => self.distance * 5.0 / 6.0,
            Phase::LastSpurt => self.distance,
        }
    }

    #[must_use]
    pub fn phase_at(&self, pos: f64) -> Phase {
        Phase::ALL
            .into_iter()
            .rev()
            .find(|phase| pos >= self.phase_start(*phase))
            .unwrap_or(Phase::EarlyRace)
    }

    #[must_use]
    pub fn is_downhill(&self, pos: f64) -> bool {
        self.slopes
            .iter()
            .any(|slope| slope.slope < 0 && slope.contains(pos))
    }
}
