//! Runner archetypes, aptitude grades and the immutable per-run stat snapshot.
use serde::{Deserialize, Serialize};

/// Pacing archetype driving the coefficient lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FrontRunner,
    #[default]
    PaceChaser,
    LateSurger,
    EndCloser,
    /// Great-escape front runner; has its own lead-competition multipliers.
    Runaway,
    /// Unclassified runner. Carries a zero stamina coefficient.
    Other,
}

impl Strategy {
    pub const ALL: [Self; 5] = [
        Self::FrontRunner,
        Self::PaceChaser,
        Self::LateSurger,
        Self::EndCloser,
        Self::Runaway,
    ];

    /// Row index into the strategy-keyed coefficient tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Other => 0,
            Self::FrontRunner => 1,
            Self::PaceChaser => 2,
            Self::LateSurger => 3,
            Self::EndCloser => 4,
            Self::Runaway => 5,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FrontRunner => "front_runner",
            Self::PaceChaser => "pace_chaser",
            Self::LateSurger => "late_surger",
            Self::EndCloser => "end_closer",
            Self::Runaway => "runaway",
            Self::Other => "other",
        }
    }
}

/// Letter grade for distance, surface and strategy fitness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Aptitude {
    S,
    #[default]
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Aptitude {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::S => 0,
            Self::A => 1,
            Self::B => 2,
            Self::C => 3,
            Self::D => 4,
            Self::E => 5,
            Self::F => 6,
            Self::G => 7,
        }
    }
}

/// Stat snapshot for one runner, fixed for the duration of a race attempt.
///
/// Stats are assumed to satisfy `stamina > 0`, `guts > 0` and `wisdom >= 0`;
/// values outside that contract surface as [`crate::PolicyError::NonFinite`]
/// once they reach a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorseParameters {
    pub speed: f64,
    pub stamina: f64,
    pub power: f64,
    pub guts: f64,
    pub wisdom: f64,
    pub strategy: Strategy,
    pub distance_aptitude: Aptitude,
    pub surface_aptitude: Aptitude,
    pub strategy_aptitude: Aptitude,
}

impl Default for HorseParameters {
    fn default() -> Self {
        Self {
            speed: 1200.0,
            stamina: 1000.0,
            power: 1000.0,
            guts: 900.0,
            wisdom: 1000.0,
            strategy: Strategy::PaceChaser,
            distance_aptitude: Aptitude::A,
            surface_aptitude: Aptitude::A,
            strategy_aptitude: Aptitude::A,
        }
    }
}

impl HorseParameters {
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_stamina(mut self, stamina: f64) -> Self {
        self.stamina = stamina;
        self
    }

    #[must_use]
    pub fn with_guts(mut self, guts: f64) -> Self {
        self.guts = guts;
        self
    }

    #[must_use]
    pub fn with_wisdom(mut self, wisdom: f64) -> Self {
        self.wisdom = wisdom;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_indices_follow_table_rows() {
        let rows: Vec<usize> = Strategy::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(rows, vec![1, 2, 3, 4, 5]);
        assert_eq!(Strategy::Other.index(), 0);
    }

    #[test]
    fn horse_deserializes_with_defaulted_grades() {
        let horse: HorseParameters = serde_json::from_str(
            r#"{"speed":1100,"stamina":900,"power":800,"guts":700,"wisdom":600,"strategy":"runaway"}"#,
        )
        .unwrap();
        assert_eq!(horse.strategy, Strategy::Runaway);
        assert_eq!(horse.distance_aptitude, Aptitude::A);
        assert!((horse.guts - 700.0).abs() < f64::EPSILON);

        let partial: HorseParameters = serde_json::from_str(r#"{"stamina":500}"#).unwrap();
        assert_eq!(partial, HorseParameters::default().with_stamina(500.0));
    }
}
