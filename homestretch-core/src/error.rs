//! Error taxonomy for the stamina policies and the batch sampler.
use thiserror::Error;

/// Errors raised at the policy boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    /// A stateful operation ran before `init()` set up the ledger.
    #[error("{operation} called before init()")]
    NotInitialized { operation: &'static str },
    /// A NaN or infinite value reached the policy boundary.
    #[error("{quantity} is not finite (got {value})")]
    NonFinite { quantity: &'static str, value: f64 },
    /// A batch was aborted between samples.
    #[error("batch cancelled after {completed} samples")]
    Cancelled { completed: usize },
}

pub type Result<T> = std::result::Result<T, PolicyError>;

/// Reject NaN and infinities so they never poison aggregate statistics.
pub(crate) fn ensure_finite(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PolicyError::NonFinite { quantity, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_passes_through_real_values() {
        assert_eq!(ensure_finite("hp", -12.5), Ok(-12.5));
    }

    #[test]
    fn ensure_finite_flags_nan_and_infinity() {
        assert!(matches!(
            ensure_finite("hp", f64::NAN),
            Err(PolicyError::NonFinite { quantity: "hp", .. })
        ));
        assert!(ensure_finite("speed", f64::INFINITY).is_err());
    }

    #[test]
    fn messages_name_the_operation() {
        let err = PolicyError::NotInitialized { operation: "tick" };
        assert_eq!(err.to_string(), "tick called before init()");
    }
}
