/// Result alias that carries the custom [`TrainerError`] type.
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    /// A beat rate that cannot drive a timer (zero, negative or not finite).
    #[error("{context}: bpm must be a positive finite number, got {bpm}")]
    InvalidBpm { context: &'static str, bpm: f64 },
    /// The tick source was asked to repeat at a degenerate period.
    #[error("timer period must be a positive finite number of seconds, got {0}")]
    InvalidInterval(f64),
    /// An operation needed the game screen while the config screen was shown.
    #[error("no session is active")]
    NoActiveSession,
    /// A session was confirmed while another one was still running.
    #[error("a session is already active")]
    SessionAlreadyActive,
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration files that fail to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl TrainerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Rejects `bpm` unless it can drive a timer.
    pub fn check_bpm(context: &'static str, bpm: f64) -> Result<f64> {
        if bpm.is_finite() && bpm > 0.0 {
            Ok(bpm)
        } else {
            Err(Self::InvalidBpm { context, bpm })
        }
    }
}

impl From<&str> for TrainerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TrainerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_positive_bpm() {
        assert_eq!(TrainerError::check_bpm("test", 80.0).unwrap(), 80.0);
    }

    #[test]
    fn rejects_degenerate_bpm() {
        for bpm in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = TrainerError::check_bpm("beat scheduler", bpm).unwrap_err();
            assert!(format!("{err}").starts_with("beat scheduler"));
        }
    }
}
