//! Engine configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{GameError, Result};

/// Timer behavior for active sessions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimerConfig {
    /// Default session timeout for standard play.
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u64,
    /// Default session timeout for challenge variants.
    #[serde(default = "default_challenge_timeout_seconds")]
    pub challenge_timeout_seconds: u64,
    /// Remaining-time marks (seconds) at which countdown notifications fire.
    /// Only marks strictly below the session timeout are scheduled.
    #[serde(default = "default_countdown_marks")]
    pub countdown_marks_seconds: Vec<u64>,
    /// Upper bound on how long the primary timer sleeps between
    /// session-liveness checks.
    #[serde(default = "default_revalidation_seconds")]
    pub revalidation_interval_seconds: u64,
    /// Grace added to the session timeout for the fallback safety timer.
    #[serde(default = "default_fallback_grace_seconds")]
    pub fallback_grace_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_challenge_timeout_seconds() -> u64 {
    45
}

fn default_countdown_marks() -> Vec<u64> {
    vec![20, 10]
}

fn default_revalidation_seconds() -> u64 {
    10
}

fn default_fallback_grace_seconds() -> u64 {
    15
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: default_timeout_seconds(),
            challenge_timeout_seconds: default_challenge_timeout_seconds(),
            countdown_marks_seconds: default_countdown_marks(),
            revalidation_interval_seconds: default_revalidation_seconds(),
            fallback_grace_seconds: default_fallback_grace_seconds(),
        }
    }
}

/// Periodic maintenance sweep behavior.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SweepConfig {
    /// Interval between maintenance sweeps.
    #[serde(default = "default_sweep_interval_seconds")]
    pub interval_seconds: u64,
    /// Hard maximum session age, independent of the configured timeout.
    /// Sessions older than this are force-ended by the sweep.
    #[serde(default = "default_max_session_seconds")]
    pub max_session_seconds: u64,
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_max_session_seconds() -> u64 {
    300
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_sweep_interval_seconds(),
            max_session_seconds: default_max_session_seconds(),
        }
    }
}

/// Health classification thresholds.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct HealthConfig {
    /// Rolling window over which engine errors are counted.
    #[serde(default = "default_error_window_seconds")]
    pub error_window_seconds: u64,
    /// Recent-error count at which health degrades to warning.
    #[serde(default = "default_warning_errors")]
    pub warning_error_threshold: usize,
    /// Recent-error count at which health degrades to critical.
    #[serde(default = "default_critical_errors")]
    pub critical_error_threshold: usize,
    /// Inaccessible-channel count at which health degrades to warning.
    #[serde(default = "default_inaccessible_warning")]
    pub inaccessible_warning_threshold: usize,
}

fn default_error_window_seconds() -> u64 {
    300
}

fn default_warning_errors() -> usize {
    5
}

fn default_critical_errors() -> usize {
    15
}

fn default_inaccessible_warning() -> usize {
    3
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            error_window_seconds: default_error_window_seconds(),
            warning_error_threshold: default_warning_errors(),
            critical_error_threshold: default_critical_errors(),
            inaccessible_warning_threshold: default_inaccessible_warning(),
        }
    }
}

fn default_timer_event_capacity() -> usize {
    256
}

/// Engine configuration parsed from TOML.
///
/// Every field has a default, so an empty document yields a usable
/// configuration equal to [`ArenaConfig::default`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ArenaConfig {
    /// Session timer behavior.
    #[serde(default)]
    pub timers: TimerConfig,
    /// Maintenance sweep behavior.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Health classification thresholds.
    #[serde(default)]
    pub health: HealthConfig,
    /// Bound of the timer event queue between timer tasks and the consumer.
    #[serde(default = "default_timer_event_capacity")]
    pub timer_event_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            timers: TimerConfig::default(),
            sweep: SweepConfig::default(),
            health: HealthConfig::default(),
            timer_event_capacity: default_timer_event_capacity(),
        }
    }
}

impl ArenaConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| GameError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Default timeout for standard sessions.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.timers.default_timeout_seconds)
    }

    /// Default timeout for challenge sessions.
    #[must_use]
    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.timers.challenge_timeout_seconds)
    }

    /// Upper bound on the primary timer's sleep between liveness checks.
    #[must_use]
    pub fn revalidation_interval(&self) -> Duration {
        Duration::from_secs(self.timers.revalidation_interval_seconds)
    }

    /// Grace the fallback timer adds to the session timeout.
    #[must_use]
    pub fn fallback_grace(&self) -> Duration {
        Duration::from_secs(self.timers.fallback_grace_seconds)
    }

    /// Interval between maintenance sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep.interval_seconds)
    }

    /// Hard maximum session age enforced by the sweep.
    #[must_use]
    pub fn max_session_age(&self) -> Duration {
        Duration::from_secs(self.sweep.max_session_seconds)
    }

    /// Rolling window over which engine errors are counted.
    #[must_use]
    pub fn error_window(&self) -> Duration {
        Duration::from_secs(self.health.error_window_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.timers.default_timeout_seconds == 0 {
            return Err(GameError::Config(
                "timers.default_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.timers.challenge_timeout_seconds == 0 {
            return Err(GameError::Config(
                "timers.challenge_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.timers.revalidation_interval_seconds == 0 {
            return Err(GameError::Config(
                "timers.revalidation_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.timers.countdown_marks_seconds.iter().any(|&m| m == 0) {
            return Err(GameError::Config(
                "timers.countdown_marks_seconds entries must be greater than zero".into(),
            ));
        }

        if self.sweep.interval_seconds == 0 {
            return Err(GameError::Config(
                "sweep.interval_seconds must be greater than zero".into(),
            ));
        }

        if self.sweep.max_session_seconds < self.timers.default_timeout_seconds {
            return Err(GameError::Config(
                "sweep.max_session_seconds must not be below timers.default_timeout_seconds"
                    .into(),
            ));
        }

        if self.health.critical_error_threshold < self.health.warning_error_threshold {
            return Err(GameError::Config(
                "health.critical_error_threshold must not be below warning threshold".into(),
            ));
        }

        if self.timer_event_capacity == 0 {
            return Err(GameError::Config(
                "timer_event_capacity must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
