//! Wizard engine tuning.

use serde::Deserialize;

use super::error::ValidationError;

/// Limits and timeouts of the migration wizard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WizardConfig {
    /// Lifetime of an active session.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// How long completed or cancelled sessions stay readable for replays.
    #[serde(default = "default_terminal_retention")]
    pub terminal_retention_secs: u64,

    /// StartWizard calls allowed per user per window.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_window: u32,

    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,

    /// Cap on distinct destination stores for bulk accept.
    #[serde(default = "default_max_stores")]
    pub max_stores: usize,

    #[serde(default = "default_max_suggestions")]
    pub max_suggestions_per_item: usize,

    /// Catalog candidates below this product similarity are ignored.
    #[serde(default = "default_min_similarity")]
    pub min_candidate_similarity: f64,

    /// Fail finalize on any dataset version change instead of revalidating
    /// the chosen offers.
    #[serde(default)]
    pub strict_dataset_version: bool,

    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

impl WizardConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_ttl_secs == 0 {
            return Err(ValidationError::MustBePositive("session_ttl_secs"));
        }
        if self.terminal_retention_secs == 0 {
            return Err(ValidationError::MustBePositive("terminal_retention_secs"));
        }
        if self.max_sessions_per_window == 0 {
            return Err(ValidationError::MustBePositive("max_sessions_per_window"));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(ValidationError::MustBePositive("rate_limit_window_secs"));
        }
        if self.max_stores == 0 {
            return Err(ValidationError::MustBePositive("max_stores"));
        }
        if self.max_suggestions_per_item == 0 {
            return Err(ValidationError::MustBePositive("max_suggestions_per_item"));
        }
        if !(0.0..=1.0).contains(&self.min_candidate_similarity) {
            return Err(ValidationError::OutOfRange {
                field: "min_candidate_similarity",
                reason: format!("{} is not within [0, 1]", self.min_candidate_similarity),
            });
        }
        if self.event_queue_capacity == 0 {
            return Err(ValidationError::MustBePositive("event_queue_capacity"));
        }
        Ok(())
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            terminal_retention_secs: default_terminal_retention(),
            max_sessions_per_window: default_max_sessions(),
            rate_limit_window_secs: default_rate_limit_window(),
            max_stores: default_max_stores(),
            max_suggestions_per_item: default_max_suggestions(),
            min_candidate_similarity: default_min_similarity(),
            strict_dataset_version: false,
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

fn default_session_ttl() -> u64 {
    1800
}

fn default_terminal_retention() -> u64 {
    3600
}

fn default_max_sessions() -> u32 {
    5
}

fn default_rate_limit_window() -> u64 {
    3600
}

fn default_max_stores() -> usize {
    2
}

fn default_max_suggestions() -> usize {
    5
}

fn default_min_similarity() -> f64 {
    0.2
}

fn default_event_queue_capacity() -> usize {
    256
}
