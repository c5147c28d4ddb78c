//! Command-line and environment configuration for polling.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::PollPolicy;

/// Polling configuration in whole seconds, convertible to a [`PollPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct PollConfig {
    /// Delay before the first re-check in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "poll-initial-delay", env = "GENIE_POLL_INITIAL_DELAY", default_value = "30")
    )]
    #[serde(default = "default_initial_delay_secs")]
    pub poll_initial_delay: u64,

    /// Maximum delay between checks in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "poll-max-delay", env = "GENIE_POLL_MAX_DELAY", default_value = "300")
    )]
    #[serde(default = "default_max_delay_secs")]
    pub poll_max_delay: u64,

    /// Growth factor between consecutive delays
    #[cfg_attr(
        feature = "config",
        arg(long = "poll-multiplier", env = "GENIE_POLL_MULTIPLIER", default_value = "2.0")
    )]
    #[serde(default = "default_multiplier")]
    pub poll_multiplier: f64,

    /// Total polling budget in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "poll-timeout", env = "GENIE_POLL_TIMEOUT", default_value = "1800")
    )]
    #[serde(default = "default_timeout_secs")]
    pub poll_timeout: u64,
}

fn default_initial_delay_secs() -> u64 {
    super::policy::DEFAULT_INITIAL_DELAY.as_secs()
}

fn default_max_delay_secs() -> u64 {
    super::policy::DEFAULT_MAX_DELAY.as_secs()
}

fn default_multiplier() -> f64 {
    super::policy::DEFAULT_MULTIPLIER
}

fn default_timeout_secs() -> u64 {
    super::policy::DEFAULT_TIMEOUT.as_secs()
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_initial_delay: default_initial_delay_secs(),
            poll_max_delay: default_max_delay_secs(),
            poll_multiplier: default_multiplier(),
            poll_timeout: default_timeout_secs(),
        }
    }
}

impl PollConfig {
    /// Builds the policy described by this configuration.
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_secs(self.poll_initial_delay),
            max_delay: Duration::from_secs(self.poll_max_delay),
            multiplier: self.poll_multiplier,
            timeout: Duration::from_secs(self.poll_timeout),
        }
    }
}
