use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("heartbeat interval must be > 0")]
    InvalidHeartbeatInterval,

    #[error("playback poll interval must be > 0")]
    InvalidPollInterval,

    #[error("autosave debounce must be > 0")]
    InvalidAutosaveDebounce,

    #[error("completion percent must be in 1..=100")]
    InvalidCompletionPercent,

    #[error("seek tolerance must be <= seek horizon")]
    InvalidSeekBounds,
}

//
// ─── ENGINE SETTINGS ───────────────────────────────────────────────────────────
//

/// Tunables for the lesson engines.
///
/// Intervals and thresholds are configuration, not contract: tests and hosts
/// construct their own values instead of relying on the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    heartbeat_interval_secs: u32,
    poll_interval_millis: u32,
    autosave_debounce_millis: u32,
    resume_threshold_secs: u32,
    completion_percent: u8,
    seek_horizon_secs: u32,
    seek_tolerance_secs: u32,
    sequential_unlock: bool,
}

impl EngineSettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any interval is zero, the completion
    /// percent is out of range, or the seek tolerance exceeds the horizon.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        heartbeat_interval_secs: u32,
        poll_interval_millis: u32,
        autosave_debounce_millis: u32,
        resume_threshold_secs: u32,
        completion_percent: u8,
        seek_horizon_secs: u32,
        seek_tolerance_secs: u32,
        sequential_unlock: bool,
    ) -> Result<Self, SettingsError> {
        if heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidHeartbeatInterval);
        }
        if poll_interval_millis == 0 {
            return Err(SettingsError::InvalidPollInterval);
        }
        if autosave_debounce_millis == 0 {
            return Err(SettingsError::InvalidAutosaveDebounce);
        }
        if completion_percent == 0 || completion_percent > 100 {
            return Err(SettingsError::InvalidCompletionPercent);
        }
        if seek_tolerance_secs > seek_horizon_secs {
            return Err(SettingsError::InvalidSeekBounds);
        }
        Ok(Self {
            heartbeat_interval_secs,
            poll_interval_millis,
            autosave_debounce_millis,
            resume_threshold_secs,
            completion_percent,
            seek_horizon_secs,
            seek_tolerance_secs,
            sequential_unlock,
        })
    }

    /// Recurring progress flush interval while playing.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u32 {
        self.heartbeat_interval_secs
    }

    /// Player polling cadence for adapters without native time updates.
    #[must_use]
    pub fn poll_interval_millis(&self) -> u32 {
        self.poll_interval_millis
    }

    /// Quiet period after the last answer edit before a draft autosave fires.
    #[must_use]
    pub fn autosave_debounce_millis(&self) -> u32 {
        self.autosave_debounce_millis
    }

    /// Minimum saved progress before a lesson resumes at its high-water mark.
    #[must_use]
    pub fn resume_threshold_secs(&self) -> u32 {
        self.resume_threshold_secs
    }

    /// Watched percentage at which a video lesson completes without an
    /// end-of-media event.
    #[must_use]
    pub fn completion_percent(&self) -> u8 {
        self.completion_percent
    }

    /// How far past the high-water mark a forward seek is allowed.
    #[must_use]
    pub fn seek_horizon_secs(&self) -> u32 {
        self.seek_horizon_secs
    }

    /// Slack added to the horizon for imprecise player seeks.
    #[must_use]
    pub fn seek_tolerance_secs(&self) -> u32 {
        self.seek_tolerance_secs
    }

    /// Whether lessons unlock strictly in flattened order.
    #[must_use]
    pub fn sequential_unlock(&self) -> bool {
        self.sequential_unlock
    }
}

impl Default for EngineSettings {
    /// Defaults matching the production portal: 10 s heartbeat, 1 s player
    /// poll, 2 s autosave debounce, resume past 5 s, complete at 90%,
    /// forward seeks limited to 15 s (+2 s tolerance) past the mark.
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 10,
            poll_interval_millis: 1_000,
            autosave_debounce_millis: 2_000,
            resume_threshold_secs: 5,
            completion_percent: 90,
            seek_horizon_secs: 15,
            seek_tolerance_secs: 2,
            sequential_unlock: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = EngineSettings::default();
        EngineSettings::new(
            s.heartbeat_interval_secs(),
            s.poll_interval_millis(),
            s.autosave_debounce_millis(),
            s.resume_threshold_secs(),
            s.completion_percent(),
            s.seek_horizon_secs(),
            s.seek_tolerance_secs(),
            s.sequential_unlock(),
        )
        .unwrap();
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let err = EngineSettings::new(0, 1_000, 2_000, 5, 90, 15, 2, false).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidHeartbeatInterval));

        let err = EngineSettings::new(10, 1_000, 0, 5, 90, 15, 2, false).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidAutosaveDebounce));
    }

    #[test]
    fn seek_tolerance_cannot_exceed_horizon() {
        let err = EngineSettings::new(10, 1_000, 2_000, 5, 90, 2, 15, false).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidSeekBounds));
    }
}
