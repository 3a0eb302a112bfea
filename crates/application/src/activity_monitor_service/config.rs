use jobgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Score contribution of each detector.
///
/// The total is capped at 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspicionWeights {
    /// Upper bound for the rapid request contribution.
    pub rapid_requests: u32,
    /// Upper bound for the unusual volume contribution.
    pub unusual_volume: u32,
    /// Flat contribution of bot-like timing or identical request runs.
    pub bot_like_timing: u32,
    /// Bonus when the mean interval is below the extreme floor.
    pub extreme_timing_bonus: u32,
    /// Contribution of low action variety.
    pub low_variety: u32,
    /// Contribution of highly regular intervals.
    pub consistent_timing: u32,
}

impl Default for SuspicionWeights {
    fn default() -> Self {
        Self {
            rapid_requests: 30,
            unusual_volume: 25,
            bot_like_timing: 25,
            extreme_timing_bonus: 15,
            low_variety: 10,
            consistent_timing: 15,
        }
    }
}

/// Thresholds and retention for the activity monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMonitorConfig {
    /// Events older than this are dropped from a user's history.
    pub history_window_seconds: u32,
    /// Maximum events retained per user.
    pub max_history: usize,
    /// Score at which a user counts as suspicious.
    pub suspicious_score_threshold: u32,
    /// Short window for the rapid request detector.
    pub rapid_window_seconds: u32,
    /// Events inside the short window that raise the rapid request flag.
    pub rapid_threshold: usize,
    /// Long window for the unusual volume detector.
    pub volume_window_seconds: u32,
    /// Events inside the long window that raise the unusual volume flag.
    pub volume_threshold: usize,
    /// Mean intervals below this are not considered human.
    pub min_human_interval_ms: u64,
    /// Mean intervals below this earn the extreme timing bonus.
    pub extreme_interval_ms: u64,
    /// Consecutive identical requests that raise the identical request flag.
    pub identical_run_threshold: usize,
    /// Most recent events inspected for action variety.
    pub variety_sample_size: usize,
    /// Unique actions at or below which a full sample has low variety.
    pub max_unique_actions_for_low_variety: usize,
    /// Coefficient of variation below which timing counts as consistent.
    pub consistency_cv_threshold: f64,
    /// Intervals required before timing consistency is judged.
    pub consistency_min_intervals: usize,
    /// Detector weights.
    pub weights: SuspicionWeights,
}

impl Default for ActivityMonitorConfig {
    fn default() -> Self {
        Self {
            history_window_seconds: 3600,
            max_history: 500,
            suspicious_score_threshold: 50,
            rapid_window_seconds: 60,
            rapid_threshold: 10,
            volume_window_seconds: 300,
            volume_threshold: 30,
            min_human_interval_ms: 1000,
            extreme_interval_ms: 200,
            identical_run_threshold: 5,
            variety_sample_size: 20,
            max_unique_actions_for_low_variety: 1,
            consistency_cv_threshold: 0.1,
            consistency_min_intervals: 5,
            weights: SuspicionWeights::default(),
        }
    }
}

impl ActivityMonitorConfig {
    /// Validates thresholds and windows.
    pub fn validate(&self) -> AppResult<()> {
        if self.history_window_seconds == 0 || self.max_history == 0 {
            return Err(AppError::Validation(
                "activity history window and size must be greater than zero".to_owned(),
            ));
        }

        if self.rapid_window_seconds == 0 || self.volume_window_seconds == 0 {
            return Err(AppError::Validation(
                "activity detector windows must be greater than zero".to_owned(),
            ));
        }

        if self.rapid_threshold == 0 || self.volume_threshold == 0 {
            return Err(AppError::Validation(
                "activity detector thresholds must be greater than zero".to_owned(),
            ));
        }

        if self.identical_run_threshold < 2 || self.consistency_min_intervals < 2 {
            return Err(AppError::Validation(
                "identical run and consistency sample must cover at least two events".to_owned(),
            ));
        }

        if self.extreme_interval_ms > self.min_human_interval_ms {
            return Err(AppError::Validation(
                "extreme_interval_ms must not exceed min_human_interval_ms".to_owned(),
            ));
        }

        if !self.consistency_cv_threshold.is_finite() || self.consistency_cv_threshold < 0.0 {
            return Err(AppError::Validation(
                "consistency_cv_threshold must be a finite non-negative value".to_owned(),
            ));
        }

        if self.suspicious_score_threshold == 0 || self.suspicious_score_threshold > 100 {
            return Err(AppError::Validation(
                "suspicious_score_threshold must be within 1..=100".to_owned(),
            ));
        }

        Ok(())
    }
}
