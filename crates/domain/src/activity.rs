use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPattern {
    /// Acting user.
    pub user_id: String,
    /// Time of the action.
    pub timestamp: DateTime<Utc>,
    /// Action name, for example a chat command.
    pub action: String,
    /// Channel the action came from.
    pub channel: Option<String>,
    /// Job type, for job triggers.
    pub job_type: Option<String>,
    /// Job name, for job triggers.
    pub job_name: Option<String>,
}

impl RequestPattern {
    /// Creates a pattern without channel or job details.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        action: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp,
            action: action.into(),
            channel: None,
            job_type: None,
            job_name: None,
        }
    }

    /// Attaches the triggered job.
    #[must_use]
    pub fn with_job(mut self, job_type: impl Into<String>, job_name: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self.job_name = Some(job_name.into());
        self
    }

    /// Attaches the originating channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Returns true when both patterns request the same thing.
    #[must_use]
    pub fn is_identical_request(&self, other: &Self) -> bool {
        self.action == other.action
            && self.job_type == other.job_type
            && self.job_name == other.job_name
    }
}

/// Behavioural signal raised by the activity analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityFlag {
    /// Too many events inside the short window.
    RapidRequests,
    /// Too many events inside the long window.
    UnusualVolume,
    /// Mean interval below the human floor.
    BotLikeTiming,
    /// Long run of identical requests.
    IdenticalRequests,
    /// Too few distinct actions in a large sample.
    LowVariety,
    /// Intervals too regular to be typed by hand.
    ConsistentTiming,
}

impl ActivityFlag {
    /// Returns the human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::RapidRequests => "Rapid requests",
            Self::UnusualVolume => "Unusual volume",
            Self::BotLikeTiming => "Bot-like timing",
            Self::IdenticalRequests => "Identical requests",
            Self::LowVariety => "Low variety",
            Self::ConsistentTiming => "Highly consistent timing",
        }
    }
}

impl Display for ActivityFlag {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Outcome of one analysis pass over a user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousActivityResult {
    /// Analysed user.
    pub user_id: String,
    /// Whether the score reached the configured threshold.
    pub is_suspicious: bool,
    /// Additive heuristic score in `0..=100`.
    pub suspicion_score: u32,
    /// Raised signals, in detector order.
    pub flags: Vec<ActivityFlag>,
    /// Events in the short window.
    pub recent_request_count: usize,
    /// Mean interval between consecutive events, in milliseconds.
    pub mean_interval_ms: Option<f64>,
    /// Analysis time.
    pub analyzed_at: DateTime<Utc>,
}

impl SuspiciousActivityResult {
    /// Result for a user without usable history.
    #[must_use]
    pub fn clean(user_id: impl Into<String>, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            is_suspicious: false,
            suspicion_score: 0,
            flags: Vec::new(),
            recent_request_count: 0,
            mean_interval_ms: None,
            analyzed_at,
        }
    }

    /// Returns true if the given flag was raised.
    #[must_use]
    pub fn has_flag(&self, flag: ActivityFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Accumulated per-user activity summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivityMetrics {
    /// Tracked user.
    pub user_id: String,
    /// Requests recorded since tracking started.
    pub total_requests: u64,
    /// First recorded request.
    pub first_activity: DateTime<Utc>,
    /// Latest recorded request.
    pub last_activity: DateTime<Utc>,
    /// Score of the latest analysis.
    pub suspicion_score: u32,
    /// Highest score seen so far.
    pub peak_suspicion_score: u32,
    /// Number of analyses that ended suspicious.
    pub flag_count: u32,
}

impl UserActivityMetrics {
    /// Starts a summary at the first recorded request.
    #[must_use]
    pub fn start(user_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_requests: 0,
            first_activity: at,
            last_activity: at,
            suspicion_score: 0,
            peak_suspicion_score: 0,
            flag_count: 0,
        }
    }

    /// Folds one recorded request and its analysis into the summary.
    pub fn observe(&mut self, timestamp: DateTime<Utc>, analysis: &SuspiciousActivityResult) {
        self.total_requests = self.total_requests.saturating_add(1);
        self.first_activity = self.first_activity.min(timestamp);
        self.last_activity = self.last_activity.max(timestamp);
        self.suspicion_score = analysis.suspicion_score;
        self.peak_suspicion_score = self.peak_suspicion_score.max(analysis.suspicion_score);
        if analysis.is_suspicious {
            self.flag_count = self.flag_count.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{ActivityFlag, RequestPattern, SuspiciousActivityResult, UserActivityMetrics};

    #[test]
    fn identical_requests_compare_job_details() {
        let at = Utc::now();
        let first = RequestPattern::new("u1", "trigger", at).with_job("deploy", "api");
        let second = RequestPattern::new("u1", "trigger", at).with_job("deploy", "api");
        let other = RequestPattern::new("u1", "trigger", at).with_job("deploy", "web");

        assert!(first.is_identical_request(&second));
        assert!(!first.is_identical_request(&other));
    }

    #[test]
    fn metrics_track_peak_and_flags() {
        let at = Utc
            .timestamp_opt(1_700_000_000, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        let mut metrics = UserActivityMetrics::start("u1", at);

        let mut analysis = SuspiciousActivityResult::clean("u1", at);
        analysis.suspicion_score = 80;
        analysis.is_suspicious = true;
        metrics.observe(at, &analysis);

        metrics.observe(at, &SuspiciousActivityResult::clean("u1", at));

        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.suspicion_score, 0);
        assert_eq!(metrics.peak_suspicion_score, 80);
        assert_eq!(metrics.flag_count, 1);
    }

    #[test]
    fn flags_display_their_labels() {
        assert_eq!(ActivityFlag::BotLikeTiming.to_string(), "Bot-like timing");
        assert_eq!(
            ActivityFlag::ConsistentTiming.to_string(),
            "Highly consistent timing"
        );
    }
}
