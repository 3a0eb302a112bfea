use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jobgate_domain::{ActivityFlag, RequestPattern, SuspiciousActivityResult};

use super::ActivityMonitorConfig;

const MAX_SCORE: u32 = 100;

/// Scores one user's history as of `now`.
///
/// Detectors run independently and their flags are unioned. The score is an
/// additive heuristic capped at 100, not a probability.
#[must_use]
pub fn analyze_history(
    user_id: &str,
    history: &[RequestPattern],
    config: &ActivityMonitorConfig,
    now: DateTime<Utc>,
) -> SuspiciousActivityResult {
    if history.is_empty() {
        return SuspiciousActivityResult::clean(user_id, now);
    }

    let weights = config.weights;
    let mut flags = Vec::new();
    let mut score = 0_u32;

    let recent = count_since(history, now, config.rapid_window_seconds);
    if recent >= config.rapid_threshold {
        flags.push(ActivityFlag::RapidRequests);
        score += scaled(weights.rapid_requests, recent, config.rapid_threshold);
    }

    let volume = count_since(history, now, config.volume_window_seconds);
    if volume >= config.volume_threshold {
        flags.push(ActivityFlag::UnusualVolume);
        score += scaled(weights.unusual_volume, volume, config.volume_threshold);
    }

    let intervals = intervals_ms(history);
    let mean_interval_ms = mean(&intervals);

    let bot_like_timing =
        mean_interval_ms.is_some_and(|mean| mean < config.min_human_interval_ms as f64);
    let identical_run = longest_identical_run(history) >= config.identical_run_threshold;
    if bot_like_timing {
        flags.push(ActivityFlag::BotLikeTiming);
    }
    if identical_run {
        flags.push(ActivityFlag::IdenticalRequests);
    }
    if bot_like_timing || identical_run {
        score += weights.bot_like_timing;
    }
    if mean_interval_ms.is_some_and(|mean| mean < config.extreme_interval_ms as f64) {
        score += weights.extreme_timing_bonus;
    }

    if has_low_variety(history, config) {
        flags.push(ActivityFlag::LowVariety);
        score += weights.low_variety;
    }

    if has_consistent_timing(&intervals, mean_interval_ms, config) {
        flags.push(ActivityFlag::ConsistentTiming);
        score += weights.consistent_timing;
    }

    let suspicion_score = score.min(MAX_SCORE);

    SuspiciousActivityResult {
        user_id: user_id.to_owned(),
        is_suspicious: suspicion_score >= config.suspicious_score_threshold,
        suspicion_score,
        flags,
        recent_request_count: recent,
        mean_interval_ms,
        analyzed_at: now,
    }
}

/// `weight * count / (2 * threshold)`, capped at `weight`.
fn scaled(weight: u32, count: usize, threshold: usize) -> u32 {
    let count = u64::try_from(count).unwrap_or(u64::MAX);
    let threshold = u64::try_from(threshold).unwrap_or(u64::MAX).max(1);
    let value = u64::from(weight).saturating_mul(count) / threshold.saturating_mul(2);
    u32::try_from(value.min(u64::from(weight))).unwrap_or(weight)
}

fn count_since(history: &[RequestPattern], now: DateTime<Utc>, window_seconds: u32) -> usize {
    let cutoff = now - Duration::seconds(i64::from(window_seconds));
    history
        .iter()
        .filter(|pattern| pattern.timestamp >= cutoff)
        .count()
}

fn intervals_ms(history: &[RequestPattern]) -> Vec<f64> {
    let mut timestamps: Vec<DateTime<Utc>> =
        history.iter().map(|pattern| pattern.timestamp).collect();
    timestamps.sort_unstable();

    timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64)
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn longest_identical_run(history: &[RequestPattern]) -> usize {
    let mut longest = 1;
    let mut current = 1;

    for pair in history.windows(2) {
        if pair[1].is_identical_request(&pair[0]) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }

    longest
}

fn has_low_variety(history: &[RequestPattern], config: &ActivityMonitorConfig) -> bool {
    if config.variety_sample_size == 0 || history.len() < config.variety_sample_size {
        return false;
    }

    let sample = &history[history.len() - config.variety_sample_size..];
    let unique_actions: HashSet<&str> = sample
        .iter()
        .map(|pattern| pattern.action.as_str())
        .collect();

    unique_actions.len() <= config.max_unique_actions_for_low_variety
}

fn has_consistent_timing(
    intervals: &[f64],
    mean_interval_ms: Option<f64>,
    config: &ActivityMonitorConfig,
) -> bool {
    let Some(mean) = mean_interval_ms else {
        return false;
    };
    if intervals.len() < config.consistency_min_intervals {
        return false;
    }
    // Simultaneous events are as regular as timing gets.
    if mean <= 0.0 {
        return true;
    }

    let variance = intervals
        .iter()
        .map(|interval| (interval - mean).powi(2))
        .sum::<f64>()
        / intervals.len() as f64;

    variance.sqrt() / mean < config.consistency_cv_threshold
}
