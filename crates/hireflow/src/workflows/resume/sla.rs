use chrono::{DateTime, Duration, Utc};

use super::domain::ResumeStatus;

/// Deadline windows for the three SLA-bearing waiting states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaPolicy {
    pub identify: Duration,
    pub connection: Duration,
    pub feedback: Duration,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            identify: Duration::hours(24),
            connection: Duration::hours(24),
            feedback: Duration::hours(120),
        }
    }
}

impl SlaPolicy {
    pub fn window(&self, status: ResumeStatus) -> Option<Duration> {
        match status {
            ResumeStatus::WaitIdentify => Some(self.identify),
            ResumeStatus::WaitConnection => Some(self.connection),
            ResumeStatus::WaitFeedback => Some(self.feedback),
            _ => None,
        }
    }

    pub fn deadline_for(&self, status: ResumeStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window(status).map(|window| now + window)
    }
}

/// Monitor cadence and lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaMonitorConfig {
    pub interval: std::time::Duration,
    pub lookahead: Duration,
}

impl Default for SlaMonitorConfig {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(30 * 60),
            lookahead: Duration::hours(4),
        }
    }
}

/// Whole hours, switching to days and hours from 24h on.
pub fn format_overdue(elapsed: Duration) -> String {
    let hours = elapsed.num_hours().max(0);
    if hours < 24 {
        return format!("{hours}h");
    }
    format!("{}d {}h", hours / 24, hours % 24)
}

/// Remaining time rounded down to whole hours.
pub fn format_remaining(remaining: Duration) -> String {
    let hours = remaining.num_hours().max(0);
    if hours > 0 {
        format!("{hours}h")
    } else {
        "less than 1h".to_string()
    }
}
