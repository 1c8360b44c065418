use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::domain::{AuditEntry, ResumeRecord, ResumeStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ResumeStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Pipeline totals per status and source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total: usize,
    pub overdue: usize,
    pub by_status: Vec<StatusCount>,
    pub by_source: BTreeMap<String, usize>,
}

impl PipelineStats {
    pub fn from_records(records: &[ResumeRecord]) -> Self {
        let mut per_status: HashMap<ResumeStatus, usize> = HashMap::new();
        let mut by_source = BTreeMap::new();
        let mut overdue = 0;
        for record in records {
            *per_status.entry(record.status).or_default() += 1;
            *by_source.entry(record.source.clone()).or_default() += 1;
            if record.is_overdue {
                overdue += 1;
            }
        }

        Self {
            total: records.len(),
            overdue,
            by_status: counts(&per_status, ResumeStatus::ordered()),
            by_source,
        }
    }
}

/// Overdue items grouped by the waiting state they are stuck in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueSummary {
    pub total_overdue: usize,
    pub by_status: Vec<StatusCount>,
    pub missing_reason: usize,
}

impl OverdueSummary {
    pub fn from_records(records: &[ResumeRecord]) -> Self {
        let overdue: Vec<&ResumeRecord> = records.iter().filter(|record| record.is_overdue).collect();
        let mut per_status: HashMap<ResumeStatus, usize> = HashMap::new();
        for record in &overdue {
            *per_status.entry(record.status).or_default() += 1;
        }
        let by_status = counts(&per_status, ResumeStatus::SLA_BEARING)
            .into_iter()
            .filter(|entry| entry.count > 0)
            .collect();

        Self {
            total_overdue: overdue.len(),
            by_status,
            missing_reason: overdue
                .iter()
                .filter(|record| record.overdue_reason.is_none())
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DwellEntry {
    pub status: ResumeStatus,
    pub status_label: &'static str,
    pub exits: usize,
    pub mean_seconds: i64,
    pub max_seconds: i64,
}

/// Time spent in each status before leaving it, taken from the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DwellReport {
    pub entries: Vec<DwellEntry>,
}

impl DwellReport {
    /// Only entries that changed status count; overdue flags and reasons leave the item in place.
    pub fn from_entries(entries: &[AuditEntry]) -> Self {
        let mut samples: HashMap<ResumeStatus, Vec<i64>> = HashMap::new();
        for entry in entries {
            let (Some(previous), Some(dwell)) = (entry.previous_status, entry.dwell_seconds) else {
                continue;
            };
            if previous == entry.new_status {
                continue;
            }
            samples.entry(previous).or_default().push(dwell);
        }

        let entries = ResumeStatus::ordered()
            .into_iter()
            .filter_map(|status| {
                let values = samples.get(&status)?;
                let total: i64 = values.iter().sum();
                Some(DwellEntry {
                    status,
                    status_label: status.label(),
                    exits: values.len(),
                    mean_seconds: total / values.len() as i64,
                    max_seconds: values.iter().copied().max().unwrap_or_default(),
                })
            })
            .collect();

        Self { entries }
    }
}

/// One inbox bucket; pool buckets carry a preview, expert buckets everything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskBucket {
    pub kind: &'static str,
    pub count: usize,
    pub items: Vec<ResumeRecord>,
}

/// One page of a newest-first listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub const DEFAULT_SIZE: usize = 20;
    pub const MAX_SIZE: usize = 100;

    /// Slice `all` into page `page` (1-based). Pages past the end are empty.
    pub fn slice(all: Vec<T>, page: usize, page_size: usize) -> Self {
        let total = all.len();
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        let items = all.into_iter().skip(skip).take(page_size).collect();
        Self {
            items,
            total,
            page,
            page_size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

fn counts<const N: usize>(
    per_status: &HashMap<ResumeStatus, usize>,
    order: [ResumeStatus; N],
) -> Vec<StatusCount> {
    order
        .into_iter()
        .map(|status| StatusCount {
            status,
            status_label: status.label(),
            count: per_status.get(&status).copied().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::resume::domain::{ActionType, NewResume, PersonId};
    use chrono::{TimeZone, Utc};

    fn record(status: ResumeStatus, source: &str, overdue: bool) -> ResumeRecord {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let mut record = ResumeRecord::new(
            NewResume {
                candidate_name: "Katherine Johnson".to_string(),
                source: source.to_string(),
                document_ref: None,
            },
            PersonId("hr-1".to_string()),
            now,
        );
        record.status = status;
        record.is_overdue = overdue;
        record
    }

    #[test]
    fn stats_cover_every_status_in_order() {
        let records = vec![
            record(ResumeStatus::PoolHr, "referral", false),
            record(ResumeStatus::PoolHr, "job-board", false),
            record(ResumeStatus::WaitIdentify, "referral", true),
        ];
        let stats = PipelineStats::from_records(&records);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.by_status.len(), ResumeStatus::ordered().len());
        assert_eq!(stats.by_status[0].status, ResumeStatus::PoolHr);
        assert_eq!(stats.by_status[0].count, 2);
        assert_eq!(stats.by_source.get("referral"), Some(&2));
    }

    #[test]
    fn overdue_summary_counts_missing_reasons() {
        let mut explained = record(ResumeStatus::WaitFeedback, "referral", true);
        explained.overdue_reason = Some("candidate travelling".to_string());
        let records = vec![
            explained,
            record(ResumeStatus::WaitIdentify, "referral", true),
            record(ResumeStatus::PoolL2, "referral", false),
        ];
        let summary = OverdueSummary::from_records(&records);

        assert_eq!(summary.total_overdue, 2);
        assert_eq!(summary.missing_reason, 1);
        let statuses: Vec<_> = summary.by_status.iter().map(|entry| entry.status).collect();
        assert_eq!(
            statuses,
            vec![ResumeStatus::WaitIdentify, ResumeStatus::WaitFeedback]
        );
    }

    #[test]
    fn dwell_ignores_entries_that_keep_the_status() {
        let before = record(ResumeStatus::WaitIdentify, "referral", false);
        let mut after = before.clone();
        after.status = ResumeStatus::WaitContactInfo;
        let later = before.created_at + chrono::Duration::hours(6);

        let moved = AuditEntry::transition(&before, &after, None, ActionType::IdentifyYes, None, later);
        let flagged = AuditEntry::transition(
            &before,
            &before,
            None,
            ActionType::OverdueFlagged,
            None,
            later,
        );
        let report = DwellReport::from_entries(&[moved, flagged, AuditEntry::upload(&before)]);

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].status, ResumeStatus::WaitIdentify);
        assert_eq!(report.entries[0].exits, 1);
        assert_eq!(report.entries[0].mean_seconds, 6 * 3600);
    }

    #[test]
    fn page_slices_and_reports_total() {
        let page = Page::slice((1..=45).collect::<Vec<_>>(), 3, 20);
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);

        let past_end = Page::slice(vec![1, 2, 3], 4, 2);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 3);
    }
}
