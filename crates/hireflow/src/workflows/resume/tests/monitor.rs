use super::common::*;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::workflows::resume::domain::{
    ActionType, Department, DepartmentId, Person, PersonId, ResumeStatus, Role, Severity,
};
use crate::workflows::resume::{
    spawn_sla_monitor, Clock, Directory, MemoryDirectory, MemoryNotificationSink,
    RepositoryError, ResumeFilter, ResumeRepository, SlaMonitor, SlaMonitorConfig, SweepError,
};

#[test]
fn breach_scan_flags_item_and_escalates() {
    let h = harness();
    let assigned = h.item_in(ResumeStatus::WaitIdentify);
    let expert_before = h.inbox("expert-ada").len();
    let managers_before = h.inbox("mgr-eng").len();

    h.clock.advance(Duration::hours(25));
    let report = h.monitor.sweep().expect("sweep runs");

    assert_eq!(report.overdue.len(), 1);
    assert!(report.failed.is_empty());
    let flagged = h.stored(&assigned.id);
    assert!(flagged.is_overdue);
    assert_eq!(flagged.status, ResumeStatus::WaitIdentify);
    assert!(flagged.sla_consistent());
    assert!(flagged.sla_deadline.unwrap() < h.clock.now());

    let entry = h.history(&assigned.id).pop().unwrap();
    assert_eq!(entry.action, ActionType::OverdueFlagged);
    assert_eq!(entry.operator, None);
    assert_eq!(entry.previous_status, Some(ResumeStatus::WaitIdentify));
    assert_eq!(entry.new_status, ResumeStatus::WaitIdentify);

    let expert_inbox = h.inbox("expert-ada");
    assert_eq!(expert_inbox.len(), expert_before + 1);
    assert_eq!(expert_inbox[0].severity, Severity::Urgent);
    assert_eq!(expert_inbox[0].overdue_for.as_deref(), Some("1h"));

    for manager in ["mgr-eng", "mgr-eng-2"] {
        let inbox = h.inbox(manager);
        assert_eq!(inbox.len(), managers_before + 1);
        assert_eq!(inbox[0].severity, Severity::Warning);
        assert_eq!(inbox[0].current_handler.as_deref(), Some("Ada Expert"));
    }
    assert!(h.inbox("mgr-sales").is_empty());
    assert_eq!(
        h.delivered_to("expert-ada")
            .iter()
            .filter(|note| note.severity == Severity::Urgent)
            .count(),
        1
    );
}

#[test]
fn flagged_items_are_not_flagged_twice() {
    let h = harness();
    let assigned = h.item_in(ResumeStatus::WaitIdentify);
    h.clock.advance(Duration::hours(30));
    h.monitor.sweep().unwrap();
    let entries = h.history(&assigned.id).len();

    h.clock.advance(Duration::hours(1));
    let second = h.monitor.sweep().unwrap();
    assert!(second.overdue.is_empty());
    assert!(second.imminent.is_empty());
    assert_eq!(h.history(&assigned.id).len(), entries);
}

#[test]
fn imminent_deadlines_only_send_reminders() {
    let h = harness();
    let assigned = h.item_in(ResumeStatus::WaitIdentify);
    let before = h.inbox("expert-ada").len();

    h.clock.advance(Duration::hours(21));
    let report = h.monitor.sweep().expect("sweep runs");

    assert!(report.overdue.is_empty());
    assert_eq!(report.imminent.len(), 1);
    assert_eq!(h.stored(&assigned.id), assigned);
    assert_eq!(h.history(&assigned.id).len(), 4);

    let inbox = h.inbox("expert-ada");
    assert_eq!(inbox.len(), before + 1);
    assert_eq!(inbox[0].severity, Severity::Warning);
    assert!(inbox[0].body.contains("due in 3h"));
}

#[test]
fn deadline_boundaries_are_strict() {
    let h = harness();
    let assigned = h.item_in(ResumeStatus::WaitIdentify);

    // Exactly at the deadline: neither breached nor imminent.
    h.clock.advance(Duration::hours(24));
    let report = h.monitor.sweep().unwrap();
    assert!(report.overdue.is_empty());
    assert!(report.imminent.is_empty());
    assert!(!h.stored(&assigned.id).is_overdue);

    // Exactly at the end of the lookahead window: imminent.
    let h = harness();
    h.item_in(ResumeStatus::WaitIdentify);
    h.clock.advance(Duration::hours(20));
    let report = h.monitor.run_sla_sweep(Duration::hours(4)).unwrap();
    assert_eq!(report.imminent.len(), 1);
}

#[test]
fn items_without_deadlines_are_ignored() {
    let h = harness();
    h.item_in(ResumeStatus::PoolL3);
    let waiting = h.item_in(ResumeStatus::WaitFeedback);
    h.service
        .submit_feedback(&waiting.id, &pid("expert-ada"), "good fit".to_string(), false)
        .unwrap();

    h.clock.advance(Duration::days(30));
    let report = h.monitor.sweep().unwrap();
    assert!(report.overdue.is_empty());
    assert!(report.imminent.is_empty());
}

#[test]
fn items_moved_since_the_scan_are_skipped() {
    let h = harness_with(SnapshotStore::default(), MemoryNotificationSink::default());
    let assigned = h.item_in(ResumeStatus::WaitIdentify);
    h.clock.advance(Duration::hours(25));

    let stale = h
        .store
        .inner
        .query(&ResumeFilter {
            statuses: Some(vec![ResumeStatus::WaitIdentify]),
            ..ResumeFilter::default()
        })
        .unwrap();
    h.service
        .record_identification(&assigned.id, &pid("expert-ada"), true, None)
        .expect("expert acts before the sweep commits");
    *h.store.snapshot.lock().unwrap() = Some(stale);

    let report = h.monitor.sweep().unwrap();
    assert!(report.overdue.is_empty());
    assert_eq!(report.skipped, vec![assigned.id.clone()]);

    let current = h.stored(&assigned.id);
    assert_eq!(current.status, ResumeStatus::WaitContactInfo);
    assert!(!current.is_overdue);
    assert!(h
        .history(&assigned.id)
        .iter()
        .all(|entry| entry.action != ActionType::OverdueFlagged));
}

#[test]
fn one_failing_item_does_not_stop_the_sweep() {
    let h = harness_with(SnapshotStore::default(), MemoryNotificationSink::default());
    let broken = h.item_in(ResumeStatus::WaitIdentify);
    let healthy = h.item_in(ResumeStatus::WaitIdentify);
    *h.store.refuse_commit.lock().unwrap() = Some(broken.id.clone());
    let urgent_before = h
        .inbox("expert-ada")
        .iter()
        .filter(|note| note.severity == Severity::Urgent)
        .count();

    h.clock.advance(Duration::hours(25));
    let report = h.monitor.sweep().expect("sweep completes despite one failure");

    assert_eq!(report.failed, vec![broken.id.clone()]);
    assert_eq!(report.overdue.len(), 1);
    assert_eq!(report.overdue[0].id, healthy.id);
    assert!(h.stored(&healthy.id).is_overdue);
    assert!(!h.stored(&broken.id).is_overdue);

    let urgent = h
        .inbox("expert-ada")
        .into_iter()
        .filter(|note| note.severity == Severity::Urgent)
        .collect::<Vec<_>>();
    assert_eq!(urgent.len(), urgent_before + 1);
    assert_eq!(urgent[0].resume_id.as_ref(), Some(&healthy.id));
}

#[test]
fn huge_lookahead_has_no_upper_bound() {
    let h = harness();
    h.item_in(ResumeStatus::WaitFeedback);

    let report = h
        .monitor
        .run_sla_sweep(Duration::max_value())
        .expect("lookahead past the calendar is clamped");
    assert_eq!(report.imminent.len(), 1);
    assert!(report.overdue.is_empty());
}

#[test]
fn inactive_handler_is_skipped_but_managers_hear() {
    let h = harness();
    h.item_in(ResumeStatus::WaitIdentify);
    h.directory.set_active(&pid("expert-ada"), false).unwrap();
    let before = h.inbox("expert-ada").len();

    h.clock.advance(Duration::hours(25));
    let report = h.monitor.sweep().unwrap();
    assert_eq!(report.overdue.len(), 1);
    assert_eq!(h.inbox("expert-ada").len(), before);
    assert_eq!(
        h.inbox("mgr-eng")
            .iter()
            .filter(|note| note.severity == Severity::Warning && note.overdue_for.is_some())
            .count(),
        1
    );
}

#[test]
fn store_outage_aborts_the_sweep() {
    let h = harness_with(UnavailableStore, MemoryNotificationSink::default());
    match h.monitor.sweep() {
        Err(SweepError::Store(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected store failure, got {other:?}"),
    }
}

/// Directory that parks the first department lookup until released.
struct GatedDirectory {
    inner: MemoryDirectory,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl Directory for GatedDirectory {
    fn person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError> {
        self.inner.person(id)
    }

    fn department(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let entered = self.entered.lock().unwrap().take();
        if let Some(entered) = entered {
            entered.send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.department(id)
    }

    fn active_members(
        &self,
        department: &DepartmentId,
        role: Role,
    ) -> Result<Vec<Person>, RepositoryError> {
        self.inner.active_members(department, role)
    }
}

#[test]
fn overlapping_sweeps_are_refused() {
    let h = harness();
    h.item_in(ResumeStatus::WaitIdentify);
    h.clock.advance(Duration::hours(25));

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let directory = Arc::new(GatedDirectory {
        inner: (*h.directory).clone(),
        entered: Mutex::new(Some(entered_tx)),
        release: Mutex::new(release_rx),
    });
    let clock: Arc<dyn Clock> = h.clock.clone();
    let monitor = Arc::new(SlaMonitor::new(
        h.store.clone(),
        directory,
        h.sink.clone(),
        clock,
        SlaMonitorConfig::default(),
    ));

    let running = {
        let monitor = monitor.clone();
        thread::spawn(move || monitor.sweep())
    };
    entered_rx.recv().expect("first sweep reaches the directory");

    assert!(matches!(monitor.sweep(), Err(SweepError::AlreadyRunning)));

    release_tx.send(()).unwrap();
    let first = running.join().unwrap().expect("first sweep completes");
    assert_eq!(first.overdue.len(), 1);
    assert!(monitor.sweep().is_ok(), "guard released after completion");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduled_monitor_sweeps_until_shutdown() {
    let h = harness();
    let assigned = h.item_in(ResumeStatus::WaitIdentify);
    h.clock.advance(Duration::hours(25));

    let clock: Arc<dyn Clock> = h.clock.clone();
    let monitor = Arc::new(SlaMonitor::new(
        h.store.clone(),
        h.directory.clone(),
        h.sink.clone(),
        clock,
        SlaMonitorConfig {
            interval: StdDuration::from_millis(20),
            lookahead: Duration::hours(4),
        },
    ));
    let handle = spawn_sla_monitor(monitor);

    let mut flagged = false;
    for _ in 0..100 {
        if h.stored(&assigned.id).is_overdue {
            flagged = true;
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
    assert!(flagged, "scheduled sweep should flag the overdue item");

    let token = handle.cancellation_token();
    tokio::time::timeout(StdDuration::from_secs(5), handle.shutdown())
        .await
        .expect("monitor stops promptly");
    assert!(token.is_cancelled());
}
