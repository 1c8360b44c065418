use hireflow::config::SlaConfig;
use hireflow::workflows::resume::domain::{
    Department, DepartmentId, DepartmentLevel, Notification, Person, PersonId, Role,
};
use hireflow::workflows::resume::{
    Clock, DirectoryError, MemoryDirectory, MemoryResumeStore, NotificationSink, ResumeApi,
    ResumeWorkflowService, SinkError, SlaMonitor,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Delivery stand-in until a push or mail transport is wired in: records each message in the log.
#[derive(Default, Clone)]
pub(crate) struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn enqueue(&self, notification: &Notification) -> Result<(), SinkError> {
        info!(
            recipient = %notification.recipient,
            severity = ?notification.severity,
            title = %notification.title,
            link = notification.link.as_deref().unwrap_or("-"),
            "notification queued"
        );
        Ok(())
    }
}

pub(crate) type Api = ResumeApi<MemoryResumeStore, MemoryDirectory, TracingNotificationSink>;

/// Wire the in-process store, directory, and sink into one service and one monitor.
pub(crate) fn build_api(
    directory: MemoryDirectory,
    clock: Arc<dyn Clock>,
    sla: &SlaConfig,
) -> Arc<Api> {
    let store = Arc::new(MemoryResumeStore::default());
    let directory = Arc::new(directory);
    let sink = Arc::new(TracingNotificationSink);

    let service = Arc::new(ResumeWorkflowService::new(
        store.clone(),
        directory.clone(),
        sink.clone(),
        clock.clone(),
        sla.policy(),
    ));
    let monitor = Arc::new(SlaMonitor::new(store, directory, sink, clock, sla.monitor()));
    Arc::new(ResumeApi { service, monitor })
}

/// Sample organisation used by `serve` and `demo` until a real directory backs the service.
pub(crate) fn seed_directory() -> Result<MemoryDirectory, DirectoryError> {
    let directory = MemoryDirectory::default();
    let departments = [
        ("eng", "Engineering", DepartmentLevel::Level2, None),
        ("eng-platform", "Platform", DepartmentLevel::Level3, Some("eng")),
        ("eng-data", "Data", DepartmentLevel::Level3, Some("eng")),
        ("ops", "Operations", DepartmentLevel::Level2, None),
        ("ops-support", "Customer Support", DepartmentLevel::Level3, Some("ops")),
    ];
    for (id, name, level, parent) in departments {
        directory.add_department(Department {
            id: DepartmentId(id.to_string()),
            name: name.to_string(),
            level,
            parent: parent.map(|parent| DepartmentId(parent.to_string())),
        })?;
    }

    let people = [
        ("hr-lena", "Lena Park", Role::Hr, None),
        ("l2-omar", "Omar Haddad", Role::L2Manager, Some("eng")),
        ("l2-june", "June Okafor", Role::L2Manager, Some("ops")),
        ("l3-ravi", "Ravi Menon", Role::L3Assistant, Some("eng-platform")),
        ("ex-mei", "Mei Chen", Role::Expert, Some("eng-platform")),
        ("ex-tom", "Tom Varga", Role::Expert, Some("eng-platform")),
        ("admin", "Administrator", Role::Admin, None),
    ];
    for (id, name, role, department) in people {
        directory.add_person(Person {
            id: PersonId(id.to_string()),
            name: name.to_string(),
            role,
            department: department.map(|department| DepartmentId(department.to_string())),
            active: true,
        })?;
    }
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow::workflows::resume::{Directory, SystemClock};

    #[test]
    fn seeded_directory_links_teams_to_managers() {
        let directory = seed_directory().expect("seed is consistent");
        let managers = directory
            .active_members(&DepartmentId("eng".to_string()), Role::L2Manager)
            .unwrap();
        assert_eq!(managers.len(), 1);
        assert_eq!(managers[0].id, PersonId("l2-omar".to_string()));

        let platform = directory
            .department(&DepartmentId("eng-platform".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(platform.parent, Some(DepartmentId("eng".to_string())));
    }

    #[test]
    fn build_api_uses_configured_windows() {
        let sla = SlaConfig {
            identify_hours: 8,
            connection_hours: 24,
            feedback_hours: 48,
            sweep_interval_minutes: 10,
            lookahead_hours: 2,
        };
        let api = build_api(seed_directory().unwrap(), Arc::new(SystemClock), &sla);
        assert_eq!(api.service.policy().identify, chrono::Duration::hours(8));
        assert_eq!(
            api.monitor.config().interval,
            std::time::Duration::from_secs(600)
        );
    }
}
