use crate::infra::{build_api, seed_directory, Api};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::Args;
use hireflow::config::SlaConfig;
use hireflow::error::AppError;
use hireflow::workflows::resume::domain::{DepartmentId, NewResume, PersonId, ResumeId, ResumeRecord};
use hireflow::workflows::resume::{available_actions, format_overdue, Clock, ManualClock};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Simulated start date (YYYY-MM-DD, 09:00 UTC). Defaults to now.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<DateTime<Utc>>,
    /// Print the closing reports as JSON instead of text.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| format!("invalid date '{value}': {err}"))?;
    let nine = NaiveTime::from_hms_opt(9, 0, 0).ok_or_else(|| "invalid start time".to_string())?;
    Ok(date.and_time(nine).and_utc())
}

fn person(id: &str) -> PersonId {
    PersonId(id.to_string())
}

fn department(id: &str) -> DepartmentId {
    DepartmentId(id.to_string())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args.start.unwrap_or_else(Utc::now);
    let clock = Arc::new(ManualClock::new(start));
    let sla = SlaConfig::default();
    let api = build_api(seed_directory()?, clock.clone(), &sla);

    println!("Hiring pipeline demo (simulated clock starts {start})");

    let hired = walk_to_expert(&api, "Grace Hopper", "referral", "ex-mei")?;
    step(&hired);

    clock.advance(Duration::hours(25));
    let sweep = api.monitor.sweep()?;
    println!(
        "\n25h later the SLA sweep flags {} case(s) overdue, {} imminent",
        sweep.overdue.len(),
        sweep.imminent.len()
    );
    for record in &sweep.overdue {
        let late = record
            .sla_deadline
            .map(|deadline| format_overdue(clock.now() - deadline))
            .unwrap_or_default();
        println!("  - {} overdue by {late}", record.candidate_name);
    }

    let mei = person("ex-mei");
    let explained = api.service.submit_overdue_reason(
        &hired.id,
        &mei,
        "interview panel rescheduled".to_string(),
    )?;
    println!(
        "  Expert explains: {}",
        explained.overdue_reason.as_deref().unwrap_or("-")
    );

    step(&api.service.record_identification(&hired.id, &mei, true, None)?);
    clock.advance(Duration::hours(3));
    step(&api.service.fill_contact_info(
        &hired.id,
        &person("l2-omar"),
        Some("grace@example.com".to_string()),
        None,
    )?);
    clock.advance(Duration::hours(6));
    step(&api.service.start_connection(&hired.id, &mei)?);
    clock.advance(Duration::days(2));
    step(&api.service.submit_feedback(
        &hired.id,
        &mei,
        "strong systems background, advance to offer".to_string(),
        true,
    )?);

    let requeued = walk_to_expert(&api, "Alan Turing", "job board", "ex-mei")?;
    step(&api.service.record_identification(&requeued.id, &mei, true, None)?);
    step(&api.service.fill_contact_info(
        &requeued.id,
        &person("l2-omar"),
        None,
        Some("+44 20 7946 0000".to_string()),
    )?);
    step(&api.service.start_connection(&requeued.id, &mei)?);
    step(&api.service.release(
        &requeued.id,
        &mei,
        Some("candidate prefers another team".to_string()),
    )?);

    let rejected = walk_to_expert(&api, "Ada Lovelace", "referral", "ex-tom")?;
    step(&api.service.record_identification(
        &rejected.id,
        &person("ex-tom"),
        false,
        Some("not a match for the platform role".to_string()),
    )?);

    print_audit(&api, &hired.id)?;
    print_inbox(&api, &mei)?;
    print_reports(&api, args.json)?;
    Ok(())
}

fn walk_to_expert(
    api: &Api,
    name: &str,
    source: &str,
    expert: &str,
) -> Result<ResumeRecord, AppError> {
    let intake = NewResume {
        candidate_name: name.to_string(),
        source: source.to_string(),
        document_ref: None,
    };

    println!("\nCandidate {name} ({source})");
    let record = api.service.upload(intake, &person("hr-lena"))?;
    step(&record);
    step(&api
        .service
        .submit_for_l2(&record.id, &person("hr-lena"), &department("eng"))?);
    step(&api
        .service
        .route_to_l3(&record.id, &person("l2-omar"), &department("eng-platform"))?);
    let assigned = api
        .service
        .assign_expert(&record.id, &person("l3-ravi"), &person(expert))?;
    Ok(assigned)
}

fn step(record: &ResumeRecord) {
    let actions: Vec<_> = available_actions(record)
        .into_iter()
        .map(|action| action.to_string())
        .collect();
    let deadline = record
        .sla_deadline
        .map(|deadline| format!(" | due {}", deadline.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();
    println!(
        "  -> {} [{}]{} | next: {}",
        record.status.label(),
        record.status,
        deadline,
        if actions.is_empty() {
            "none".to_string()
        } else {
            actions.join(", ")
        }
    );
}

fn print_audit(api: &Api, id: &ResumeId) -> Result<(), AppError> {
    println!("\nAudit trail for {id} (newest first)");
    for entry in api.service.audit_log(id)? {
        let operator = entry
            .operator
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "system".to_string());
        println!(
            "  - {} {} by {} -> {}{}",
            entry.created_at.format("%m-%d %H:%M"),
            entry.action,
            operator,
            entry.new_status,
            entry
                .comment
                .as_deref()
                .map(|comment| format!(" ({comment})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn print_inbox(api: &Api, recipient: &PersonId) -> Result<(), AppError> {
    let counts = api.service.notification_counts(recipient)?;
    println!(
        "\nInbox for {recipient}: {} message(s), {} unread",
        counts.total, counts.unread
    );
    for note in api.service.notifications(recipient, false, 5)? {
        println!("  - [{:?}] {}: {}", note.severity, note.title, note.body);
    }
    Ok(())
}

fn print_reports(api: &Api, json: bool) -> Result<(), AppError> {
    let stats = api.service.stats()?;
    let overdue = api.service.overdue_summary()?;
    let dwell = api.service.dwell_report()?;

    if json {
        let payload = serde_json::json!({
            "stats": stats,
            "overdue": overdue,
            "dwell": dwell,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
        );
        return Ok(());
    }

    println!("\nPipeline snapshot: {} case(s), {} overdue", stats.total, stats.overdue);
    for entry in stats.by_status.iter().filter(|entry| entry.count > 0) {
        println!("  - {}: {}", entry.status_label, entry.count);
    }
    println!(
        "Overdue cases awaiting an explanation: {} of {}",
        overdue.missing_reason, overdue.total_overdue
    );
    println!("Average dwell per stage:");
    for entry in &dwell.entries {
        println!(
            "  - {}: {:.1}h mean over {} exit(s), {:.1}h max",
            entry.status_label,
            entry.mean_seconds as f64 / 3600.0,
            entry.exits,
            entry.max_seconds as f64 / 3600.0
        );
    }
    Ok(())
}
