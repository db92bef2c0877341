// ==========================================
// Aggregator 集成测试
// ==========================================

mod helpers;

use chrono::{NaiveDate, NaiveDateTime};
use helpers::test_data_builder::ScheduleBuilder;
use std::collections::HashSet;
use yard_planner::domain::schedule::ScheduleItem;
use yard_planner::engine::Aggregator;

fn now(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 3, 15)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn schedule() -> Vec<ScheduleItem> {
    vec![
        ScheduleBuilder::new("s1").service("VISTORIA").quadra("A1 - NORTE").removals(3).at(2023, 3, 15, 8, 0).build(),
        ScheduleBuilder::new("s2").service("DESOVA").quadra("B2 - SUL").removals(3).at(2023, 3, 15, 9, 0).build(),
        ScheduleBuilder::new("s3").service("PESAGEM").quadra("B2 - SUL").removals(5).at(2023, 3, 16, 10, 0).build(),
        ScheduleBuilder::new("s4").service("VISTORIA").quadra("A1").removals(0).build(),
    ]
}

#[test]
fn test_full_report() {
    let items = schedule();
    let report = Aggregator::new().report(&items, None, &HashSet::new(), now(8, 30));

    assert_eq!(report.total_items, 4);
    assert_eq!(report.total_removals, 11);

    let services: Vec<&str> = report.services.iter().map(|s| s.service.as_str()).collect();
    // 同为 3 次时保持首次出现顺序
    assert_eq!(services, vec!["PESAGEM", "VISTORIA", "DESOVA"]);

    let vistoria = &report.services[1];
    assert_eq!(vistoria.count, 2);
    assert_eq!(vistoria.late, 1);
    assert_eq!(vistoria.on_time, 1);
    assert_eq!(vistoria.span.label(), "15/03/2023");

    let quadras: Vec<(&str, u64)> = report
        .quadras
        .iter()
        .map(|q| (q.quadra.as_str(), q.removals))
        .collect();
    assert_eq!(quadras, vec![("B2", 8), ("A1", 3)]);
    assert_eq!(report.quadras[0].span.label(), "15/03/2023 - 16/03/2023");
}

#[test]
fn test_report_for_one_day_with_completions() {
    let items = schedule();
    let completed: HashSet<String> = ["s1".to_string()].into_iter().collect();
    let day = NaiveDate::from_ymd_opt(2023, 3, 15);

    let report = Aggregator::new().report(&items, day, &completed, now(12, 0));

    assert_eq!(report.total_items, 2);
    assert_eq!(report.total_removals, 6);
    assert_eq!(report.execution.done_count, 1);
    assert_eq!(report.execution.done_removals, 3);
    assert_eq!(report.execution.pending_count, 1);
    assert!((report.execution.done_ratio() - 0.5).abs() < 1e-9);
    assert!(report.services.iter().all(|s| s.late == s.count));
}

#[test]
fn test_totals_match_grouped_sums() {
    let items = schedule();
    let aggregator = Aggregator::new();
    let all: Vec<&ScheduleItem> = items.iter().collect();

    let by_service: u64 = aggregator.service_stats(&all, now(0, 0)).iter().map(|s| s.removals).sum();
    let by_quadra: u64 = aggregator.quadra_stats(&all).iter().map(|q| q.removals).sum();
    let execution = aggregator.execution_stats(&all, &HashSet::new());

    assert_eq!(by_service, 11);
    assert_eq!(by_quadra, 11);
    assert_eq!(execution.pending_removals, 11);
}

#[test]
fn test_scheduled_dates() {
    let dates = Aggregator::new().scheduled_dates(&schedule());
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2023, 3, 15).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 16).unwrap(),
        ]
    );
}
