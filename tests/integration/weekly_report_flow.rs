#[path = "../common/mod.rs"]
mod common;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use common::{invoker, seed_user, temp_pool, Reply, ScriptedBackend, REPORT_REPLY};
use std::sync::Arc;
use tempo_insights_lib::db::repositories::report_repository::ReportRepository;
use tempo_insights_lib::db::repositories::user_repository::UserRepository;
use tempo_insights_lib::db::DbPool;
use tempo_insights_lib::error::{AiErrorCode, AppError, ErrorKind};
use tempo_insights_lib::models::insights::{
    NarrativeSource, ReportNarrative, ReportStatus, WeeklyReportRequest,
};
use tempo_insights_lib::services::weekly_report_service::WeeklyReportService;

const USER: &str = "user-ada";

fn wednesday() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-21T15:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn service(pool: &DbPool, backend: Arc<ScriptedBackend>) -> WeeklyReportService {
    WeeklyReportService::new(pool.clone(), invoker(backend), Tz::UTC, "gemini-2.0-flash")
}

fn report_count(pool: &DbPool) -> i64 {
    pool.with_connection(|conn| ReportRepository::count_for_user(conn, USER))
        .expect("count reports")
}

#[tokio::test]
async fn generates_report_from_week_metrics() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, Some("Ada"));
    let backend = ScriptedBackend::new(vec![Reply::Text(REPORT_REPLY.into())]);

    let outcome = service(&pool, backend.clone())
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("report");

    assert_eq!(outcome.status, ReportStatus::Created);
    assert_eq!(outcome.narrative_source, NarrativeSource::Model);

    let report = &outcome.report;
    assert_eq!(report.week_start.to_rfc3339(), "2026-10-18T00:00:00+00:00");
    assert_eq!(
        report.week_end,
        DateTime::parse_from_rfc3339("2026-10-24T23:59:59.999Z").unwrap()
    );
    assert_eq!(report.tasks_completed, 12);
    assert_eq!(report.habits_completed, 5);
    assert!((report.total_focus_hours - 4.5).abs() < 1e-9);
    assert!((report.productivity_score - 77.666_666_666).abs() < 1e-6);
    assert_eq!(report.strengths, vec!["Consistent mornings", "Long focus blocks"]);

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "gemini-2.0-flash");
    let prompt = &calls[0].1;
    assert!(prompt.contains("User: Ada"));
    assert!(prompt.contains("Week: 2026-10-18 to 2026-10-24"));
    assert!(prompt.contains("- Total Focus Hours: 4.5"));
    assert!(prompt.contains("- Average Productivity Score: 78/100"));
    assert!(prompt.contains("- Number of Active Habits: 2"));
    assert!(prompt.contains("2026-10-19: 5 tasks, 2 habits, 120min focus, 85/100 score"));
}

#[tokio::test]
async fn second_generation_returns_stored_report() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::always(REPORT_REPLY);
    let service = service(&pool, backend.clone());

    let first = service
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("first");
    let second = service
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("second");

    assert!(first.is_new());
    assert_eq!(second.status, ReportStatus::AlreadyExists);
    assert_eq!(second.narrative_source, NarrativeSource::Stored);
    assert_eq!(second.report, first.report);
    assert_eq!(backend.call_count(), 1);
    assert_eq!(report_count(&pool), 1);
}

#[tokio::test]
async fn unparseable_reply_stores_fallback_narrative() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::new(vec![Reply::Text("not json".into())]);

    let outcome = service(&pool, backend)
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("fallback report");

    assert_eq!(outcome.narrative_source, NarrativeSource::Fallback);
    let fallback = ReportNarrative::fallback();
    assert_eq!(outcome.report.summary, fallback.summary);
    assert_eq!(outcome.report.strengths, fallback.strengths);
    assert_eq!(outcome.report.improvements, fallback.improvements);
    assert_eq!(outcome.report.suggestions, fallback.suggestions);
    assert_eq!(report_count(&pool), 1);
}

#[tokio::test]
async fn partial_payload_is_repaired() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::new(vec![Reply::Text(
        r#"{"strengths": "many", "improvements": ["sleep", 7], "suggestions": null}"#.into(),
    )]);

    let outcome = service(&pool, backend)
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("repaired report");

    assert_eq!(outcome.narrative_source, NarrativeSource::Model);
    assert_eq!(outcome.report.summary, "");
    assert!(outcome.report.strengths.is_empty());
    assert_eq!(outcome.report.improvements, vec!["sleep"]);
    assert!(outcome.report.suggestions.is_empty());
}

#[tokio::test]
async fn backend_failure_propagates_and_stores_nothing() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::new(vec![Reply::Fail(AiErrorCode::RateLimited)]);

    let error = service(&pool, backend)
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect_err("quota exhausted");

    assert_eq!(error.kind(), ErrorKind::Backend);
    assert_eq!(error.ai_code(), Some(AiErrorCode::RateLimited));
    assert_eq!(report_count(&pool), 0);
}

#[tokio::test]
async fn concurrent_generations_store_one_report() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::always(REPORT_REPLY);
    let service = service(&pool, backend.clone());

    let (left, right) = futures::join!(
        service.generate_at(USER, WeeklyReportRequest::default(), wednesday()),
        service.generate_at(USER, WeeklyReportRequest::default(), wednesday()),
    );
    let left = left.expect("left");
    let right = right.expect("right");

    assert_eq!(left.report.id, right.report.id);
    let created = [&left, &right].iter().filter(|outcome| outcome.is_new()).count();
    assert_eq!(created, 1);
    assert_eq!(backend.call_count(), 2);
    assert_eq!(report_count(&pool), 1);
}

#[tokio::test]
async fn empty_week_has_zero_scores() {
    let (pool, _dir) = temp_pool();
    pool.with_connection(|conn| UserRepository::upsert_user(conn, USER, Some("New user")))
        .expect("user");
    let backend = ScriptedBackend::always(REPORT_REPLY);

    let outcome = service(&pool, backend.clone())
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("empty report");

    assert_eq!(outcome.report.productivity_score, 0.0);
    assert_eq!(outcome.report.total_focus_hours, 0.0);
    assert_eq!(outcome.report.tasks_completed, 0);
    assert!(backend.calls()[0].1.contains("- Number of Active Habits: 0"));
}

#[tokio::test]
async fn explicit_end_shortens_the_sunday_week() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::always(REPORT_REPLY);

    let outcome = service(&pool, backend)
        .generate_at(
            USER,
            WeeklyReportRequest {
                week_start: Some("2026-10-21".into()),
                week_end: Some("2026-10-19".into()),
            },
            wednesday(),
        )
        .await
        .expect("shortened week");

    assert_eq!(outcome.report.tasks_completed, 8);
    assert_eq!(outcome.report.week_start.to_rfc3339(), "2026-10-18T00:00:00+00:00");
    assert_eq!(
        outcome.report.week_end,
        DateTime::parse_from_rfc3339("2026-10-19T23:59:59.999Z").unwrap()
    );
}

#[tokio::test]
async fn mid_week_start_finds_report_of_same_week() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::always(REPORT_REPLY);
    let service = service(&pool, backend.clone());

    let first = service
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("default week");
    let second = service
        .generate_at(
            USER,
            WeeklyReportRequest {
                week_start: Some("2026-10-21".into()),
                week_end: None,
            },
            wednesday(),
        )
        .await
        .expect("mid-week start");

    assert_eq!(first.status, ReportStatus::Created);
    assert_eq!(second.status, ReportStatus::AlreadyExists);
    assert_eq!(second.report.id, first.report.id);
    assert_eq!(backend.call_count(), 1);
    assert_eq!(report_count(&pool), 1);
}

#[tokio::test]
async fn user_checks_run_before_anything_else() {
    let (pool, _dir) = temp_pool();
    let backend = ScriptedBackend::always(REPORT_REPLY);
    let service = service(&pool, backend.clone());

    let blank = service
        .generate_at("  ", WeeklyReportRequest::default(), wednesday())
        .await
        .expect_err("blank user");
    assert_eq!(blank.kind(), ErrorKind::InvalidRequest);

    let unknown = service
        .generate_at("ghost", WeeklyReportRequest::default(), wednesday())
        .await
        .expect_err("unknown user");
    assert!(matches!(unknown, AppError::NotFound));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn latest_returns_most_recent_report() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, USER, None);
    let backend = ScriptedBackend::always(REPORT_REPLY);
    let service = service(&pool, backend);

    assert!(service.latest(USER).expect("no reports yet").is_none());

    service
        .generate_at(
            USER,
            WeeklyReportRequest {
                week_start: Some("2026-10-11".into()),
                week_end: None,
            },
            wednesday(),
        )
        .await
        .expect("earlier week");
    let current = service
        .generate_at(USER, WeeklyReportRequest::default(), wednesday())
        .await
        .expect("current week");

    let latest = service.latest(USER).expect("latest").expect("a report");
    assert_eq!(latest.id, current.report.id);
}
