// Error taxonomy and boundary-code tests

#[path = "../common/mod.rs"]
mod common;

use common::{day, invoker, seed_user, temp_pool, Reply, ScriptedBackend};
use serde_json::json;
use tempo_insights_lib::commands::CommandError;
use tempo_insights_lib::db::migrations::get_migration_history;
use tempo_insights_lib::db::repositories::daily_stats_repository::DailyStatsRepository;
use tempo_insights_lib::error::{AiErrorCode, AppError, ErrorKind};
use tempo_insights_lib::models::ai_types::ArtifactKind;
use tempo_insights_lib::models::insights::{GoalPlanRequest, WeeklyReportRequest};
use tempo_insights_lib::services::ai_service::testing::map_http_error;
use tempo_insights_lib::services::insight_service::InsightService;
use tempo_insights_lib::services::model_invoker::parse_model_output;
use tempo_insights_lib::services::schema_validator::{check, validate_artifact};
use tempo_insights_lib::services::weekly_report_service::WeeklyReportService;

#[test]
fn every_error_kind_has_a_stable_boundary_code() {
    let cases = vec![
        (AppError::invalid_request("goal is required"), ErrorKind::InvalidRequest, "INVALID_REQUEST"),
        (AppError::ai(AiErrorCode::MalformedOutput, "bad"), ErrorKind::ModelOutput, "MODEL_OUTPUT_INVALID"),
        (AppError::validation("steps"), ErrorKind::Validation, "VALIDATION_ERROR"),
        (AppError::ai(AiErrorCode::HttpTimeout, "slow"), ErrorKind::Backend, "HTTP_TIMEOUT"),
        (
            AppError::ai(AiErrorCode::RejectedRequest, "bad body"),
            ErrorKind::Backend,
            "BACKEND_REJECTED_REQUEST",
        ),
        (AppError::not_found(), ErrorKind::Persistence, "NOT_FOUND"),
        (AppError::conflict("dup"), ErrorKind::Persistence, "CONFLICT"),
        (AppError::database("locked"), ErrorKind::Persistence, "UNKNOWN"),
        (AppError::other("boom"), ErrorKind::Internal, "UNKNOWN"),
    ];

    for (error, kind, code) in cases {
        assert_eq!(error.kind(), kind, "kind of {error}");
        assert_eq!(CommandError::from(error).code, code);
    }
}

#[test]
fn backend_rejection_is_not_reported_as_caller_fault() {
    for status in [reqwest::StatusCode::BAD_REQUEST, reqwest::StatusCode::NOT_FOUND] {
        let (backend, _) = map_http_error(status);
        let backend = CommandError::from(backend);
        let client = CommandError::from(AppError::invalid_request("goal is required"));

        assert_eq!(backend.code, "BACKEND_REJECTED_REQUEST");
        assert_eq!(client.code, "INVALID_REQUEST");
        assert_ne!(backend.code, client.code);
    }
}

#[test]
fn parse_and_schema_failures_are_distinct() {
    let parse = parse_model_output("```json\n{\"goal\": \n```").expect_err("truncated json");
    assert_eq!(parse.kind(), ErrorKind::ModelOutput);

    let value = json!({ "goal": "x", "steps": ["only one"], "timeline": "t", "focus": "f" });
    let violations = check(ArtifactKind::GoalPlan, &value).expect("schema compiles");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].path, "/steps");

    let schema = validate_artifact::<serde_json::Value>(ArtifactKind::GoalPlan, value)
        .expect_err("one step is too few");
    assert_eq!(schema.kind(), ErrorKind::Validation);
}

#[test]
fn negative_daily_stats_are_rejected_by_the_store() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, "user-1", None);

    let error = pool
        .with_connection(|conn| DailyStatsRepository::upsert(conn, "user-1", &day("2026-10-21", -1, 0, 0, 0.0)))
        .expect_err("negative tasks");
    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn database_records_applied_migrations() {
    let (pool, _dir) = temp_pool();
    let history = pool
        .with_connection(|conn| get_migration_history(conn))
        .expect("history");

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version, 1);
}

#[tokio::test]
async fn inverted_week_bounds_are_invalid_request() {
    let (pool, _dir) = temp_pool();
    seed_user(&pool, "user-1", None);
    let backend = ScriptedBackend::always("{}");
    let service = WeeklyReportService::new(pool, invoker(backend.clone()), chrono_tz::Tz::UTC, "gemini-2.0-flash");

    let error = service
        .generate(
            "user-1",
            WeeklyReportRequest {
                week_start: Some("2026-10-24".into()),
                week_end: Some("2026-10-17".into()),
            },
        )
        .await
        .expect_err("end before start");

    assert_eq!(error.kind(), ErrorKind::InvalidRequest);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn model_output_errors_keep_correlation_id_and_excerpt() {
    let backend = ScriptedBackend::new(vec![Reply::Text("I cannot help with that.".into())]);
    let service = InsightService::new(invoker(backend));

    let error = service
        .generate_goal_plan(GoalPlanRequest {
            goal: "Run a 10k".into(),
            context: None,
        })
        .await
        .expect_err("prose reply");

    let command_error = CommandError::from(error);
    assert_eq!(command_error.code, "MODEL_OUTPUT_INVALID");
    let details = command_error.details.expect("details");
    assert!(details.get("correlationId").is_some());
    assert_eq!(details["excerpt"], json!("I cannot help with that."));
}
