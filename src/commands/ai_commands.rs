use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::ai_types::AiStatusDto;
use crate::models::insights::{
    GoalPlanArtifact, GoalPlanRequest, HabitOptimizationArtifact, HabitOptimizationRequest,
    WeeklyReport, WeeklyReportOutcome, WeeklyReportRequest, WeeklySummaryArtifact,
    WeeklySummaryRequest,
};

use super::{ApiEnvelope, AppState, CommandError, CommandResult};

const REPORT_EXISTS_MESSAGE: &str = "Report already exists for this week";
const REPORT_CREATED_MESSAGE: &str = "Weekly report generated successfully";

fn command_failed(command: &'static str, error: AppError) -> CommandError {
    let correlation_id = error.ai_correlation_id().unwrap_or("-");
    warn!(
        target: "app::command",
        command,
        error = %error,
        correlation_id = %correlation_id,
        "command failed"
    );
    CommandError::from(error)
}

pub async fn insights_summarize(
    app_state: &AppState,
    request: WeeklySummaryRequest,
) -> CommandResult<WeeklySummaryArtifact> {
    debug!(target: "app::command", "insights_summarize invoked");

    app_state
        .insights()
        .generate_weekly_summary(request)
        .await
        .map_err(|error| command_failed("insights_summarize", error))
}

pub async fn insights_plan_goal(
    app_state: &AppState,
    request: GoalPlanRequest,
) -> CommandResult<GoalPlanArtifact> {
    debug!(
        target: "app::command",
        has_context = request.context.is_some(),
        "insights_plan_goal invoked"
    );

    app_state
        .insights()
        .generate_goal_plan(request)
        .await
        .map_err(|error| command_failed("insights_plan_goal", error))
}

pub async fn insights_optimize_habit(
    app_state: &AppState,
    request: HabitOptimizationRequest,
) -> CommandResult<HabitOptimizationArtifact> {
    debug!(target: "app::command", "insights_optimize_habit invoked");

    app_state
        .insights()
        .optimize_habit(request)
        .await
        .map_err(|error| command_failed("insights_optimize_habit", error))
}

pub async fn weekly_report_generate(
    app_state: &AppState,
    user_id: &str,
    request: WeeklyReportRequest,
) -> CommandResult<WeeklyReportOutcome> {
    debug!(
        target: "app::command",
        user_id,
        week_start = request.week_start.as_deref().unwrap_or("-"),
        "weekly_report_generate invoked"
    );

    match app_state.reports().generate(user_id, request).await {
        Ok(outcome) => {
            debug!(
                target: "app::command",
                report_id = %outcome.report.id,
                status = ?outcome.status,
                narrative_source = ?outcome.narrative_source,
                "weekly_report_generate completed"
            );
            Ok(outcome)
        }
        Err(error) => Err(command_failed("weekly_report_generate", error)),
    }
}

pub async fn weekly_report_latest(
    app_state: &AppState,
    user_id: &str,
) -> CommandResult<Option<WeeklyReport>> {
    debug!(target: "app::command", user_id, "weekly_report_latest invoked");

    app_state
        .reports()
        .latest(user_id)
        .map_err(|error| command_failed("weekly_report_latest", error))
}

pub async fn ai_status(app_state: &AppState) -> CommandResult<AiStatusDto> {
    debug!(target: "app::command", "ai_status invoked");

    let config = app_state.config();
    let provider = app_state.backend().describe();
    let message = if provider.has_api_key {
        None
    } else {
        Some("Gemini API key is not configured".to_string())
    };

    Ok(AiStatusDto {
        has_api_key: provider.has_api_key,
        model: config.model.clone(),
        report_model: config.report_model.clone(),
        last_checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        provider: Some(provider),
        message,
    })
}

/// Envelope for a report generation, with the created/existing message.
pub fn weekly_report_envelope(result: CommandResult<WeeklyReportOutcome>) -> ApiEnvelope<WeeklyReport> {
    match result {
        Ok(outcome) => {
            let message = if outcome.is_new() {
                REPORT_CREATED_MESSAGE
            } else {
                REPORT_EXISTS_MESSAGE
            };
            ApiEnvelope::ok(outcome.report).with_message(message)
        }
        Err(error) => ApiEnvelope::failure(error),
    }
}
