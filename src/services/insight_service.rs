use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::ai_types::ArtifactKind;
use crate::models::insights::{
    GoalPlanArtifact, GoalPlanRequest, HabitOptimizationArtifact, HabitOptimizationRequest,
    MetricsSnapshot, WeeklySummaryArtifact, WeeklySummaryRequest,
};
use crate::services::model_invoker::ModelInvoker;
use crate::services::prompt_templates;
use crate::services::schema_validator::{self, Violation};

/// Produces the three on-demand insight artifacts. Nothing is persisted.
#[derive(Clone)]
pub struct InsightService {
    invoker: ModelInvoker,
}

impl InsightService {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }

    pub async fn generate_weekly_summary(
        &self,
        request: WeeklySummaryRequest,
    ) -> AppResult<WeeklySummaryArtifact> {
        let snapshot = MetricsSnapshot {
            tasks_completed: required_count("tasksCompleted", request.tasks_completed)?,
            focus_minutes: required_count("focusMinutes", request.focus_minutes)?,
            top_habit_name: non_blank(request.top_habit.as_deref()).map(str::to_string),
            top_habit_streak_days: optional_count("topStreakDays", request.top_streak_days)?,
        };

        let kind = ArtifactKind::WeeklySummary;
        let prompt = prompt_templates::weekly_summary_prompt(&snapshot);
        let value = self.invoker.invoke_json(&prompt, kind, None).await?;
        let artifact: WeeklySummaryArtifact = schema_validator::validate_artifact(kind, value)?;

        let mut mismatches = Vec::new();
        echo_mismatch(&mut mismatches, "/tasksCompleted", snapshot.tasks_completed, artifact.tasks_completed);
        echo_mismatch(&mut mismatches, "/focusMinutes", snapshot.focus_minutes, artifact.focus_minutes);
        reject_mismatches(kind, &mismatches)?;

        info!(
            target: "app::ai",
            tasks_completed = snapshot.tasks_completed,
            focus_minutes = snapshot.focus_minutes,
            "weekly summary generated"
        );
        Ok(artifact)
    }

    pub async fn generate_goal_plan(&self, request: GoalPlanRequest) -> AppResult<GoalPlanArtifact> {
        let goal = non_blank(Some(request.goal.as_str()))
            .ok_or_else(|| AppError::invalid_request("goal is required"))?;

        let kind = ArtifactKind::GoalPlan;
        let prompt = prompt_templates::goal_plan_prompt(goal, request.context.as_deref());
        let value = self.invoker.invoke_json(&prompt, kind, None).await?;
        let artifact: GoalPlanArtifact = schema_validator::validate_artifact(kind, value)?;

        info!(target: "app::ai", steps = artifact.steps.len(), "goal plan generated");
        Ok(artifact)
    }

    pub async fn optimize_habit(
        &self,
        request: HabitOptimizationRequest,
    ) -> AppResult<HabitOptimizationArtifact> {
        let habit_name = non_blank(Some(request.habit_name.as_str()))
            .ok_or_else(|| AppError::invalid_request("habitName is required"))?;
        let current_streak = required_count("currentStreak", request.current_streak)?;

        let kind = ArtifactKind::HabitOptimization;
        let prompt =
            prompt_templates::habit_optimization_prompt(habit_name, current_streak, request.context.as_deref());
        let value = self.invoker.invoke_json(&prompt, kind, None).await?;
        let artifact: HabitOptimizationArtifact = schema_validator::validate_artifact(kind, value)?;

        let mut mismatches = Vec::new();
        echo_mismatch(&mut mismatches, "/currentStreak", current_streak, artifact.current_streak);
        reject_mismatches(kind, &mismatches)?;

        info!(target: "app::ai", current_streak, "habit optimization generated");
        Ok(artifact)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required_count(field: &str, value: Option<i64>) -> AppResult<u64> {
    match value {
        Some(raw) => to_count(field, raw),
        None => Err(AppError::invalid_request(format!("{field} is required"))),
    }
}

fn optional_count(field: &str, value: Option<i64>) -> AppResult<u64> {
    value.map_or(Ok(0), |raw| to_count(field, raw))
}

fn to_count(field: &str, raw: i64) -> AppResult<u64> {
    u64::try_from(raw)
        .map_err(|_| AppError::invalid_request(format!("{field} must not be negative (got {raw})")))
}

fn echo_mismatch(mismatches: &mut Vec<Violation>, path: &str, expected: u64, actual: u64) {
    if expected != actual {
        mismatches.push(Violation {
            path: path.to_string(),
            message: format!("expected {expected} from the request, model returned {actual}"),
        });
    }
}

fn reject_mismatches(kind: ArtifactKind, mismatches: &[Violation]) -> AppResult<()> {
    if mismatches.is_empty() {
        return Ok(());
    }
    debug!(target: "app::ai", kind = kind.as_str(), "model altered request figures");
    Err(schema_validator::violation_error(kind, mismatches))
}
