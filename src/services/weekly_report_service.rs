use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::db::repositories::daily_stats_repository::DailyStatsRepository;
use crate::db::repositories::report_repository::ReportRepository;
use crate::db::repositories::user_repository::UserRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::ai_types::ArtifactKind;
use crate::models::insights::{
    NarrativeSource, NewWeeklyReport, ReportNarrative, UserProfile, WeeklyMetrics, WeeklyReport,
    WeeklyReportOutcome, WeeklyReportRequest,
};
use crate::services::model_invoker::{parse_model_output, ModelInvoker};
use crate::services::prompt_templates::{weekly_report_prompt, WeeklyReportPromptInput};
use crate::services::schema_validator::normalize_report_payload;
use crate::services::week_utils::resolve_week_bounds;

/// Builds, persists and deduplicates weekly reports.
///
/// At most one report exists per user and week start; the store's unique
/// constraint settles concurrent generators.
#[derive(Clone)]
pub struct WeeklyReportService {
    db: DbPool,
    invoker: ModelInvoker,
    timezone: Tz,
    report_model: String,
}

impl WeeklyReportService {
    pub fn new(db: DbPool, invoker: ModelInvoker, timezone: Tz, report_model: impl Into<String>) -> Self {
        Self {
            db,
            invoker,
            timezone,
            report_model: report_model.into(),
        }
    }

    pub async fn generate(&self, user_id: &str, request: WeeklyReportRequest) -> AppResult<WeeklyReportOutcome> {
        self.generate_at(user_id, request, Utc::now()).await
    }

    pub async fn generate_at(
        &self,
        user_id: &str,
        request: WeeklyReportRequest,
        now: DateTime<Utc>,
    ) -> AppResult<WeeklyReportOutcome> {
        let profile = self.load_profile(user_id)?;
        let user_id = profile.id.as_str();

        let bounds = resolve_week_bounds(
            request.week_start.as_deref(),
            request.week_end.as_deref(),
            self.timezone,
            now,
        )?;

        let existing = self
            .db
            .with_connection(|conn| ReportRepository::find_in_week(conn, user_id, &bounds.start, &bounds.end))?;
        if let Some(report) = existing {
            info!(
                target: "app::report",
                user_id,
                report_id = %report.id,
                "weekly report already exists"
            );
            return Ok(WeeklyReportOutcome::existing(report));
        }

        let daily = self.db.with_connection(|conn| {
            DailyStatsRepository::list_between(conn, user_id, bounds.start_date, bounds.end_date)
        })?;
        let metrics = WeeklyMetrics::aggregate(bounds.start, bounds.end, daily);

        let prompt = weekly_report_prompt(&WeeklyReportPromptInput {
            user_name: profile.name.as_deref(),
            week_start: bounds.start_date,
            week_end: bounds.end_date,
            metrics: &metrics,
            active_habits: profile.active_habits,
        });

        let raw = self
            .invoker
            .complete(&prompt, ArtifactKind::WeeklyReport, Some(self.report_model.as_str()))
            .await?;

        let (narrative, source) = match parse_model_output(&raw) {
            Ok(value) => (normalize_report_payload(&value), NarrativeSource::Model),
            Err(err) if err.is_model_output() => {
                warn!(
                    target: "app::report",
                    user_id,
                    correlation_id = err.ai_correlation_id().unwrap_or_default(),
                    "model reply unusable, storing fallback narrative"
                );
                (ReportNarrative::fallback(), NarrativeSource::Fallback)
            }
            Err(err) => return Err(err),
        };

        let new_report = NewWeeklyReport::from_metrics(user_id, &metrics, narrative);
        match self.db.with_connection(|conn| ReportRepository::create(conn, &new_report)) {
            Ok(report) => {
                info!(
                    target: "app::report",
                    user_id,
                    report_id = %report.id,
                    days = metrics.daily_breakdown.len(),
                    fallback = source == NarrativeSource::Fallback,
                    "weekly report created"
                );
                Ok(WeeklyReportOutcome::created(report, source))
            }
            Err(AppError::Conflict { message }) => {
                // Another generator stored this week first; hand back its report.
                let winner = self.db.with_connection(|conn| {
                    ReportRepository::find_in_week(conn, user_id, &bounds.start, &bounds.end)
                })?;
                match winner {
                    Some(report) => {
                        info!(
                            target: "app::report",
                            user_id,
                            report_id = %report.id,
                            "lost report creation race, returning stored report"
                        );
                        Ok(WeeklyReportOutcome::existing(report))
                    }
                    None => Err(AppError::Conflict { message }),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Most recently created report of the user, if any.
    pub fn latest(&self, user_id: &str) -> AppResult<Option<WeeklyReport>> {
        let profile = self.load_profile(user_id)?;
        self.db
            .with_connection(|conn| ReportRepository::latest_for_user(conn, &profile.id))
    }

    fn load_profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::invalid_request("userId is required"));
        }

        self.db
            .with_connection(|conn| UserRepository::find_profile(conn, user_id))?
            .ok_or_else(AppError::not_found)
    }
}
