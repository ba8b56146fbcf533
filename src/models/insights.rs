use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Caller input for a weekly summary. Fields are optional so that a missing
/// value can be told apart from zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklySummaryRequest {
    pub tasks_completed: Option<i64>,
    pub focus_minutes: Option<i64>,
    pub top_habit: Option<String>,
    pub top_streak_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalPlanRequest {
    pub goal: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HabitOptimizationRequest {
    pub habit_name: String,
    pub current_streak: Option<i64>,
    pub context: Option<String>,
}

/// Optional week bounds; each accepts an RFC 3339 timestamp or a `YYYY-MM-DD` date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklyReportRequest {
    pub week_start: Option<String>,
    pub week_end: Option<String>,
}

/// Validated per-request metrics behind a weekly summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub tasks_completed: u64,
    pub focus_minutes: u64,
    pub top_habit_name: Option<String>,
    pub top_habit_streak_days: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub tasks_completed: i64,
    pub habits_completed: i64,
    pub focus_minutes: i64,
    pub productivity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMetrics {
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub tasks_completed: i64,
    pub habits_completed: i64,
    pub total_focus_minutes: i64,
    pub avg_productivity_score: f64,
    pub daily_breakdown: Vec<DailyMetric>,
}

impl WeeklyMetrics {
    pub fn aggregate(
        week_start: DateTime<Utc>,
        week_end: DateTime<Utc>,
        daily_breakdown: Vec<DailyMetric>,
    ) -> Self {
        let tasks_completed = daily_breakdown.iter().map(|day| day.tasks_completed).sum();
        let habits_completed = daily_breakdown.iter().map(|day| day.habits_completed).sum();
        let total_focus_minutes = daily_breakdown.iter().map(|day| day.focus_minutes).sum();
        let avg_productivity_score = if daily_breakdown.is_empty() {
            0.0
        } else {
            daily_breakdown
                .iter()
                .map(|day| day.productivity_score)
                .sum::<f64>()
                / daily_breakdown.len() as f64
        };

        Self {
            week_start,
            week_end,
            tasks_completed,
            habits_completed,
            total_focus_minutes,
            avg_productivity_score,
            daily_breakdown,
        }
    }

    pub fn total_focus_hours(&self) -> f64 {
        self.total_focus_minutes as f64 / 60.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummaryArtifact {
    pub summary: String,
    pub tasks_completed: u64,
    pub focus_minutes: u64,
    pub top_streak: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPlanArtifact {
    pub goal: String,
    pub steps: Vec<String>,
    pub timeline: String,
    pub focus: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitOptimizationArtifact {
    pub habit: String,
    pub current_streak: u64,
    pub suggestion: String,
    pub motivation: String,
    pub next_step: String,
}

/// Text part of a weekly report, after repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportNarrative {
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ReportNarrative {
    /// Substitute used when the model reply cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            summary: "Weekly productivity report generated.".to_string(),
            strengths: vec!["Tracked weekly activities".to_string()],
            improvements: vec!["Review daily patterns".to_string()],
            suggestions: vec!["Maintain consistency".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub id: String,
    pub user_id: String,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub suggestions: Vec<String>,
    pub productivity_score: f64,
    pub total_focus_hours: f64,
    pub habits_completed: i64,
    pub tasks_completed: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields the orchestrator hands to the report store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWeeklyReport {
    pub user_id: String,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub narrative: ReportNarrative,
    pub productivity_score: f64,
    pub total_focus_hours: f64,
    pub habits_completed: i64,
    pub tasks_completed: i64,
}

impl NewWeeklyReport {
    pub fn from_metrics(user_id: &str, metrics: &WeeklyMetrics, narrative: ReportNarrative) -> Self {
        Self {
            user_id: user_id.to_string(),
            week_start: metrics.week_start,
            week_end: metrics.week_end,
            narrative,
            productivity_score: metrics.avg_productivity_score,
            total_focus_hours: metrics.total_focus_hours(),
            habits_completed: metrics.habits_completed,
            tasks_completed: metrics.tasks_completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStatus {
    Created,
    AlreadyExists,
}

/// Where the narrative of a returned report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NarrativeSource {
    Model,
    Fallback,
    Stored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportOutcome {
    pub status: ReportStatus,
    pub narrative_source: NarrativeSource,
    pub report: WeeklyReport,
}

impl WeeklyReportOutcome {
    pub fn existing(report: WeeklyReport) -> Self {
        Self {
            status: ReportStatus::AlreadyExists,
            narrative_source: NarrativeSource::Stored,
            report,
        }
    }

    pub fn created(report: WeeklyReport, narrative_source: NarrativeSource) -> Self {
        Self {
            status: ReportStatus::Created,
            narrative_source,
            report,
        }
    }

    pub fn is_new(&self) -> bool {
        self.status == ReportStatus::Created
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub active_habits: u32,
}
