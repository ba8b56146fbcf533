use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::db::repositories::{format_timestamp, parse_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::insights::{NewWeeklyReport, WeeklyReport};

const REPORT_COLUMNS: &str = r#"
    id,
    user_id,
    week_start,
    week_end,
    summary,
    strengths,
    improvements,
    suggestions,
    productivity_score,
    total_focus_hours,
    habits_completed,
    tasks_completed,
    created_at
"#;

#[derive(Debug, Clone)]
pub struct WeeklyReportRow {
    pub id: String,
    pub user_id: String,
    pub week_start: String,
    pub week_end: String,
    pub summary: String,
    pub strengths: String,
    pub improvements: String,
    pub suggestions: String,
    pub productivity_score: f64,
    pub total_focus_hours: f64,
    pub habits_completed: i64,
    pub tasks_completed: i64,
    pub created_at: String,
}

impl WeeklyReportRow {
    pub fn from_new(input: &NewWeeklyReport, id: String, created_at: &DateTime<Utc>) -> AppResult<Self> {
        Ok(Self {
            id,
            user_id: input.user_id.clone(),
            week_start: format_timestamp(&input.week_start),
            week_end: format_timestamp(&input.week_end),
            summary: input.narrative.summary.clone(),
            strengths: serde_json::to_string(&input.narrative.strengths)?,
            improvements: serde_json::to_string(&input.narrative.improvements)?,
            suggestions: serde_json::to_string(&input.narrative.suggestions)?,
            productivity_score: input.productivity_score,
            total_focus_hours: input.total_focus_hours,
            habits_completed: input.habits_completed,
            tasks_completed: input.tasks_completed,
            created_at: format_timestamp(created_at),
        })
    }

    pub fn into_report(self) -> AppResult<WeeklyReport> {
        Ok(WeeklyReport {
            id: self.id,
            user_id: self.user_id,
            week_start: parse_timestamp(&self.week_start, 2)?,
            week_end: parse_timestamp(&self.week_end, 3)?,
            summary: self.summary,
            strengths: deserialize_list(&self.strengths)?,
            improvements: deserialize_list(&self.improvements)?,
            suggestions: deserialize_list(&self.suggestions)?,
            productivity_score: self.productivity_score,
            total_focus_hours: self.total_focus_hours,
            habits_completed: self.habits_completed,
            tasks_completed: self.tasks_completed,
            created_at: parse_timestamp(&self.created_at, 12)?,
        })
    }
}

impl TryFrom<&Row<'_>> for WeeklyReportRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            week_start: row.get("week_start")?,
            week_end: row.get("week_end")?,
            summary: row.get("summary")?,
            strengths: row.get("strengths")?,
            improvements: row.get("improvements")?,
            suggestions: row.get("suggestions")?,
            productivity_score: row.get("productivity_score")?,
            total_focus_hours: row.get("total_focus_hours")?,
            habits_completed: row.get("habits_completed")?,
            tasks_completed: row.get("tasks_completed")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct ReportRepository;

impl ReportRepository {
    /// Insert a report. A second report for the same user and week start
    /// fails with `AppError::Conflict`.
    pub fn create(conn: &Connection, input: &NewWeeklyReport) -> AppResult<WeeklyReport> {
        let row = WeeklyReportRow::from_new(input, Uuid::new_v4().to_string(), &Utc::now())?;

        conn.execute(
            r#"
                INSERT INTO weekly_reports (
                    id,
                    user_id,
                    week_start,
                    week_end,
                    summary,
                    strengths,
                    improvements,
                    suggestions,
                    productivity_score,
                    total_focus_hours,
                    habits_completed,
                    tasks_completed,
                    created_at
                ) VALUES (
                    :id,
                    :user_id,
                    :week_start,
                    :week_end,
                    :summary,
                    :strengths,
                    :improvements,
                    :suggestions,
                    :productivity_score,
                    :total_focus_hours,
                    :habits_completed,
                    :tasks_completed,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":week_start": &row.week_start,
                ":week_end": &row.week_end,
                ":summary": &row.summary,
                ":strengths": &row.strengths,
                ":improvements": &row.improvements,
                ":suggestions": &row.suggestions,
                ":productivity_score": &row.productivity_score,
                ":total_focus_hours": &row.total_focus_hours,
                ":habits_completed": &row.habits_completed,
                ":tasks_completed": &row.tasks_completed,
                ":created_at": &row.created_at,
            },
        )?;

        debug!(target: "app::db", report_id = %row.id, user_id = %row.user_id, "weekly report stored");
        row.into_report()
    }

    /// First stored report whose week start lies within `[start, end]`.
    pub fn find_in_week(
        conn: &Connection,
        user_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> AppResult<Option<WeeklyReport>> {
        let sql = format!(
            r#"
                SELECT {REPORT_COLUMNS}
                FROM weekly_reports
                WHERE user_id = :user_id
                  AND week_start >= :start
                  AND week_start <= :end
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(
                named_params! {
                    ":user_id": user_id,
                    ":start": format_timestamp(start),
                    ":end": format_timestamp(end),
                },
                |row| WeeklyReportRow::try_from(row),
            )
            .optional()?;

        row.map(WeeklyReportRow::into_report).transpose()
    }

    pub fn latest_for_user(conn: &Connection, user_id: &str) -> AppResult<Option<WeeklyReport>> {
        let sql = format!(
            r#"
                SELECT {REPORT_COLUMNS}
                FROM weekly_reports
                WHERE user_id = :user_id
                ORDER BY created_at DESC, rowid DESC
                LIMIT 1
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(named_params! {":user_id": user_id}, |row| {
                WeeklyReportRow::try_from(row)
            })
            .optional()?;

        row.map(WeeklyReportRow::into_report).transpose()
    }

    pub fn count_for_user(conn: &Connection, user_id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM weekly_reports WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn deserialize_list(raw: &str) -> AppResult<Vec<String>> {
    serde_json::from_str(raw).map_err(AppError::from)
}
