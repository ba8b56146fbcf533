use std::convert::TryFrom;

use chrono::{NaiveDate, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::db::repositories::{format_date, format_timestamp, parse_date};
use crate::error::{AppError, AppResult};
use crate::models::insights::DailyMetric;

#[derive(Debug, Clone)]
pub struct DailyStatsRow {
    pub stat_date: String,
    pub tasks_completed: i64,
    pub habits_completed: i64,
    pub focus_minutes: i64,
    pub productivity_score: f64,
}

impl DailyStatsRow {
    pub fn into_metric(self) -> AppResult<DailyMetric> {
        Ok(DailyMetric {
            date: parse_date(&self.stat_date, 0)?,
            tasks_completed: self.tasks_completed,
            habits_completed: self.habits_completed,
            focus_minutes: self.focus_minutes,
            productivity_score: self.productivity_score,
        })
    }
}

impl TryFrom<&Row<'_>> for DailyStatsRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            stat_date: row.get("stat_date")?,
            tasks_completed: row.get("tasks_completed")?,
            habits_completed: row.get("habits_completed")?,
            focus_minutes: row.get("focus_minutes")?,
            productivity_score: row.get("productivity_score")?,
        })
    }
}

pub struct DailyStatsRepository;

impl DailyStatsRepository {
    pub fn upsert(conn: &Connection, user_id: &str, metric: &DailyMetric) -> AppResult<()> {
        if metric.tasks_completed < 0 || metric.habits_completed < 0 || metric.focus_minutes < 0 {
            return Err(AppError::validation(format!(
                "daily stats for {} contain negative counts",
                metric.date
            )));
        }

        conn.execute(
            r#"
                INSERT INTO daily_stats (
                    user_id,
                    stat_date,
                    tasks_completed,
                    habits_completed,
                    focus_minutes,
                    productivity_score,
                    updated_at
                ) VALUES (
                    :user_id,
                    :stat_date,
                    :tasks_completed,
                    :habits_completed,
                    :focus_minutes,
                    :productivity_score,
                    :updated_at
                )
                ON CONFLICT(user_id, stat_date) DO UPDATE SET
                    tasks_completed = excluded.tasks_completed,
                    habits_completed = excluded.habits_completed,
                    focus_minutes = excluded.focus_minutes,
                    productivity_score = excluded.productivity_score,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":user_id": user_id,
                ":stat_date": format_date(&metric.date),
                ":tasks_completed": metric.tasks_completed,
                ":habits_completed": metric.habits_completed,
                ":focus_minutes": metric.focus_minutes,
                ":productivity_score": metric.productivity_score,
                ":updated_at": format_timestamp(&Utc::now()),
            },
        )?;

        Ok(())
    }

    /// Daily records with `start <= date <= end`, oldest first.
    pub fn list_between(
        conn: &Connection,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DailyMetric>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    stat_date,
                    tasks_completed,
                    habits_completed,
                    focus_minutes,
                    productivity_score
                FROM daily_stats
                WHERE user_id = :user_id
                  AND stat_date >= :start
                  AND stat_date <= :end
                ORDER BY stat_date ASC
            "#,
        )?;

        let metrics = stmt
            .query_map(
                named_params! {
                    ":user_id": user_id,
                    ":start": format_date(&start),
                    ":end": format_date(&end),
                },
                |row| DailyStatsRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(DailyStatsRow::into_metric))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(metrics)
    }
}
