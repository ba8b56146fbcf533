use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

const DAYS_AFTER_START: i64 = 6;

/// Resolved reporting window, as instants and as dates in the report timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    End,
}

/// Resolve optional week bounds against `now` in `tz`.
///
/// The start is always the Sunday at 00:00:00.000 of the week containing the
/// supplied start (or `now` when none is given), and the natural end is six
/// days later at 23:59:59.999. A supplied end may only shorten that window.
/// Bounds are RFC 3339 timestamps or plain dates in the report timezone.
pub fn resolve_week_bounds(
    week_start: Option<&str>,
    week_end: Option<&str>,
    tz: Tz,
    now: DateTime<Utc>,
) -> AppResult<WeekBounds> {
    let anchor = match non_blank(week_start) {
        Some(raw) => parse_bound(raw, Edge::Start, tz)?,
        None => now,
    };
    let first_day = most_recent_sunday(anchor, tz);
    let start = local_instant(tz, first_day.and_time(NaiveTime::MIN), Edge::Start)?;

    let last_day = first_day + Duration::days(DAYS_AFTER_START);
    let week_end_instant = local_instant(tz, last_day.and_time(end_of_day()), Edge::End)?;
    let end = match non_blank(week_end) {
        Some(raw) => parse_bound(raw, Edge::End, tz)?.min(week_end_instant),
        None => week_end_instant,
    };

    if end < start {
        return Err(AppError::invalid_request(format!(
            "weekEnd ({}) is before weekStart ({})",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }

    Ok(WeekBounds {
        start,
        end,
        start_date: first_day,
        end_date: end.with_timezone(&tz).date_naive(),
    })
}

pub fn most_recent_sunday(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    let today = now.with_timezone(&tz).date_naive();
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_bound(raw: &str, edge: Edge, tz: Tz) -> AppResult<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::invalid_request(format!(
            "'{raw}' is neither an RFC 3339 timestamp nor a YYYY-MM-DD date"
        ))
    })?;

    let time = match edge {
        Edge::Start => NaiveTime::MIN,
        Edge::End => end_of_day(),
    };
    local_instant(tz, date.and_time(time), edge)
}

// Ambiguous local times resolve outward so the window never shrinks; a time
// inside a DST gap moves forward by the gap's hour.
fn local_instant(tz: Tz, local: NaiveDateTime, edge: Edge) -> AppResult<DateTime<Utc>> {
    let resolved = match tz.from_local_datetime(&local) {
        LocalResult::Single(value) => Some(value),
        LocalResult::Ambiguous(earliest, latest) => Some(match edge {
            Edge::Start => earliest,
            Edge::End => latest,
        }),
        LocalResult::None => tz.from_local_datetime(&(local + Duration::hours(1))).earliest(),
    };

    resolved
        .map(|value| value.with_timezone(&Utc))
        .ok_or_else(|| AppError::invalid_request(format!("{local} does not exist in {tz}")))
}
