use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

pub mod daily_stats_repository;
pub mod report_repository;
pub mod user_repository;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// RFC 3339 UTC with milliseconds; text order matches instant order.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(raw: &str, column: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err)))
}

pub(crate) fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(raw: &str, column: usize) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err)))
}
