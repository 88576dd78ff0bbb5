//! Instant parsing and formatting shared by the wire model and the views.
//!
//! The API exchanges ISO 8601 strings with a `Z` suffix. Values without an offset
//! (as emitted by some backends, and as typed into the report form) are taken as UTC.

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::{format_description, time};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const NAIVE: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);
const WIRE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const FORM: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DISPLAY: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DAY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses an instant. An explicit offset is converted to UTC; a naive value is UTC.
pub fn parse_instant(input: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let s = input.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(dt.to_offset(UtcOffset::UTC));
    }
    let naive = s
        .strip_suffix('Z')
        .or_else(|| s.strip_suffix('z'))
        .unwrap_or(s)
        .replacen(' ', "T", 1);
    PrimitiveDateTime::parse(&naive, NAIVE).map(PrimitiveDateTime::assume_utc)
}

/// `YYYY-MM-DDTHH:MM:SSZ`, the form sent to the API.
pub fn to_wire(dt: OffsetDateTime) -> String {
    let dt = dt.to_offset(UtcOffset::UTC);
    dt.format(WIRE).unwrap_or_else(|_| dt.to_string())
}

/// `YYYY-MM-DD HH:MM:SS` in UTC. Display only.
pub fn format_display(dt: OffsetDateTime) -> String {
    let dt = dt.to_offset(UtcOffset::UTC);
    dt.format(DISPLAY).unwrap_or_else(|_| dt.to_string())
}

/// Default value of the report form's timestamp field.
pub fn form_default(now: OffsetDateTime) -> String {
    let now = now.to_offset(UtcOffset::UTC);
    now.format(FORM).unwrap_or_default()
}

pub fn parse_day(input: &str) -> Result<Date, time::error::Parse> {
    Date::parse(input.trim(), DAY)
}

pub fn format_day(date: Date) -> String {
    date.format(DAY).unwrap_or_else(|_| date.to_string())
}

/// 00:00:00Z of `date`.
pub fn day_start(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

/// 23:59:59Z of `date`.
pub fn day_end(date: Date) -> OffsetDateTime {
    PrimitiveDateTime::new(date, time!(23:59:59)).assume_utc()
}

pub mod instant {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_wire(*dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_instant(&s)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {s:?}: {e}")))
    }
}
