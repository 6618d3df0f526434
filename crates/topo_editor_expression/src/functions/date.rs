// SPDX-License-Identifier: MIT OR Apache-2.0
//! Date utilities.
//!
//! Range helpers work in local time and return UTC ISO-8601 strings with
//! millisecond precision.

use super::{arg, has_arg, string_arg, LibraryFunction, Usage};
use crate::error::ExpressionResult;
use chrono::{
    DateTime, Datelike, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone,
    Timelike, Utc,
};
use serde_json::Value;

/// Date entries of the library
pub const FUNCTIONS: &[LibraryFunction] = &[
    LibraryFunction { name: "now", usage: Usage::Function, call: now },
    LibraryFunction { name: "today", usage: Usage::Function, call: today },
    LibraryFunction { name: "todayEnd", usage: Usage::Function, call: today_end },
    LibraryFunction { name: "monthStart", usage: Usage::Function, call: month_start },
    LibraryFunction { name: "monthEnd", usage: Usage::Function, call: month_end },
    LibraryFunction { name: "yearStart", usage: Usage::Function, call: year_start },
    LibraryFunction { name: "yearEnd", usage: Usage::Function, call: year_end },
    LibraryFunction { name: "formatDate", usage: Usage::Both, call: format_date },
];

const INVALID_DATE: &str = "Invalid Date";

fn iso(instant: DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Local midnight of `date` as a UTC ISO string
fn local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Last millisecond before the local midnight of `next`
fn end_before(next: NaiveDate) -> Option<DateTime<Utc>> {
    local_midnight(next).map(|dt| dt - TimeDelta::milliseconds(1))
}

fn iso_or_null(instant: Option<DateTime<Utc>>) -> Value {
    instant.map_or(Value::Null, iso)
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// `now()`
pub fn now(_args: &[Value]) -> ExpressionResult<Value> {
    Ok(iso(Utc::now()))
}

/// `today()`: start of the current local day
pub fn today(_args: &[Value]) -> ExpressionResult<Value> {
    Ok(iso_or_null(local_midnight(Local::now().date_naive())))
}

/// `todayEnd()`: end of the current local day
pub fn today_end(_args: &[Value]) -> ExpressionResult<Value> {
    let tomorrow = Local::now().date_naive().succ_opt();
    Ok(iso_or_null(tomorrow.and_then(end_before)))
}

/// `monthStart()`
pub fn month_start(_args: &[Value]) -> ExpressionResult<Value> {
    let first = Local::now().date_naive().with_day(1);
    Ok(iso_or_null(first.and_then(local_midnight)))
}

/// `monthEnd()`
pub fn month_end(_args: &[Value]) -> ExpressionResult<Value> {
    let next = first_of_next_month(Local::now().date_naive());
    Ok(iso_or_null(next.and_then(end_before)))
}

/// `yearStart()`
pub fn year_start(_args: &[Value]) -> ExpressionResult<Value> {
    let first = NaiveDate::from_ymd_opt(Local::now().year(), 1, 1);
    Ok(iso_or_null(first.and_then(local_midnight)))
}

/// `yearEnd()`
pub fn year_end(_args: &[Value]) -> ExpressionResult<Value> {
    let next = NaiveDate::from_ymd_opt(Local::now().year() + 1, 1, 1);
    Ok(iso_or_null(next.and_then(end_before)))
}

/// Interpret a date argument: ISO strings, common date(-time) layouts,
/// or epoch milliseconds. Missing input means now.
pub fn parse_date(value: &Value) -> Option<DateTime<Local>> {
    match value {
        Value::Null => Some(Local::now()),
        Value::Number(n) => {
            let millis = n.as_f64()?;
            DateTime::<Utc>::from_timestamp_millis(millis as i64).map(|dt| dt.with_timezone(&Local))
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Local));
            }
            const DATE_TIMES: &[&str] = &[
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y/%m/%d %H:%M:%S",
                "%Y-%m-%d %H:%M",
            ];
            const DATES: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
            let naive = DATE_TIMES
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .or_else(|| {
                    DATES
                        .iter()
                        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })?;
            Local.from_local_datetime(&naive).earliest()
        }
        _ => None,
    }
}

/// Render `date` using `YYYY-MM-DD HH:mm:ss` style tokens. Text inside
/// square brackets is copied verbatim.
pub fn render(date: &DateTime<Local>, pattern: &str) -> String {
    const TOKENS: &[&str] = &[
        "YYYY", "SSS", "YY", "MM", "DD", "HH", "hh", "mm", "ss", "M", "D", "H", "h", "m", "s",
        "A", "a",
    ];
    let mut out = String::new();
    let mut rest = pattern;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').unwrap_or(stripped.len());
            out.push_str(&stripped[..end]);
            rest = stripped.get(end + 1..).unwrap_or("");
            continue;
        }
        let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
            continue;
        };
        let hour12 = match date.hour() % 12 {
            0 => 12,
            h => h,
        };
        let piece = match *token {
            "YYYY" => format!("{:04}", date.year()),
            "YY" => format!("{:02}", date.year() % 100),
            "MM" => format!("{:02}", date.month()),
            "M" => date.month().to_string(),
            "DD" => format!("{:02}", date.day()),
            "D" => date.day().to_string(),
            "HH" => format!("{:02}", date.hour()),
            "H" => date.hour().to_string(),
            "hh" => format!("{hour12:02}"),
            "h" => hour12.to_string(),
            "mm" => format!("{:02}", date.minute()),
            "m" => date.minute().to_string(),
            "ss" => format!("{:02}", date.second()),
            "s" => date.second().to_string(),
            "SSS" => format!("{:03}", date.timestamp_subsec_millis()),
            "A" => (if date.hour() < 12 { "AM" } else { "PM" }).to_string(),
            _ => (if date.hour() < 12 { "am" } else { "pm" }).to_string(),
        };
        out.push_str(&piece);
        rest = &rest[token.len()..];
    }
    out
}

/// `formatDate(date, format = "YYYY-MM-DDTHH:mm:ssZ")`
pub fn format_date(args: &[Value]) -> ExpressionResult<Value> {
    let Some(date) = parse_date(arg(args, 0)) else {
        return Ok(Value::String(INVALID_DATE.to_string()));
    };
    if !has_arg(args, 1) {
        return Ok(Value::String(date.to_rfc3339_opts(SecondsFormat::Secs, false)));
    }
    Ok(Value::String(render(&date, &string_arg(args, 1))))
}
