//! Datetime family. Timestamps travel as ISO-8601
//! strings, not `Value::DateTime`, matching how the original exchanges
//! dates through JSON — `Value::DateTime` stays reserved for values a host
//! embeds directly.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::funcutil::{apply, validate_arity_and_any_type};
use crate::registry::{insert, FunctionEntry};

const DEFAULT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
/// .NET ticks (100ns units) between 0001-01-01 and the Unix epoch.
const TICKS_AT_EPOCH: i64 = 621_355_968_000_000_000;

pub(crate) fn parse_iso(s: &str) -> Result<DateTime<Utc>, ExpressionError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap()));
        }
    }
    Err(ExpressionError::format(format!("'{s}' is not a valid ISO-8601 timestamp")))
}

fn format_dt(dt: DateTime<Utc>, format: Option<&str>) -> String {
    dt.format(format.unwrap_or(DEFAULT_FORMAT)).to_string()
}

fn str_arg(v: &Value, label: &str) -> Result<String, ExpressionError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ExpressionError::type_error(format!("{label}: expected a string"))),
    }
}

fn num_arg(v: &Value, label: &str) -> Result<f64, ExpressionError> {
    v.as_f64()
        .filter(|_| !matches!(v, Value::Boolean(_)))
        .ok_or_else(|| ExpressionError::type_error(format!("{label}: expected a number")))
}

fn duration_for(unit: &str, amount: f64) -> Result<Duration, ExpressionError> {
    match unit.to_lowercase().trim_end_matches('s') {
        "second" => Ok(Duration::milliseconds((amount * 1000.0) as i64)),
        "minute" => Ok(Duration::seconds((amount * 60.0) as i64)),
        "hour" => Ok(Duration::seconds((amount * 3600.0) as i64)),
        "day" => Ok(Duration::seconds((amount * 86400.0) as i64)),
        "week" => Ok(Duration::seconds((amount * 604800.0) as i64)),
        "month" => Ok(Duration::seconds((amount * 2_629_746.0) as i64)),
        "year" => Ok(Duration::seconds((amount * 31_556_952.0) as i64)),
        other => Err(ExpressionError::domain(format!("unsupported time unit '{other}'"))),
    }
}

fn add_unit(args: &[Value], label: &str, unit: &str) -> Result<Value, ExpressionError> {
    let ts = parse_iso(&str_arg(&args[0], label)?)?;
    let amount = num_arg(&args[1], label)?;
    let format = args.get(2).map(|v| str_arg(v, label)).transpose()?;
    let dur = duration_for(unit, amount)?;
    Ok(Value::String(format_dt(ts + dur, format.as_deref())))
}

/// `getTimeOfDay` buckets: `[0:00) midnight`,
/// `[5:00,12:00) morning`, `=12:00 noon`, `(12:00,18:00) afternoon`,
/// `[18:00,22:00] evening`, else `night`.
fn time_of_day_bucket(dt: &DateTime<Utc>) -> &'static str {
    let minutes = dt.hour() * 60 + dt.minute();
    match minutes {
        0 => "midnight",
        m if (5 * 60..12 * 60).contains(&m) => "morning",
        m if m == 12 * 60 => "noon",
        m if (12 * 60 + 1..18 * 60).contains(&m) => "afternoon",
        m if (18 * 60..=22 * 60).contains(&m) => "evening",
        _ => "night",
    }
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    for (name, unit) in [
        ("addDays", "day"),
        ("addHours", "hour"),
        ("addMinutes", "minute"),
        ("addSeconds", "second"),
    ] {
        insert(
            map,
            name,
            ReturnType::STRING,
            Some(|node| validate_arity_and_any_type(node, 2, 3, ReturnType::OBJECT)),
            apply(move |args| add_unit(args, name, unit), None),
        );
    }
    insert(
        map,
        "subtractFromTime",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 3, 4, ReturnType::OBJECT)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "subtractFromTime")?)?;
                let amount = num_arg(&args[1], "subtractFromTime")?;
                let unit = str_arg(&args[2], "subtractFromTime")?;
                let format = args.get(3).map(|v| str_arg(v, "subtractFromTime")).transpose()?;
                let dur = duration_for(&unit, amount)?;
                Ok(Value::String(format_dt(ts - dur, format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "addToTime",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 3, 4, ReturnType::OBJECT)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "addToTime")?)?;
                let amount = num_arg(&args[1], "addToTime")?;
                let unit = str_arg(&args[2], "addToTime")?;
                let format = args.get(3).map(|v| str_arg(v, "addToTime")).transpose()?;
                let dur = duration_for(&unit, amount)?;
                Ok(Value::String(format_dt(ts + dur, format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "formatDateTime",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "formatDateTime")?)?;
                let format = args.get(1).map(|v| str_arg(v, "formatDateTime")).transpose()?;
                Ok(Value::String(format_dt(ts, format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "formatEpoch",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::NUMBER)),
        apply(
            |args| {
                let seconds = num_arg(&args[0], "formatEpoch")?;
                let format = args.get(1).map(|v| str_arg(v, "formatEpoch")).transpose()?;
                let whole = seconds.trunc() as i64;
                let nanos = ((seconds.fract()) * 1e9) as u32;
                let dt = DateTime::<Utc>::from_timestamp(whole, nanos)
                    .ok_or_else(|| ExpressionError::domain("formatEpoch: seconds out of range"))?;
                Ok(Value::String(format_dt(dt, format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "formatTicks",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::NUMBER)),
        apply(
            |args| {
                let ticks = num_arg(&args[0], "formatTicks")? as i64;
                let format = args.get(1).map(|v| str_arg(v, "formatTicks")).transpose()?;
                let unix_seconds = (ticks - TICKS_AT_EPOCH) / 10_000_000;
                let remainder_ticks = (ticks - TICKS_AT_EPOCH) % 10_000_000;
                let nanos = (remainder_ticks * 100) as u32;
                let dt = DateTime::<Utc>::from_timestamp(unix_seconds, nanos)
                    .ok_or_else(|| ExpressionError::domain("formatTicks: ticks out of range"))?;
                Ok(Value::String(format_dt(dt, format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "ticks",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "ticks")?)?;
                let ticks = ts.timestamp() * 10_000_000 + (ts.timestamp_subsec_nanos() as i64) / 100 + TICKS_AT_EPOCH;
                Ok(Value::Int(ticks))
            },
            None,
        ),
    );
    for (name, divisor) in [("ticksToDays", 864_000_000_000i64), ("ticksToHours", 36_000_000_000), ("ticksToMinutes", 600_000_000)] {
        insert(
            map,
            name,
            ReturnType::NUMBER,
            Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::NUMBER)),
            apply(move |args| Ok(Value::Number(num_arg(&args[0], name)? / divisor as f64)), None),
        );
    }
    for (name, extractor) in [
        ("dayOfMonth", (|d: &DateTime<Utc>| d.day() as i64) as fn(&DateTime<Utc>) -> i64),
        ("dayOfWeek", |d| d.weekday().num_days_from_sunday() as i64),
        ("dayOfYear", |d| d.ordinal() as i64),
        ("month", |d| d.month() as i64),
        ("year", |d| d.year() as i64),
    ] {
        insert(
            map,
            name,
            ReturnType::NUMBER,
            Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
            apply(move |args| Ok(Value::Int(extractor(&parse_iso(&str_arg(&args[0], name)?)?))), None),
        );
    }
    insert(
        map,
        "date",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "date")?)?;
                Ok(Value::String(ts.format("%Y-%m-%d").to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "utcNow",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 0, 1, ReturnType::STRING)),
        apply(
            |args| {
                let format = args.first().map(|v| str_arg(v, "utcNow")).transpose()?;
                Ok(Value::String(format_dt(Utc::now(), format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "startOfDay",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "startOfDay")?)?;
                let format = args.get(1).map(|v| str_arg(v, "startOfDay")).transpose()?;
                let truncated = ts.date_naive().and_hms_opt(0, 0, 0).unwrap();
                Ok(Value::String(format_dt(Utc.from_utc_datetime(&truncated), format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "startOfHour",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "startOfHour")?)?;
                let format = args.get(1).map(|v| str_arg(v, "startOfHour")).transpose()?;
                let truncated = ts.date_naive().and_hms_opt(ts.hour(), 0, 0).unwrap();
                Ok(Value::String(format_dt(Utc.from_utc_datetime(&truncated), format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "startOfMonth",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "startOfMonth")?)?;
                let format = args.get(1).map(|v| str_arg(v, "startOfMonth")).transpose()?;
                let truncated = chrono::NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap();
                Ok(Value::String(format_dt(Utc.from_utc_datetime(&truncated), format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "dateTimeDiff",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::STRING)),
        apply(
            |args| {
                let a = parse_iso(&str_arg(&args[0], "dateTimeDiff")?)?;
                let b = parse_iso(&str_arg(&args[1], "dateTimeDiff")?)?;
                let delta = a - b;
                Ok(Value::Int(delta.num_milliseconds() * 10_000))
            },
            None,
        ),
    );
    insert(
        map,
        "dateReadBack",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::STRING)),
        apply(
            |args| {
                let a = parse_iso(&str_arg(&args[0], "dateReadBack")?)?.date_naive();
                let b = parse_iso(&str_arg(&args[1], "dateReadBack")?)?.date_naive();
                let diff = (b - a).num_days();
                Ok(Value::String(
                    match diff {
                        0 => "Today",
                        1 => "Tomorrow",
                        -1 => "Yesterday",
                        _ => return Ok(Value::String(b.format("%Y-%m-%d").to_string())),
                    }
                    .to_string(),
                ))
            },
            None,
        ),
    );
    insert(
        map,
        "getTimeOfDay",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "getTimeOfDay")?)?;
                Ok(Value::String(time_of_day_bucket(&ts).to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "getPastTime",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 2, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let amount = num_arg(&args[0], "getPastTime")?;
                let unit = str_arg(&args[1], "getPastTime")?;
                let format = args.get(2).map(|v| str_arg(v, "getPastTime")).transpose()?;
                let dur = duration_for(&unit, amount)?;
                Ok(Value::String(format_dt(Utc::now() - dur, format.as_deref())))
            },
            None,
        ),
    );
    insert(
        map,
        "convertFromUTC",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 2, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let ts = parse_iso(&str_arg(&args[0], "convertFromUTC")?)?;
                let tz_name = str_arg(&args[1], "convertFromUTC")?;
                let format = args.get(2).map(|v| str_arg(v, "convertFromUTC")).transpose()?;
                let tz: Tz = tz_name
                    .parse()
                    .map_err(|_| ExpressionError::domain(format!("unrecognized timezone '{tz_name}'")))?;
                Ok(Value::String(ts.with_timezone(&tz).format(format.as_deref().unwrap_or(DEFAULT_FORMAT)).to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "convertToUTC",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 2, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let s = str_arg(&args[0], "convertToUTC")?;
                let tz_name = str_arg(&args[1], "convertToUTC")?;
                let format = args.get(2).map(|v| str_arg(v, "convertToUTC")).transpose()?;
                let tz: Tz = tz_name
                    .parse()
                    .map_err(|_| ExpressionError::domain(format!("unrecognized timezone '{tz_name}'")))?;
                let naive = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S"))
                    .map_err(|_| ExpressionError::format(format!("'{s}' is not a valid local timestamp")))?;
                let local = tz
                    .from_local_datetime(&naive)
                    .single()
                    .ok_or_else(|| ExpressionError::domain("convertToUTC: ambiguous local time"))?;
                Ok(Value::String(format_dt(local.with_timezone(&Utc), format.as_deref())))
            },
            None,
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Expression;
    use crate::memory::SimpleObjectMemory;
    use crate::options::Options;

    fn eval(src: &str) -> Value {
        let expr = Expression::parse(src).unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none(), "unexpected error: {e:?}");
        v
    }

    #[test]
    fn format_ticks_matches_spec_scenario() {
        assert_eq!(
            eval("formatTicks(637243624200000000)"),
            Value::string("2020-05-06T11:47:00.000Z")
        );
    }

    #[test]
    fn add_days_round_trips() {
        assert_eq!(
            eval("addDays('2020-01-01T00:00:00.000Z', 1)"),
            Value::string("2020-01-02T00:00:00.000Z")
        );
    }

    #[test]
    fn time_of_day_bucket_boundaries() {
        assert_eq!(eval("getTimeOfDay('2020-01-01T00:00:00.000Z')"), Value::string("midnight"));
        assert_eq!(eval("getTimeOfDay('2020-01-01T12:00:00.000Z')"), Value::string("noon"));
        assert_eq!(eval("getTimeOfDay('2020-01-01T19:00:00.000Z')"), Value::string("evening"));
    }
}
