//! Timex predicates.
//!
//! Timex expressions are TIMEX3 strings (the Microsoft Recognizers-Text
//! grammar): `"2020-05-06"` (a definite date), `"XXXX-WXX-6"` (a bare
//! weekday — "next/last Friday"), `"PT1H"` (a one-hour duration),
//! `"PRESENT_REF"` (the present moment). This family only recognizes the
//! shapes 's catalog actually needs — full TIMEX3 (seasons, date
//! ranges with explicit bounds, fuzzy durations) is out of scope, scoped
//! down in DESIGN.md.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::builtins::datetime::parse_iso;
use crate::funcutil::{apply, validate_arity_and_any_type};
use crate::registry::{insert, FunctionEntry};

fn str_arg(v: &Value, label: &str) -> Result<String, ExpressionError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ExpressionError::type_error(format!("{label}: expected a timex string"))),
    }
}

fn is_duration(s: &str) -> bool {
    s.starts_with('P') && s != "PRESENT_REF"
}

fn is_present(s: &str) -> bool {
    s == "PRESENT_REF"
}

/// A definite date: `yyyy-MM-dd` with no `X` placeholders.
fn is_definite_date(s: &str) -> bool {
    !s.contains('X') && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_date(s: &str) -> bool {
    !is_duration(s) && !is_present(s) && (is_definite_date(s) || s.contains("-W") || s.starts_with("XXXX-"))
}

fn is_date_range(s: &str) -> bool {
    is_date(s) && s.contains('X') && !is_definite_date(s)
}

fn is_time(s: &str) -> bool {
    s.starts_with('T') && s.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
}

fn is_time_range(s: &str) -> bool {
    matches!(s, "TMO" | "TAF" | "TEV" | "TNI") || (s.starts_with('T') && s.contains('X'))
}

/// `isDefinite`: a concrete, fully-resolved date (not a range, not a
/// duration, not the present moment).
fn is_timex_definite(s: &str) -> bool {
    is_definite_date(s)
}

/// ISO weekday parsed from a `XXXX-WXX-D` pattern (`D` is 1=Monday..7=Sunday).
fn weekday_digit(s: &str) -> Option<u32> {
    let tail = s.strip_prefix("XXXX-WXX-")?;
    tail.parse::<u32>().ok().filter(|d| (1..=7).contains(d))
}

fn iso_weekday_of(d: NaiveDate) -> u32 {
    d.weekday().number_from_monday()
}

/// Representative clock time for a partially-specified time timex:
/// `Thh`/`Thh:mm`/`Thh:mm:ss` parse to their literal hour/minute/second; the
/// four day-part buckets (`TMO`/`TAF`/`TEV`/`TNI`) resolve to the
/// representative hour Microsoft's Recognizers-Text TimexProperty grammar
/// uses for each part of day — morning 08:00, afternoon 14:00, evening
/// 19:00, night 23:00.
fn time_of_day_hms(s: &str) -> Option<NaiveTime> {
    match s {
        "TMO" => return NaiveTime::from_hms_opt(8, 0, 0),
        "TAF" => return NaiveTime::from_hms_opt(14, 0, 0),
        "TEV" => return NaiveTime::from_hms_opt(19, 0, 0),
        "TNI" => return NaiveTime::from_hms_opt(23, 0, 0),
        _ => {}
    }
    let digits = s.strip_prefix('T')?;
    let mut parts = digits.splitn(3, ':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0))?;
    let second: u32 = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0))?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Resolves a partially-specified time-of-day timex to the nearest
/// preceding/following concrete instant relative to `reference`. Ties (the
/// reference instant already sits exactly on the target time-of-day) move
/// to the adjacent day, mirroring `nearest_viable_date`'s same-weekday
/// convention.
fn nearest_viable_time(timex: &str, reference: DateTime<Utc>, forward: bool) -> Result<DateTime<Utc>, ExpressionError> {
    let time = time_of_day_hms(timex)
        .ok_or_else(|| ExpressionError::domain(format!("unsupported timex time pattern '{timex}'")))?;
    let same_day = Utc.from_utc_datetime(&reference.date_naive().and_time(time));
    Ok(if forward {
        if same_day > reference {
            same_day
        } else {
            same_day + Duration::days(1)
        }
    } else if same_day < reference {
        same_day
    } else {
        same_day - Duration::days(1)
    })
}

fn nearest_viable_date(timex: &str, reference: NaiveDate, forward: bool) -> Result<NaiveDate, ExpressionError> {
    let target = weekday_digit(timex)
        .ok_or_else(|| ExpressionError::domain(format!("unsupported timex date pattern '{timex}'")))?;
    let ref_weekday = iso_weekday_of(reference);
    let delta = if forward {
        let diff = (target as i64 - ref_weekday as i64).rem_euclid(7);
        if diff == 0 { 7 } else { diff }
    } else {
        let diff = (ref_weekday as i64 - target as i64).rem_euclid(7);
        if diff == 0 { 7 } else { diff }
    };
    let days = if forward { delta } else { -delta };
    Ok(reference + chrono::Duration::days(days))
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    for (name, pred) in [
        ("isDefinite", is_timex_definite as fn(&str) -> bool),
        ("isTime", is_time),
        ("isDuration", is_duration),
        ("isDate", is_date),
        ("isTimeRange", is_time_range),
        ("isDateRange", is_date_range),
        ("isPresent", is_present),
    ] {
        insert(
            map,
            name,
            ReturnType::BOOLEAN,
            Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
            apply(move |args| Ok(Value::Boolean(pred(&str_arg(&args[0], name)?))), None),
        );
    }
    insert(
        map,
        "getPreviousViableDate",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::STRING)),
        apply(
            |args| {
                let timex = str_arg(&args[0], "getPreviousViableDate")?;
                let reference = match args.get(1) {
                    Some(v) => NaiveDate::parse_from_str(&str_arg(v, "getPreviousViableDate")?, "%Y-%m-%d")
                        .map_err(|_| ExpressionError::format("getPreviousViableDate: invalid reference date"))?,
                    None => chrono::Utc::now().date_naive(),
                };
                let date = nearest_viable_date(&timex, reference, false)?;
                Ok(Value::String(date.format("%Y-%m-%d").to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "getNextViableDate",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::STRING)),
        apply(
            |args| {
                let timex = str_arg(&args[0], "getNextViableDate")?;
                let reference = match args.get(1) {
                    Some(v) => NaiveDate::parse_from_str(&str_arg(v, "getNextViableDate")?, "%Y-%m-%d")
                        .map_err(|_| ExpressionError::format("getNextViableDate: invalid reference date"))?,
                    None => chrono::Utc::now().date_naive(),
                };
                let date = nearest_viable_date(&timex, reference, true)?;
                Ok(Value::String(date.format("%Y-%m-%d").to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "getPreviousViableTime",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::STRING)),
        apply(
            |args| {
                let timex = str_arg(&args[0], "getPreviousViableTime")?;
                let reference = match args.get(1) {
                    Some(v) => parse_iso(&str_arg(v, "getPreviousViableTime")?)?,
                    None => Utc::now(),
                };
                let instant = nearest_viable_time(&timex, reference, false)?;
                Ok(Value::String(instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "getNextViableTime",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::STRING)),
        apply(
            |args| {
                let timex = str_arg(&args[0], "getNextViableTime")?;
                let reference = match args.get(1) {
                    Some(v) => parse_iso(&str_arg(v, "getNextViableTime")?)?,
                    None => Utc::now(),
                };
                let instant = nearest_viable_time(&timex, reference, true)?;
                Ok(Value::String(instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()))
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
    fn is_duration_recognizes_period() {
        assert_eq!(eval("isDuration('PT1H')"), Value::Boolean(true));
        assert_eq!(eval("isDuration('2020-05-06')"), Value::Boolean(false));
    }

    #[test]
    fn is_definite_requires_full_date() {
        assert_eq!(eval("isDefinite('2020-05-06')"), Value::Boolean(true));
        assert_eq!(eval("isDefinite('XXXX-WXX-6')"), Value::Boolean(false));
    }

    #[test]
    fn next_viable_date_resolves_bare_weekday() {
        assert_eq!(
            eval("getNextViableDate('XXXX-WXX-5', '2020-05-04')"),
            Value::string("2020-05-08")
        );
    }

    #[test]
    fn next_viable_time_resolves_definite_time_later_same_day() {
        assert_eq!(
            eval("getNextViableTime('T14:00:00', '2020-05-06T08:00:00.000Z')"),
            Value::string("2020-05-06T14:00:00.000Z")
        );
    }

    #[test]
    fn next_viable_time_rolls_to_next_day_when_already_past() {
        assert_eq!(
            eval("getNextViableTime('T08:00:00', '2020-05-06T14:00:00.000Z')"),
            Value::string("2020-05-07T08:00:00.000Z")
        );
    }

    #[test]
    fn previous_viable_time_rolls_back_a_day_when_still_to_come() {
        assert_eq!(
            eval("getPreviousViableTime('T14:00:00', '2020-05-06T08:00:00.000Z')"),
            Value::string("2020-05-05T14:00:00.000Z")
        );
    }

    #[test]
    fn viable_time_resolves_day_part_bucket() {
        assert_eq!(
            eval("getNextViableTime('TMO', '2020-05-06T20:00:00.000Z')"),
            Value::string("2020-05-07T08:00:00.000Z")
        );
    }
}
