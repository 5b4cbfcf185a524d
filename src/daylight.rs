// src/daylight.rs
//
// Computes the next eligible wake time: a repeating period clamped into a
// daily window whose boundaries are crontab expressions. The day-of-week
// field of the expressions decides which calendar days are eligible at all.

use std::str::FromStr;

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, Timelike};
use cron::Schedule;

use crate::config::{ConfigError, ScheduleConfig};

pub struct DaylightWindow {
    period: ChronoDuration,
    begin: Schedule,
    end: Schedule,
}

impl DaylightWindow {
    pub fn new(period_seconds: u64, begin_expr: &str, end_expr: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            period: ChronoDuration::seconds(period_seconds as i64),
            begin: parse_schedule(begin_expr)?,
            end: parse_schedule(end_expr)?,
        })
    }

    pub fn from_config(schedule: &ScheduleConfig) -> Result<Self, ConfigError> {
        Self::new(
            schedule.period_seconds,
            &schedule.daylight_begin,
            &schedule.daylight_end,
        )
    }

    /// Next wake time strictly inside a daylight window, at second
    /// resolution. `None` only if a boundary expression has no future
    /// occurrence at all.
    ///
    /// The candidate `now + period` is clamped up to the window begin and
    /// accepted up to and including the window end; past the end, the
    /// search restarts from the next calendar day's begin occurrence,
    /// which may itself lie days ahead (weekends and other ineligible
    /// days are encoded in the cron day-of-week field).
    pub fn next_occurrence(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let now = now.with_nanosecond(0).unwrap_or(now);
        let day_start = start_of_day(now)?;

        let today_end = self.end.after(&day_start).next()?;
        if now <= today_end {
            let today_begin = self.begin.after(&day_start).next()?;
            let mut candidate = now + self.period;
            if candidate < today_begin {
                candidate = today_begin;
            }
            if candidate <= today_end {
                return Some(candidate);
            }
        }

        let next_day = day_start + ChronoDuration::days(1);
        self.begin.after(&next_day).next()
    }
}

fn start_of_day(now: DateTime<Local>) -> Option<DateTime<Local>> {
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
}

fn parse_schedule(expr: &str) -> Result<Schedule, ConfigError> {
    let normalized = normalize_cron(expr)?;
    Schedule::from_str(&normalized).map_err(|e| ConfigError::CronSyntax {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Rewrite a standard 5-field crontab expression into the seconds-first
/// 6-field form the `cron` crate parses. Crontab numbers days of week
/// 0-7 with both 0 and 7 meaning Sunday; the crate numbers them 1-7 with
/// Sunday as 1, so numeric tokens in the day-of-week field are remapped.
fn normalize_cron(expr: &str) -> Result<String, ConfigError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ConfigError::CronFieldCount {
            expr: expr.to_string(),
            fields: fields.len(),
        });
    }
    let dow = remap_dow(fields[4]).map_err(|reason| ConfigError::CronSyntax {
        expr: expr.to_string(),
        reason,
    })?;
    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], dow
    ))
}

fn remap_dow(field: &str) -> Result<String, String> {
    let items = field
        .split(',')
        .map(remap_dow_item)
        .collect::<Result<Vec<_>, String>>()?;
    Ok(items.join(","))
}

fn remap_dow_item(item: &str) -> Result<String, String> {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (item, None),
    };

    let remapped = if base == "*" || base == "?" {
        base.to_string()
    } else if let Some((lo, hi)) = base.split_once('-') {
        match (remap_dow_num(lo)?, remap_dow_num(hi)?) {
            (Some(lo), Some(hi)) if lo <= hi => format!("{}-{}", lo, hi),
            (Some(lo), Some(hi)) => {
                // Remapping shifted the range across Sunday; split it.
                if step.is_some() {
                    return Err(format!(
                        "stepped day-of-week range `{}` wraps over Sunday",
                        base
                    ));
                }
                format!("{}-7,1-{}", lo, hi)
            }
            (None, None) => base.to_string(),
            _ => {
                return Err(format!(
                    "day-of-week range `{}` mixes numbers and names",
                    base
                ));
            }
        }
    } else {
        match remap_dow_num(base)? {
            Some(n) => n.to_string(),
            None => base.to_string(),
        }
    };

    Ok(match step {
        Some(step) => format!("{}/{}", remapped, step),
        None => remapped,
    })
}

/// `Some(remapped)` for a numeric token, `None` for a named day (the cron
/// crate understands SUN..SAT itself).
fn remap_dow_num(token: &str) -> Result<Option<u8>, String> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let n: u8 = token
        .parse()
        .map_err(|_| format!("bad day-of-week `{}`", token))?;
    if n > 7 {
        return Err(format!("day-of-week `{}` out of range", token));
    }
    Ok(Some(n % 7 + 1))
}
