//! Schedule parsing and next occurrence calculation.
//!
//! Accepts 6-field cron expressions with a leading seconds field
//! (`sec min hour day-of-month month day-of-week`), the descriptor shortcuts
//! (`@daily`, `@hourly`, ...) and interval expressions (`@every 1h30m`).
//!
//! Numeric day-of-week values follow the usual crontab convention where
//! `0` is Sunday and `6` is Saturday. When both day fields are restricted, a
//! day matching either one fires, as in Vixie cron.

use chrono::{DateTime, TimeZone, Timelike};
use cron::Schedule as CronSchedule;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Invalid cron expression.
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    /// Invalid interval expression.
    #[error("invalid interval expression: {0}")]
    InvalidInterval(String),
}

/// A parsed recurrence expression.
#[derive(Clone)]
pub struct Schedule {
    /// The original expression string.
    expression: String,
    kind: ScheduleKind,
}

#[derive(Clone)]
enum ScheduleKind {
    Cron(Box<CronSchedule>),
    /// Day-of-month and day-of-week both restricted: either one matches.
    CronEither {
        by_month_day: Box<CronSchedule>,
        by_week_day: Box<CronSchedule>,
    },
    /// Fixed delay between firings (`@every`).
    Interval(chrono::Duration),
}

impl Schedule {
    /// Parse a recurrence expression.
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let trimmed = expression.trim();

        let kind = if trimmed.starts_with('@') {
            Self::parse_shortcut(trimmed)?
        } else {
            Self::parse_cron(trimmed)?
        };

        Ok(Self {
            expression: trimmed.to_string(),
            kind,
        })
    }

    /// Parse a shortcut expression (@daily, @every, etc.).
    fn parse_shortcut(expression: &str) -> Result<ScheduleKind, ScheduleError> {
        match expression.to_lowercase().as_str() {
            "@yearly" | "@annually" => Self::parse_cron("0 0 0 1 1 *"),
            "@monthly" => Self::parse_cron("0 0 0 1 * *"),
            "@weekly" => Self::parse_cron("0 0 0 * * 0"),
            "@daily" | "@midnight" => Self::parse_cron("0 0 0 * * *"),
            "@hourly" => Self::parse_cron("0 0 * * * *"),
            s if s.starts_with("@every ") => Self::parse_interval(&s[7..]),
            _ => Err(ScheduleError::InvalidCron {
                expression: expression.to_string(),
                reason: "unknown shortcut".to_string(),
            }),
        }
    }

    /// Parse an interval expression (e.g., "5m", "1h30m").
    fn parse_interval(interval: &str) -> Result<ScheduleKind, ScheduleError> {
        let secs = parse_duration_secs(interval.trim())?;
        let duration = chrono::Duration::try_seconds(secs as i64)
            .ok_or_else(|| ScheduleError::InvalidInterval(interval.to_string()))?;
        Ok(ScheduleKind::Interval(duration))
    }

    /// Parse a 6-field cron expression.
    fn parse_cron(expression: &str) -> Result<ScheduleKind, ScheduleError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ScheduleError::InvalidCron {
                expression: expression.to_string(),
                reason: format!("expected 6 fields, got {}", fields.len()),
            });
        }

        let dow = shift_day_of_week(fields[5]).ok_or_else(|| ScheduleError::InvalidCron {
            expression: expression.to_string(),
            reason: format!("invalid day-of-week field '{}'", fields[5]),
        })?;
        let (sec, min, hour, dom, month) = (fields[0], fields[1], fields[2], fields[3], fields[4]);

        let build = |dom: &str, dow: &str| {
            let normalized = format!("{} {} {} {} {} {}", sec, min, hour, dom, month, dow);
            CronSchedule::from_str(&normalized)
                .map(Box::new)
                .map_err(|e| ScheduleError::InvalidCron {
                    expression: expression.to_string(),
                    reason: e.to_string(),
                })
        };

        if is_unrestricted(dom) || is_unrestricted(&dow) {
            return Ok(ScheduleKind::Cron(build(dom, &dow)?));
        }

        Ok(ScheduleKind::CronEither {
            by_month_day: build(dom, "*")?,
            by_week_day: build("*", &dow)?,
        })
    }

    /// Next matching instant strictly after `after`.
    ///
    /// `None` when the expression can never match again.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match &self.kind {
            ScheduleKind::Cron(schedule) => schedule.after(after).next(),
            ScheduleKind::CronEither {
                by_month_day,
                by_week_day,
            } => [
                by_month_day.after(after).next(),
                by_week_day.after(after).next(),
            ]
            .into_iter()
            .flatten()
            .min(),
            ScheduleKind::Interval(delta) => {
                // Whole seconds, so wake-up latency does not accumulate.
                let start = after.with_nanosecond(0).unwrap_or_else(|| after.clone());
                start.checked_add_signed(*delta)
            }
        }
    }

    /// The next `n` instants after `after`.
    pub fn upcoming<Tz: TimeZone>(&self, after: &DateTime<Tz>, n: usize) -> Vec<DateTime<Tz>> {
        let mut results = Vec::with_capacity(n);
        let mut current = after.clone();
        while results.len() < n {
            match self.next_after(&current) {
                Some(next) => {
                    current = next.clone();
                    results.push(next);
                }
                None => break,
            }
        }
        results
    }

    /// Get the original expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("expression", &self.expression)
            .finish()
    }
}

/// Parse a duration string like "5m", "1h", "1h30m", "30s" into seconds.
fn parse_duration_secs(s: &str) -> Result<u64, ScheduleError> {
    let mut total_secs: u64 = 0;
    let mut current_num = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            current_num.push(c);
        } else {
            let num: u64 = current_num
                .parse()
                .map_err(|_| ScheduleError::InvalidInterval(s.to_string()))?;
            current_num.clear();

            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(ScheduleError::InvalidInterval(s.to_string())),
            };
            total_secs = num
                .checked_mul(unit)
                .and_then(|v| total_secs.checked_add(v))
                .ok_or_else(|| ScheduleError::InvalidInterval(s.to_string()))?;
        }
    }

    // Trailing digits without a unit
    if !current_num.is_empty() || total_secs == 0 {
        return Err(ScheduleError::InvalidInterval(s.to_string()));
    }

    Ok(total_secs)
}

/// `*` and `?` (optionally with a step of 1) leave a day field unrestricted.
fn is_unrestricted(field: &str) -> bool {
    matches!(field, "*" | "?" | "*/1" | "?/1")
}

/// Rewrite numeric day-of-week values from crontab numbering (0 = Sunday)
/// to the `cron` crate's (1 = Sunday). Names, `*`, `?` and step values are
/// left alone.
fn shift_day_of_week(field: &str) -> Option<String> {
    let items: Option<Vec<String>> = field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let shifted_range = match range.split_once('-') {
                Some((start, end)) => format!("{}-{}", shift_day(start)?, shift_day(end)?),
                None => shift_day(range)?,
            };
            Some(match step {
                Some(step) => format!("{}/{}", shifted_range, step),
                None => shifted_range,
            })
        })
        .collect();
    items.map(|items| items.join(","))
}

fn shift_day(token: &str) -> Option<String> {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Some(token.to_string());
    }
    match token.parse::<u8>().ok()? {
        day @ 0..=6 => Some((day + 1).to_string()),
        // 7 is a common alias for Sunday
        7 => Some("1".to_string()),
        _ => None,
    }
}
