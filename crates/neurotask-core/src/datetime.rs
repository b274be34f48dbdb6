use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{
  DateTime,
  Datelike,
  Days,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::error::TaskError;

const TIMEZONE_CONFIG_FILE: &str =
  "neurotask-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "NEUROTASK_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "NEUROTASK_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// The zone that decides which calendar
/// day "today" is.
#[derive(Debug, Clone, Copy)]
pub enum ProjectZone {
  Local,
  Named(Tz)
}

pub fn project_zone() -> &'static ProjectZone
{
  static PROJECT_ZONE: OnceLock<
    ProjectZone
  > = OnceLock::new();
  PROJECT_ZONE
    .get_or_init(resolve_project_zone)
}

/// Calendar date of `now` in the project
/// zone.
#[must_use]
pub fn today(
  now: DateTime<Utc>
) -> NaiveDate {
  date_in_zone(now, project_zone())
}

#[must_use]
pub fn date_in_zone(
  now: DateTime<Utc>,
  zone: &ProjectZone
) -> NaiveDate {
  match zone {
    | ProjectZone::Local => {
      now
        .with_timezone(&Local)
        .date_naive()
    }
    | ProjectZone::Named(tz) => {
      now.with_timezone(tz).date_naive()
    }
  }
}

#[must_use]
pub fn add_days(
  day: NaiveDate,
  days: u64
) -> NaiveDate {
  day
    .checked_add_days(Days::new(days))
    .unwrap_or(day)
}

#[must_use]
pub fn format_date(
  day: NaiveDate
) -> String {
  day.format("%Y-%m-%d").to_string()
}

fn resolve_project_zone() -> ProjectZone
{
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return ProjectZone::Named(tz);
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return ProjectZone::Named(tz);
  }

  tracing::debug!(
    "no timezone configured; using \
     system local time"
  );
  ProjectZone::Local
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

fn relative_re()
-> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
    )
    .map_err(|err| {
      tracing::error!(error = %err, "internal regex compile failure");
    })
    .ok()
  })
  .as_ref()
}

/// Parses a due-date expression relative
/// to `today`: `today`, `tomorrow`,
/// `yesterday`, weekday names, `+3d` /
/// `-1w` offsets, or `YYYY-MM-DD`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due_expr(
  input: &str,
  today: NaiveDate
) -> Result<NaiveDate, TaskError> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let invalid = || {
    TaskError::InvalidDue(
      token.to_string()
    )
  };

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return today
        .checked_sub_days(Days::new(1))
        .ok_or_else(invalid);
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(re) = relative_re()
    && let Some(caps) =
      re.captures(&lower)
  {
    let num: u64 = caps["num"]
      .parse()
      .map_err(|_| invalid())?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    let shifted = if &caps["sign"] == "-"
    {
      today
        .checked_sub_days(Days::new(days))
    } else {
      today
        .checked_add_days(Days::new(days))
    };
    return shifted.ok_or_else(invalid);
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map_err(|_| invalid())
}

fn next_weekday_date(
  today: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let current = today
    .weekday()
    .num_days_from_monday();
  let wanted =
    target.num_days_from_monday();
  let mut delta =
    (7 + wanted - current) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(today, u64::from(delta))
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    ProjectZone,
    date_in_zone,
    parse_due_expr
  };
  use crate::error::TaskError;

  fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 17)
      .expect("valid date")
  }

  fn ymd(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(
      raw, "%Y-%m-%d"
    )
    .expect("valid date")
  }

  #[test]
  fn parses_named_days() {
    assert_eq!(
      parse_due_expr("today", tuesday()),
      Ok(tuesday())
    );
    assert_eq!(
      parse_due_expr(
        "Tomorrow",
        tuesday()
      ),
      Ok(ymd("2026-02-18"))
    );
    assert_eq!(
      parse_due_expr(
        "yesterday",
        tuesday()
      ),
      Ok(ymd("2026-02-16"))
    );
  }

  #[test]
  fn weekday_is_always_in_the_future() {
    assert_eq!(
      parse_due_expr(
        "wednesday",
        tuesday()
      ),
      Ok(ymd("2026-02-18"))
    );
    assert_eq!(
      parse_due_expr("tue", tuesday()),
      Ok(ymd("2026-02-24"))
    );
  }

  #[test]
  fn parses_relative_offsets() {
    assert_eq!(
      parse_due_expr("+3d", tuesday()),
      Ok(ymd("2026-02-20"))
    );
    assert_eq!(
      parse_due_expr("+2w", tuesday()),
      Ok(ymd("2026-03-03"))
    );
    assert_eq!(
      parse_due_expr("-1d", tuesday()),
      Ok(ymd("2026-02-16"))
    );
  }

  #[test]
  fn parses_iso_date_and_rejects_garbage()
   {
    assert_eq!(
      parse_due_expr(
        "2026-12-31",
        tuesday()
      ),
      Ok(ymd("2026-12-31"))
    );
    assert_eq!(
      parse_due_expr("someday", tuesday()),
      Err(TaskError::InvalidDue(
        "someday".to_string()
      ))
    );
  }

  #[test]
  fn named_zone_decides_the_calendar_day()
   {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 3, 0, 0
      )
      .single()
      .expect("valid now");
    assert_eq!(
      date_in_zone(
        now,
        &ProjectZone::Named(
          chrono_tz::UTC
        )
      ),
      ymd("2026-02-17")
    );
    assert_eq!(
      date_in_zone(
        now,
        &ProjectZone::Named(
          chrono_tz::America::Mexico_City
        )
      ),
      ymd("2026-02-16")
    );
  }
}
