use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const DATE_KEY_FORMAT: &str =
  "%Y-%m-%d";

/// Timezone used to decide what
/// "today" is. `None` means the
/// machine's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
  tz: Option<Tz>
}

impl Clock {
  #[must_use]
  pub fn local() -> Self {
    Self { tz: None }
  }

  #[must_use]
  pub fn with_timezone(
    tz: Tz
  ) -> Self {
    Self { tz: Some(tz) }
  }

  /// Builds a clock from the
  /// `timezone` config value;
  /// unparsable ids fall back to
  /// local time.
  pub fn from_config(
    raw: Option<&str>
  ) -> Self {
    match raw {
      | Some(raw) => Self {
        tz: parse_timezone(
          raw, "config"
        )
      },
      | None => Self::local()
    }
  }

  #[must_use]
  pub fn today(&self) -> NaiveDate {
    match self.tz {
      | Some(tz) => Utc::now()
        .with_timezone(&tz)
        .date_naive(),
      | None => {
        Local::now().date_naive()
      }
    }
  }
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
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id; using local time"
      );
      None
    }
  }
}

#[must_use]
pub fn format_date_key(
  date: NaiveDate
) -> String {
  date
    .format(DATE_KEY_FORMAT)
    .to_string()
}

pub fn parse_date_key(
  input: &str
) -> anyhow::Result<NaiveDate> {
  NaiveDate::parse_from_str(
    input.trim(),
    DATE_KEY_FORMAT
  )
  .with_context(|| {
    format!(
      "invalid date (expected \
       YYYY-MM-DD): {input}"
    )
  })
}

/// Resolves a user date expression
/// against `today`.
///
/// Accepts `YYYY-MM-DD`, `today`,
/// `yesterday`, `tomorrow`, `+N` /
/// `-N` day offsets and weekday
/// names (the next such day, today
/// included).
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "yesterday" => {
      return Ok(
        today - Duration::days(1)
      );
    }
    | "tomorrow" => {
      return Ok(
        today + Duration::days(1)
      );
    }
    | _ => {}
  }

  let offset =
    Regex::new(r"^([+-])(\d{1,5})d?$")
      .map_err(|e| {
        anyhow!(
          "internal regex compile \
           failure: {e}"
        )
      })?;
  if let Some(caps) =
    offset.captures(&lower)
  {
    let amount: i64 = caps[2]
      .parse()
      .with_context(|| {
        format!(
          "invalid day offset: \
           {token}"
        )
      })?;
    let delta =
      Duration::days(amount);
    return Ok(if &caps[1] == "-" {
      today - delta
    } else {
      today + delta
    });
  }

  if let Some(weekday) =
    parse_weekday(&lower)
  {
    let ahead = (7
      + weekday.num_days_from_monday()
      as i64
      - today
        .weekday()
        .num_days_from_monday()
        as i64)
      % 7;
    return Ok(
      today + Duration::days(ahead)
    );
  }

  parse_date_key(token).map_err(|_| {
    anyhow!(
      "unrecognized date expression: \
       {token}"
    )
  })
}

fn parse_weekday(
  lower: &str
) -> Option<Weekday> {
  let day = match lower {
    | "monday" | "mon" => Weekday::Mon,
    | "tuesday" | "tue" => {
      Weekday::Tue
    }
    | "wednesday" | "wed" => {
      Weekday::Wed
    }
    | "thursday" | "thu" => {
      Weekday::Thu
    }
    | "friday" | "fri" => Weekday::Fri,
    | "saturday" | "sat" => {
      Weekday::Sat
    }
    | "sunday" | "sun" => Weekday::Sun,
    | _ => return None
  };
  Some(day)
}
