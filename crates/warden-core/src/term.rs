//! Sentence lengths, and the compact/long text forms used to read and show
//! them.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Encodes [`Term::Indefinite`] in persisted records.
pub const INDEFINITE_SENTINEL: i64 = -1;

/// Longest finite term accepted: 100 years. Anything longer should be
/// indefinite.
pub const MAX_TERM_SECONDS: i64 = 100 * 365 * 86_400;

/// How long a warrant holds its subject once it starts running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "seconds", rename_all = "snake_case")]
pub enum Term {
  /// Never counts down; held until voided.
  Indefinite,
  /// A countdown of this many seconds. Zero is a valid (instant) term.
  Finite(i64),
}

impl Term {
  /// Build a finite term, rejecting negative lengths and lengths over
  /// [`MAX_TERM_SECONDS`].
  pub fn finite(seconds: i64) -> Result<Self> {
    if seconds < 0 {
      return Err(Error::NegativeDuration(seconds));
    }
    if seconds > MAX_TERM_SECONDS {
      return Err(Error::TermTooLong(seconds));
    }
    Ok(Self::Finite(seconds))
  }

  pub fn is_indefinite(&self) -> bool { matches!(self, Self::Indefinite) }

  /// The record encoding: seconds, or [`INDEFINITE_SENTINEL`].
  pub fn to_seconds(self) -> i64 {
    match self {
      Self::Indefinite => INDEFINITE_SENTINEL,
      Self::Finite(s) => s,
    }
  }

  /// Inverse of [`Term::to_seconds`]. Stored values outside
  /// `0..=MAX_TERM_SECONDS` (other than the sentinel) are clamped into range.
  pub fn from_seconds(seconds: i64) -> Self {
    match seconds {
      INDEFINITE_SENTINEL => Self::Indefinite,
      s => Self::Finite(s.clamp(0, MAX_TERM_SECONDS)),
    }
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse a human-entered term.
///
/// Accepts `indefinite` (or `-1`), a bare number of seconds, or a compact
/// form like `1d12h`, `90m`, `2h30m15s`. Units must appear in descending
/// order and at most once each.
pub fn parse_term(text: &str) -> Result<Term> {
  let trimmed = text.trim().to_ascii_lowercase();
  let invalid = || Error::InvalidDuration(text.to_owned());

  if trimmed.is_empty() {
    return Err(invalid());
  }
  if trimmed == "indefinite" || trimmed == "-1" {
    return Ok(Term::Indefinite);
  }
  if let Ok(seconds) = trimmed.parse::<i64>() {
    return Term::finite(seconds);
  }

  const UNITS: [(char, i64); 4] = [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)];

  let mut total: i64 = 0;
  let mut digits = String::new();
  // Index into UNITS of the next unit allowed.
  let mut next_unit = 0;

  for c in trimmed.chars() {
    if c.is_ascii_digit() {
      digits.push(c);
      continue;
    }
    let offset = UNITS[next_unit..]
      .iter()
      .position(|(u, _)| *u == c)
      .ok_or_else(invalid)?;
    let (_, scale) = UNITS[next_unit + offset];
    let value: i64 = digits.parse().map_err(|_| invalid())?;
    total = value
      .checked_mul(scale)
      .and_then(|v| total.checked_add(v))
      .ok_or_else(invalid)?;
    digits.clear();
    next_unit += offset + 1;
  }

  if !digits.is_empty() {
    return Err(invalid());
  }
  Term::finite(total)
}

// ─── Formatting ──────────────────────────────────────────────────────────────

fn unit(value: i64, name: &str) -> String {
  if value == 1 {
    format!("{value} {name}")
  } else {
    format!("{value} {name}s")
  }
}

/// Render seconds as e.g. `1 day, 2 hours, 0 minutes, 5 seconds`.
///
/// Leading zero units are dropped; zero (or less) renders as `now`.
pub fn format_duration_long(seconds: i64) -> String {
  if seconds <= 0 {
    return "now".to_owned();
  }

  let days = seconds / 86_400;
  let hours = seconds % 86_400 / 3_600;
  let minutes = seconds % 3_600 / 60;
  let secs = seconds % 60;

  let parts = [(days, "day"), (hours, "hour"), (minutes, "minute"), (secs, "second")];
  let first = parts.iter().position(|(v, _)| *v > 0).unwrap_or(3);

  parts[first..]
    .iter()
    .map(|(v, name)| unit(*v, name))
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_compact_forms() {
    assert_eq!(parse_term("1d").unwrap(), Term::Finite(86_400));
    assert_eq!(parse_term("2h30m").unwrap(), Term::Finite(9_000));
    assert_eq!(parse_term("1d2h3m4s").unwrap(), Term::Finite(93_784));
    assert_eq!(parse_term(" 90M ").unwrap(), Term::Finite(5_400));
  }

  #[test]
  fn parses_plain_seconds_and_indefinite() {
    assert_eq!(parse_term("3600").unwrap(), Term::Finite(3_600));
    assert_eq!(parse_term("0").unwrap(), Term::Finite(0));
    assert_eq!(parse_term("indefinite").unwrap(), Term::Indefinite);
    assert_eq!(parse_term("-1").unwrap(), Term::Indefinite);
  }

  #[test]
  fn rejects_malformed_terms() {
    for bad in ["", "abc", "1h1d", "1h1h", "12x", "h", "-5", "10m5"] {
      assert!(parse_term(bad).is_err(), "{bad:?} should not parse");
    }
  }

  #[test]
  fn sentinel_roundtrip() {
    assert_eq!(Term::from_seconds(-1), Term::Indefinite);
    assert_eq!(Term::Indefinite.to_seconds(), INDEFINITE_SENTINEL);
    assert_eq!(Term::from_seconds(-30), Term::Finite(0));
    assert_eq!(Term::from_seconds(60).to_seconds(), 60);
    assert_eq!(Term::from_seconds(i64::MAX), Term::Finite(MAX_TERM_SECONDS));
  }

  #[test]
  fn rejects_terms_past_the_cap() {
    assert!(matches!(parse_term("300000000d"), Err(Error::TermTooLong(_))));
    assert!(matches!(
      parse_term("9223372036854775807"),
      Err(Error::TermTooLong(_))
    ));
    assert!(matches!(
      Term::finite(MAX_TERM_SECONDS + 1),
      Err(Error::TermTooLong(_))
    ));
    assert_eq!(parse_term("36500d").unwrap(), Term::Finite(MAX_TERM_SECONDS));
  }

  #[test]
  fn long_format_drops_leading_zero_units() {
    assert_eq!(format_duration_long(0), "now");
    assert_eq!(format_duration_long(1), "1 second");
    assert_eq!(format_duration_long(61), "1 minute, 1 second");
    assert_eq!(format_duration_long(3_600), "1 hour, 0 minutes, 0 seconds");
    assert_eq!(
      format_duration_long(2 * 86_400 + 5),
      "2 days, 0 hours, 0 minutes, 5 seconds"
    );
  }
}
