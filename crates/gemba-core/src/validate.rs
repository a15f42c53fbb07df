//! Field-level validation applied before any store write.
//!
//! Limits mirror the admin form schemas. The store calls these on every
//! input struct, so all transports get the same rejections.

use crate::error::{Error, Result};

/// Requires `min..=max` characters.
pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
  let n = value.chars().count();
  if n < min || n > max {
    return Err(Error::invalid(format!(
      "{field} must be {min}-{max} characters"
    )));
  }
  Ok(())
}

/// Requires at most `max` characters; empty is fine.
pub fn max_length(field: &str, value: &str, max: usize) -> Result<()> {
  if value.chars().count() > max {
    return Err(Error::invalid(format!(
      "{field} must be at most {max} characters"
    )));
  }
  Ok(())
}

/// Uppercase letters, digits and (optionally) hyphens, 1..=max characters.
pub fn code(field: &str, value: &str, max: usize, allow_hyphen: bool) -> Result<()> {
  length(field, value, 1, max)?;
  let ok = value
    .chars()
    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || (allow_hyphen && c == '-'));
  if !ok {
    let charset = if allow_hyphen {
      "uppercase letters, numbers, and hyphens"
    } else {
      "uppercase letters and numbers"
    };
    return Err(Error::invalid(format!("{field} must be {charset} only")));
  }
  Ok(())
}

/// Lowercase letters, digits and hyphens, 1..=100 characters.
pub fn slug(value: &str) -> Result<()> {
  length("slug", value, 1, 100)?;
  let ok = value
    .chars()
    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
  if !ok {
    return Err(Error::invalid(
      "slug must be lowercase letters, numbers, and hyphens only".to_owned(),
    ));
  }
  Ok(())
}

/// `#rrggbb` hex color.
pub fn color(value: &str) -> Result<()> {
  let mut chars = value.chars();
  let ok = chars.next() == Some('#')
    && value.chars().skip(1).all(|c| c.is_ascii_hexdigit())
    && value.chars().count() == 7;
  if !ok {
    return Err(Error::invalid(
      "color must be a hex value like #1a2b3c".to_owned(),
    ));
  }
  Ok(())
}

/// Integer in `min..=max`.
pub fn range(field: &str, value: i64, min: i64, max: i64) -> Result<()> {
  if value < min || value > max {
    return Err(Error::invalid(format!(
      "{field} must be between {min} and {max}"
    )));
  }
  Ok(())
}

pub fn non_negative(field: &str, value: i64) -> Result<()> {
  if value < 0 {
    return Err(Error::invalid(format!("{field} must not be negative")));
  }
  Ok(())
}

/// Loose shape check only; deliverability is someone else's problem.
pub fn email(value: &str) -> Result<()> {
  let ok = value.chars().count() <= 254
    && value
      .split_once('@')
      .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'));
  if !ok {
    return Err(Error::invalid("email address is not valid".to_owned()));
  }
  Ok(())
}

/// 4..=8 ASCII digits.
pub fn pin(value: &str) -> Result<()> {
  let n = value.chars().count();
  if !(4..=8).contains(&n) || !value.chars().all(|c| c.is_ascii_digit()) {
    return Err(Error::invalid("PIN must be 4-8 digits".to_owned()));
  }
  Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn length_bounds() {
    assert!(length("name", "ok", 1, 100).is_ok());
    assert!(length("name", "", 1, 100).is_err());
    assert!(length("name", &"x".repeat(101), 1, 100).is_err());
  }

  #[test]
  fn code_charsets() {
    assert!(code("code", "WELD-01", 20, true).is_ok());
    assert!(code("code", "WELD-01", 20, false).is_err());
    assert!(code("code", "OPS", 10, false).is_ok());
    assert!(code("code", "ops", 10, false).is_err());
    assert!(code("code", "TOOLONGCODE", 10, false).is_err());
  }

  #[test]
  fn slug_charset() {
    assert!(slug("area-a").is_ok());
    assert!(slug("Area A").is_err());
    assert!(slug("").is_err());
  }

  #[test]
  fn color_shape() {
    assert!(color("#1a2b3c").is_ok());
    assert!(color("#1A2B3C").is_ok());
    assert!(color("1a2b3c").is_err());
    assert!(color("#1a2b3").is_err());
    assert!(color("#1a2b3cz").is_err());
  }

  #[test]
  fn email_shape() {
    assert!(email("john@factory.local").is_ok());
    assert!(email("nope").is_err());
    assert!(email("@factory.local").is_err());
    assert!(email("john@").is_err());
  }

  #[test]
  fn pin_shape() {
    assert!(pin("123456").is_ok());
    assert!(pin("0000").is_ok());
    assert!(pin("123").is_err());
    assert!(pin("123456789").is_err());
    assert!(pin("12a456").is_err());
  }
}
