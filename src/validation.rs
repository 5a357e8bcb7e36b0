//! Contact validation for prospects registered from outside the simulation.

use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use std::sync::LazyLock;

// RFC 5322 simplified: local@domain.tld
static EMAIL_REGEX: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
});

/// Validate email address
///
/// Checks for:
/// - Basic email format (contains @ and a dotted domain)
/// - Fake/placeholder patterns (repeated digits like 9999, 1111)
/// - Minimum length requirements
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    let fake_patterns = ["999999", "111111", "000000", "123456789", "test@test"];
    for pattern in &fake_patterns {
        if email.contains(pattern) {
            tracing::warn!(
                "❌ Invalid email detected (fake pattern '{}'): {}",
                pattern,
                email
            );
            return false;
        }
    }

    let matches = EMAIL_REGEX
        .as_ref()
        .map(|re| re.is_match(email))
        .unwrap_or(false);
    if !matches {
        tracing::warn!("❌ Invalid email format: {}", email);
    }
    matches
}

/// Validate and normalize a North American (NANP) phone number.
///
/// Parses with the US region so bare ten-digit numbers are accepted, rejects
/// numbers outside country code 1, and returns the E.164 form
/// (`+13128294410`) on success.
pub fn validate_us_phone(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() || raw.len() < 10 {
        return Err("Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::US), raw) {
        Ok(number) => {
            if number.code().value() != 1 {
                tracing::warn!("❌ Non-NANP phone number: {}", raw);
                return Err("Phone must be a US or Canadian number".to_string());
            }
            if !phonenumber::is_valid(&number) {
                tracing::warn!("❌ Invalid phone number: {}", raw);
                return Err("Invalid phone number".to_string());
            }
            let formatted = number.format().mode(Mode::E164).to_string();
            tracing::debug!("✓ Valid phone: {} → {}", raw, formatted);
            Ok(formatted)
        }
        Err(e) => {
            tracing::warn!("❌ Failed to parse phone '{}': {:?}", raw, e);
            Err(format!("Parse error: {:?}", e))
        }
    }
}
