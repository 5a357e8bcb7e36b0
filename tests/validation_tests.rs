/// Unit tests for prospect contact validation
/// Email checks and NANP phone normalization used by prospect intake
use freight_agents::validation::{is_valid_email, validate_us_phone};

#[cfg(test)]
mod email_validation_tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("dispatch@example.com"));
        assert!(is_valid_email("maria.alvarez@summitlogistics.com"));
        assert!(is_valid_email("ops+loads@carrier.co.uk"));
        assert!(is_valid_email("fleet_ops@three-rivers.com"));
        assert!(is_valid_email("a@b.c"));
    }

    #[test]
    fn test_invalid_emails_basic() {
        // Missing @ or .
        assert!(!is_valid_email("dispatchexample.com"));
        assert!(!is_valid_email("dispatch@examplecom"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dispatch@"));

        // Too short
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_invalid_emails_fake_patterns() {
        assert!(!is_valid_email("3129999999@gmail.com"));
        assert!(!is_valid_email("user111111@example.com"));
        assert!(!is_valid_email("000000@example.com"));
        assert!(!is_valid_email("lead123456789@example.com"));
        assert!(!is_valid_email("test@test.com"));
    }

    #[test]
    fn test_invalid_emails_malformed() {
        assert!(!is_valid_email("dispatch @example.com"));
        assert!(!is_valid_email("dispatch@exam ple.com"));
    }
}

#[cfg(test)]
mod phone_validation_tests {
    use super::*;

    #[test]
    fn test_valid_us_phones() {
        assert_eq!(validate_us_phone("(312) 829-4410").unwrap(), "+13128294410");
        assert_eq!(validate_us_phone("+1 206 443 7720").unwrap(), "+12064437720");
        assert_eq!(validate_us_phone("214-748-3647").unwrap(), "+12147483647");
        assert_eq!(validate_us_phone("2147483647").unwrap(), "+12147483647");
    }

    #[test]
    fn test_invalid_phones() {
        // Too short
        assert!(validate_us_phone("312829").is_err());
        assert!(validate_us_phone("").is_err());
        assert!(validate_us_phone("   ").is_err());

        // Not a NANP number
        assert!(validate_us_phone("+44 20 7946 0958").is_err());

        // Area codes never start with 0 or 1
        assert!(validate_us_phone("(123) 456-7890").is_err());

        // Not a number at all
        assert!(validate_us_phone("call me maybe").is_err());
    }
}
