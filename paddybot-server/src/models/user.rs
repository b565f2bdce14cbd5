//! User field validation
//!
//! Limits mirror the column widths in `migrations/`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

const MAX_USERNAME_LEN: usize = 50;
const MIN_USERNAME_LEN: usize = 3;
const MAX_EMAIL_LEN: usize = 100;
const MAX_FULL_NAME_LEN: usize = 100;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("invalid username regex"));

// One @, no whitespace, a dot in the domain
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex"));

/// Validated username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// # Example
    /// ```
    /// use paddybot_server::models::Username;
    ///
    /// assert!(Username::new("paddy_01").is_ok());
    /// assert!(Username::new("ab").is_err());        // too short
    /// assert!(Username::new("-paddy").is_err());    // starts with dash
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required { field: "username" });
        }
        let len = s.chars().count();
        if len < MIN_USERNAME_LEN {
            return Err(ValidationError::TooShort {
                field: "username",
                min: MIN_USERNAME_LEN,
            });
        }
        if len > MAX_USERNAME_LEN {
            return Err(ValidationError::TooLong {
                field: "username",
                max: MAX_USERNAME_LEN,
            });
        }
        if !USERNAME_RE.is_match(s) {
            return Err(ValidationError::Malformed {
                field: "username",
                expected: "letters, digits, '.', '_' or '-', starting with a letter or digit",
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated email address, stored lowercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required { field: "email" });
        }
        if s.chars().count() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }
        if !EMAIL_RE.is_match(s) {
            return Err(ValidationError::Malformed {
                field: "email",
                expected: "an address like name@example.com",
            });
        }
        Ok(Self(s.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Plaintext password that passed length checks. Hash it before storing.
pub struct Password(String);

impl Password {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Required { field: "password" });
        }
        let len = s.chars().count();
        if len < MIN_PASSWORD_LEN {
            return Err(ValidationError::TooShort {
                field: "password",
                min: MIN_PASSWORD_LEN,
            });
        }
        if len > MAX_PASSWORD_LEN {
            return Err(ValidationError::TooLong {
                field: "password",
                max: MAX_PASSWORD_LEN,
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(********)")
    }
}

/// Optional display name; blank input becomes `None`.
pub fn full_name(s: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(s) = s.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if s.chars().count() > MAX_FULL_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "full_name",
            max: MAX_FULL_NAME_LEN,
        });
    }
    Ok(Some(s.to_owned()))
}

/// Row to insert. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub hashed_password: String,
    pub full_name: Option<String>,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<Email>,
    pub full_name: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.hashed_password.is_none()
            && self.is_active.is_none()
            && self.is_superuser.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_usernames() {
        assert!(Username::new("paddy").is_ok());
        assert!(Username::new("paddy.bot").is_ok());
        assert!(Username::new("paddy_bot-2").is_ok());
        assert_eq!(Username::new("  paddy ").unwrap().as_str(), "paddy");
    }

    #[test]
    fn username_bounds() {
        assert!(matches!(
            Username::new("").unwrap_err(),
            ValidationError::Required { .. }
        ));
        assert!(matches!(
            Username::new("ab").unwrap_err(),
            ValidationError::TooShort { min: 3, .. }
        ));
        assert!(Username::new(&"a".repeat(50)).is_ok());
        assert!(matches!(
            Username::new(&"a".repeat(51)).unwrap_err(),
            ValidationError::TooLong { max: 50, .. }
        ));
    }

    #[test]
    fn username_rejects_spaces_and_symbols() {
        for bad in ["has space", "-dash", "semi;colon", "at@sign"] {
            assert!(
                matches!(Username::new(bad), Err(ValidationError::Malformed { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::new(" Paddy@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "paddy@example.com");
    }

    #[test]
    fn email_rejects_malformed() {
        for bad in ["plain", "two@@example.com", "no@tld", "sp ace@example.com"] {
            assert!(Email::new(bad).is_err(), "{bad}");
        }
        let long = format!("{}@example.com", "a".repeat(100));
        assert!(matches!(
            Email::new(&long).unwrap_err(),
            ValidationError::TooLong { max: 100, .. }
        ));
    }

    #[test]
    fn password_length() {
        assert!(Password::new("12345678").is_ok());
        assert!(matches!(
            Password::new("short").unwrap_err(),
            ValidationError::TooShort { min: 8, .. }
        ));
        assert!(matches!(
            Password::new("").unwrap_err(),
            ValidationError::Required { .. }
        ));
    }

    #[test]
    fn password_debug_hides_plaintext() {
        let password = Password::new("hunter2hunter2").unwrap();
        let debug = format!("{:?}", password);
        assert_eq!(debug, "Password(********)");
        assert!(!format!("{:?}", Ok::<_, ()>(password)).contains("hunter2"));
    }

    #[test]
    fn full_name_blank_is_none() {
        assert_eq!(full_name(None).unwrap(), None);
        assert_eq!(full_name(Some("   ")).unwrap(), None);
        assert_eq!(
            full_name(Some(" Paddy Bot ")).unwrap().as_deref(),
            Some("Paddy Bot")
        );
        assert!(full_name(Some(&"x".repeat(101))).is_err());
    }

    #[test]
    fn empty_changes() {
        assert!(UserChanges::default().is_empty());
        let changes = UserChanges {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
