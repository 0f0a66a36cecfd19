//! Redaction wrapper for store credentials
//!
//! Connection passwords travel through configuration files, handle
//! construction and log records. `Sensitive<T>` keeps the raw value out of
//! every `Debug` and `Display` rendering so that a logged `StoreConfig`
//! never leaks it.

use serde::{Deserialize, Deserializer};
use std::fmt;

const REDACTED: &str = "***REDACTED***";

/// Wrapper for a credential that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use vcsmine_core_types::Sensitive;
///
/// let password = Sensitive::new("s3cret");
/// assert_eq!(format!("{:?}", password), "***REDACTED***");
/// assert_eq!(password.expose(), &"s3cret");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a credential
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying value
    ///
    /// Only a driver handing the credential to its backend should call this.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: PartialEq> PartialEq for Sensitive<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sensitive<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let secret = Sensitive::new("hunter2");
        assert_eq!(format!("{:?}", secret), REDACTED);
        assert_eq!(format!("{}", secret), REDACTED);
    }

    #[test]
    fn test_expose_and_into_inner() {
        let secret = Sensitive::new(String::from("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
        assert_eq!(secret.into_inner(), "hunter2");
    }

    #[test]
    fn test_deserialize_is_transparent() {
        let secret: Sensitive<String> = serde_json::from_str("\"hunter2\"").unwrap();
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_redacted_inside_struct() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Credentials {
            user: String,
            password: Sensitive<String>,
        }

        let creds: Credentials =
            serde_json::from_str(r#"{"user":"miner","password":"hunter2"}"#).unwrap();
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("miner"));
        assert!(rendered.contains(REDACTED));
        assert!(!rendered.contains("hunter2"));
    }
}
