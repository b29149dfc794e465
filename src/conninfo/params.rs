use std::fmt;

use super::ConnInfoError;
use super::scanner::{needs_quoting, push_quoted, tokenize};

/// Placeholder rendered instead of a password in logging output.
pub const PASSWORD_PLACEHOLDER: &str = "*****";

/// Ordered key/value pairs of a connection string.
///
/// Keys keep the position of their first occurrence; a repeated key
/// overwrites the earlier value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnParams {
    pairs: Vec<(String, String)>,
}

impl ConnParams {
    /// Parse `text` and validate the well-known keys.
    ///
    /// # Errors
    /// Returns [`ConnInfoError`] for malformed syntax or an invalid `port`.
    pub fn parse(text: &str) -> Result<Self, ConnInfoError> {
        let mut params = Self::default();
        for (key, value) in tokenize(text)? {
            params.set(&key, value);
        }
        if let Some(port) = params.port() {
            validate_port(port)?;
        }
        Ok(params)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get("host").or_else(|| self.get("hostaddr"))
    }

    #[must_use]
    pub fn port(&self) -> Option<&str> {
        self.get("port")
    }

    #[must_use]
    pub fn dbname(&self) -> Option<&str> {
        self.get("dbname")
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.get("user")
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.get("password")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render the canonical form. With `for_logging` the password is replaced
    /// by [`PASSWORD_PLACEHOLDER`].
    #[must_use]
    pub fn render(&self, for_logging: bool) -> String {
        let mut out = String::new();
        for (key, value) in &self.pairs {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(key);
            out.push('=');
            if for_logging && key == "password" {
                out.push_str(PASSWORD_PLACEHOLDER);
            } else if needs_quoting(value) {
                push_quoted(&mut out, value);
            } else {
                out.push_str(value);
            }
        }
        out
    }
}

// Debug output ends up in logs, so it never shows the password.
impl fmt::Debug for ConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnParams").field(&self.render(true)).finish()
    }
}

fn validate_port(port: &str) -> Result<(), ConnInfoError> {
    // Multi-host strings carry one port per host.
    for part in port.split(',') {
        if !part.is_empty() && part.parse::<u16>().is_err() {
            return Err(ConnInfoError::InvalidPort {
                value: port.to_string(),
            });
        }
    }
    Ok(())
}
