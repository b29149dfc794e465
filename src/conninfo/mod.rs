// Connection descriptor module - parses and renders libpq-style connection strings
//
// - scanner: tokenizer state machine for `key=value` pairs
// - params: ordered key/value storage, validation and canonical rendering

mod params;
mod scanner;

use thiserror::Error;

pub use params::{ConnParams, PASSWORD_PLACEHOLDER};

/// Syntax and validation failures of a connection string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnInfoError {
    #[error("missing \"=\" after \"{key}\" in connection info string")]
    MissingEquals { key: String },

    #[error("missing keyword before \"=\" in connection info string")]
    MissingKey,

    #[error("unterminated quoted string for \"{key}\" in connection info string")]
    UnterminatedQuote { key: String },

    #[error("invalid port \"{value}\" in connection info string")]
    InvalidPort { value: String },
}

/// Output of [`ConnInfo::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConnInfo {
    /// Canonical (or redacted, for logging) connection string.
    pub conn_str: String,
    /// The `dbname` value, if the string carried one.
    pub db_name: Option<String>,
}

/// A validated connection descriptor.
///
/// `set` parses and stores a string without connecting; `get` renders the
/// canonical form, optionally aimed at another database.
///
/// ```rust
/// use jobagent_db::conninfo::ConnInfo;
///
/// let mut info = ConnInfo::default();
/// assert!(info.set("host=localhost dbname=postgres password=hunter2"));
/// assert_eq!(info.get(Some("jobs")), "host=localhost dbname=jobs password=hunter2");
/// assert!(!info.redacted().contains("hunter2"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnInfo {
    params: ConnParams,
    error: String,
}

impl ConnInfo {
    /// Parse and store `text`. Returns `false` and records the error text when
    /// the string is malformed; the previously stored parameters are cleared.
    pub fn set(&mut self, text: &str) -> bool {
        match ConnParams::parse(text) {
            Ok(params) => {
                self.params = params;
                self.error.clear();
                true
            }
            Err(err) => {
                self.params = ConnParams::default();
                self.error = err.to_string();
                false
            }
        }
    }

    /// Canonical connection string, with `dbname` replaced when an override is
    /// given.
    #[must_use]
    pub fn get(&self, db_override: Option<&str>) -> String {
        match db_override {
            Some(db) if !db.is_empty() => {
                let mut params = self.params.clone();
                params.set("dbname", db);
                params.render(false)
            }
            _ => self.params.render(false),
        }
    }

    /// Canonical string with the password masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        self.params.render(true)
    }

    /// Last parse failure, empty when the last `set` succeeded.
    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    #[must_use]
    pub fn db_name(&self) -> Option<&str> {
        self.params.dbname()
    }

    #[must_use]
    pub fn params(&self) -> &ConnParams {
        &self.params
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parse `text` into its canonical rendering and database name.
    ///
    /// # Errors
    /// Returns [`ConnInfoError`] for malformed input; no partial output is
    /// produced.
    pub fn parse(text: &str, for_logging: bool) -> Result<ParsedConnInfo, ConnInfoError> {
        let params = ConnParams::parse(text)?;
        Ok(ParsedConnInfo {
            conn_str: params.render(for_logging),
            db_name: params.dbname().map(str::to_string),
        })
    }

    /// Canonicalize `text` and aim it at `database` when one is given.
    ///
    /// # Errors
    /// Returns [`ConnInfoError`] for malformed input.
    pub fn canonical_for(text: &str, database: Option<&str>) -> Result<String, ConnInfoError> {
        let mut info: ConnInfo = text.parse()?;
        if let Some(db) = database.filter(|db| !db.is_empty()) {
            info.params.set("dbname", db);
        }
        Ok(info.get(None))
    }

    /// Best-effort redaction for arbitrary text: malformed strings are not
    /// echoed back at all.
    #[must_use]
    pub fn redact(text: &str) -> String {
        Self::parse(text, true)
            .map(|parsed| parsed.conn_str)
            .unwrap_or_else(|_| "<invalid connection string>".to_string())
    }
}

impl std::str::FromStr for ConnInfo {
    type Err = ConnInfoError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(ConnInfo {
            params: ConnParams::parse(text)?,
            error: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_pairs() {
        let parsed = ConnInfo::parse("host=localhost port=5432 dbname=postgres user=agent", false)
            .unwrap();
        assert_eq!(
            parsed.conn_str,
            "host=localhost port=5432 dbname=postgres user=agent"
        );
        assert_eq!(parsed.db_name.as_deref(), Some("postgres"));
    }

    #[test]
    fn normalizes_whitespace_around_equals() {
        let parsed = ConnInfo::parse("  host = db1   user =agent  ", false).unwrap();
        assert_eq!(parsed.conn_str, "host=db1 user=agent");
        assert_eq!(parsed.db_name, None);
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let params = ConnParams::parse("application_name='job agent' password='it\\'s'").unwrap();
        assert_eq!(params.get("application_name"), Some("job agent"));
        assert_eq!(params.password(), Some("it's"));
        assert_eq!(
            params.render(false),
            "application_name='job agent' password='it\\'s'"
        );
    }

    #[test]
    fn canonical_output_reparses_to_same_params() {
        let original = ConnParams::parse("host=h password='a b\\\\c' options='-c x=1'").unwrap();
        let reparsed = ConnParams::parse(&original.render(false)).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn last_duplicate_wins() {
        let parsed = ConnInfo::parse("dbname=a host=h dbname=b", false).unwrap();
        assert_eq!(parsed.conn_str, "dbname=b host=h");
        assert_eq!(parsed.db_name.as_deref(), Some("b"));
    }

    #[test]
    fn unterminated_quote_fails() {
        let err = ConnInfo::parse("host=h password='oops", false).unwrap_err();
        assert_eq!(
            err,
            ConnInfoError::UnterminatedQuote {
                key: "password".to_string()
            }
        );
    }

    #[test]
    fn missing_equals_fails() {
        assert!(matches!(
            ConnInfo::parse("host localhost", false),
            Err(ConnInfoError::MissingEquals { .. })
        ));
        assert!(matches!(
            ConnInfo::parse("host=h dbname", false),
            Err(ConnInfoError::MissingEquals { .. })
        ));
        assert_eq!(
            ConnInfo::parse("=value", false),
            Err(ConnInfoError::MissingKey)
        );
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(matches!(
            ConnInfo::parse("host=h port=abc", false),
            Err(ConnInfoError::InvalidPort { .. })
        ));
        assert!(ConnInfo::parse("host=a,b port=5432,5433", false).is_ok());
    }

    #[test]
    fn logging_form_masks_password() {
        let text = "host=localhost user=agent password=secret123 dbname=postgres";
        let parsed = ConnInfo::parse(text, true).unwrap();
        assert!(!parsed.conn_str.contains("secret123"));
        assert!(parsed.conn_str.contains(PASSWORD_PLACEHOLDER));
    }

    #[test]
    fn logging_form_masks_quoted_and_repeated_passwords() {
        let text = "password=secret123 host=h password='secret123 with space'";
        let parsed = ConnInfo::parse(text, true).unwrap();
        assert!(!parsed.conn_str.contains("secret123"));
        assert_eq!(parsed.conn_str, "password=***** host=h");
    }

    #[test]
    fn debug_output_is_redacted() {
        let params = ConnParams::parse("user=a password=secret123").unwrap();
        assert!(!format!("{params:?}").contains("secret123"));
    }

    #[test]
    fn set_and_get_with_override() {
        let mut info = ConnInfo::default();
        assert!(info.set("host=localhost dbname=postgres"));
        assert_eq!(info.error(), "");
        assert_eq!(info.get(None), "host=localhost dbname=postgres");
        assert_eq!(info.get(Some("jobsdb")), "host=localhost dbname=jobsdb");
        assert_eq!(info.get(Some("")), "host=localhost dbname=postgres");
        assert_eq!(info.db_name(), Some("postgres"));
    }

    #[test]
    fn override_appends_missing_dbname() {
        let mut info = ConnInfo::default();
        assert!(info.set("host=localhost"));
        assert_eq!(info.get(Some("jobsdb")), "host=localhost dbname=jobsdb");
    }

    #[test]
    fn failed_set_records_error() {
        let mut info = ConnInfo::default();
        assert!(info.set("host=h"));
        assert!(!info.set("host='h"));
        assert!(!info.error().is_empty());
        assert!(info.is_empty());
        assert!(info.set("host=h"));
        assert!(info.error().is_empty());
    }

    #[test]
    fn canonical_for_substitutes_database() {
        let canonical =
            ConnInfo::canonical_for("host=localhost   dbname=postgres", Some("jobsdb")).unwrap();
        assert_eq!(canonical, "host=localhost dbname=jobsdb");
        let unchanged = ConnInfo::canonical_for("host=localhost dbname=postgres", None).unwrap();
        assert_eq!(unchanged, "host=localhost dbname=postgres");
    }

    #[test]
    fn redact_hides_malformed_input() {
        assert_eq!(
            ConnInfo::redact("password='secret123"),
            "<invalid connection string>"
        );
    }

    #[test]
    fn empty_value_is_quoted() {
        let params = ConnParams::parse("host=h password=").unwrap();
        assert_eq!(params.password(), Some(""));
        assert_eq!(params.render(false), "host=h password=''");
    }
}
