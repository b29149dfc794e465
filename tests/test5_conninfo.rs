use jobagent_db::conninfo::{ConnInfo, ConnInfoError, PASSWORD_PLACEHOLDER};
use jobagent_db::quote_literal;

#[test]
fn test5_logging_form_never_contains_secret() {
    let inputs = [
        "host=localhost user=agent password=secret123 dbname=postgres",
        "password='secret123' host=localhost",
        "host = localhost password = secret123",
        "password=secret123",
    ];
    for text in inputs {
        let parsed = ConnInfo::parse(text, true).unwrap();
        assert!(!parsed.conn_str.contains("secret123"), "{text}");
        assert!(parsed.conn_str.contains(PASSWORD_PLACEHOLDER));
        assert!(!ConnInfo::redact(text).contains("secret123"));
    }
}

#[test]
fn test5_descriptor_set_get() {
    let mut info = ConnInfo::default();
    assert!(info.set("host=db1 port=5433 dbname=postgres user=agent"));
    assert_eq!(
        info.get(Some("jobsdb")),
        "host=db1 port=5433 dbname=jobsdb user=agent"
    );
    assert_eq!(info.params().port(), Some("5433"));

    assert!(!info.set("host=db1 port=fifty"));
    assert!(info.error().contains("port"));
}

#[test]
fn test5_parse_errors_are_typed() {
    assert_eq!(
        ConnInfo::parse("host=h password='x", false).unwrap_err(),
        ConnInfoError::UnterminatedQuote {
            key: "password".into()
        }
    );
    assert_eq!(
        ConnInfo::parse(" = x", false).unwrap_err(),
        ConnInfoError::MissingKey
    );
}

/// Reads a literal back the way the server's lexer does.
fn server_reads(literal: &str) -> String {
    let (escape, body) = match literal.strip_prefix('E') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let body = &body[1..body.len() - 1];
    let mut out = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                chars.next();
                out.push('\'');
            }
            '\\' if escape => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[test]
fn test5_quote_literal_round_trips() {
    let samples = [
        "",
        "plain",
        "it's",
        "''",
        r"C:\temp\jobs",
        r"\\server\share",
        "tab\there",
        r"mixed ' and \ together",
        "ünïcödé ✓",
    ];
    for value in samples {
        let quoted = quote_literal(value);
        assert_eq!(server_reads(&quoted), value, "{quoted}");
        assert_eq!(quoted.starts_with('E'), value.contains('\\'));
    }
}
