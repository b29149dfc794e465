pub(crate) fn extract_column_names<I, T, F>(columns: I, name: F) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> &str,
{
    columns
        .into_iter()
        .map(|col| name(&col).to_string())
        .collect()
}

/// Quote `value` as a PostgreSQL string literal that can be spliced into query
/// text.
///
/// Single quotes are doubled. Backslashes are doubled too, and a literal that
/// contains one is written in escape-string form (`E'...'`) so its meaning
/// does not depend on `standard_conforming_strings`.
///
/// ```rust
/// use jobagent_db::quote_literal;
///
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// assert_eq!(quote_literal(r"C:\jobs"), r"E'C:\\jobs'");
/// ```
#[must_use]
pub fn quote_literal(value: &str) -> String {
    let has_backslash = value.contains('\\');
    let mut out = String::with_capacity(value.len() + 3);
    if has_backslash {
        out.push('E');
    }
    push_escaped(&mut out, value);
    out
}

/// Literal form for servers older than 8.1, which always treat backslash as an
/// escape and do not know the `E` prefix.
pub(crate) fn quote_literal_legacy(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    push_escaped(&mut out, value);
    out
}

fn push_escaped(out: &mut String, value: &str) {
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Read a literal back the way the server does.
    fn unquote(literal: &str) -> Option<String> {
        let (escape, body) = match literal.strip_prefix('E') {
            Some(rest) => (true, rest),
            None => (false, literal),
        };
        let body = body.strip_prefix('\'')?.strip_suffix('\'')?;
        let mut out = String::new();
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    // Inside the body a quote only appears doubled.
                    if chars.next() != Some('\'') {
                        return None;
                    }
                    out.push('\'');
                }
                '\\' if escape => out.push(chars.next()?),
                _ => out.push(c),
            }
        }
        Some(out)
    }

    #[test]
    fn plain_text_is_wrapped() {
        assert_eq!(quote_literal("daily backup"), "'daily backup'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal("'"), "''''");
    }

    #[test]
    fn backslash_uses_escape_string_form() {
        assert_eq!(quote_literal("a\\b"), "E'a\\\\b'");
        assert_eq!(quote_literal("\\'"), "E'\\\\'''");
    }

    #[test]
    fn legacy_form_has_no_prefix() {
        assert_eq!(quote_literal_legacy("a\\b'c"), "'a\\\\b''c'");
    }

    #[test]
    fn round_trips_awkward_inputs() {
        let inputs = [
            "",
            "'",
            "''",
            "\\",
            "\\'",
            "'; DROP TABLE pga_job; --",
            "tab\tnewline\nend",
            "E'not a prefix'",
            "ünïcødé 'quoted' \\path\\",
            "trailing backslash \\",
        ];
        for input in inputs {
            let quoted = quote_literal(input);
            assert_eq!(unquote(&quoted).as_deref(), Some(input), "input {input:?}");
        }
    }

    #[test]
    fn round_trips_every_ascii_pair() {
        for a in 1u8..128 {
            for b in [b'\'', b'\\', b'a', b' '] {
                let input: String = [a as char, b as char].iter().collect();
                let quoted = quote_literal(&input);
                assert_eq!(unquote(&quoted).as_deref(), Some(input.as_str()));
            }
        }
    }

    #[test]
    fn extracts_names_in_order() {
        let cols = ["jobid", "jobname"];
        let names = extract_column_names(cols.iter(), |c| **c);
        assert_eq!(names, vec!["jobid".to_string(), "jobname".to_string()]);
    }
}
