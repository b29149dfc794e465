use super::ConnInfoError;

#[derive(Clone, Copy)]
pub(super) enum State {
    BetweenPairs,
    Key,
    AfterKey,
    BeforeValue,
    Unquoted,
    Quoted,
}

/// Split a libpq-style `key=value` string into pairs in source order.
///
/// Whitespace may surround `=`. A value is either a bare word or wrapped in
/// single quotes; in both forms a backslash takes the next character
/// literally.
pub(super) fn tokenize(text: &str) -> Result<Vec<(String, String)>, ConnInfoError> {
    let mut pairs = Vec::new();
    let mut state = State::BetweenPairs;
    let mut key = String::new();
    let mut value = String::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match state {
            State::BetweenPairs => {
                if c.is_whitespace() {
                    continue;
                }
                if c == '=' {
                    return Err(ConnInfoError::MissingKey);
                }
                key.push(c);
                state = State::Key;
            }
            State::Key => {
                if c == '=' {
                    state = State::BeforeValue;
                } else if c.is_whitespace() {
                    state = State::AfterKey;
                } else {
                    key.push(c);
                }
            }
            State::AfterKey => {
                if c == '=' {
                    state = State::BeforeValue;
                } else if !c.is_whitespace() {
                    return Err(ConnInfoError::MissingEquals { key });
                }
            }
            State::BeforeValue => {
                if c.is_whitespace() {
                    continue;
                }
                match c {
                    '\'' => state = State::Quoted,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                        state = State::Unquoted;
                    }
                    _ => {
                        value.push(c);
                        state = State::Unquoted;
                    }
                }
            }
            State::Unquoted => {
                if c.is_whitespace() {
                    pairs.push((std::mem::take(&mut key), std::mem::take(&mut value)));
                    state = State::BetweenPairs;
                } else if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                } else {
                    value.push(c);
                }
            }
            State::Quoted => match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                '\'' => {
                    pairs.push((std::mem::take(&mut key), std::mem::take(&mut value)));
                    state = State::BetweenPairs;
                }
                _ => value.push(c),
            },
        }
    }

    match state {
        State::BetweenPairs => {}
        State::Key | State::AfterKey => return Err(ConnInfoError::MissingEquals { key }),
        State::BeforeValue | State::Unquoted => pairs.push((key, value)),
        State::Quoted => return Err(ConnInfoError::UnterminatedQuote { key }),
    }

    Ok(pairs)
}

/// Whether a value must be quoted to survive another pass through [`tokenize`].
pub(super) fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\')
}

pub(super) fn push_quoted(out: &mut String, value: &str) {
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}
