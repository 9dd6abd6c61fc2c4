//! Utilities for tokenizing DBC statements.
//!
//! These helpers support escaped quotes (`\"`) and multi-line quoted strings,
//! which are common in `CM_` comments or attribute values.

/// A lexical unit of a DBC statement.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    /// Bare word: keyword, name or number.
    Word(String),
    /// Content of a `"..."` segment, escapes resolved.
    Quoted(String),
}

impl Token {
    pub(crate) fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            Token::Quoted(_) => None,
        }
    }

    pub(crate) fn as_quoted(&self) -> Option<&str> {
        match self {
            Token::Quoted(q) => Some(q),
            Token::Word(_) => None,
        }
    }
}

/// Counts unescaped double quotes in a string.
///
/// A quote is considered escaped if immediately preceded by an **odd** number
/// of backslashes. This matches how DBC escapes quoted content.
pub(crate) fn count_unescaped_quotes(s: &str) -> usize {
    let mut count = 0usize;
    let mut backslashes = 0usize;
    for ch in s.chars() {
        if ch == '\\' {
            backslashes += 1;
            continue;
        }
        if ch == '"' && backslashes.is_multiple_of(2) {
            count += 1;
        }
        backslashes = 0;
    }
    count
}

/// Returns `true` while the statement still has an unclosed quoted segment.
pub(crate) fn has_open_quote(s: &str) -> bool {
    !count_unescaped_quotes(s).is_multiple_of(2)
}

/// Returns `true` once a `;` appears outside every quoted segment.
pub(crate) fn has_terminator(s: &str) -> bool {
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in s.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return true,
            _ => {}
        }
    }
    false
}

/// Splits a statement into tokens.
///
/// Whitespace, `:` and `,` separate words; `"` opens a quoted segment; the first
/// `;` outside quotes ends the statement.
pub(crate) fn tokenize(s: &str) -> Result<Vec<Token>, String> {
    let mut out: Vec<Token> = Vec::new();
    let mut chars = s.chars();
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut Vec<Token>| {
        if !word.is_empty() {
            out.push(Token::Word(std::mem::take(word)));
        }
    };

    while let Some(ch) = chars.next() {
        match ch {
            ';' => break,
            ':' | ',' => flush(&mut word, &mut out),
            c if c.is_whitespace() => flush(&mut word, &mut out),
            '"' => {
                flush(&mut word, &mut out);
                let mut quoted = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => quoted.push('\n'),
                            Some('r') => quoted.push('\r'),
                            Some('t') => quoted.push('\t'),
                            Some(other) => quoted.push(other),
                            None => break,
                        },
                        other => quoted.push(other),
                    }
                }
                if !closed {
                    return Err("unterminated quoted string".to_string());
                }
                out.push(Token::Quoted(quoted));
            }
            other => word.push(other),
        }
    }
    flush(&mut word, &mut out);
    Ok(out)
}

/// Escapes characters so they are safe inside DBC quoted strings.
pub(crate) fn escape_dbc_string(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Parses a numeric word, naming `what` in the error.
pub(crate) fn parse_num<T: std::str::FromStr>(token: Option<&Token>, what: &str) -> Result<T, String> {
    let word: &str = token
        .and_then(Token::as_word)
        .ok_or_else(|| format!("missing {}", what))?;
    word.parse::<T>()
        .map_err(|_| format!("invalid {} '{}'", what, word))
}
