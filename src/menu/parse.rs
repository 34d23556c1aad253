//! Parsers for free-text menus

use serde_json::{Number, Value};
use thiserror::Error;

/// What a text menu expects the user to type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextKind {
    Str,
    Int,
    Float,
    /// Stored like `Str`, shown masked
    Password,
    Email,
    Tel,
    Url { allowed_protocols: Vec<String> },
}

impl TextKind {
    /// URL input accepting `http` and `https`
    pub fn url() -> Self {
        TextKind::Url {
            allowed_protocols: vec!["http".to_string(), "https".to_string()],
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Not a whole number: {0:?}")]
    Int(String),
    #[error("Not a number: {0:?}")]
    Float(String),
    #[error("Not an email address: {0:?}")]
    Email(String),
    #[error("Protocol not allowed: {0:?}")]
    Protocol(String),
}

/// Turn user input into the value stored as the menu's tmp data
pub fn parse_text(kind: &TextKind, text: &str) -> Result<Value, ParseError> {
    let text = text.trim();
    match kind {
        TextKind::Str | TextKind::Password | TextKind::Tel => Ok(Value::from(text)),
        TextKind::Int => text
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| ParseError::Int(text.to_string())),
        TextKind::Float => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| ParseError::Float(text.to_string())),
        TextKind::Email => {
            if text.contains('@') && text.contains('.') {
                Ok(Value::from(text))
            } else {
                Err(ParseError::Email(text.to_string()))
            }
        }
        TextKind::Url { allowed_protocols } => {
            let allowed = allowed_protocols.iter().any(|protocol| {
                text.strip_prefix(protocol.as_str())
                    .is_some_and(|rest| rest.starts_with(':'))
            });
            if allowed {
                Ok(Value::from(text))
            } else {
                Err(ParseError::Protocol(text.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int() {
        assert_eq!(parse_text(&TextKind::Int, " 42 "), Ok(json!(42)));
        assert_eq!(parse_text(&TextKind::Int, "-7"), Ok(json!(-7)));
        assert_eq!(parse_text(&TextKind::Int, "abc"), Err(ParseError::Int("abc".to_string())));
        assert!(parse_text(&TextKind::Int, "4.2").is_err());
    }

    #[test]
    fn test_float() {
        assert_eq!(parse_text(&TextKind::Float, "2.5"), Ok(json!(2.5)));
        assert_eq!(parse_text(&TextKind::Float, "3"), Ok(json!(3.0)));
        assert!(parse_text(&TextKind::Float, "NaN").is_err());
        assert!(parse_text(&TextKind::Float, "inf").is_err());
        assert!(parse_text(&TextKind::Float, "x").is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(parse_text(&TextKind::Email, "a@b.de"), Ok(json!("a@b.de")));
        assert!(parse_text(&TextKind::Email, "a@b").is_err());
        assert!(parse_text(&TextKind::Email, "a.b").is_err());
    }

    #[test]
    fn test_url() {
        let url = TextKind::url();
        assert_eq!(parse_text(&url, "https://example.org"), Ok(json!("https://example.org")));
        assert!(parse_text(&url, "ftp://example.org").is_err());
        assert!(parse_text(&url, "httpx://example.org").is_err());

        let ftp = TextKind::Url {
            allowed_protocols: vec!["ftp".to_string()],
        };
        assert!(parse_text(&ftp, "ftp://example.org").is_ok());
    }

    #[test]
    fn test_passthrough() {
        for kind in [TextKind::Str, TextKind::Password, TextKind::Tel] {
            assert_eq!(parse_text(&kind, " hello "), Ok(json!("hello")));
        }
    }
}
