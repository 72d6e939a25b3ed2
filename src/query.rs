//! Query normalization and boundary parameter coercion
//!
//! Agents hand the search tool either a bare Gmail query string or a
//! structured query literal such as
//! `{"query": "from:user in:inbox", "count": 50, "full_body": True}`.
//! The literal may follow JSON conventions or Python-flavored ones
//! (single-quoted strings, capitalized booleans). Strict JSON is parsed
//! first, so the JSON convention wins whenever both would succeed; the
//! permissive form is a deprecated compatibility shim that logs a warning.

use serde_json::{Map, Value};

use crate::errors::{AppError, AppResult};

/// Query used when a structured literal omits the `query` field
pub const DEFAULT_QUERY: &str = "to:me in:Inbox";

/// Caller-supplied fallback values for the optional search parameters
#[derive(Debug, Clone, Copy)]
pub struct SearchDefaults {
    /// Emails per page
    pub count: usize,
    /// Page number (1-based)
    pub page: usize,
    /// Whether to fetch full bodies
    pub full_body: bool,
}

/// Normalized search request
///
/// Derived purely from caller input; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Gmail search query string
    pub query: String,
    /// Emails per page (≥ 1)
    pub count: usize,
    /// Page number (≥ 1)
    pub page: usize,
    /// Fetch the full plain-text body instead of the snippet
    pub full_body: bool,
}

/// Normalize a raw query argument into a [`SearchRequest`]
///
/// A trimmed input wrapped in `{`..`}` is treated as a structured query
/// literal and its `query`/`count`/`page`/`full_body` fields override the
/// caller defaults (`full_body` defaults to `false` in this branch even when
/// the caller default says otherwise, matching the historical tool contract).
/// Any other input is the query verbatim with the defaults untouched.
///
/// # Errors
///
/// - `MalformedQuery` when a structured literal parses under neither
///   convention (no silent fallback to a literal search).
/// - `InvalidParameter` when a field is present but cannot be coerced to its
///   expected type.
pub fn normalize(raw: &str, defaults: SearchDefaults) -> AppResult<SearchRequest> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Ok(SearchRequest {
            query: trimmed.to_owned(),
            count: defaults.count,
            page: defaults.page,
            full_body: defaults.full_body,
        });
    }

    let params = parse_structured_literal(trimmed)?;

    let query = match params.get("query") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(AppError::invalid_parameter("query", "must be a string"));
        }
        None => DEFAULT_QUERY.to_owned(),
    };
    let count = match params.get("count") {
        Some(v) => coerce_positive(v, "count")?,
        None => defaults.count,
    };
    let page = match params.get("page") {
        Some(v) => coerce_positive(v, "page")?,
        None => defaults.page,
    };
    let full_body = match params.get("full_body") {
        Some(v) => coerce_bool(v, "full_body")?,
        None => false,
    };

    Ok(SearchRequest {
        query,
        count,
        page,
        full_body,
    })
}

/// Parse a structured query literal under both supported conventions
///
/// Strict JSON (after canonicalizing bare `True`/`False` tokens) is
/// authoritative; the permissive object-literal parser only runs when JSON
/// parsing fails.
fn parse_structured_literal(trimmed: &str) -> AppResult<Map<String, Value>> {
    let canonical = canonicalize_boolean_tokens(trimmed);
    let json_err = match serde_json::from_str::<Value>(&canonical) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected an object, got {other}"),
        Err(e) => e.to_string(),
    };

    tracing::debug!(error = %json_err, "strict JSON parse of query literal failed");
    match LiteralParser::parse(trimmed) {
        Ok(map) => {
            tracing::warn!(
                "query literal accepted by the deprecated permissive parser; \
                 send strict JSON instead"
            );
            Ok(map)
        }
        Err(literal_err) => Err(AppError::MalformedQuery(format!(
            "not valid JSON ({json_err}) and not a simple object literal ({literal_err})"
        ))),
    }
}

/// Rewrite bare `True`/`False` tokens to JSON booleans
///
/// Only tokens outside string literals are touched; a query such as
/// `"subject:True story"` passes through unchanged. Both `"` and `'` open a
/// string, with backslash escapes honored.
fn canonicalize_boolean_tokens(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if let Some(quote) = in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }
        if ch == '"' || ch == '\'' {
            in_string = Some(ch);
            out.push(ch);
            continue;
        }
        if ch.is_ascii_alphabetic() {
            let mut word = String::new();
            word.push(ch);
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    word.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            match word.as_str() {
                "True" => out.push_str("true"),
                "False" => out.push_str("false"),
                _ => out.push_str(&word),
            }
            continue;
        }
        out.push(ch);
    }
    out
}

/// Coerce a loose JSON value into a positive integer
///
/// Accepts positive integers and strings holding one.
///
/// # Errors
///
/// Returns `InvalidParameter` naming `field` on any other shape.
pub fn coerce_positive(value: &Value, field: &str) -> AppResult<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(AppError::invalid_parameter(
            field,
            format!("must be a positive integer, got {value}"),
        )),
    }
}

/// Coerce a loose JSON value into a boolean
///
/// Accepts booleans, `"true"`/`"false"` strings in any capitalization, and
/// the integers 0/1.
///
/// # Errors
///
/// Returns `InvalidParameter` naming `field` on any other shape.
pub fn coerce_bool(value: &Value, field: &str) -> AppResult<bool> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| {
        AppError::invalid_parameter(field, format!("must be a boolean, got {value}"))
    })
}

/// Permissive object-literal parser
///
/// Accepts the Python-flavored form the legacy tooling emitted: single- or
/// double-quoted strings, integer values, and booleans spelled `true`/`True`
/// or `false`/`False`. `None`/`null` map to JSON null. No nesting; the tool
/// contract is a flat field map.
struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn parse(input: &str) -> Result<Map<String, Value>, String> {
        let mut parser = Self {
            chars: input.chars().collect(),
            pos: 0,
        };
        let map = parser.parse_object()?;
        parser.skip_ws();
        if parser.pos != parser.chars.len() {
            return Err(format!("trailing characters at position {}", parser.pos));
        }
        Ok(map)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(format!(
                "expected '{expected}' at position {}, found '{ch}'",
                self.pos - 1
            )),
            None => Err(format!("expected '{expected}', found end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Map<String, Value>, String> {
        self.skip_ws();
        self.expect('{')?;
        let mut map = Map::new();

        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(map);
        }

        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_ws();
            match self.bump() {
                Some(',') => {
                    // tolerate a trailing comma before the closing brace
                    self.skip_ws();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                        return Ok(map);
                    }
                }
                Some('}') => return Ok(map),
                Some(ch) => {
                    return Err(format!(
                        "expected ',' or '}}' at position {}, found '{ch}'",
                        self.pos - 1
                    ));
                }
                None => return Err("unterminated object literal".to_owned()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, String> {
        match self.peek() {
            Some('"') | Some('\'') => self.parse_string().map(Value::String),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.parse_number(),
            Some(ch) if ch.is_ascii_alphabetic() => self.parse_keyword(),
            Some(ch) => Err(format!(
                "unexpected '{ch}' at position {} (nested values are not supported)",
                self.pos
            )),
            None => Err("expected a value, found end of input".to_owned()),
        }
    }

    fn parse_string(&mut self) -> Result<String, String> {
        let quote = match self.bump() {
            Some(ch @ ('"' | '\'')) => ch,
            Some(ch) => {
                return Err(format!(
                    "expected a quoted string at position {}, found '{ch}'",
                    self.pos - 1
                ));
            }
            None => return Err("expected a quoted string, found end of input".to_owned()),
        };

        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(escaped) => out.push(escaped),
                    None => return Err("unterminated string escape".to_owned()),
                },
                Some(ch) if ch == quote => return Ok(out),
                Some(ch) => out.push(ch),
                None => return Err("unterminated string literal".to_owned()),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid integer '{text}' at position {start}"))
    }

    fn parse_keyword(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "None" => Ok(Value::Null),
            _ => Err(format!("unknown keyword '{word}' at position {start}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        DEFAULT_QUERY, SearchDefaults, canonicalize_boolean_tokens, coerce_bool, coerce_positive,
        normalize,
    };
    use crate::errors::AppError;

    const DEFAULTS: SearchDefaults = SearchDefaults {
        count: 50,
        page: 1,
        full_body: false,
    };

    #[test]
    fn plain_string_is_the_query_verbatim() {
        let request = normalize("  in:inbox is:unread ", DEFAULTS).expect("must normalize");
        assert_eq!(request.query, "in:inbox is:unread");
        assert_eq!(request.count, 50);
        assert_eq!(request.page, 1);
        assert!(!request.full_body);
    }

    #[test]
    fn json_and_python_conventions_yield_identical_fields() {
        let json_form = normalize(
            r#"{"query": "to:me", "count": 10, "page": 2, "full_body": true}"#,
            DEFAULTS,
        )
        .expect("json form must normalize");
        let python_form = normalize(
            r#"{'query': 'to:me', 'count': 10, 'page': 2, 'full_body': True}"#,
            DEFAULTS,
        )
        .expect("python form must normalize");
        assert_eq!(json_form, python_form);
        assert_eq!(json_form.query, "to:me");
        assert_eq!(json_form.count, 10);
        assert_eq!(json_form.page, 2);
        assert!(json_form.full_body);
    }

    #[test]
    fn capitalized_booleans_in_double_quoted_literal_take_the_strict_path() {
        // `True` outside strings canonicalizes to JSON, so the strict parser
        // accepts this form and the permissive shim never runs.
        let request =
            normalize(r#"{"query": "to:me", "full_body": True}"#, DEFAULTS).expect("must parse");
        assert!(request.full_body);
    }

    #[test]
    fn boolean_tokens_inside_strings_are_left_alone() {
        assert_eq!(
            canonicalize_boolean_tokens(r#"{"query": "subject:True story", "full_body": True}"#),
            r#"{"query": "subject:True story", "full_body": true}"#
        );
        let request = normalize(
            r#"{"query": "subject:True story", "full_body": True}"#,
            DEFAULTS,
        )
        .expect("must parse");
        assert_eq!(request.query, "subject:True story");
        assert!(request.full_body);
    }

    #[test]
    fn missing_query_field_falls_back_to_default_query() {
        let request = normalize(r#"{"count": 5}"#, DEFAULTS).expect("must parse");
        assert_eq!(request.query, DEFAULT_QUERY);
        assert_eq!(request.count, 5);
    }

    #[test]
    fn structured_literal_resets_full_body_even_when_caller_default_is_true() {
        let defaults = SearchDefaults {
            count: 50,
            page: 1,
            full_body: true,
        };
        let request = normalize(r#"{"query": "to:me"}"#, defaults).expect("must parse");
        assert!(!request.full_body, "structured form defaults full_body off");

        let passthrough = normalize("to:me", defaults).expect("must normalize");
        assert!(passthrough.full_body, "plain form keeps the caller default");
    }

    #[test]
    fn unparseable_literal_is_a_malformed_query_error() {
        let err = normalize(r#"{"query": to:me}"#, DEFAULTS).expect_err("must fail");
        assert!(matches!(err, AppError::MalformedQuery(_)));
    }

    #[test]
    fn string_count_is_coerced_and_garbage_count_names_the_field() {
        let request = normalize(r#"{"query": "a", "count": "25"}"#, DEFAULTS).expect("must parse");
        assert_eq!(request.count, 25);

        let err = normalize(r#"{"query": "a", "count": "lots"}"#, DEFAULTS).expect_err("must fail");
        match err {
            AppError::InvalidParameter { field, .. } => assert_eq!(field, "count"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn zero_and_negative_page_values_are_rejected() {
        for raw in [r#"{"page": 0}"#, r#"{"page": -1}"#] {
            let err = normalize(raw, DEFAULTS).expect_err("must fail");
            assert!(matches!(err, AppError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn empty_literal_uses_every_default() {
        let request = normalize("{}", DEFAULTS).expect("must parse");
        assert_eq!(request.query, DEFAULT_QUERY);
        assert_eq!(request.count, 50);
        assert_eq!(request.page, 1);
        assert!(!request.full_body);
    }

    #[test]
    fn coerce_positive_handles_numbers_and_strings() {
        assert_eq!(coerce_positive(&json!(10), "count").expect("ok"), 10);
        assert_eq!(coerce_positive(&json!(" 7 "), "count").expect("ok"), 7);
        assert!(coerce_positive(&json!(0), "count").is_err());
        assert!(coerce_positive(&json!(1.5), "count").is_err());
        assert!(coerce_positive(&json!(true), "count").is_err());
    }

    #[test]
    fn coerce_bool_handles_common_spellings() {
        assert!(coerce_bool(&json!(true), "full_body").expect("ok"));
        assert!(coerce_bool(&json!("True"), "full_body").expect("ok"));
        assert!(!coerce_bool(&json!("false"), "full_body").expect("ok"));
        assert!(coerce_bool(&json!(1), "full_body").expect("ok"));
        assert!(!coerce_bool(&json!(0), "full_body").expect("ok"));
        assert!(coerce_bool(&json!("yes"), "full_body").is_err());
        assert!(coerce_bool(&json!(2), "full_body").is_err());
    }
}
