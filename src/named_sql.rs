//! Named-parameter SQL templates
//!
//! This module turns a template such as
//!
//! ```text
//! INSERT INTO FOOS (MESSAGE_ID, PAYLOAD) VALUES (:headers[id], :payload)
//! ```
//!
//! into SQLite numbered placeholders (`?1`, `?2`, ...) plus the ordered list of
//! parameter names, and binds those names against a [`ParameterSource`].
//!
//! A placeholder is `:` followed by name characters. Everything inside `[...]`
//! belongs to the name, so `:headers[business.id]` needs no quoting. Quoted
//! literals, identifiers and comments are copied verbatim, `::` casts are left
//! alone, and `\:` produces a literal colon.

use diesel::QueryResult;

use crate::{parameter_source::ParameterSource, utils::BindError, value::BindValue};

/// A parsed named-parameter statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSql {
    sql: String,
    parameter_names: Vec<String>,
    placeholder_count: usize,
}

impl ParsedSql {
    /// The statement with numbered placeholders
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Distinct parameter names, in order of first appearance
    ///
    /// The name at index `i` binds to placeholder `?{i + 1}`.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Total number of placeholders, counting repeats
    pub fn placeholder_count(&self) -> usize {
        self.placeholder_count
    }

    /// Resolve every parameter against `source`, in placeholder order
    ///
    /// Fails with [`BindError::MissingParameter`] on the first name the source
    /// cannot supply.
    pub fn bind(&self, source: &dyn ParameterSource) -> QueryResult<Vec<BindValue>> {
        self.parameter_names
            .iter()
            .map(|name| {
                source.value(name).ok_or_else(|| {
                    BindError::MissingParameter { name: name.clone() }.into()
                })
            })
            .collect()
    }
}

/// Parse a named-parameter template
pub fn parse_sql_statement(sql: &str) -> QueryResult<ParsedSql> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut parameter_names: Vec<String> = Vec::new();
    let mut placeholder_count = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                let end = skip_quoted(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '[' => {
                // Bracket-quoted identifier
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map_or(chars.len(), |p| i + p + 1);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = find_block_comment_end(&chars, i + 2);
                out.extend(&chars[i..end]);
                i = end;
            }
            '\\' if chars.get(i + 1) == Some(&':') => {
                out.push(':');
                i += 2;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' => {
                let (name, end) = read_parameter_name(&chars, i + 1)?;
                if name.is_empty() {
                    out.push(':');
                    i += 1;
                    continue;
                }
                let index = match parameter_names.iter().position(|n| *n == name) {
                    Some(idx) => idx,
                    None => {
                        parameter_names.push(name);
                        parameter_names.len() - 1
                    }
                };
                out.push('?');
                out.push_str(&(index + 1).to_string());
                placeholder_count += 1;
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(ParsedSql {
        sql: out,
        parameter_names,
        placeholder_count,
    })
}

/// Characters that end a parameter name outside brackets
fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '"' | '\'' | ':' | '&' | ',' | ';' | '(' | ')' | '|' | '=' | '+' | '-' | '*' | '%'
                | '/' | '\\' | '<' | '>' | '^' | ']'
        )
}

fn read_parameter_name(chars: &[char], start: usize) -> QueryResult<(String, usize)> {
    let mut name = String::new();
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '[' {
            let close = chars[i..]
                .iter()
                .position(|&ch| ch == ']')
                .ok_or(BindError::MalformedPlaceholder { position: start - 1 })?;
            name.extend(&chars[i..=i + close]);
            i += close + 1;
        } else if is_separator(c) {
            break;
        } else {
            name.push(c);
            i += 1;
        }
    }
    Ok((name, i))
}

/// Index just past the closing quote; doubled quotes are escapes
fn skip_quoted(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn find_block_comment_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parameter_source::MapParameterSource, utils::bind_error};

    #[test]
    fn test_insert_with_headers_and_payload() {
        let parsed = parse_sql_statement(
            "INSERT INTO FOOS (MESSAGE_ID, PAYLOAD) VALUES (:headers[id], :payload)",
        )
        .unwrap();
        assert_eq!(
            parsed.sql(),
            "INSERT INTO FOOS (MESSAGE_ID, PAYLOAD) VALUES (?1, ?2)"
        );
        assert_eq!(parsed.parameter_names(), ["headers[id]", "payload"]);
        assert_eq!(parsed.placeholder_count(), 2);
    }

    #[test]
    fn test_dotted_names_need_no_quoting() {
        let parsed =
            parse_sql_statement("UPDATE t SET a = :headers[business.id] WHERE b = :business.id")
                .unwrap();
        assert_eq!(parsed.sql(), "UPDATE t SET a = ?1 WHERE b = ?2");
        assert_eq!(parsed.parameter_names(), ["headers[business.id]", "business.id"]);
    }

    #[test]
    fn test_repeated_name_reuses_number() {
        let parsed = parse_sql_statement("SELECT :a, :b, :a").unwrap();
        assert_eq!(parsed.sql(), "SELECT ?1, ?2, ?1");
        assert_eq!(parsed.parameter_names(), ["a", "b"]);
        assert_eq!(parsed.placeholder_count(), 3);
    }

    #[test]
    fn test_literals_and_comments_are_untouched() {
        let sql = "SELECT ':not', \"col:x\" -- :comment\n FROM t /* :block */ WHERE x = :x";
        let parsed = parse_sql_statement(sql).unwrap();
        assert_eq!(
            parsed.sql(),
            "SELECT ':not', \"col:x\" -- :comment\n FROM t /* :block */ WHERE x = ?1"
        );
        assert_eq!(parsed.parameter_names(), ["x"]);
    }

    #[test]
    fn test_bracket_quoted_identifiers_are_untouched() {
        let parsed = parse_sql_statement("SELECT [a:b] FROM t WHERE c = :c").unwrap();
        assert_eq!(parsed.sql(), "SELECT [a:b] FROM t WHERE c = ?1");
        assert_eq!(parsed.parameter_names(), ["c"]);
    }

    #[test]
    fn test_doubled_quote_escape() {
        let parsed = parse_sql_statement("SELECT 'it''s :here', :after").unwrap();
        assert_eq!(parsed.sql(), "SELECT 'it''s :here', ?1");
    }

    #[test]
    fn test_casts_escapes_and_lone_colons() {
        let parsed = parse_sql_statement("SELECT a::text, '\\:x', b\\:c, : d").unwrap();
        assert_eq!(parsed.sql(), "SELECT a::text, '\\:x', b:c, : d");
        assert!(parsed.parameter_names().is_empty());
    }

    #[test]
    fn test_unclosed_bracket_is_malformed() {
        let error = parse_sql_statement("INSERT INTO t VALUES (:headers[id)").unwrap_err();
        assert_eq!(
            bind_error(&error),
            Some(&BindError::MalformedPlaceholder { position: 22 })
        );
    }

    #[test]
    fn test_bind_in_placeholder_order() {
        let parsed = parse_sql_statement("INSERT INTO t VALUES (:b, :a, :b)").unwrap();
        let source = MapParameterSource::new().add_value("a", 1).add_value("b", "x");
        let binds = parsed.bind(&source).unwrap();
        assert_eq!(binds, vec![BindValue::Text("x".into()), BindValue::Integer(1)]);
    }

    #[test]
    fn test_bind_missing_parameter() {
        let parsed = parse_sql_statement("UPDATE t SET a = :nonexistent").unwrap();
        let error = parsed.bind(&MapParameterSource::new()).unwrap_err();
        assert_eq!(
            bind_error(&error),
            Some(&BindError::MissingParameter {
                name: "nonexistent".to_string()
            })
        );
    }

    #[test]
    fn test_no_parameters_binds_nothing() {
        let parsed = parse_sql_statement("DELETE FROM t").unwrap();
        assert!(parsed.bind(&MapParameterSource::new()).unwrap().is_empty());
    }
}
