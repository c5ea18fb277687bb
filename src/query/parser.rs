//! Field-filter tokenizer shared by the mail and event query parsers
//!. Splits a query string into `key:value` tokens and a
//! free-text remainder, honoring quoted values that contain spaces.

/// Splits `input` into whitespace-separated tokens, treating the
/// contents of a double-quoted span as one token even if it contains
/// spaces.
pub(crate) fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// A single `key:value` filter token, or `None` when the token carries
/// no recognized (or any) prefix and belongs in free text.
pub(crate) struct FilterToken {
    pub key: String,
    pub value: String,
}

/// Splits one token into `(key, value)` if it looks like `key:value`.
/// Values wrapped in double quotes have the quotes stripped.
pub(crate) fn split_filter(token: &str) -> Option<FilterToken> {
    let idx = token.find(':')?;
    let key = token[..idx].to_lowercase();
    let raw_value = &token[idx + 1..];
    if raw_value.is_empty() {
        return None;
    }
    let value = strip_quotes(raw_value).to_string();
    Some(FilterToken { key, value })
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Parses a `YYYY-MM-DD` date (local midnight) into seconds-since-epoch
/// UTC. This core treats the local timezone as UTC for date-only filters
/// absent a supplied timezone, matching the Identity Engine's convention
/// of never letting IANA tz strings participate in ordering.
pub(crate) fn parse_date_midnight_utc(value: &str) -> Option<i64> {
    use chrono::NaiveDate;
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_respects_quotes() {
        let tokens = tokenize(r#"from:"Alice Smith" is:unread hello"#);
        assert_eq!(tokens, vec![r#"from:"Alice Smith""#, "is:unread", "hello"]);
    }

    #[test]
    fn test_split_filter_strips_quotes() {
        let filter = split_filter(r#"from:"Alice Smith""#).unwrap();
        assert_eq!(filter.key, "from");
        assert_eq!(filter.value, "Alice Smith");
    }

    #[test]
    fn test_split_filter_none_for_plain_word() {
        assert!(split_filter("hello").is_none());
    }

    #[test]
    fn test_parse_date_midnight_utc() {
        let ts = parse_date_midnight_utc("2026-02-03").unwrap();
        assert_eq!(ts, 1770076800);
    }
}
