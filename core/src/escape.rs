//! Repair raw newlines inside JSON string literals.
//!
//! Request bodies pasted into workflow files often contain multi-line string
//! values that are not valid JSON. Every double-quoted span is located first
//! and only its contents are rewritten: a newline or carriage return plus
//! any whitespace that follows it becomes the two characters `\n`. Text
//! outside quoted spans is never touched. The scan is quote-pair based and
//! not JSON aware, so escaped quotes inside strings split spans.

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

static QUOTED_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*""#).unwrap());

static LINE_BREAK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\n\r]\s*").unwrap());

pub fn escape_newlines_in_strings(input: &str) -> String {
    QUOTED_SPAN
        .replace_all(input, |caps: &Captures| {
            LINE_BREAK_RUN.replace_all(&caps[0], NoExpand(r"\n")).into_owned()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_inside_string_is_escaped() {
        let input = "{\"msg\":\"line one\nline two\"}";
        assert_eq!(escape_newlines_in_strings(input), r#"{"msg":"line one\nline two"}"#);
    }

    #[test]
    fn whitespace_after_break_is_swallowed() {
        let input = "{\"msg\":\"a\r\n    b\"}";
        assert_eq!(escape_newlines_in_strings(input), r#"{"msg":"a\nb"}"#);
    }

    #[test]
    fn newlines_outside_strings_are_kept() {
        let input = "{\n  \"a\": \"x\",\n  \"b\": 1\n}";
        assert_eq!(escape_newlines_in_strings(input), input);
    }

    #[test]
    fn result_parses_as_json() {
        let input = "{\"body\":\"first\n\nsecond\"}";
        let escaped = escape_newlines_in_strings(input);
        let value: serde_json::Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(value["body"], "first\nsecond");
    }

    #[test]
    fn idempotent_without_raw_newlines() {
        let input = r#"{"a":"already\nescaped","b":[1,2]}"#;
        let once = escape_newlines_in_strings(input);
        assert_eq!(once, input);
        assert_eq!(escape_newlines_in_strings(&once), once);
    }

    #[test]
    fn unbalanced_quote_leaves_tail_untouched() {
        let input = "\"a\nb\" \"c\nd";
        assert_eq!(escape_newlines_in_strings(input), "\"a\\nb\" \"c\nd");
    }

    #[test]
    fn escaped_quote_splits_span() {
        // `"x\"` is one span; `\ny"` starts outside any span.
        let input = "\"x\\\"\ny\"";
        assert_eq!(escape_newlines_in_strings(input), input);
    }
}
