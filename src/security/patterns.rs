//! Built-in signature patterns, shared by the request inspector and the
//! response DLP interceptor.

use regex::Regex;

/// A named signature with a compiled, case-insensitive regular expression.
/// Immutable after construction.
pub struct Pattern {
    pub name: &'static str,
    pub regex: Regex,
    pub message: &'static str,
}

fn compile(name: &'static str, pattern: &str, message: &'static str) -> Pattern {
    let regex = Regex::new(pattern)
        .unwrap_or_else(|e| panic!("invalid built-in pattern '{name}': {e}"));
    Pattern { name, regex, message }
}

pub fn xss_pattern() -> Pattern {
    compile(
        "XSS Detection",
        r"(?i)<script.*?>|javascript:|onload=",
        "Malicious <script> or javascript: detected.",
    )
}

pub fn sqli_pattern() -> Pattern {
    compile(
        "SQL Injection Detection",
        r"(?i)(union.*select|insert.*into|drop.*table|truncate.*table|' or 1=1|--|#)",
        "SQL injection attempt detected.",
    )
}

/// Intentionally permissive per spec.md §9 -- this will flag many benign
/// digit sequences. That is the specified behavior, not a bug.
pub fn credit_card_pattern() -> Pattern {
    compile(
        "Credit Card Leak",
        r"\b(?:\d[ -]*?){13,16}\b",
        "Sensitive financial data detected in response.",
    )
}

pub fn ssn_pattern() -> Pattern {
    compile(
        "SSN Leak",
        r"\b\d{3}-\d{2}-\d{4}\b",
        "Personally Identifiable Information (SSN) detected in response.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xss_matches_script_tag_case_insensitively() {
        let p = xss_pattern();
        assert!(p.regex.is_match("<SCRIPT>alert(1)</script>"));
        assert!(p.regex.is_match("javascript:alert(1)"));
        assert!(!p.regex.is_match("hello world"));
    }

    #[test]
    fn sqli_matches_common_payloads() {
        let p = sqli_pattern();
        assert!(p.regex.is_match("' or 1=1 --"));
        assert!(p.regex.is_match("UNION SELECT * FROM users"));
        assert!(p.regex.is_match("DROP TABLE users"));
    }

    #[test]
    fn credit_card_matches_hyphenated_digits() {
        let p = credit_card_pattern();
        assert!(p.regex.is_match("4111-1111-1111-1111"));
    }

    #[test]
    fn ssn_matches_dashed_format() {
        let p = ssn_pattern();
        assert!(p.regex.is_match("123-45-6789"));
        assert!(!p.regex.is_match("123456789"));
    }
}
