//! Pattern utilities for index columns.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static COMPLETION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.+?)\]\]").expect("static completion pattern"));

/// Expand the `[[...]]` completion shorthand used in command columns.
///
/// `sh[[ow]]` becomes `sh(o(w)?)?`, so any prefix of the bracketed word
/// matches. Completion cannot be combined with regex syntax inside the
/// brackets.
pub fn expand_completion(pattern: &str) -> String {
    COMPLETION
        .replace_all(pattern, |caps: &Captures<'_>| {
            let word: Vec<String> = caps[1].chars().map(String::from).collect();
            format!("({}{}", word.join("("), ")?".repeat(word.len()))
        })
        .into_owned()
}

/// Compile an index column anchored at the start of the attribute.
///
/// The match only needs to start at the beginning; trailing text is
/// allowed unless the pattern ends in `$`.
pub fn compile_column_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_completion() {
        assert_eq!(expand_completion("sh[[ow]]"), "sh(o(w)?)?");
        assert_eq!(
            expand_completion("sh[[ow]] ver[[sion]]"),
            "sh(o(w)?)? ver(s(i(o(n)?)?)?)?"
        );
        assert_eq!(expand_completion("show vlan"), "show vlan");
    }

    #[test]
    fn test_completion_accepts_prefixes() {
        let re = compile_column_pattern(&expand_completion("sh[[ow]] vl[[an]]")).unwrap();
        assert!(re.is_match("show vlan"));
        assert!(re.is_match("sh vl"));
        assert!(re.is_match("sho vla"));
        assert!(!re.is_match("s vlan"));
    }

    #[test]
    fn test_anchored_at_start() {
        let re = compile_column_pattern("cisco_ios").unwrap();
        assert!(re.is_match("cisco_ios"));
        assert!(!re.is_match("my_cisco_ios"));

        let re = compile_column_pattern("show vlan$").unwrap();
        assert!(re.is_match("show vlan"));
        assert!(!re.is_match("show vlan brief"));
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let re = compile_column_pattern("cisco_ios|cisco_xe").unwrap();
        assert!(re.is_match("cisco_xe"));
        assert!(!re.is_match("not_cisco_xe"));
    }
}
