//! Regex compilation for `$regex` and regex literals.

use docket_core::{Error, RegexValue, Result};
use regex::{Regex, RegexBuilder};

/// Compiles a pattern with JavaScript-style flag letters.
///
/// Only `i`, `m` and `g` are accepted; `g` has no effect on matching.
pub fn compile_regex(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            'g' => {}
            other => {
                return Err(Error::selector(format!(
                    "Only the i, m, and g regexp options are supported, got '{}'",
                    other
                )))
            }
        }
    }
    builder
        .build()
        .map_err(|e| Error::selector(format!("bad regex /{}/: {}", pattern, e)))
}

/// Compiles a regex literal value.
#[inline]
pub fn compile_regex_value(re: &RegexValue) -> Result<Regex> {
    compile_regex(&re.pattern, &re.flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let re = compile_regex("a", "i").unwrap();
        assert!(re.is_match("CAT"));

        let re = compile_regex("^b", "m").unwrap();
        assert!(re.is_match("a\nb"));

        let re = compile_regex("a", "g").unwrap();
        assert!(re.is_match("cat"));
    }

    #[test]
    fn test_unsupported_flags() {
        assert!(matches!(compile_regex("a", "x"), Err(Error::SelectorCompile { .. })));
        assert!(matches!(compile_regex("a", "s"), Err(Error::SelectorCompile { .. })));
    }

    #[test]
    fn test_bad_pattern() {
        assert!(compile_regex("(", "").is_err());
    }
}
