//! Identifier-to-parameter-name derivation.
//!
//! Field identifiers are written in Rust `CamelCase`/`snake_case` style;
//! parameters need `kebab-case` names and environment variables need
//! `SCREAMING_SNAKE_CASE` names. The conversion is a small state machine that
//! collapses leading acronym runs into a single token (`IPMask` → `ip-mask`,
//! not `i-p-mask`) while still splitting an uppercase letter that starts a new
//! lowercase word (`CAPath` → `ca-path`).

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Word,
    Punct,
}

/// Convert an identifier into a lowercase phrase joined by `sep`.
///
/// Word boundaries come from uppercase characters and from any punctuation,
/// whitespace, or non-printable character (which is dropped and replaced by
/// the separator). Total and deterministic for any input, including empty
/// strings and strings with no letters.
pub fn to_phrase(identifier: &str, sep: char) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut out = String::with_capacity(identifier.len() + identifier.len() / 4);
    let mut state = State::Start;
    for (i, &c) in chars.iter().enumerate() {
        if c.is_control() || c.is_whitespace() || c.is_ascii_punctuation() {
            state = State::Punct;
        } else if state == State::Punct || c.is_uppercase() {
            // A leading all-caps run stays one token; the run's last capital
            // opens a boundary only when a lowercase word follows it.
            let starts_word = i > 0 && chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            if !out.is_empty() && (state != State::Start || starts_word) {
                out.push(sep);
            }
            state = State::Start;
            out.extend(c.to_lowercase());
        } else {
            state = State::Word;
            out.push(c);
        }
    }
    out
}

/// Convert an identifier into a `SCREAMING_SNAKE_CASE` environment name.
pub fn to_screaming_snake(identifier: &str) -> String {
    to_phrase(identifier, '_').to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_phrase_cases() {
        let cases = [
            ("CamelCase", "camel-case"),
            ("CamelCamelCase", "camel-camel-case"),
            ("Camel2Camel2Case", "camel2-camel2-case"),
            ("PathToCSV", "path-to-csv"),
            ("CAPath", "ca-path"),
            ("EndsInUppeR", "ends-in-uppe-r"),
            ("eNdSiNLower", "e-nd-si-n-lower"),
            ("ALLUPPER", "allupper"),
            ("alllower", "alllower"),
            ("firstNotLower", "first-not-lower"),
            ("IP", "ip"),
            ("IPMask", "ip-mask"),
        ];
        for (input, want) in cases {
            assert_eq!(to_phrase(input, '-'), want, "to_phrase({input:?})");
        }
    }

    #[test]
    fn punctuation_becomes_separator() {
        assert_eq!(to_phrase("foo_bar", '-'), "foo-bar");
        assert_eq!(to_phrase("foo bar baz", '-'), "foo-bar-baz");
        assert_eq!(to_phrase("foo..bar", '-'), "foo-bar");
    }

    #[test]
    fn leading_and_trailing_punctuation_dropped() {
        assert_eq!(to_phrase("_foo", '-'), "foo");
        assert_eq!(to_phrase("foo_", '-'), "foo");
    }

    #[test]
    fn empty_input() {
        assert_eq!(to_phrase("", '-'), "");
        assert_eq!(to_screaming_snake(""), "");
    }

    #[test]
    fn digits_do_not_open_boundaries() {
        assert_eq!(to_phrase("http2Server", '-'), "http2-server");
    }

    #[test]
    fn screaming_snake_matches_phrase() {
        for input in ["CamelCase", "CamelCamelCase", "Camel2Camel2Case", "IPMask", "foo_bar"] {
            assert_eq!(
                to_screaming_snake(input),
                to_phrase(input, '_').to_uppercase()
            );
        }
        assert_eq!(to_screaming_snake("CamelCase"), "CAMEL_CASE");
        assert_eq!(to_screaming_snake("Camel2Camel2Case"), "CAMEL2_CAMEL2_CASE");
    }
}
