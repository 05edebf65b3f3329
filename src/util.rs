//! Small shared helpers: list splitting, cache-key digests, macro expansion.

use std::collections::HashMap;

/// Split a user-entered list on any mixture of commas, semicolons and
/// whitespace, trimming tokens and dropping empty ones.
///
/// Used for package lists, packages-file lists and bind-mount lists, which
/// all accept the same free-form delimiters.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| matches!(c, ',' | ';' | ' ' | '\t' | '\n' | '\r'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 128-bit fingerprint of a package list, hex-encoded lower-case and
/// zero-padded to 32 characters.
///
/// This is a cache-key component only, never an integrity check: it
/// namespaces base environment directories per distinct package set.
pub fn digest(input: &str) -> String {
    format!("{:032x}", md5::compute(input.as_bytes()))
}

/// Expand `${VAR}` and `$VAR` references against the given environment map.
///
/// Unknown variables expand to the empty string. A `$` not followed by a
/// name or `{` is kept literally.
pub fn expand_macros(input: &str, env: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if closed {
                    if let Some(value) = env.get(&name) {
                        out.push_str(value);
                    }
                } else {
                    // unterminated ${...}: keep it literally
                    out.push_str("${");
                    out.push_str(&name);
                }
            }
            Some((_, c)) if c.is_ascii_alphanumeric() || *c == '_' => {
                let mut name = String::new();
                while let Some((_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || *c == '_' {
                        name.push(*c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(value) = env.get(&name) {
                    out.push_str(value);
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_mixed_delimiters() {
        let input = " a b, c ; d,e;f    g,h\ti\nj\r\nk ";
        let tokens = split_list(input);
        assert_eq!(
            tokens,
            vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]
        );
    }

    #[test]
    fn split_empty_and_blank() {
        assert!(split_list("").is_empty());
        assert!(split_list("  ,, ;\t\n").is_empty());
    }

    #[test]
    fn split_preserves_order() {
        assert_eq!(split_list("zlib1g-dev, gcc make"), vec!["zlib1g-dev", "gcc", "make"]);
    }

    #[test]
    fn digest_of_empty_string_is_fixed() {
        assert_eq!(digest(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn digest_is_deterministic() {
        let a = digest("gcc make");
        assert_eq!(a, digest("gcc make"));
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_distinguishes_package_sets() {
        let samples = ["gcc", "gcc make", "make gcc", "sudo wget gnupg", "a", "b"];
        for x in &samples {
            for y in &samples {
                if x != y {
                    assert_ne!(digest(x), digest(y), "collision between {x:?} and {y:?}");
                }
            }
        }
    }

    #[test]
    fn expand_braced_and_bare_macros() {
        let env = HashMap::from([
            ("VERSION".to_string(), "1.2".to_string()),
            ("NAME".to_string(), "hello".to_string()),
        ]);
        assert_eq!(expand_macros("${NAME}_${VERSION}.dsc", &env), "hello_1.2.dsc");
        assert_eq!(expand_macros("$NAME-$VERSION", &env), "hello-1.2");
    }

    #[test]
    fn expand_unknown_and_literal_dollar() {
        let env = HashMap::new();
        assert_eq!(expand_macros("${MISSING}.dsc", &env), ".dsc");
        assert_eq!(expand_macros("cost: 5$ total", &env), "cost: 5$ total");
        assert_eq!(expand_macros("a$", &env), "a$");
    }
}
