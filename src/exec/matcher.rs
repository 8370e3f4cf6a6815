//! Full-text `match` over whitespace separated tokens.

use crate::value::Value;

/// One search term. A trailing `*` turns it into a prefix match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatcher {
    term: String,
    prefix: bool,
}

impl TermMatcher {
    pub fn new(term: &str) -> Self {
        let term = term.trim().to_lowercase();
        match term.strip_suffix('*') {
            Some(stem) => TermMatcher {
                term: stem.to_string(),
                prefix: true,
            },
            None => TermMatcher {
                term,
                prefix: false,
            },
        }
    }

    /// `word` must already be lower-cased.
    pub fn matches(&self, word: &str) -> bool {
        if self.prefix {
            word.starts_with(&self.term)
        } else {
            word == self.term
        }
    }
}

/// True when every term matches a token of `text`, each term a different
/// token. With no terms, any non-blank text matches.
pub fn match_text(text: &str, terms: &[TermMatcher]) -> bool {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return !words.is_empty();
    }
    if terms.len() > words.len() {
        return false;
    }
    let mut owner = vec![None; words.len()];
    for term in 0..terms.len() {
        let mut seen = vec![false; words.len()];
        if !assign(term, terms, &words, &mut owner, &mut seen) {
            return false;
        }
    }
    true
}

// Augmenting path search, so a greedy early claim never blocks a later term.
fn assign(
    term: usize,
    terms: &[TermMatcher],
    words: &[String],
    owner: &mut [Option<usize>],
    seen: &mut [bool],
) -> bool {
    for (index, word) in words.iter().enumerate() {
        if seen[index] || !terms[term].matches(word) {
            continue;
        }
        seen[index] = true;
        let free = match owner[index] {
            None => true,
            Some(other) => assign(other, terms, words, owner, seen),
        };
        if free {
            owner[index] = Some(term);
            return true;
        }
    }
    false
}

/// Evaluate `candidate match terms`.
///
/// Returns null when a term or the candidate is not a string. For an array
/// of candidates any match wins, but a non-string element reached before a
/// match makes the whole result null.
pub fn match_value(candidate: &Value, terms: &[Value]) -> Value {
    let Some(matchers) = terms
        .iter()
        .map(|term| term.as_str().map(TermMatcher::new))
        .collect::<Option<Vec<_>>>()
    else {
        return Value::Null;
    };
    match candidate {
        Value::String(text) => Value::Boolean(match_text(text, &matchers)),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(text) if match_text(text, &matchers) => {
                        return Value::Boolean(true);
                    }
                    Value::String(_) => {}
                    _ => return Value::Null,
                }
            }
            Value::Boolean(false)
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(terms: &[&str]) -> Vec<TermMatcher> {
        terms.iter().map(|t| TermMatcher::new(t)).collect()
    }

    #[test]
    fn test_prefix_wildcard() {
        assert!(match_text("hello world", &terms(&["hel*"])));
        assert!(match_text("Hello World", &terms(&["WORLD"])));
        assert!(!match_text("hello", &terms(&["xyz"])));
        assert!(!match_text("hello", &terms(&["hell"])));
    }

    #[test]
    fn test_terms_need_distinct_tokens() {
        assert!(!match_text("hello", &terms(&["hel*", "hello"])));
        assert!(match_text("hello help", &terms(&["hel*", "hello"])));
        // the prefix term must not keep "hello" for itself
        assert!(match_text("hello help", &terms(&["hello", "hel*"])));
    }

    #[test]
    fn test_empty_terms_match_any_tokens() {
        assert!(match_text("a", &[]));
        assert!(!match_text("   ", &[]));
    }

    #[test]
    fn test_non_strings_are_unknown() {
        let hello = [Value::from("hello")];
        assert_eq!(match_value(&Value::Integer(1), &hello), Value::Null);
        assert_eq!(match_value(&Value::from("hello"), &[Value::Integer(1)]), Value::Null);
        let mixed = Value::Array(vec![Value::from("nope"), Value::Null, Value::from("hello")]);
        assert_eq!(match_value(&mixed, &hello), Value::Null);
        let early = Value::Array(vec![Value::from("hello"), Value::Null]);
        assert_eq!(match_value(&early, &hello), Value::Boolean(true));
    }
}
