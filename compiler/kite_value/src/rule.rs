//! Grammar rules.
//!
//! A rule is an ordered list of alternatives; each alternative is a sequence
//! of terms. Matching is anchored at the start of the input and explores
//! every alternative, so `rule-match` reports the longest prefix any
//! alternative accepts.

use serde::{Deserialize, Serialize};

/// Character classes usable as single-character terms.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharClass {
    Any,
    Digit,
    Alpha,
    Alnum,
    Space,
}

impl CharClass {
    fn accepts(self, c: char) -> bool {
        match self {
            CharClass::Any => true,
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Alpha => c.is_alphabetic(),
            CharClass::Alnum => c.is_alphanumeric(),
            CharClass::Space => c.is_whitespace(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "any" => CharClass::Any,
            "digit" => CharClass::Digit,
            "alpha" => CharClass::Alpha,
            "alnum" => CharClass::Alnum,
            "space" => CharClass::Space,
            _ => return None,
        })
    }
}

/// One element of a rule alternative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTerm {
    /// Exact text.
    Text(String),
    /// One character of a class.
    Class(CharClass),
    /// `term` repeated between `min` and `max` times (unbounded if `None`).
    Repeat {
        term: Box<RuleTerm>,
        min: u32,
        max: Option<u32>,
    },
    /// A nested rule.
    Rule(Box<RuleValue>),
}

/// A grammar rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleValue {
    pub alternatives: Vec<Vec<RuleTerm>>,
}

impl RuleValue {
    pub fn new(alternatives: Vec<Vec<RuleTerm>>) -> Self {
        RuleValue { alternatives }
    }

    /// Length in bytes of the longest prefix of `input` this rule matches.
    pub fn longest_match(&self, input: &str) -> Option<usize> {
        self.ends(input, 0).into_iter().max()
    }

    /// Whether the rule matches all of `input`.
    pub fn matches_all(&self, input: &str) -> bool {
        self.ends(input, 0).contains(&input.len())
    }

    fn ends(&self, input: &str, start: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for alternative in &self.alternatives {
            let mut positions = vec![start];
            for term in alternative {
                positions = step_all(term, input, &positions);
                if positions.is_empty() {
                    break;
                }
            }
            merge(&mut out, positions);
        }
        out
    }
}

fn step_all(term: &RuleTerm, input: &str, positions: &[usize]) -> Vec<usize> {
    let mut next = Vec::new();
    for &pos in positions {
        merge(&mut next, term_ends(term, input, pos));
    }
    next
}

fn term_ends(term: &RuleTerm, input: &str, pos: usize) -> Vec<usize> {
    let rest = input.get(pos..).unwrap_or("");
    match term {
        RuleTerm::Text(text) => {
            if rest.starts_with(text.as_str()) {
                vec![pos + text.len()]
            } else {
                Vec::new()
            }
        }
        RuleTerm::Class(class) => match rest.chars().next() {
            Some(c) if class.accepts(c) => vec![pos + c.len_utf8()],
            _ => Vec::new(),
        },
        RuleTerm::Repeat { term, min, max } => {
            let mut out = if *min == 0 { vec![pos] } else { Vec::new() };
            let mut frontier = vec![pos];
            let mut count = 0u32;
            while max.map_or(true, |max| count < max) {
                // Only progress counts; a zero-width repetition would never end.
                let mut advanced = Vec::new();
                for &from in &frontier {
                    let ends = term_ends(term, input, from)
                        .into_iter()
                        .filter(|end| *end > from)
                        .collect();
                    merge(&mut advanced, ends);
                }
                if advanced.is_empty() {
                    break;
                }
                count += 1;
                if count >= *min {
                    merge(&mut out, advanced.clone());
                }
                frontier = advanced;
            }
            out
        }
        RuleTerm::Rule(rule) => rule.ends(input, pos),
    }
}

fn merge(into: &mut Vec<usize>, from: Vec<usize>) {
    for pos in from {
        if !into.contains(&pos) {
            into.push(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> RuleValue {
        RuleValue::new(vec![vec![RuleTerm::Repeat {
            term: Box::new(RuleTerm::Class(CharClass::Digit)),
            min: 1,
            max: None,
        }]])
    }

    #[test]
    fn repeat_matches_longest_run() {
        assert_eq!(number().longest_match("1234abc"), Some(4));
        assert_eq!(number().longest_match("abc"), None);
    }

    #[test]
    fn alternatives_and_nesting() {
        let signed = RuleValue::new(vec![
            vec![RuleTerm::Text("-".into()), RuleTerm::Rule(Box::new(number()))],
            vec![RuleTerm::Rule(Box::new(number()))],
        ]);
        assert!(signed.matches_all("-42"));
        assert!(signed.matches_all("42"));
        assert!(!signed.matches_all("--42"));
    }

    #[test]
    fn bounded_repeat() {
        let two = RuleValue::new(vec![vec![RuleTerm::Repeat {
            term: Box::new(RuleTerm::Class(CharClass::Alpha)),
            min: 0,
            max: Some(2),
        }]]);
        assert_eq!(two.longest_match("abcd"), Some(2));
        assert_eq!(two.longest_match("1"), Some(0));
    }
}
