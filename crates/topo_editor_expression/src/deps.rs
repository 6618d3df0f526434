// SPDX-License-Identifier: MIT OR Apache-2.0
//! Approximate dependency extraction.
//!
//! Expressions are scanned with regular expressions instead of being
//! parsed, so results over-approximate: identifiers inside string literals
//! and relative filter fields are reported as variables too. Re-evaluation
//! triggering depends on this exact behavior, so it is kept as is.

use indexmap::IndexSet;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

const IDENT: &str = r"[a-zA-Z_$][0-9a-zA-Z_$]*";

static ARRAY_WITH_CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"({IDENT})(\[[^\]]+\])")).expect("static pattern")
});
static VARIABLE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({IDENT}(?:\.{IDENT})*)\b")).expect("static pattern")
});
static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"({IDENT})\s*\(")).expect("static pattern"));
static PIPE_TRANSFORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\|(\s*{IDENT})")).expect("static pattern"));
static DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(true|false|null|undefined|NaN|\d+)$").expect("static pattern")
});

/// Functions too common to be worth tracking
const IGNORED_FUNCTIONS: &[&str] = &["max", "min", "sqrt"];

/// Names an expression reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyInfo {
    /// Variable paths in first-seen order
    pub variables: IndexSet<String>,
    /// Function and transform names
    pub functions: IndexSet<String>,
}

/// Scan an expression without caching
pub fn extract_dependencies(expression: &str) -> DependencyInfo {
    let mut info = DependencyInfo::default();

    for captures in ARRAY_WITH_CONDITION.captures_iter(expression) {
        info.variables.insert(captures[1].to_string());
    }

    for m in VARIABLE_PATH.find_iter(expression) {
        // A path directly followed by `(` is a call: the last segment is the
        // callee and only the receiver before it counts as a read.
        let token = if expression[m.end()..].starts_with('(') {
            match m.as_str().rsplit_once('.') {
                Some((receiver, _)) => receiver,
                None => continue,
            }
        } else {
            m.as_str()
        };
        if !DENYLIST.is_match(token) {
            info.variables.insert(token.to_string());
        }
    }

    for captures in FUNCTION_CALL.captures_iter(expression) {
        let name = &captures[1];
        if !IGNORED_FUNCTIONS.contains(&name) {
            info.functions.insert(name.to_string());
        }
    }

    for captures in PIPE_TRANSFORM.captures_iter(expression) {
        info.functions.insert(captures[1].trim().to_string());
    }

    info
}

/// Memoizing extractor. Expressions are immutable once seen, so entries
/// are never invalidated.
#[derive(Debug, Default)]
pub struct DependencyExtractor {
    cache: Mutex<HashMap<String, Arc<DependencyInfo>>>,
}

impl DependencyExtractor {
    /// Create an empty extractor
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependencies of `expression`, computed once per distinct string
    pub fn extract(&self, expression: &str) -> Arc<DependencyInfo> {
        let mut cache = self.cache.lock();
        if let Some(info) = cache.get(expression) {
            return Arc::clone(info);
        }
        let info = Arc::new(extract_dependencies(expression));
        cache.insert(expression.to_string(), Arc::clone(&info));
        info
    }

    /// Number of memoized expressions
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(expression: &str) -> Vec<String> {
        extract_dependencies(expression).variables.into_iter().collect()
    }

    fn funcs(expression: &str) -> Vec<String> {
        extract_dependencies(expression).functions.into_iter().collect()
    }

    #[test]
    fn test_variable_paths() {
        assert_eq!(vars("employee.first + ' ' + employee.last"), vec!["employee.first", "employee.last"]);
        assert_eq!(vars("count > 10 && true"), vec!["count"]);
    }

    #[test]
    fn test_array_conditions() {
        let found = vars("items[.id == 3].name");
        assert_eq!(found[0], "items");
        // Relative fields are over-reported
        assert!(found.contains(&"id".to_string()));
    }

    #[test]
    fn test_method_receiver() {
        assert_eq!(vars("user.name.trim()"), vec!["user.name"]);
        assert!(vars("sum(values)").contains(&"values".to_string()));
        assert!(!vars("sum(values)").contains(&"sum".to_string()));
    }

    #[test]
    fn test_functions_and_transforms() {
        assert_eq!(funcs("max(a, b) + round(c)"), vec!["round"]);
        assert_eq!(funcs("name | upper | pad(3)"), vec!["pad", "upper"]);
    }

    #[test]
    fn test_memoized() {
        let extractor = DependencyExtractor::new();
        let a = extractor.extract("x + y");
        let b = extractor.extract("x + y");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(extractor.cached(), 1);
    }
}
