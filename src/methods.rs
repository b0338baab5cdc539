//! Variable-method registry (`spec.md` §4.D), grounded on the original's
//! `variable_methods.py`: each registered method is a pure function from a
//! single string argument to a string. When a method chain applies
//! parentheses (`.t(ing)`), the argument is `"subject,params"` — the method
//! itself is responsible for splitting on the first comma, exactly as the
//! original's `TrimTask.execute` does.

use std::collections::HashMap;
use std::sync::Arc;

/// A registered method: `(combined subject/params) -> transformed subject`.
pub type MethodFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Process-wide-shaped, but instance-owned, mapping from method name (and
/// aliases) to implementation. Populated at `MethodRegistry::new()` with
/// the required built-ins, then optionally extended by `options.methods`
/// (the `interpret()` seed) and by `*method`/`*m` directives
/// (`spec.md` §4.I.4).
#[derive(Clone)]
pub struct MethodRegistry {
    methods: HashMap<String, MethodFn>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            methods: HashMap::new(),
        };
        registry.register_all(["t", "trim"], trim_method());
        registry.register_all(["u", "upper"], upper_method());
        registry
    }

    /// Registers a single method function under every alias given.
    pub fn register_all<const N: usize>(&mut self, names: [&str; N], func: MethodFn) {
        for name in names {
            self.methods.insert(name.to_string(), func.clone());
        }
    }

    pub fn register(&mut self, name: &str, func: MethodFn) {
        self.methods.insert(name.to_string(), func);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Applies the named method to `input` (either a bare subject, or
    /// `"subject,params"` for a parenthesised call). `spec.md` §4.D:
    /// unknown methods are not looked up here at all — callers consult
    /// `contains` first and leave unregistered chains untouched.
    pub fn apply(&self, name: &str, input: &str) -> Option<String> {
        self.methods.get(name).map(|f| f(input))
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `trim`/`t`: truncates the subject just before the first occurrence of
/// `needle` in `"subject,needle"`, or returns the subject unchanged if
/// `needle` does not occur. Mirrors `TrimTask.execute` exactly.
fn trim_method() -> MethodFn {
    Arc::new(|input: &str| {
        let Some((subject, needle)) = input.split_once(',') else {
            return input.to_string();
        };
        match subject.find(needle) {
            Some(idx) => subject[..idx].to_string(),
            None => subject.to_string(),
        }
    })
}

/// `upper`/`u`: uppercases the subject. Unlike `trim`, `upper` takes no
/// parameters, so it ignores anything past a comma if one is present
/// (defensive only — no chain in `spec.md`'s examples parenthesises it).
fn upper_method() -> MethodFn {
    Arc::new(|input: &str| {
        let subject = input.split(',').next().unwrap_or(input);
        subject.to_uppercase()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_cuts_before_needle() {
        let reg = MethodRegistry::new();
        assert_eq!(reg.apply("t", "testing,ing"), Some("test".to_string()));
        assert_eq!(reg.apply("trim", "testing,ing"), Some("test".to_string()));
    }

    #[test]
    fn trim_is_unchanged_when_needle_absent() {
        let reg = MethodRegistry::new();
        assert_eq!(reg.apply("t", "testing,xyz"), Some("testing".to_string()));
    }

    #[test]
    fn upper_uppercases() {
        let reg = MethodRegistry::new();
        assert_eq!(reg.apply("u", "testing"), Some("TESTING".to_string()));
        assert_eq!(reg.apply("upper", "testing"), Some("TESTING".to_string()));
    }

    #[test]
    fn unknown_method_reports_absent() {
        let reg = MethodRegistry::new();
        assert!(!reg.contains("frobnicate"));
        assert_eq!(reg.apply("frobnicate", "x"), None);
    }
}
