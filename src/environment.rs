//! Environments (`spec.md` §4.G): three distinct keyspaces owned by the
//! evaluator instance, cleared wholesale on an import restart by simply
//! constructing a fresh `Environment` rather than mutating in place
//! (`spec.md` §9: "an outer loop ... not an exception from deep within
//! recursion" applies equally to environment lifetime).
//!
//! Named-pair and named-variable maps use `im::HashMap` (structural
//! sharing), matching the teacher's use of `im` for its `World`/environment
//! state — cheap to snapshot if a caller wants to inspect environment state
//! mid-pass without disturbing the evaluator's own copy.

use crate::value::Value;
use crate::{err_msg, ModlError};
use im::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// `?`-assigned values, in append order; addressed by stringified index.
    numbered: Vec<Value>,
    /// `_`-prefixed pairs; stored without the leading underscore.
    named_vars: HashMap<String, Value>,
    /// All other top-level (and, recursively, nested definition-carrying)
    /// pairs, after string transformation of their scalar values.
    named_pairs: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value to the numbered-variable list (`?=value`) or, for
    /// an array value, appends each element (`spec.md` §4.I.5).
    pub fn push_numbered(&mut self, value: Value) {
        match value {
            Value::Array(items) => self.numbered.extend(items),
            other => self.numbered.push(other),
        }
    }

    pub fn numbered(&self, index: usize) -> Option<&Value> {
        self.numbered.get(index)
    }

    /// Binds a named (underscore-prefixed) variable. Named variables are
    /// not subject to the upper-case-immutability rule — that rule applies
    /// to named *pairs* only (`spec.md` §4.G).
    pub fn bind_named_var(&mut self, name: &str, value: Value) {
        self.named_vars.insert(name.to_string(), value);
    }

    pub fn named_var(&self, name: &str) -> Option<&Value> {
        self.named_vars.get(name)
    }

    /// Defines a top-level named pair. Upper-case-only names are immutable
    /// once assigned (`spec.md` invariant 2): a second definition raises
    /// `ImmutableRedefinition`.
    pub fn define_pair(&mut self, name: &str, value: Value) -> Result<(), ModlError> {
        if name.chars().any(char::is_alphabetic) && name == name.to_uppercase() && self.named_pairs.contains_key(name)
        {
            return Err(err_msg!(ImmutableRedefinition, name: name.to_string()));
        }
        self.named_pairs.insert(name.to_string(), value);
        Ok(())
    }

    pub fn named_pair(&self, name: &str) -> Option<&Value> {
        self.named_pairs.get(name)
    }

    /// Lookup order from `spec.md` §4.E.4: numbered → named → pair, with
    /// the pair environment additionally tried under an `_`-prefixed key.
    pub fn resolve_head(&self, head: &str) -> Option<&Value> {
        if let Ok(index) = head.parse::<usize>() {
            if let Some(v) = self.numbered(index) {
                return Some(v);
            }
        }
        if let Some(v) = self.named_var(head) {
            return Some(v);
        }
        if let Some(v) = self.named_pair(head) {
            return Some(v);
        }
        self.named_pair(head.strip_prefix('_').unwrap_or(head))
    }
}
