//! Class registry (`spec.md` §4.F), grounded on the original's
//! `ModlInterpreter._load_class_structure`/`_get_modl_class`/
//! `add_all_parent_pairs`. Stores class definitions, resolves inheritance
//! at load time (copy-parent-then-overlay, walked once per class, with
//! cycle detection that the original lacks — `spec.md` §9 requires it),
//! and answers the lookups the instance-transform algorithm in
//! `crate::eval` needs. The built-in class `o` (superclass `map`) always
//! exists, per `spec.md` §3.

use crate::value::Pair;
use crate::{err_msg, ModlError};
use std::collections::HashMap;

/// One loaded class definition, fully resolved against its ancestors.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub id: String,
    pub name: String,
    pub superclass: Option<String>,
    /// `*paramsN` → ordered parameter (display) names, one entry per
    /// arity the class supports positional instantiation for.
    pub params: HashMap<usize, Vec<String>>,
    /// Non-prefixed default pair definitions, inherited by instances
    /// unless already present (`spec.md` §4.F.4). Stored as raw,
    /// unevaluated pair values (a default may itself reference
    /// variables, evaluated fresh at each instantiation).
    pub defaults: Vec<Pair>,
}

impl ClassDef {
    fn reserved_superclass(sup: &str) -> bool {
        sup.chars().any(char::is_alphabetic) && sup == sup.to_uppercase()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    /// Insertion-ordered so that `add_all_parent_pairs`-equivalent default
    /// merging is deterministic; keyed by the class's own id.
    classes: Vec<ClassDef>,
}

impl ClassRegistry {
    /// A registry pre-populated with the built-in `o` class.
    pub fn with_builtins() -> Self {
        let mut reg = Self::default();
        reg.classes.push(ClassDef {
            id: "o".to_string(),
            name: "o".to_string(),
            superclass: Some("map".to_string()),
            params: HashMap::new(),
            defaults: Vec::new(),
        });
        reg
    }

    /// Looks up a class by id, display name, or raw storage key — any of
    /// `*id`/`*i`/`*name`/`*n` match, per `spec.md` §4.F.
    pub fn lookup(&self, key: &str) -> Option<&ClassDef> {
        self.classes
            .iter()
            .find(|c| c.id == key || c.name == key)
    }

    pub fn has_class(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Registers a class, given its own id/name/superclass/params/defaults
    /// (already parsed out of the `*class` pair's map value by the
    /// driver). Copies the full ancestor chain's fields first, then
    /// overlays the new class's own fields, detecting cycles and rejecting
    /// derivation from a reserved (upper-case-only) superclass.
    pub fn register(
        &mut self,
        id: String,
        name: Option<String>,
        superclass: Option<String>,
        own_params: HashMap<usize, Vec<String>>,
        own_defaults: Vec<Pair>,
    ) -> Result<(), ModlError> {
        if id.is_empty() {
            return Err(err_msg!(
                InvalidClassDefinition,
                message: "missing *id/*i in class definition".to_string()
            ));
        }

        if let Some(sup) = &superclass {
            if ClassDef::reserved_superclass(sup) && self.has_class(sup) {
                return Err(err_msg!(
                    InvalidClassDefinition,
                    message: format!("cannot derive from '{sup}': upper-case class ids are fixed/reserved")
                ));
            }
        }

        // Cycle detection: walk the proposed ancestor chain before
        // inserting, so a self-referential or mutually-referential
        // *superclass chain is rejected at load time (spec.md §9).
        let mut seen = vec![id.clone()];
        let mut walk = superclass.clone();
        while let Some(next) = walk {
            if matches!(next.as_str(), "str" | "arr" | "map") {
                break;
            }
            if seen.contains(&next) {
                return Err(err_msg!(
                    InvalidClassDefinition,
                    message: format!("cycle detected in *superclass chain at '{next}'")
                ));
            }
            seen.push(next.clone());
            walk = self.lookup(&next).and_then(|c| c.superclass.clone());
        }

        let mut params = HashMap::new();
        let mut defaults: Vec<Pair> = Vec::new();

        if let Some(sup) = &superclass {
            if let Some(parent) = self.lookup(sup) {
                params = parent.params.clone();
                defaults = parent.defaults.clone();
            }
        }

        for (k, v) in own_params {
            params.insert(k, v);
        }
        for pair in own_defaults {
            if let Some(existing) = defaults.iter_mut().find(|p| p.key == pair.key) {
                *existing = pair;
            } else {
                defaults.push(pair);
            }
        }

        let resolved_name = name.unwrap_or_else(|| id.clone());

        let def = ClassDef {
            id: id.clone(),
            name: resolved_name,
            superclass,
            params,
            defaults,
        };

        if let Some(slot) = self.classes.iter_mut().find(|c| c.id == id) {
            *slot = def;
        } else {
            self.classes.push(def);
        }

        Ok(())
    }
}
