//! The tagged value tree (`spec.md` §3 / §4.A). One `Value` type serves as
//! both the raw (pre-evaluation) tree and the output (post-evaluation) tree;
//! `spec.md`'s invariant 5 ("output trees contain no Conditional, no
//! reference string, ...") is an assertion about which variants/shapes a
//! *successful* `interpret()` call returns, not a reason to split the type.

use crate::ast::ConditionalNode;
use std::fmt;

/// A numeric literal. Integers that fit `i64` stay integral; anything else
/// (decimals, exponents, overflow) widens to `f64` — `spec.md` §4.A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Parses MODL numeric source text, preferring the integer
    /// representation when it fits exactly and the text carries no
    /// decimal point or exponent.
    pub fn parse(text: &str) -> Option<Number> {
        if !text.contains(['.', 'e', 'E']) {
            if let Ok(i) = text.parse::<i64>() {
                return Some(Number::Int(i));
            }
        }
        text.parse::<f64>().ok().map(Number::Float)
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    /// Normalized decimal text, used when a `Number` is spliced into a
    /// composite string (`spec.md` §9 Open Question 4: not byte-exact
    /// source preservation, a normalized decimal).
    pub fn to_decimal_string(&self) -> String {
        match self {
            Number::Int(i) => i.to_string(),
            Number::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

/// A single `(key, value)` structural unit. `key` never carries its prefix
/// (`_`, `*`, `?`, `%`) once stored — prefixes are stripped at the point a
/// name becomes a storage key, per `spec.md` invariant 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub key: String,
    pub value: Option<Box<Value>>,
}

impl Pair {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn with_value(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value: Some(Box::new(value)),
        }
    }

    /// The promotion table from `spec.md` §4.A, grounded on the original
    /// `Pair.add_modl_value`:
    ///
    /// - empty → store value
    /// - current is `Map`, new is `Pair` → append pair to map
    /// - current is `Pair`, new is `Pair` → promote to a `Map` of the two
    /// - otherwise → promote to an `Array` containing current then new
    pub fn add_child(&mut self, incoming: Value) {
        let Some(existing) = self.value.take() else {
            self.value = Some(Box::new(incoming));
            return;
        };

        let promoted = match (*existing, incoming) {
            (Value::Map(mut items), Value::Pair(p)) => {
                items.push(*p);
                Value::Map(items)
            }
            (Value::Pair(old), Value::Pair(new)) => Value::Map(vec![*old, *new]),
            (old, new) => Value::Array(vec![old, new]),
        };
        self.value = Some(Box::new(promoted));
    }
}

/// The tagged value sum described by `spec.md` §3.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(Number),
    True,
    False,
    Null,
    Pair(Box<Pair>),
    /// Ordered map of pairs. Key uniqueness (after evaluation) is enforced
    /// by the evaluator, not by this container — `spec.md` §4.H controls
    /// how duplicates are rejected or merged.
    Map(Vec<Pair>),
    Array(Vec<Value>),
    /// Present only in the raw tree; never survives a successful
    /// `interpret()` call (`spec.md` invariant 5).
    Conditional(Box<ConditionalNode>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Number(_) => "Number",
            Value::True | Value::False => "Bool",
            Value::Null => "Null",
            Value::Pair(_) => "Pair",
            Value::Map(_) => "Map",
            Value::Array(_) => "Array",
            Value::Conditional(_) => "Conditional",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::True => Some(true),
            Value::False => Some(false),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(_))
    }

    /// Stringifies a scalar the way `spec.md` §4.F.5's `str` superclass and
    /// the condition-atom comparisons do: numbers → decimal, booleans →
    /// `true`/`false`, null → `null`, strings unchanged.
    pub fn stringify_scalar(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_decimal_string(),
            Value::True => "true".to_string(),
            Value::False => "false".to_string(),
            Value::Null => "null".to_string(),
            other => format!("<{}>", other.type_name()),
        }
    }

    /// Capability predicate used by the reference resolver (`spec.md` §9:
    /// "a small trait/interface of capability predicates"): look up a named
    /// child, valid on `Map` (by pair key) and `Array` (by child-pair key).
    pub fn child_by_name(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|p| p.key == name)
                .and_then(|p| p.value.as_deref()),
            Value::Array(items) => items.iter().find_map(|v| match v {
                Value::Pair(p) if p.key == name => p.value.as_deref(),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Capability predicate: look up a positional child, valid on `Array`
    /// (by index) and `Pair` (only index `0`, returning its value).
    pub fn child_by_index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(index),
            Value::Pair(p) if index == 0 => p.value.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stringify_scalar())
    }
}
