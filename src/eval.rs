//! Pair/map/array evaluator (`spec.md` §4.H), grounded on the original's
//! `_interpret_pair`/`_interpret_modl_value`/`_add_map_items_to_pair`/
//! `_make_new_map_pair`/`add_all_parent_pairs`. Recursive descent over the
//! raw (lowered, not-yet-directive-processed) tree, producing the output
//! tree: applies the string transformer to scalar strings, drops
//! side-effect-only pairs, resolves class-directed reshape, and picks
//! conditional branches.
//!
//! A "reference in value position" (`fav=%1`) is not a separate code path
//! here: `crate::transform::transform` already returns the resolved
//! `Value` unwrapped when the whole scalar string is one reference
//! (`spec.md` §4.E's "Outputs" note), which is the same behavior §4.H
//! describes for that case. One function serves both sections, per
//! `spec.md` §9's note that the two must not drift apart.

use crate::ast::{ConditionalFlavor, Span};
use crate::classes::{ClassDef, ClassRegistry};
use crate::environment::Environment;
use crate::lower::MAP_CONDITIONAL_SENTINEL;
use crate::methods::MethodRegistry;
use crate::value::{Pair, Value};
use crate::{err_ctx, ModlError};

/// The evaluator's working state, threaded through every recursive call:
/// the live environments, the method/class registries (read-only during
/// evaluation; only the directive driver mutates them), and the punycode
/// collaborator hook.
pub struct EvalContext<'a> {
    pub env: &'a mut Environment,
    pub methods: &'a MethodRegistry,
    pub classes: &'a ClassRegistry,
    pub punycode: &'a dyn Fn(&str) -> String,
}

/// Binds the side effect of a `_`/`?`-prefixed pair (named variable or
/// numbered-variable assignment) and reports whether `key` was one of
/// those two prefixes. Callers drop the pair from output when this returns
/// `true`. Deliberately does not handle `*`: directive keys are dispatched
/// in full only by `crate::driver` at the top level; a `*`-prefixed key
/// found nested inside a map/array has no directive meaning and is simply
/// dropped by the caller without calling this function for it.
pub fn apply_prefix_side_effect(
    key: &str,
    raw_value: &Value,
    ctx: &mut EvalContext,
) -> Result<bool, ModlError> {
    if let Some(name) = key.strip_prefix('_') {
        let value = evaluate_value(raw_value, ctx)?;
        ctx.env.bind_named_var(name, value);
        return Ok(true);
    }
    if key.strip_prefix('?').is_some() || key == "?" {
        let value = evaluate_value(raw_value, ctx)?;
        ctx.env.push_numbered(value);
        return Ok(true);
    }
    Ok(false)
}

/// Recursively evaluates a raw value found in "value position": a pair's
/// value, an array element, a conditional branch's contribution.
pub fn evaluate_value(raw: &Value, ctx: &mut EvalContext) -> Result<Value, ModlError> {
    match raw {
        Value::String(s) => crate::transform::transform(s, ctx.env, ctx.methods, ctx.punycode),
        Value::Number(_) | Value::True | Value::False | Value::Null => Ok(raw.clone()),
        Value::Pair(p) => evaluate_standalone_pair(p, ctx).map(|opt| opt.map_or(Value::Null, Value::Pair)),
        Value::Map(items) => Ok(Value::Map(evaluate_map_items(items, ctx)?)),
        Value::Array(items) => Ok(Value::Array(evaluate_array_items(items, ctx)?)),
        Value::Conditional(cond) => {
            match crate::conditional::select_branch(cond, ctx)? {
                Some(values) => Ok(fold_values(values)),
                None => Ok(Value::Null),
            }
        }
    }
}

/// Evaluates a bare pair appearing directly in value position (a
/// single-field object, e.g. an array element written as `name=alice`).
/// Returns `None` when the key is a dropped side-effect prefix.
fn evaluate_standalone_pair(p: &Pair, ctx: &mut EvalContext) -> Result<Option<Box<Pair>>, ModlError> {
    if p.key.starts_with('*') {
        return Ok(None);
    }
    let raw_value = p.value.as_deref().cloned().unwrap_or(Value::Null);
    if apply_prefix_side_effect(&p.key, &raw_value, ctx)? {
        return Ok(None);
    }
    let (key, value) = reshape_and_evaluate(&p.key, raw_value, ctx)?;
    Ok(Some(Box::new(Pair::with_value(key, value))))
}

/// Evaluates the items of a `Map`, applying side effects, class reshape,
/// sentinel conditional splicing, and duplicate-key merging.
pub fn evaluate_map_items(items: &[Pair], ctx: &mut EvalContext) -> Result<Vec<Pair>, ModlError> {
    let mut output: Vec<Pair> = Vec::with_capacity(items.len());
    for item in items {
        if item.key == MAP_CONDITIONAL_SENTINEL {
            if let Some(Value::Conditional(cond)) = item.value.as_deref() {
                if let Some(values) = crate::conditional::select_branch(cond, ctx)? {
                    for v in values {
                        match v {
                            Value::Pair(contributed) => {
                                let raw_value = contributed.value.as_deref().cloned().unwrap_or(Value::Null);
                                if apply_prefix_side_effect(&contributed.key, &raw_value, ctx)? {
                                    continue;
                                }
                                let (key, value) = reshape_and_evaluate(&contributed.key, raw_value, ctx)?;
                                merge_pair_into(&mut output, Pair::with_value(key, value))?;
                            }
                            other => {
                                return Err(err_ctx!(
                                    MalformedInput,
                                    Span::default(),
                                    message: format!("map conditional branch contributed a non-pair value: {}", other.type_name())
                                ));
                            }
                        }
                    }
                }
            }
            continue;
        }

        if item.key.starts_with('*') {
            continue;
        }
        let raw_value = item.value.as_deref().cloned().unwrap_or(Value::Null);
        if apply_prefix_side_effect(&item.key, &raw_value, ctx)? {
            continue;
        }
        let (key, value) = reshape_and_evaluate(&item.key, raw_value, ctx)?;
        merge_pair_into(&mut output, Pair::with_value(key, value))?;
    }
    Ok(output)
}

fn evaluate_array_items(items: &[Value], ctx: &mut EvalContext) -> Result<Vec<Value>, ModlError> {
    let mut output = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Conditional(cond) => {
                if let Some(values) = crate::conditional::select_branch(cond, ctx)? {
                    output.push(fold_values(values));
                }
            }
            Value::Pair(p) => {
                if let Some(pair) = evaluate_standalone_pair(p, ctx)? {
                    output.push(Value::Pair(pair));
                }
            }
            other => output.push(evaluate_value(other, ctx)?),
        }
    }
    Ok(output)
}

/// Merges `new_pair` into `output`, applying `spec.md` §4.H's duplicate-key
/// rule: an upper-case-only name may not be redefined; otherwise the
/// existing pair's value is augmented via `Pair::add_child` (§4.A's
/// promotion table).
pub fn merge_pair_into(output: &mut Vec<Pair>, new_pair: Pair) -> Result<(), ModlError> {
    if let Some(existing) = output.iter_mut().find(|p| p.key == new_pair.key) {
        let upper_case_only = new_pair.key.chars().any(char::is_alphabetic)
            && new_pair.key == new_pair.key.to_uppercase();
        if upper_case_only {
            return Err(err_ctx!(
                ImmutableRedefinition,
                Span::default(),
                name: new_pair.key.clone()
            ));
        }
        if let Some(value) = new_pair.value {
            existing.add_child(*value);
        }
    } else {
        output.push(new_pair);
    }
    Ok(())
}

/// Folds a sequence of contributed values (from a conditional branch, or a
/// class's positional-argument list) into one `Value`, using the same
/// `Pair::add_child` promotion table duplicate-key merging uses. An empty
/// sequence folds to `Value::Null`; a single value passes through as-is.
fn fold_values(values: Vec<Value>) -> Value {
    let mut carrier = Pair::new(String::new());
    for v in values {
        carrier.add_child(v);
    }
    carrier.value.map(|b| *b).unwrap_or(Value::Null)
}

/// Applies `spec.md` §4.F's instance transformation when `key` names a
/// registered class, then evaluates the (possibly reshaped) value.
/// Non-class keys pass through unchanged other than normal evaluation.
pub(crate) fn reshape_and_evaluate(key: &str, raw_value: Value, ctx: &mut EvalContext) -> Result<(String, Value), ModlError> {
    let Some(def) = ctx.classes.lookup(key).cloned() else {
        return Ok((key.to_string(), evaluate_value(&raw_value, ctx)?));
    };

    let new_key = def.name.clone();
    let reshaped = instantiate_class(&def, raw_value, ctx)?;
    Ok((new_key, reshaped))
}

/// Positional argument list implied by a raw instantiation value, per
/// `spec.md` §4.F.2: `Map` → its values in order; `Array` → its elements;
/// `Null` → none; any other leaf → itself, as the sole argument.
fn positional_args(raw_value: &Value) -> Vec<Value> {
    match raw_value {
        Value::Map(items) => items
            .iter()
            .map(|p| p.value.as_deref().cloned().unwrap_or(Value::Null))
            .collect(),
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn terminal_builtin_superclass(classes: &ClassRegistry, start: &str) -> Option<&'static str> {
    let mut current = start.to_string();
    for _ in 0..64 {
        match current.as_str() {
            "str" => return Some("str"),
            "arr" => return Some("arr"),
            "map" => return Some("map"),
            _ => {}
        }
        match classes.lookup(&current).and_then(|def| def.superclass.clone()) {
            Some(next) => current = next,
            None => return None,
        }
    }
    None
}

fn instantiate_class(def: &ClassDef, raw_value: Value, ctx: &mut EvalContext) -> Result<Value, ModlError> {
    let n = match &raw_value {
        Value::Map(items) => items.len(),
        Value::Array(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    };

    let leaf_superclass = def
        .superclass
        .as_deref()
        .and_then(|sup| terminal_builtin_superclass(ctx.classes, sup));

    let mut reshaped = if let Some(param_names) = def.params.get(&n) {
        let args = positional_args(&raw_value);
        let mut carrier = Pair::new(String::new());
        for (name, arg) in param_names.iter().zip(args) {
            let evaluated = evaluate_value(&arg, ctx)?;
            carrier.add_child(Value::Pair(Box::new(Pair::with_value(name.clone(), evaluated))));
        }
        carrier.value.map(|b| *b).unwrap_or(Value::Map(Vec::new()))
    } else {
        match leaf_superclass {
            Some("str") => {
                let evaluated = evaluate_value(&raw_value, ctx)?;
                Value::String(evaluated.stringify_scalar())
            }
            Some("arr") => {
                let args = positional_args(&raw_value);
                let mut out = Vec::with_capacity(args.len());
                for a in args {
                    out.push(evaluate_value(&a, ctx)?);
                }
                Value::Array(out)
            }
            Some("map") => {
                if let Some(param_names) = def.params.get(&n) {
                    let args = positional_args(&raw_value);
                    let mut pairs = Vec::new();
                    for (name, arg) in param_names.iter().zip(args) {
                        let evaluated = evaluate_value(&arg, ctx)?;
                        pairs.push(Pair::with_value(name.clone(), evaluated));
                    }
                    Value::Map(pairs)
                } else {
                    evaluate_value(&raw_value, ctx)?
                }
            }
            _ => evaluate_value(&raw_value, ctx)?,
        }
    };

    if !def.defaults.is_empty() {
        if let Value::Map(ref mut pairs) = reshaped {
            for default in &def.defaults {
                if pairs.iter().any(|p| p.key == default.key) {
                    continue;
                }
                let default_raw = default.value.as_deref().cloned().unwrap_or(Value::Null);
                let evaluated = evaluate_value(&default_raw, ctx)?;
                pairs.push(Pair::with_value(default.key.clone(), evaluated));
            }
        }
    }

    Ok(reshaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;
    use std::collections::HashMap as StdMap;

    fn ctx_pieces() -> (Environment, MethodRegistry, ClassRegistry) {
        (Environment::new(), MethodRegistry::new(), ClassRegistry::with_builtins())
    }

    #[test]
    fn drops_underscore_pair_and_binds_named_var() {
        let (mut env, methods, classes) = ctx_pieces();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        let pair = Pair::with_value("_city", Value::String("Ghent".to_string()));
        let result = evaluate_standalone_pair(&pair, &mut ctx).unwrap();
        assert!(result.is_none());
        assert_eq!(ctx.env.named_var("city"), Some(&Value::String("Ghent".to_string())));
    }

    #[test]
    fn duplicate_lower_case_keys_merge_via_add_child() {
        let mut output = Vec::new();
        merge_pair_into(&mut output, Pair::with_value("tag", Value::String("a".to_string()))).unwrap();
        merge_pair_into(&mut output, Pair::with_value("tag", Value::String("b".to_string()))).unwrap();
        assert_eq!(
            *output[0].value.as_ref().unwrap().as_ref(),
            Value::Array(vec![Value::String("a".to_string()), Value::String("b".to_string())])
        );
    }

    #[test]
    fn duplicate_upper_case_keys_are_rejected() {
        let mut output = Vec::new();
        merge_pair_into(&mut output, Pair::with_value("ID", Value::Number(Number::Int(1)))).unwrap();
        let err = merge_pair_into(&mut output, Pair::with_value("ID", Value::Number(Number::Int(2))));
        assert!(matches!(err, Err(ModlError::ImmutableRedefinition { .. })));
    }

    #[test]
    fn class_with_params_reshapes_positional_array() {
        let (mut env, methods, mut classes) = ctx_pieces();
        let mut params = StdMap::new();
        params.insert(2, vec!["name".to_string(), "age".to_string()]);
        classes
            .register("p".to_string(), Some("person".to_string()), Some("map".to_string()), params, Vec::new())
            .unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        let raw = Value::Array(vec![
            Value::String("alice".to_string()),
            Value::Number(Number::Int(30)),
        ]);
        let (key, value) = reshape_and_evaluate("person", raw, &mut ctx).unwrap();
        assert_eq!(key, "person");
        let Value::Map(pairs) = value else { panic!("expected Map") };
        assert_eq!(pairs[0].key, "name");
        assert_eq!(pairs[1].key, "age");
    }

    #[test]
    fn str_superclass_stringifies_value() {
        let (mut env, methods, mut classes) = ctx_pieces();
        classes
            .register("c".to_string(), Some("code".to_string()), Some("str".to_string()), StdMap::new(), Vec::new())
            .unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        let (_, value) = reshape_and_evaluate("code", Value::Number(Number::Int(7)), &mut ctx).unwrap();
        assert_eq!(value, Value::String("7".to_string()));
    }
}
