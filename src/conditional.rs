//! Conditional evaluator (`spec.md` §4.J), grounded on the original's
//! `ConditionTest`/`ConditionGroup`/`Condition` walk in `modl_creator.py`
//! and the (left-fold, no precedence) reduction `spec.md` §9 Open Question
//! 1 resolves explicitly: `&`/`|` apply in sequence, left to right: there
//! is no operator precedence, only explicit `ConditionGroup` nesting.
//!
//! `select_branch` returns the chosen branch's *lowered but not-yet-fully-
//! evaluated* contributions for `ConditionalFlavor::Map` and `::TopLevel`
//! (their callers — the map-conditional splice in `crate::eval` and the
//! top-level redispatch in `crate::driver` — each apply their own
//! directive/reshape handling to every contributed structure), but
//! fully-evaluated, folded values for `ConditionalFlavor::Value` (a bare
//! value-position conditional has no directive semantics to preserve).

use crate::ast::{BoolJoin, ConditionNode, ConditionOp, ConditionTestNode, ConditionalFlavor, ConditionalNode, Subcondition};
use crate::eval::{evaluate_value, EvalContext};
use crate::transform::resolve_subject_path;
use crate::value::Value;
use crate::ModlError;

/// Picks the first branch whose test is true, or the default branch if
/// present, and returns its contributed structures — see module docs for
/// the raw-vs-evaluated split by `ConditionalFlavor`. Returns `Ok(None)`
/// when nothing matches and there is no default.
pub fn select_branch(cond: &ConditionalNode, ctx: &mut EvalContext) -> Result<Option<Vec<Value>>, ModlError> {
    for branch in &cond.branches {
        if evaluate_test(&branch.test, ctx)? {
            return Ok(Some(materialize(&branch.values, cond.flavor, ctx)?));
        }
    }
    match &cond.default {
        Some(values) => Ok(Some(materialize(values, cond.flavor, ctx)?)),
        None => Ok(None),
    }
}

fn materialize(
    nodes: &[crate::ast::ParseNode],
    flavor: ConditionalFlavor,
    ctx: &mut EvalContext,
) -> Result<Vec<Value>, ModlError> {
    let raw = crate::lower::lower_nodes(nodes)?;
    match flavor {
        ConditionalFlavor::Map | ConditionalFlavor::TopLevel => Ok(raw),
        ConditionalFlavor::Value => raw.iter().map(|v| evaluate_value(v, ctx)).collect(),
    }
}

/// Left-to-right reduction over `(join, negated, subcondition)` terms. The
/// first term's `join` is ignored (there is nothing to its left yet).
fn evaluate_test(test: &ConditionTestNode, ctx: &mut EvalContext) -> Result<bool, ModlError> {
    let mut acc: Option<bool> = None;
    for (join, negated, sub) in &test.terms {
        let mut value = evaluate_subcondition(sub, ctx)?;
        if *negated {
            value = !value;
        }
        acc = Some(match acc {
            None => value,
            Some(prev) => match join {
                BoolJoin::And => prev && value,
                BoolJoin::Or => prev || value,
            },
        });
    }
    Ok(acc.unwrap_or(true))
}

fn evaluate_subcondition(sub: &Subcondition, ctx: &mut EvalContext) -> Result<bool, ModlError> {
    match sub {
        Subcondition::Condition(atom) => evaluate_condition(atom, ctx),
        Subcondition::Group(group) => evaluate_test(group, ctx),
    }
}

/// Evaluates one `Condition` atom: resolves `key` through the same
/// nested-path walk the string transformer uses, lowers and evaluates
/// `values`, and applies `operator` plus the atom's own `negated` flag.
fn evaluate_condition(atom: &ConditionNode, ctx: &mut EvalContext) -> Result<bool, ModlError> {
    let left = resolve_subject_path(&atom.key, ctx.env).unwrap_or(Value::Null);

    let mut rights = Vec::with_capacity(atom.values.len());
    for node in &atom.values {
        let raw = crate::lower::lower_node(node)?;
        rights.push(evaluate_value(&raw, ctx)?);
    }

    let result = match atom.operator {
        ConditionOp::Eq | ConditionOp::In => rights.iter().any(|r| values_equal(&left, r)),
        ConditionOp::NotEq => !rights.iter().any(|r| values_equal(&left, r)),
        ConditionOp::Lt => order_against(&left, &rights, std::cmp::Ordering::is_lt),
        ConditionOp::Gt => order_against(&left, &rights, std::cmp::Ordering::is_gt),
        ConditionOp::Le => order_against(&left, &rights, std::cmp::Ordering::is_le),
        ConditionOp::Ge => order_against(&left, &rights, std::cmp::Ordering::is_ge),
    };

    Ok(if atom.negated { !result } else { result })
}

/// Applies `pred` to the ordering of `left` against the first of `rights`
/// — ordering operators compare against a single right-hand value;
/// `spec.md` §4.J only describes set-membership for `=`/`!=` with
/// multiple values.
fn order_against(left: &Value, rights: &[Value], pred: fn(std::cmp::Ordering) -> bool) -> bool {
    let Some(right) = rights.first() else {
        return false;
    };
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).is_some_and(pred),
        _ => left
            .stringify_scalar()
            .partial_cmp(&right.stringify_scalar())
            .is_some_and(pred),
    }
}

/// Coerces both sides to comparable forms before comparing, per
/// `spec.md` §4.J.2: numbers compare numerically even against a string
/// that happens to hold the same digits, booleans compare as booleans,
/// everything else falls back to stringified comparison.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => return x == y,
        _ => {}
    }
    match (a.as_bool(), b.as_bool()) {
        (Some(x), Some(y)) => return x == y,
        _ => {}
    }
    a.stringify_scalar() == b.stringify_scalar()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ConditionalBranch, Span};
    use crate::classes::ClassRegistry;
    use crate::environment::Environment;
    use crate::methods::MethodRegistry;
    use crate::value::Number;

    fn ctx_pieces() -> (Environment, MethodRegistry, ClassRegistry) {
        (Environment::new(), MethodRegistry::new(), ClassRegistry::with_builtins())
    }

    fn atom(key: &str, operator: ConditionOp, values: Vec<crate::ast::ParseNode>, negated: bool) -> ConditionNode {
        ConditionNode {
            key: key.to_string(),
            operator,
            values,
            negated,
        }
    }

    fn string_node(s: &str) -> crate::ast::ParseNode {
        crate::ast::ParseNode::String(s.to_string(), Span::default())
    }

    fn bool_node(b: bool) -> crate::ast::ParseNode {
        crate::ast::ParseNode::Bool(b, Span::default())
    }

    #[test]
    fn first_matching_branch_wins() {
        let (mut env, methods, classes) = ctx_pieces();
        env.define_pair("tier", Value::String("gold".to_string())).unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };

        let cond = ConditionalNode {
            flavor: ConditionalFlavor::Value,
            branches: vec![
                ConditionalBranch {
                    test: ConditionTestNode {
                        terms: vec![(BoolJoin::And, false, Subcondition::Condition(atom(
                            "tier",
                            ConditionOp::Eq,
                            vec![string_node("silver")],
                            false,
                        )))],
                    },
                    values: vec![string_node("silver-perk")],
                },
                ConditionalBranch {
                    test: ConditionTestNode {
                        terms: vec![(BoolJoin::And, false, Subcondition::Condition(atom(
                            "tier",
                            ConditionOp::Eq,
                            vec![string_node("gold")],
                            false,
                        )))],
                    },
                    values: vec![string_node("gold-perk")],
                },
            ],
            default: None,
            span: Span::default(),
        };

        let result = select_branch(&cond, &mut ctx).unwrap();
        assert_eq!(result, Some(vec![Value::String("gold-perk".to_string())]));
    }

    #[test]
    fn default_branch_used_when_nothing_matches() {
        let (mut env, methods, classes) = ctx_pieces();
        env.define_pair("tier", Value::String("bronze".to_string())).unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        let cond = ConditionalNode {
            flavor: ConditionalFlavor::Value,
            branches: vec![ConditionalBranch {
                test: ConditionTestNode {
                    terms: vec![(BoolJoin::And, false, Subcondition::Condition(atom(
                        "tier",
                        ConditionOp::Eq,
                        vec![string_node("gold")],
                        false,
                    )))],
                },
                values: vec![string_node("gold-perk")],
            }],
            default: Some(vec![string_node("no-perk")]),
            span: Span::default(),
        };
        let result = select_branch(&cond, &mut ctx).unwrap();
        assert_eq!(result, Some(vec![Value::String("no-perk".to_string())]));
    }

    #[test]
    fn no_match_and_no_default_yields_none() {
        let (mut env, methods, classes) = ctx_pieces();
        env.define_pair("tier", Value::String("bronze".to_string())).unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        let cond = ConditionalNode {
            flavor: ConditionalFlavor::Value,
            branches: vec![ConditionalBranch {
                test: ConditionTestNode {
                    terms: vec![(BoolJoin::And, false, Subcondition::Condition(atom(
                        "tier",
                        ConditionOp::Eq,
                        vec![string_node("gold")],
                        false,
                    )))],
                },
                values: vec![string_node("gold-perk")],
            }],
            default: None,
            span: Span::default(),
        };
        assert_eq!(select_branch(&cond, &mut ctx).unwrap(), None);
    }

    #[test]
    fn negated_atom_flips_result() {
        let (mut env, methods, classes) = ctx_pieces();
        env.define_pair("tier", Value::String("gold".to_string())).unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        let a = atom("tier", ConditionOp::Eq, vec![string_node("gold")], true);
        assert!(!evaluate_condition(&a, &mut ctx).unwrap());
    }

    #[test]
    fn numeric_ordering_compares_numerically_not_lexicographically() {
        let (mut env, methods, classes) = ctx_pieces();
        env.define_pair("age", Value::Number(Number::Int(9))).unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        let a = atom(
            "age",
            ConditionOp::Lt,
            vec![crate::ast::ParseNode::Number("10".to_string(), Span::default())],
            false,
        );
        assert!(evaluate_condition(&a, &mut ctx).unwrap());
    }

    #[test]
    fn left_fold_has_no_and_or_precedence() {
        let (mut env, methods, classes) = ctx_pieces();
        env.define_pair("a", Value::True).unwrap();
        env.define_pair("b", Value::False).unwrap();
        env.define_pair("c", Value::True).unwrap();
        let hook = crate::transform::identity_hook;
        let mut ctx = EvalContext {
            env: &mut env,
            methods: &methods,
            classes: &classes,
            punycode: &hook,
        };
        // a=true | b=true & c=true, folded strictly left to right:
        // ((a=true) | (b=true)) & (c=true) == (true | false) & true == true
        let test = ConditionTestNode {
            terms: vec![
                (BoolJoin::And, false, Subcondition::Condition(atom("a", ConditionOp::Eq, vec![bool_node(true)], false))),
                (BoolJoin::Or, false, Subcondition::Condition(atom("b", ConditionOp::Eq, vec![bool_node(true)], false))),
                (BoolJoin::And, false, Subcondition::Condition(atom("c", ConditionOp::Eq, vec![bool_node(true)], false))),
            ],
        };
        assert!(evaluate_test(&test, &mut ctx).unwrap());
    }
}
