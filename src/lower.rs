//! Lowering (`spec.md` §4.B): a deterministic, side-effect-free walk from
//! the (collaborator) concrete parser's `ParseTree` into the raw `Value`
//! tree the rest of the evaluator operates on. No references are resolved
//! and no directives are interpreted here — that is `crate::eval`'s and
//! `crate::driver`'s job.
//!
//! A `Map`'s children are ordinarily `Value::Pair`s, but a conditional
//! nested directly in map position (`ConditionalFlavor::Map`) cannot be
//! represented as a keyed pair until it is evaluated and a branch is
//! chosen. We carry it through as a sentinel `Pair` with an empty key and
//! a `Value::Conditional` payload; `crate::eval` recognises and splices it
//! before any duplicate-key check runs, so no *other* code ever sees an
//! empty-keyed pair.

use crate::ast::{ParseNode, ParseTree};
use crate::value::{Number, Pair, Value};
use crate::{err_ctx, ModlError};

/// Sentinel key marking a `Pair` that actually holds an unevaluated
/// `ConditionalFlavor::Map` conditional, to be spliced by `crate::eval`.
pub const MAP_CONDITIONAL_SENTINEL: &str = "";

/// Lowers a full parse tree into the raw document value: an `Array` of its
/// top-level structures, each either a `Value::Pair` or (for a bare
/// top-level conditional) a `Value::Conditional`.
pub fn lower(tree: &ParseTree) -> Result<Value, ModlError> {
    Ok(Value::Array(lower_nodes(&tree.structures)?))
}

/// Lowers a sequence of parse nodes in order. Exposed so `crate::conditional`
/// can lower a chosen branch's contributed structures lazily, at the point
/// the branch is actually selected, rather than eagerly lowering every
/// branch of every conditional up front.
pub fn lower_nodes(nodes: &[ParseNode]) -> Result<Vec<Value>, ModlError> {
    nodes.iter().map(lower_node).collect()
}

pub fn lower_node(node: &ParseNode) -> Result<Value, ModlError> {
    match node {
        ParseNode::String(text, _) => Ok(Value::String(crate::escape::decode(text))),
        ParseNode::Number(text, span) => Number::parse(text).map(Value::Number).ok_or_else(|| {
            err_ctx!(MalformedInput, *span, message: format!("not a valid number: `{text}`"))
        }),
        ParseNode::Bool(true, _) => Ok(Value::True),
        ParseNode::Bool(false, _) => Ok(Value::False),
        ParseNode::Null(_) => Ok(Value::Null),
        ParseNode::Pair(key, inner, _) => {
            let value = lower_node(inner)?;
            Ok(Value::Pair(Box::new(Pair::with_value(key.clone(), value))))
        }
        ParseNode::Map(items, span) => {
            let mut pairs = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    ParseNode::Pair(key, inner, _) => {
                        pairs.push(Pair::with_value(key.clone(), lower_node(inner)?));
                    }
                    ParseNode::Conditional(cond) => {
                        pairs.push(Pair::with_value(
                            MAP_CONDITIONAL_SENTINEL,
                            Value::Conditional(Box::new(cond.clone())),
                        ));
                    }
                    other => {
                        return Err(err_ctx!(
                            MalformedInput,
                            *span,
                            message: format!("expected a pair or conditional in map position, found {}", node_kind(other))
                        ));
                    }
                }
            }
            Ok(Value::Map(pairs))
        }
        ParseNode::Array(slots, _) => {
            let mut values = Vec::with_capacity(slots.len());
            for slot in slots {
                match slot {
                    Some(n) => values.push(lower_node(n)?),
                    None => values.push(Value::Null),
                }
            }
            Ok(Value::Array(values))
        }
        ParseNode::Conditional(cond) => Ok(Value::Conditional(Box::new(cond.clone()))),
    }
}

fn node_kind(node: &ParseNode) -> &'static str {
    match node {
        ParseNode::String(..) => "String",
        ParseNode::Number(..) => "Number",
        ParseNode::Bool(..) => "Bool",
        ParseNode::Null(_) => "Null",
        ParseNode::Pair(..) => "Pair",
        ParseNode::Map(..) => "Map",
        ParseNode::Array(..) => "Array",
        ParseNode::Conditional(_) => "Conditional",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn sp() -> Span {
        Span::default()
    }

    #[test]
    fn lowers_scalars() {
        assert_eq!(
            lower_node(&ParseNode::String("a~\"b".into(), sp())).unwrap(),
            Value::String("a\"b".to_string())
        );
        assert_eq!(
            lower_node(&ParseNode::Number("42".into(), sp())).unwrap(),
            Value::Number(Number::Int(42))
        );
        assert_eq!(lower_node(&ParseNode::Bool(true, sp())).unwrap(), Value::True);
        assert_eq!(lower_node(&ParseNode::Null(sp())).unwrap(), Value::Null);
    }

    #[test]
    fn lowers_pair_and_array_with_null_slots() {
        let node = ParseNode::Pair(
            "fav".to_string(),
            Box::new(ParseNode::Array(
                vec![
                    Some(ParseNode::String("red".into(), sp())),
                    None,
                    Some(ParseNode::String("blue".into(), sp())),
                ],
                sp(),
            )),
            sp(),
        );
        let Value::Pair(pair) = lower_node(&node).unwrap() else {
            panic!("expected Pair");
        };
        assert_eq!(pair.key, "fav");
        assert_eq!(
            *pair.value.unwrap(),
            Value::Array(vec![
                Value::String("red".to_string()),
                Value::Null,
                Value::String("blue".to_string()),
            ])
        );
    }

    #[test]
    fn invalid_number_text_is_malformed_input() {
        let err = lower_node(&ParseNode::Number("4x2".into(), sp()));
        assert!(matches!(err, Err(ModlError::MalformedInput { .. })));
    }

    #[test]
    fn map_conditional_is_wrapped_in_sentinel_pair() {
        use crate::ast::{ConditionalFlavor, ConditionalNode};
        let cond = ConditionalNode {
            flavor: ConditionalFlavor::Map,
            branches: Vec::new(),
            default: None,
            span: sp(),
        };
        let map = ParseNode::Map(vec![ParseNode::Conditional(cond)], sp());
        let Value::Map(pairs) = lower_node(&map).unwrap() else {
            panic!("expected Map");
        };
        assert_eq!(pairs[0].key, MAP_CONDITIONAL_SENTINEL);
        assert!(matches!(*pairs[0].value.as_ref().unwrap().as_ref(), Value::Conditional(_)));
    }
}
