//! Reference concrete parser: MODL source text → `ParseTree`, built on the
//! `grammar.pest` rules. Grounded on the teacher's `syntax/parser.rs`
//! (`#[derive(Parser)] #[grammar = "..."] struct _Parser;`, `Rule::program`
//! entry point, recursive `build_ast_node`-style tree walk).

use crate::ast::{ParseNode, ParseTree, Span};
use crate::{err_ctx, ModlError};
use pest::iterators::Pair as PestPair;
use pest::Parser as PestParserTrait;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct ModlGrammar;

/// The parser collaborator contract from `spec.md` §6: `parse(text) -> ParseTree`.
pub trait Parser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ParseTree, ModlError>;
}

/// Default `Parser` backed by `grammar.pest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PestParser;

impl PestParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for PestParser {
    fn parse(&self, text: &str) -> Result<ParseTree, ModlError> {
        let mut pairs = ModlGrammar::parse(Rule::document, text).map_err(|e| {
            err_ctx!(Parse, Span::default(), message: e.to_string())
        })?;
        let document = pairs.next().expect("grammar guarantees a document pair");

        let mut structures = Vec::new();
        for item in document.into_inner() {
            match item.as_rule() {
                Rule::structure => structures.push(build_structure(item)?),
                Rule::EOI => {}
                other => {
                    return Err(err_ctx!(
                        Parse,
                        Span::default(),
                        message: format!("unexpected top-level rule: {other:?}")
                    ));
                }
            }
        }
        Ok(ParseTree::new(structures))
    }
}

fn span_of(pair: &PestPair<Rule>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

fn build_structure(pair: PestPair<Rule>) -> Result<ParseNode, ModlError> {
    let inner = pair.into_inner().next().expect("structure wraps exactly one pair rule");
    build_pair(inner)
}

fn build_pair(pair: PestPair<Rule>) -> Result<ParseNode, ModlError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let key = inner.next().expect("pair rule guarantees a key").as_str().to_string();
    let value_pair = inner.next().expect("pair rule guarantees a value");
    let value = build_value(value_pair)?;
    Ok(ParseNode::Pair(key, Box::new(value), span))
}

fn build_value(pair: PestPair<Rule>) -> Result<ParseNode, ModlError> {
    let span = span_of(&pair);
    let inner = pair.into_inner().next().expect("value rule guarantees exactly one alternative");
    match inner.as_rule() {
        Rule::map => build_map(inner),
        Rule::bracket_array => build_bracket_array(inner),
        Rule::colon_array => build_colon_array(inner),
        Rule::scalar => build_scalar(inner),
        other => Err(err_ctx!(Parse, span, message: format!("unexpected value rule: {other:?}"))),
    }
}

fn build_map(pair: PestPair<Rule>) -> Result<ParseNode, ModlError> {
    let span = span_of(&pair);
    let mut pairs = Vec::new();
    for item in pair.into_inner() {
        pairs.push(build_pair(item)?);
    }
    Ok(ParseNode::Map(pairs, span))
}

fn build_bracket_array(pair: PestPair<Rule>) -> Result<ParseNode, ModlError> {
    let span = span_of(&pair);
    let mut slots = Vec::new();
    for item in pair.into_inner() {
        let inner = item.into_inner().next().expect("bracket_item wraps exactly one alternative");
        slots.push(Some(match inner.as_rule() {
            Rule::map => build_map(inner)?,
            Rule::colon_array => build_colon_array(inner)?,
            Rule::scalar => build_scalar(inner)?,
            other => {
                return Err(err_ctx!(Parse, span, message: format!("unexpected bracket item rule: {other:?}")));
            }
        }));
    }
    Ok(ParseNode::Array(slots, span))
}

fn build_colon_array(pair: PestPair<Rule>) -> Result<ParseNode, ModlError> {
    let span = span_of(&pair);
    let mut slots = Vec::new();
    for slot in pair.into_inner() {
        match slot.into_inner().next() {
            None => slots.push(None),
            Some(inner) => slots.push(Some(match inner.as_rule() {
                Rule::map => build_map(inner)?,
                Rule::scalar => build_scalar(inner)?,
                other => {
                    return Err(err_ctx!(Parse, span, message: format!("unexpected colon slot rule: {other:?}")));
                }
            })),
        }
    }
    Ok(ParseNode::Array(slots, span))
}

fn build_scalar(pair: PestPair<Rule>) -> Result<ParseNode, ModlError> {
    let span = span_of(&pair);
    let inner = pair.into_inner().next().expect("scalar rule guarantees exactly one alternative");
    Ok(match inner.as_rule() {
        Rule::number => ParseNode::Number(inner.as_str().to_string(), span),
        Rule::boolean => ParseNode::Bool(inner.as_str().eq_ignore_ascii_case("true"), span),
        Rule::null_lit => ParseNode::Null(span),
        Rule::string => ParseNode::String(inner.as_str().to_string(), span),
        other => {
            return Err(err_ctx!(Parse, span, message: format!("unexpected scalar rule: {other:?}")));
        }
    })
}
