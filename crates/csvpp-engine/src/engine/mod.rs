//! Compile-time engine API.
//!
//! This module provides everything needed to turn csv++ source text into
//! resolved formula trees:
//!
//! - [`CellRef`] - A1 reference parsing (A1 notation ↔ row/col indices)
//! - [`Entity`], [`Position`] - The AST and the position it is evaluated at
//! - [`tokenize`], [`parse_code_section`], [`parse_formula`] - Tokenizer and grammars
//! - [`Scope`] - Variable and function definitions
//! - [`DependencyGraph`], [`topological_sort`] - Static variable ordering
//! - [`resolve`] - Per-cell reference resolution

mod cell_ref;
mod cycle;
mod deps;
mod entity;
mod error;
mod lexer;
mod parser;
mod resolve;
mod scope;
mod token;

pub use cell_ref::CellRef;
pub use cycle::topological_sort;
pub use deps::{DependencyGraph, extract_variable_references};
pub use entity::{
    CellReference, Entity, ExpandScope, Function, FunctionCall, Position, RuntimeFn, RuntimeValue,
    UNARY_PRECEDENCE, format_number, infix_precedence,
};
pub use error::{EngineError, ErrorKind, Result};
pub use lexer::{Grammar, line_of, tokenize};
pub use parser::{CodeSection, Parser, parse_code_section, parse_formula};
pub use resolve::{MAX_PASSES, pending_references, resolve};
pub use scope::{FunctionLookup, Scope};
pub use token::{Token, TokenKind};
