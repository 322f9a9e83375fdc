//! csvpp-core - compiles csv++ source files into spreadsheet rows.

pub mod compiler;
pub mod error;
pub mod modifier;
pub mod options;
pub mod source;
pub mod storage;
pub mod template;

pub use compiler::{compile, compile_file, compile_str};
pub use error::{CompileError, Result};
pub use options::{Options, parse_key_values};
pub use source::SourceCode;
pub use template::{Cell, Phase, Row, Template};

pub use csvpp_engine::engine::{CellRef, EngineError, Entity, ErrorKind, Position};
