//! Error types for the csv++ compiler.

use std::path::PathBuf;

use thiserror::Error;

use csvpp_engine::engine::{EngineError, ErrorKind};

/// Errors that can occur while compiling a source file.
///
/// Row and cell indices are stored 0-based and reported 1-based.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}:{line}: {source}", .filename.display())]
    CodeSection {
        filename: PathBuf,
        line: usize,
        #[source]
        source: EngineError,
    },

    #[error("{}: in the code section: {source}", .filename.display())]
    Definitions {
        filename: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("{}:{line}: row {}, cell {}: {source}", .filename.display(), .row + 1, .cell + 1)]
    Cell {
        filename: PathBuf,
        line: usize,
        row: usize,
        cell: usize,
        #[source]
        source: EngineError,
    },

    #[error("{}:{line}: row {}, cell {}: {message}", .filename.display(), .row + 1, .cell + 1)]
    Modifier {
        filename: PathBuf,
        line: usize,
        row: usize,
        cell: usize,
        message: String,
    },

    #[error("Invalid option: {0}")]
    Options(String),

    #[error("Compiler error: {0}")]
    Compiler(String),
}

impl CompileError {
    /// Broad category, for reporting. I/O and option errors count as
    /// compiler errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::CodeSection { source, .. }
            | CompileError::Definitions { source, .. }
            | CompileError::Cell { source, .. } => source.kind(),
            CompileError::Modifier { .. } => ErrorKind::Modifier,
            CompileError::Io(_) | CompileError::Options(_) | CompileError::Compiler(_) => {
                ErrorKind::Compiler
            }
        }
    }

    /// The wrapped engine error, if any.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            CompileError::CodeSection { source, .. }
            | CompileError::Definitions { source, .. }
            | CompileError::Cell { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
