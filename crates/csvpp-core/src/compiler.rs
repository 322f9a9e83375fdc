//! Compilation entry point: runs every phase in order.
//!
//! 1. parse the code section into a [`Scope`]
//! 2. inject `key_values`, then resolve static variables in dependency order
//! 3. parse the spreadsheet section
//! 4. check that at most one row expands without a bound
//! 5. expand rows
//! 6. bind `[[var=]]` modifiers
//! 7. resolve every cell
//!
//! This is the only place errors from the phases are given file context;
//! nothing is caught and continued.

use log::{debug, info};
use std::path::Path;

use csvpp_engine::engine::{EngineError, Entity, Scope, line_of, parse_code_section};

use crate::error::{CompileError, Result};
use crate::options::Options;
use crate::source::SourceCode;
use crate::template::Template;

/// Compile a source file that has already been read.
pub fn compile(source: &SourceCode, options: &Options) -> Result<Template> {
    let mut scope = build_scope(source, options)?;

    let mut template = Template::parse(source, options)?;
    debug!("parsed {} rows", template.rows().len());

    template.validate_infinite_expands()?;
    template.expand_rows()?;
    debug!("expanded to {} rows", template.rows().len());

    template.bind_variables(&mut scope)?;
    template.resolve_cells(&scope)?;

    if options.verbose {
        info!("{}", template.summary());
    }
    Ok(template)
}

/// Compile source text held in memory.
pub fn compile_str(filename: impl AsRef<Path>, input: &str, options: &Options) -> Result<Template> {
    compile(&SourceCode::new(filename.as_ref(), input), options)
}

/// Read and compile a source file.
pub fn compile_file(path: &Path, options: &Options) -> Result<Template> {
    let source = SourceCode::read(path)?;
    compile(&source, options)
}

/// Parse the code section and resolve its variables. `key_values` replace
/// code-section variables of the same name before anything is resolved.
pub fn build_scope(source: &SourceCode, options: &Options) -> Result<Scope> {
    let mut scope = Scope::new();

    if let Some(code) = &source.code_section {
        let section = parse_code_section(code).map_err(|e| code_section_error(source, code, e))?;
        debug!(
            "code section defines {} variables and {} functions",
            section.variables.len(),
            section.functions.len()
        );
        for function in section.functions {
            let id = function.id.clone();
            scope.define_function(&id, function);
        }
        for (id, value) in section.variables {
            scope.define_variable(&id, value);
        }
    }

    for (id, value) in &options.key_values {
        debug!("key value {} overrides any definition", id);
        scope.define_variable(id, Entity::String(value.clone()));
    }

    scope
        .resolve_variables()
        .map_err(|source_error| CompileError::Definitions {
            filename: source.filename.clone(),
            source: source_error,
        })?;
    Ok(scope)
}

fn code_section_error(source: &SourceCode, code: &str, error: EngineError) -> CompileError {
    let line = match &error {
        EngineError::Syntax { offset, .. } => line_of(code, *offset),
        _ => 1,
    };
    CompileError::CodeSection {
        filename: source.filename.clone(),
        line,
        source: error,
    }
}
