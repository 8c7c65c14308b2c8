//! Compiler error types.
//!
//! Hand-written `Display`/`Error` impls, matching `ember-core`'s own
//! error shape rather than reaching for `thiserror`.

use ember_parser::ast::Pos;
use ember_parser::parser::ParseError;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum CompileError {
    Parse(ParseError),
    UnimplementedSwitch(Pos),
    SymbolTableFull(Pos),
    ConstantPoolFull(Pos),
    JumpTooLarge(Pos),
    TooManyArguments(Pos),
    Import { path: String, pos: Pos, source: ImportFailure },
}

#[derive(Debug)]
pub enum ImportFailure {
    Io(io::Error),
    Parse(Vec<ParseError>),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::UnimplementedSwitch(pos) => write!(
                f,
                "{}:{}: 'switch' is not implemented at the code generation layer",
                pos.line, pos.column
            ),
            CompileError::SymbolTableFull(pos) => {
                write!(f, "{}:{}: too many distinct identifiers in this compilation", pos.line, pos.column)
            }
            CompileError::ConstantPoolFull(pos) => {
                write!(f, "{}:{}: too many constants in this compilation", pos.line, pos.column)
            }
            CompileError::JumpTooLarge(pos) => {
                write!(f, "{}:{}: control-flow body is too large to jump over", pos.line, pos.column)
            }
            CompileError::TooManyArguments(pos) => {
                write!(f, "{}:{}: too many arguments in call (max 255)", pos.line, pos.column)
            }
            CompileError::Import { path, pos, source } => match source {
                ImportFailure::Io(e) => {
                    write!(f, "{}:{}: could not import '{path}': {e}", pos.line, pos.column)
                }
                ImportFailure::Parse(errs) => {
                    write!(f, "{}:{}: could not parse imported file '{path}':", pos.line, pos.column)?;
                    for e in errs {
                        write!(f, "\n  {e}")?;
                    }
                    Ok(())
                }
            },
        }
    }
}

impl std::error::Error for CompileError {}
