//! Error aggregation: the two errors that can stop grammar compilation are gathered into
//! one type so the top-level `compile` entry point has a single failure mode.

use std::fmt::{self, Display, Formatter};

use crate::grammar::GrammarError;
use crate::table::TableBuildError;

/// Everything that can prevent `compile` from producing a usable [`crate::table::ParsingTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Grammar(GrammarError),
    TableBuild(TableBuildError),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Grammar(e) => Display::fmt(e, f),
            CompileError::TableBuild(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<GrammarError> for CompileError {
    fn from(e: GrammarError) -> Self {
        CompileError::Grammar(e)
    }
}

impl From<TableBuildError> for CompileError {
    fn from(e: TableBuildError) -> Self {
        CompileError::TableBuild(e)
    }
}
