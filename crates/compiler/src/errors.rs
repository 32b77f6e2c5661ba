// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use thiserror::Error;

/// Everything that can abort the compilation of a single verb body.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CompileError {
    #[error("Unexpected character {character:?} @ {line}/{column}")]
    LexError {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Failure to parse string: {0}")]
    StringLexError(String),
    #[error("Failure to parse program @ {line}/{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        context: String,
        message: String,
    },
    #[error("Length marker `$` used outside of an index or range @ {line}/{column}")]
    LengthOutsideIndex { line: usize, column: usize },
    #[error("Could not find loop with id: {0}")]
    UnknownLoopLabel(String),
    #[error("`{0}` used outside of a loop")]
    LoopControlOutsideLoop(String),
    #[error("Invalid l-value for assignment @ {line}/{column}")]
    InvalidAssignment { line: usize, column: usize },
    #[error("No exception category for error code: {0}")]
    UnmappedErrorCode(String),
}

impl CompileError {
    /// Source position of the error, where one is known.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            CompileError::LexError { line, column, .. }
            | CompileError::ParseError { line, column, .. }
            | CompileError::LengthOutsideIndex { line, column }
            | CompileError::InvalidAssignment { line, column } => Some((*line, *column)),
            _ => None,
        }
    }
}
