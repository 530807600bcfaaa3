use std::{io, path::PathBuf, string::FromUtf8Error};

use crate::{analyzer, bind, lexer, linker, parser};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure of the pipeline, annotated with the file and the pass it
/// happened in.
///
/// Failures inside imported files are nested in [`Error::Import`], so the
/// [`source`](std::error::Error::source) chain follows the imports down to
/// the failing file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{} is not valid UTF-8", .path.display())]
    Encoding {
        path: PathBuf,
        source: FromUtf8Error,
    },

    #[error("failed to lex {}", .path.display())]
    Lex {
        path: PathBuf,
        source: lexer::Error,
    },

    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        source: parser::Error,
    },

    #[error("failed to analyze {}", .path.display())]
    Analyze {
        path: PathBuf,
        source: analyzer::Error,
    },

    #[error("{}: failed to import {import}", .path.display())]
    Import {
        /// The importing file.
        path: PathBuf,
        /// The import path as written in the importing file.
        import: Box<str>,
        source: Box<Error>,
    },

    #[error("import cycle detected at {}", .path.display())]
    ImportCycle { path: PathBuf },

    #[error("failed to link {}", .path.display())]
    Link {
        path: PathBuf,
        source: linker::Error,
    },

    #[error("failed to bind the resolved tree")]
    Bind(#[from] bind::Error),

    #[error("failed to encode JSON")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Skips the import chain, returning the error of the file which actually
    /// failed.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Import { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Formats the error with all of its sources, joined by `: `.
    pub fn chain(&self) -> String {
        let mut buf = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(error) = source {
            buf.push_str(": ");
            buf.push_str(&error.to_string());
            source = error.source();
        }
        buf
    }
}
