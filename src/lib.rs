//! A configuration language with imports, spreads and environment
//! references, compiled into a single resolved tree.
//!
//! ```
//! use atmc::{source::MemorySource, Atmc};
//!
//! let source = MemorySource::new()
//!     .file("/app/common.atmc", "{ log: { level: \"info\", color: true } }")
//!     .file("/app/main.atmc", "common ./common.atmc { common..., log: { level: \"debug\" } }");
//!
//! let json = Atmc::new().with_source(source).json("/app/main.atmc").unwrap();
//! assert_eq!(json, br#"{"log":{"level":"debug","color":true}}"#);
//! ```

extern crate self as atmc;

use std::path::Path;

use tracing::debug;

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The analyzer checks variable definition and use within one file.
pub mod analyzer;

/// The processor reads every file reachable from the root and runs the passes
/// above on each of them.
pub mod processor;

/// The linker resolves variables, spreads and environment references across
/// files, producing the resolved tree.
pub mod linker;

pub mod ast;
pub mod bind;
pub mod cursor;
pub mod error;
pub mod resolved;
pub mod scanner;
pub mod source;
pub mod token;

pub mod util {
    pub mod fmt {
        pub mod tree;
    }
    #[cfg(test)]
    pub(crate) mod test_utils;
}

pub use atmc_derive::Record;
pub use error::{Error, Result};
pub use scanner::{Scan, Scanner};

use crate::{processor::Processor, source::Source};

#[derive(Debug, Clone)]
pub struct Options {
    /// Which `#[tag(..)]` entry names the key of a record field.
    pub field_tag_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            field_tag_name: bind::DEFAULT_FIELD_TAG.to_owned(),
        }
    }
}

/// The compiler entry point.
pub struct Atmc {
    options: Options,
    source: Box<dyn Source>,
}

impl Default for Atmc {
    fn default() -> Self {
        Atmc::new()
    }
}

impl Atmc {
    /// Reads from the filesystem and the process environment, with the
    /// default options.
    pub fn new() -> Atmc {
        Atmc {
            options: Options::default(),
            source: Box::new(source::OsSource),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Atmc {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_field_tag(mut self, field_tag_name: impl Into<String>) -> Atmc {
        self.options.field_tag_name = field_tag_name.into();
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Source + 'static) -> Atmc {
        self.source = Box::new(source);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compiles the file at `path` and everything it imports.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Scanner> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading");
        let resolved = Processor::new(&*self.source).process(path)?;
        Ok(Scanner::new(resolved, &self.options.field_tag_name))
    }

    /// Compiles the file at `path` and renders the result as JSON, keeping
    /// member order.
    pub fn json(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let scanner = self.load(path)?;
        let mut map = serde_json::Map::new();
        scanner.scan(&mut map)?;
        Ok(serde_json::to_vec(&map)?)
    }
}
