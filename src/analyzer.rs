use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use crate::{
    ast::{File, Node},
    token::Location,
};

/// Checks that every variable names an import and that every import is used.
pub fn analyze(file: &File) -> Result<(), Error> {
    let mut analyzer = Analyzer {
        scope: IndexMap::with_capacity(file.imports.len()),
    };
    file.inspect(&mut |node| analyzer.visit(node))?;
    analyzer.finish()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{}: undefined variable `{name}`", .location.start)]
    UndefinedVariable { name: Box<str>, location: Location },
    #[error("{}", UnusedList(.0))]
    UnusedVariables(Vec<Unused>),
}

/// An import which no variable refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unused {
    pub name: Box<str>,
    pub location: Location,
}

impl fmt::Display for Unused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: unused variable `{}`", self.location.start, self.name)
    }
}

struct UnusedList<'a>(&'a [Unused]);

impl fmt::Display for UnusedList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, unused) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{unused}")?;
        }
        Ok(())
    }
}

struct Usage {
    count: usize,
    location: Location,
}

struct Analyzer {
    scope: IndexMap<Box<str>, Usage>,
}

impl Analyzer {
    fn visit(&mut self, node: Node<'_>) -> Result<(), Error> {
        match node {
            Node::Import(import) => {
                let usage = Usage {
                    count: 0,
                    location: import.name.location,
                };
                if self.scope.insert(import.name.name.clone(), usage).is_some() {
                    warn!(name = %import.name.name, "import name declared twice, keeping the last one");
                }
            }
            Node::Var(var) => {
                let head = var.head();
                let Some(usage) = self.scope.get_mut(&head.name) else {
                    return Err(Error::UndefinedVariable {
                        name: head.name.clone(),
                        location: head.location,
                    });
                };
                usage.count += 1;
            }
            _ => (),
        }
        Ok(())
    }

    fn finish(self) -> Result<(), Error> {
        let unused: Vec<_> = self
            .scope
            .into_iter()
            .filter(|(_, usage)| usage.count == 0)
            .map(|(name, usage)| Unused {
                name,
                location: usage.location,
            })
            .collect();
        if unused.is_empty() {
            Ok(())
        } else {
            Err(Error::UnusedVariables(unused))
        }
    }
}
