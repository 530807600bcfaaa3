use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{
    analyzer,
    ast::{File, FileWithPath},
    cursor::TokenCursor,
    error::{Error, Result},
    lexer, linker, parser,
    resolved::Object,
    source::Source,
};

/// Drives the front passes over every file reachable from a root file, then
/// hands the whole set to the linker.
pub struct Processor<'s> {
    source: &'s dyn Source,
    ast_by_path: HashMap<PathBuf, FileWithPath>,
}

impl<'s> Processor<'s> {
    pub fn new(source: &'s dyn Source) -> Processor<'s> {
        Processor {
            source,
            ast_by_path: HashMap::new(),
        }
    }

    /// Processes the file at `path` and every file it imports, returning the
    /// resolved root object.
    ///
    /// Files already processed by this instance are not read again.
    pub fn process(&mut self, path: impl AsRef<Path>) -> Result<Object> {
        let raw = path.as_ref();
        let root = self
            .source
            .abs_path(Path::new(""), &raw.to_string_lossy())
            .map_err(|source| Error::Read {
                path: raw.to_owned(),
                source,
            })?;

        let mut stack = Vec::with_capacity(8);
        self.process_file(&root, &mut stack)?;

        let env = self.source.env();
        let mut linker = linker::Linker::new(&self.ast_by_path, &env);
        let Some(root_file) = self.ast_by_path.get(&root) else {
            unreachable!("root file was just processed");
        };
        let object = linker.link(root_file)?;
        drop(linker);
        Ok(Rc::unwrap_or_clone(object))
    }

    /// The absolute paths of every file processed so far.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.ast_by_path.keys().map(PathBuf::as_path)
    }

    /// `stack` holds the files on the path from the root to the current
    /// file. Sibling imports never see each other, so a diamond is not a
    /// cycle.
    fn process_file(&mut self, path: &Path, stack: &mut Vec<PathBuf>) -> Result<()> {
        if self.ast_by_path.contains_key(path) {
            trace!(path = %path.display(), "already processed");
            return Ok(());
        }
        if stack.iter().any(|p| p == path) {
            return Err(Error::ImportCycle {
                path: path.to_owned(),
            });
        }
        debug!(path = %path.display(), "processing file");

        let bytes = self.source.read_file(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        let src = String::from_utf8(bytes).map_err(|source| Error::Encoding {
            path: path.to_owned(),
            source,
        })?;

        let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
        lexer::lex(&src, &mut tokens).map_err(|source| Error::Lex {
            path: path.to_owned(),
            source,
        })?;
        trace!(path = %path.display(), tokens = tokens.len(), "lexed");

        let file = parser::parse(&mut TokenCursor::new(tokens)).map_err(|source| {
            Error::Parse {
                path: path.to_owned(),
                source,
            }
        })?;
        analyzer::analyze(&file).map_err(|source| Error::Analyze {
            path: path.to_owned(),
            source,
        })?;

        stack.push(path.to_owned());
        let import_paths = self.process_imports(path, &file, stack);
        stack.pop();
        let import_paths = import_paths?;

        self.ast_by_path.insert(
            path.to_owned(),
            FileWithPath {
                file,
                path: path.to_owned(),
                import_paths,
            },
        );
        Ok(())
    }

    /// Processes the imports of the file at `path`, returning where each of
    /// them points.
    fn process_imports(
        &mut self,
        path: &Path,
        file: &File,
        stack: &mut Vec<PathBuf>,
    ) -> Result<HashMap<Box<str>, PathBuf>> {
        let base_dir = path.parent().unwrap_or(Path::new("/"));
        let mut import_paths = HashMap::with_capacity(file.imports.len());
        for import in &file.imports {
            let raw = &import.path.value;
            let import_path = self
                .source
                .abs_path(base_dir, raw)
                .map_err(|source| Error::Read {
                    path: base_dir.join(&**raw),
                    source,
                })?;
            debug!(from = %path.display(), to = %import_path.display(), "import");
            self.process_file(&import_path, stack)
                .map_err(|source| Error::Import {
                    path: path.to_owned(),
                    import: raw.clone(),
                    source: Box::new(source),
                })?;
            import_paths.insert(raw.clone(), import_path);
        }
        Ok(import_paths)
    }
}
