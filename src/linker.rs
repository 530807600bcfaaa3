use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{
    ast::{self, Entry, FileWithPath},
    error::Error as CrateError,
    resolved::{Expr, Object},
    token::Location,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{}: variable not found, expected: {path}", .location.start)]
    NotFoundVariable { path: String, location: Location },
    #[error("{}: unexpected node type, expected: {expected}, found: {found}", .location.start)]
    UnexpectedNodeType {
        expected: &'static str,
        found: &'static str,
        location: Location,
    },
    /// The import was never handed to the linker.
    #[error("{}: import {import} was not processed", .location.start)]
    MissingImport { import: Box<str>, location: Location },
}

/// Turns processed files into resolved objects.
///
/// Each file is linked at most once per linker; later imports of the same
/// file share the first result.
pub struct Linker<'a> {
    ast_by_path: &'a HashMap<PathBuf, FileWithPath>,
    env: &'a HashMap<String, String>,
    linked_by_path: HashMap<PathBuf, Rc<Object>>,
}

impl<'a> Linker<'a> {
    pub fn new(
        ast_by_path: &'a HashMap<PathBuf, FileWithPath>,
        env: &'a HashMap<String, String>,
    ) -> Linker<'a> {
        Linker {
            ast_by_path,
            env,
            linked_by_path: HashMap::with_capacity(ast_by_path.len()),
        }
    }

    /// Links the file and, first, every file it imports.
    pub fn link(&mut self, file: &FileWithPath) -> Result<Rc<Object>, CrateError> {
        if let Some(linked) = self.linked_by_path.get(&file.path) {
            debug!(path = %file.path.display(), "link cache hit");
            return Ok(Rc::clone(linked));
        }
        trace!(path = %file.path.display(), "linking");

        let mut scope = HashMap::with_capacity(file.file.imports.len());
        for import in &file.file.imports {
            let target = self
                .import_target(file, import)
                .map_err(|source| link_error(&file.path, source))?;
            let linked = self.link(target).map_err(|source| CrateError::Import {
                path: file.path.clone(),
                import: import.path.value.clone(),
                source: Box::new(source),
            })?;
            scope.insert(import.name.name.clone(), linked);
        }

        let scope = Scope {
            env: self.env,
            vars: scope,
        };
        let object = scope
            .link_object(&file.file.object)
            .map_err(|source| link_error(&file.path, source))?;

        let object = Rc::new(object);
        self.linked_by_path.insert(file.path.clone(), Rc::clone(&object));
        Ok(object)
    }

    fn import_target(
        &self,
        file: &FileWithPath,
        import: &ast::Import,
    ) -> Result<&'a FileWithPath, Error> {
        let ast_by_path = self.ast_by_path;
        file.import_path(&import.path.value)
            .and_then(|path| ast_by_path.get(path))
            .ok_or_else(|| Error::MissingImport {
                import: import.path.value.clone(),
                location: import.location(),
            })
    }
}

fn link_error(path: &Path, source: Error) -> CrateError {
    CrateError::Link {
        path: path.to_owned(),
        source,
    }
}

/// The names visible while linking one file.
struct Scope<'a> {
    env: &'a HashMap<String, String>,
    vars: HashMap<Box<str>, Rc<Object>>,
}

impl Scope<'_> {
    fn link_object(&self, object: &ast::Object) -> Result<Object, Error> {
        let mut linked = Object::with_capacity(object.entries.len());
        for entry in &object.entries {
            match entry {
                Entry::Kv(kv) => {
                    let value = self.link_expr(&kv.value)?;
                    let key = &*kv.key.name;
                    match linked.get_mut(key) {
                        Some(existing) => merge_into(existing, value),
                        None => {
                            linked.insert(key.to_owned(), value);
                        }
                    }
                }
                Entry::Spread(spread) => match self.resolve_var(&spread.var)? {
                    Expr::Object(members) => {
                        for (key, value) in members {
                            linked.insert(key, value);
                        }
                    }
                    other => return Err(unexpected("Object", &other, &spread.var)),
                },
            }
        }
        Ok(linked)
    }

    fn link_expr(&self, expr: &ast::Expr) -> Result<Expr, Error> {
        let linked = match expr {
            ast::Expr::Object(object) => Expr::Object(self.link_object(object)?),
            ast::Expr::Array(array) => Expr::Array(self.link_array(array)?),
            ast::Expr::Var(var) => self.resolve_var(var)?,
            ast::Expr::Env(env) => {
                let value = self.env.get(&*env.name.name).cloned();
                if value.is_none() {
                    trace!(name = %env.name.name, "environment variable is not set");
                }
                Expr::String(value.unwrap_or_default())
            }
            ast::Expr::Int(lit) => Expr::Int(lit.value),
            ast::Expr::Float(lit) => Expr::Float(lit.value),
            ast::Expr::String(lit) => Expr::String(lit.value.to_string()),
            ast::Expr::Bool(lit) => Expr::Bool(lit.value),
            // The parser only accepts spreads as entries or elements.
            ast::Expr::Spread(spread) => {
                return Err(Error::UnexpectedNodeType {
                    expected: "Expression",
                    found: "Spread",
                    location: spread.location,
                })
            }
        };
        Ok(linked)
    }

    fn link_array(&self, array: &ast::Array) -> Result<Vec<Expr>, Error> {
        let mut linked = Vec::with_capacity(array.elements.len());
        for element in &array.elements {
            if let ast::Expr::Spread(spread) = element {
                match self.resolve_var(&spread.var)? {
                    Expr::Array(elements) => linked.extend(elements),
                    other => return Err(unexpected("Array", &other, &spread.var)),
                }
            } else {
                linked.push(self.link_expr(element)?);
            }
        }
        Ok(linked)
    }

    /// Walks the variable path from the root object of the imported file.
    fn resolve_var(&self, var: &ast::Var) -> Result<Expr, Error> {
        let not_found = || Error::NotFoundVariable {
            path: var.dotted(),
            location: var.location(),
        };
        let head = var.head();
        let Some(root) = self.vars.get(&head.name) else {
            return Err(Error::NotFoundVariable {
                path: head.name.to_string(),
                location: head.location,
            });
        };

        let mut object: &Object = root;
        let mut value: Option<&Expr> = None;
        for ident in var.tail() {
            if let Some(prev) = value {
                let Expr::Object(inner) = prev else {
                    return Err(not_found());
                };
                object = inner;
            }
            value = Some(object.get(&*ident.name).ok_or_else(not_found)?);
        }

        Ok(match value {
            Some(value) => value.clone(),
            None => Expr::Object(object.clone()),
        })
    }
}

fn unexpected(expected: &'static str, found: &Expr, var: &ast::Var) -> Error {
    Error::UnexpectedNodeType {
        expected,
        found: found.kind(),
        location: var.location(),
    }
}

/// Merges `value` into `slot` when both are objects; otherwise `value`
/// replaces what the slot held.
fn merge_into(slot: &mut Expr, value: Expr) {
    match (slot, value) {
        (Expr::Object(old), Expr::Object(new)) => merge_objects(old, new),
        (slot, value) => *slot = value,
    }
}

fn merge_objects(into: &mut Object, from: Object) {
    for (key, value) in from {
        match into.get_mut(&key) {
            Some(existing) => merge_into(existing, value),
            None => {
                into.insert(key, value);
            }
        }
    }
}

/// Merges two objects. Members of `b` win on conflicts, except that two
/// objects under the same key are merged in turn. Keys keep the order in
/// which they were first seen.
pub fn merge(mut a: Object, b: Object) -> Object {
    merge_objects(&mut a, b);
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_utils::{object, tree_tests};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_is_recursive() {
        let a = object([
            ("x", Expr::Int(1)),
            (
                "nested",
                Expr::Object(object([("keep", Expr::Int(1)), ("over", Expr::Int(1))])),
            ),
        ]);
        let b = object([
            ("nested", Expr::Object(object([("over", Expr::Int(2)), ("new", Expr::Int(2))]))),
            ("y", Expr::Int(2)),
        ]);
        let expected = object([
            ("x", Expr::Int(1)),
            (
                "nested",
                Expr::Object(object([
                    ("keep", Expr::Int(1)),
                    ("over", Expr::Int(2)),
                    ("new", Expr::Int(2)),
                ])),
            ),
            ("y", Expr::Int(2)),
        ]);
        let merged = merge(a, b);
        assert_eq!(merged, expected);
        assert!(merged.keys().eq(["x", "nested", "y"]));
        let nested = merged["nested"].as_object().unwrap();
        assert!(nested.keys().eq(["keep", "over", "new"]));
    }

    #[test]
    fn test_merge_scalar_replaces_object() {
        let a = object([("k", Expr::Object(object([("x", Expr::Int(1))])))]);
        let b = object([("k", Expr::Int(2))]);
        assert_eq!(merge(a, b), object([("k", Expr::Int(2))]));
    }

    tree_tests!(
        use linker;

        fn test_import_and_used_data() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import.atmc {a: var1.c, b: var1.d}"),
                ("/home/user/import.atmc", "{c: 3, d: 4}"),
            ];
            let tree_ok = "
                object
                  a: int 3
                  b: int 4
            ";
        }

        fn test_nested_variable() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import.atmc {a: var1.c.nested1.nested2, b: var1.d}"),
                ("/home/user/import.atmc", "{c: {nested1: {nested2: [1, 2, 3]}}, d: 4}"),
            ];
            let tree_ok = "
                object
                  a: array
                    int 1
                    int 2
                    int 3
                  b: int 4
            ";
        }

        fn test_several_imports() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import1.atmc\nvar2 ./import2.atmc\n{ a: var1.c, b: var2.i }"),
                ("/home/user/import1.atmc", "{c: 3, d: 4}"),
                ("/home/user/import2.atmc", "{i: 5, f: 6}"),
            ];
            let tree_ok = "
                object
                  a: int 3
                  b: int 5
            ";
        }

        fn test_env() {
            let files = &[
                ("/home/user/config.atmc", "{ object1: { password: $password, missing: $NOPE } }"),
            ];
            let tree_ok = r#"
                object
                  object1: object
                    password: string "qwerty"
                    missing: string ""
            "#;
        }

        fn test_object_spread_appends() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import1.atmc { a: var1.c, b: var1.d, var1... }"),
                ("/home/user/import1.atmc", "{c: 3, d: 4}"),
            ];
            let tree_ok = "
                object
                  a: int 3
                  b: int 4
                  c: int 3
                  d: int 4
            ";
        }

        fn test_spread_overrides_existing_keys() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import1.atmc { a: 1, b: 2, var1... }"),
                ("/home/user/import1.atmc", "{a: 3, b: 4, c: 5}"),
            ];
            let tree_ok = "
                object
                  a: int 3
                  b: int 4
                  c: int 5
            ";
        }

        fn test_spread_does_not_merge() {
            let files = &[
                ("/home/user/config.atmc", "v ./v.atmc { o: { x: 1, y: 1 }, v... }"),
                ("/home/user/v.atmc", "{ o: { y: 2 } }"),
            ];
            let tree_ok = "
                object
                  o: object
                    y: int 2
            ";
        }

        fn test_explicit_key_after_spread() {
            let files = &[
                ("/home/user/config.atmc", "v ./v.atmc { v..., b: 20 }"),
                ("/home/user/v.atmc", "{ a: 1, b: 2, c: 3 }"),
            ];
            let tree_ok = "
                object
                  a: int 1
                  b: int 20
                  c: int 3
            ";
        }

        fn test_nested_override() {
            let files = &[
                ("/home/user/config.atmc", "common ./common.atmc {\n  common...\n  logging: { settings: { enabled: false } }\n}"),
                ("/home/user/common.atmc", "{ logging: { level: \"info\", settings: { enabled: true, path: \"/var/log\" } } }"),
            ];
            let tree_ok = r#"
                object
                  logging: object
                    level: string "info"
                    settings: object
                      enabled: bool false
                      path: string "/var/log"
            "#;
        }

        fn test_array_spread() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import1.atmc { a: var1.c, b: [1, 2, var1.d..., 6, 7] }"),
                ("/home/user/import1.atmc", "{c: 3, d: [3, 4, 5]}"),
            ];
            let tree_ok = "
                object
                  a: int 3
                  b: array
                    int 1
                    int 2
                    int 3
                    int 4
                    int 5
                    int 6
                    int 7
            ";
        }

        fn test_whole_import_as_value() {
            let files = &[
                ("/home/user/config.atmc", "db ./db.atmc { database: db, copy: [db] }"),
                ("/home/user/db.atmc", "{ port: 5432 }"),
            ];
            let tree_ok = "
                object
                  database: object
                    port: int 5432
                  copy: array
                    object
                      port: int 5432
            ";
        }

        fn test_transitive_imports() {
            let files = &[
                ("/home/user/config.atmc", "mid ./mid.atmc { value: mid.inner.x }"),
                ("/home/user/mid.atmc", "leaf ./leaf.atmc { inner: leaf }"),
                ("/home/user/leaf.atmc", "{ x: 1.5 }"),
            ];
            let tree_ok = "
                object
                  value: float 1.5
            ";
        }

        fn test_error_spread_of_array_into_object() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import1.atmc { a: var1.c, b: var1.d, var1.c... }"),
                ("/home/user/import1.atmc", "{c: [3, 4, 5], d: 6}"),
            ];
            let expected_errors = &[
                "failed to link /home/user/config.atmc: 1:44: unexpected node type, expected: Object, found: array",
            ];
        }

        fn test_error_spread_of_object_into_array() {
            let files = &[
                ("/home/user/config.atmc", "v ./v.atmc { a: [v...] }"),
                ("/home/user/v.atmc", "{}"),
            ];
            let expected_errors = &[
                "failed to link /home/user/config.atmc: 1:17: unexpected node type, expected: Array, found: object",
            ];
        }

        fn test_error_not_found_nested_variable() {
            let files = &[
                ("/home/user/config.atmc", "var1 ./import1.atmc { a: var1.c, b: var1.j }"),
                ("/home/user/import1.atmc", "{c: [3, 4, 5], d: 6}"),
            ];
            let expected_errors = &[
                "failed to link /home/user/config.atmc: 1:36: variable not found, expected: var1.j",
            ];
        }

        fn test_error_path_through_scalar() {
            let files = &[
                ("/home/user/config.atmc", "v ./v.atmc { a: v.d.x }"),
                ("/home/user/v.atmc", "{ d: 6 }"),
            ];
            let expected_errors = &[
                "failed to link /home/user/config.atmc: 1:16: variable not found, expected: v.d.x",
            ];
        }

        fn test_error_in_imported_file() {
            let files = &[
                ("/home/user/config.atmc", "v ./v.atmc { a: v.x }"),
                ("/home/user/v.atmc", "w ./w.atmc { x: w.missing }"),
                ("/home/user/w.atmc", "{}"),
            ];
            let expected_errors = &[
                "/home/user/config.atmc: failed to import ./v.atmc: failed to link /home/user/v.atmc: 1:16: variable not found, expected: w.missing",
            ];
        }
    );

    #[test]
    fn test_link_is_memoized() {
        let source = crate::source::MemorySource::new()
            .file("/main.atmc", "a ./a.atmc { x: a }")
            .file("/a.atmc", "{ k: [1, 2] }");
        let mut processor = crate::processor::Processor::new(&source);
        let first = processor.process("/main.atmc").unwrap();
        let second = processor.process("/main.atmc").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_file_links_to_the_same_object() {
        let mut ast_by_path = HashMap::new();
        for (path, src) in [("/a.atmc", "{ k: 1 }")] {
            let file = crate::parser::test_utils::parse_file(src);
            ast_by_path.insert(
                PathBuf::from(path),
                FileWithPath {
                    file,
                    path: PathBuf::from(path),
                    import_paths: HashMap::new(),
                },
            );
        }
        let env = HashMap::new();
        let mut linker = Linker::new(&ast_by_path, &env);
        let file = &ast_by_path[Path::new("/a.atmc")];
        let first = linker.link(file).unwrap();
        let second = linker.link(file).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }
}
