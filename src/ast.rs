// file   ::= import* object
// import ::= IDENT PATH
// object ::= '{' entry* '}'
// entry  ::= IDENT ':' expr
//          | var '...'
// var    ::= IDENT ('.' IDENT)*
// expr   ::= var
//          | var '...'          (array elements only)
//          | '$' IDENT
//          | object
//          | '[' expr* ']'
//          | STRING | INT | FLOAT | BOOL

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::token::Location;

#[derive(Debug, PartialEq)]
pub struct File {
    pub imports: Vec<Import>,
    /// Every file has exactly one root object.
    pub object: Object,
}

#[derive(Debug, PartialEq)]
pub struct Import {
    /// The local name the imported root object is bound to.
    pub name: Ident,
    /// The path as written in the source, resolved later by the processor.
    pub path: Literal<Box<str>>,
}

impl Import {
    pub fn location(&self) -> Location {
        self.name.location.to(self.path.location)
    }
}

#[derive(Debug, PartialEq)]
pub struct Object {
    pub entries: Vec<Entry>,
    /// Spans both braces.
    pub location: Location,
}

#[derive(Debug, PartialEq)]
pub enum Entry {
    Kv(Kv),
    Spread(Spread),
}

#[derive(Debug, PartialEq)]
pub struct Kv {
    pub key: Ident,
    pub value: Expr,
}

/// `var...`, inlining either the members of an object (as an object entry) or
/// the elements of an array (as an array element).
#[derive(Debug, PartialEq)]
pub struct Spread {
    pub var: Var,
    pub location: Location,
}

#[derive(Debug, PartialEq)]
pub struct Array {
    pub elements: Vec<Expr>,
    pub location: Location,
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Object(Object),
    Array(Array),
    Var(Var),
    Env(Env),
    Int(Literal<i64>),
    Float(Literal<f64>),
    String(Literal<Box<str>>),
    Bool(Literal<bool>),
    /// Only produced inside of an array's element list.
    Spread(Spread),
}

impl Expr {
    pub fn location(&self) -> Location {
        match self {
            Expr::Object(object) => object.location,
            Expr::Array(array) => array.location,
            Expr::Var(var) => var.location(),
            Expr::Env(env) => env.location,
            Expr::Int(lit) => lit.location,
            Expr::Float(lit) => lit.location,
            Expr::String(lit) => lit.location,
            Expr::Bool(lit) => lit.location,
            Expr::Spread(spread) => spread.location,
        }
    }
}

/// A dotted path whose first identifier names an import.
#[derive(Debug, PartialEq)]
pub struct Var {
    /// Non empty list of identifiers.
    pub path: Vec<Ident>,
}

impl Var {
    pub fn head(&self) -> &Ident {
        &self.path[0]
    }

    pub fn tail(&self) -> &[Ident] {
        &self.path[1..]
    }

    /// Spans from the first to the last identifier.
    pub fn location(&self) -> Location {
        let first = self.head().location;
        let last = self.path[self.path.len() - 1].location;
        first.to(last)
    }

    /// Returns the path joined with dots, as written in the source.
    pub fn dotted(&self) -> String {
        let mut buf = String::with_capacity(16 * self.path.len());
        for (i, ident) in self.path.iter().enumerate() {
            if i > 0 {
                buf.push('.');
            }
            buf.push_str(&ident.name);
        }
        buf
    }
}

/// `$NAME`
#[derive(Debug, PartialEq)]
pub struct Env {
    pub name: Ident,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: Box<str>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal<T> {
    pub value: T,
    pub location: Location,
}

/// A borrowed view of any node, handed out by [`File::inspect`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    File(&'a File),
    Import(&'a Import),
    Object(&'a Object),
    Kv(&'a Kv),
    Spread(&'a Spread),
    Array(&'a Array),
    Var(&'a Var),
    Env(&'a Env),
    Int(&'a Literal<i64>),
    Float(&'a Literal<f64>),
    String(&'a Literal<Box<str>>),
    Bool(&'a Literal<bool>),
}

impl File {
    /// Walks every node of the file in pre-order, in source order. Stops at
    /// the first error returned by `f`.
    pub fn inspect<E>(&self, f: &mut impl FnMut(Node<'_>) -> Result<(), E>) -> Result<(), E> {
        f(Node::File(self))?;
        for import in &self.imports {
            f(Node::Import(import))?;
        }
        inspect_object(&self.object, f)
    }
}

fn inspect_object<E>(
    object: &Object,
    f: &mut impl FnMut(Node<'_>) -> Result<(), E>,
) -> Result<(), E> {
    f(Node::Object(object))?;
    for entry in &object.entries {
        match entry {
            Entry::Kv(kv) => {
                f(Node::Kv(kv))?;
                inspect_expr(&kv.value, f)?;
            }
            Entry::Spread(spread) => inspect_spread(spread, f)?,
        }
    }
    Ok(())
}

fn inspect_spread<E>(
    spread: &Spread,
    f: &mut impl FnMut(Node<'_>) -> Result<(), E>,
) -> Result<(), E> {
    f(Node::Spread(spread))?;
    f(Node::Var(&spread.var))
}

fn inspect_expr<E>(expr: &Expr, f: &mut impl FnMut(Node<'_>) -> Result<(), E>) -> Result<(), E> {
    match expr {
        Expr::Object(object) => inspect_object(object, f),
        Expr::Array(array) => {
            f(Node::Array(array))?;
            for element in &array.elements {
                inspect_expr(element, f)?;
            }
            Ok(())
        }
        Expr::Var(var) => f(Node::Var(var)),
        Expr::Env(env) => f(Node::Env(env)),
        Expr::Int(lit) => f(Node::Int(lit)),
        Expr::Float(lit) => f(Node::Float(lit)),
        Expr::String(lit) => f(Node::String(lit)),
        Expr::Bool(lit) => f(Node::Bool(lit)),
        Expr::Spread(spread) => inspect_spread(spread, f),
    }
}

/// A parsed file together with where it lives and where its imports point.
#[derive(Debug)]
pub struct FileWithPath {
    pub file: File,
    /// Absolute path of the file itself.
    pub path: PathBuf,
    /// Maps each import path, as written in the source, to its absolute path.
    pub import_paths: HashMap<Box<str>, PathBuf>,
}

impl FileWithPath {
    pub fn import_path(&self, raw: &str) -> Option<&Path> {
        self.import_paths.get(raw).map(PathBuf::as_path)
    }
}
