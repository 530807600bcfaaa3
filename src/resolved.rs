//! The resolved tree: what a file means once every variable, spread and
//! environment reference has been replaced by its value.

use indexmap::IndexMap;

/// An object with its members in their final order.
///
/// Overwriting a member keeps its original position.
pub type Object = IndexMap<String, Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Object(Object),
    Array(Vec<Expr>),
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Expr {
    /// The name of the expression type, as used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Object(_) => "object",
            Expr::Array(_) => "array",
            Expr::String(_) => "string",
            Expr::Int(_) => "int",
            Expr::Float(_) => "float",
            Expr::Bool(_) => "bool",
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Expr::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Expr]> {
        match self {
            Expr::Array(elements) => Some(elements),
            _ => None,
        }
    }
}
