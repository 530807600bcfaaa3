//! Binding of resolved trees into Rust values.
//!
//! [`Bind`] assigns one resolved expression into an existing value, checking
//! that the expression kind matches and that numbers fit. Structs take part
//! through [`Record`], usually derived with `#[derive(Record)]`:
//!
//! ```
//! use atmc::{bind::{bind_record, Context}, resolved::Expr, Record};
//!
//! #[derive(Debug, Default, Record)]
//! struct Server {
//!     #[tag(atmc = "listen_port")]
//!     port: u16,
//!     name: Option<String>,
//! }
//!
//! let object = [
//!     ("listen_port".to_owned(), Expr::Int(8080)),
//!     ("name".to_owned(), Expr::String("api".into())),
//!     ("unknown".to_owned(), Expr::Bool(true)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let mut server = Server::default();
//! bind_record(&mut server, &object, &Context::default()).unwrap();
//! assert_eq!(server.port, 8080);
//! assert_eq!(server.name.as_deref(), Some("api"));
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use tracing::trace;

use crate::resolved::{Expr, Object};

/// The tag consulted when no other is configured.
pub const DEFAULT_FIELD_TAG: &str = "atmc";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid type, expected {expected}, found {found}")]
    InvalidType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{value} does not fit in {target}")]
    TypeOverflow { value: String, target: &'static str },
    #[error("{found} can't be represented")]
    UnexpectedExpressionType { found: String },
    /// Another error, together with the dotted key path it happened at.
    #[error("{path}: {inner}")]
    At { path: String, inner: Box<Error> },
}

impl Error {
    /// Prefixes the error path with `segment`.
    #[must_use]
    pub fn at(self, segment: impl std::fmt::Display) -> Error {
        match self {
            Error::At { path, inner } => Error::At {
                path: format!("{segment}.{path}"),
                inner,
            },
            other => Error::At {
                path: segment.to_string(),
                inner: Box::new(other),
            },
        }
    }

    /// The error without its path.
    pub fn kind(&self) -> &Error {
        match self {
            Error::At { inner, .. } => inner.kind(),
            other => other,
        }
    }
}

pub fn invalid_type(expected: &'static str, found: &Expr) -> Error {
    Error::InvalidType {
        expected,
        found: found.kind(),
    }
}

/// Settings shared by a whole binding.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Which `#[tag(..)]` entry names the key of a field.
    pub field_tag_name: &'a str,
}

impl Default for Context<'_> {
    fn default() -> Self {
        Context {
            field_tag_name: DEFAULT_FIELD_TAG,
        }
    }
}

/// A value which can be assigned from a resolved expression.
pub trait Bind {
    fn bind(&mut self, value: &Expr, ctx: &Context<'_>) -> Result<(), Error>;
}

/// A field of a [`Record`].
#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    /// `(tag name, key)` pairs.
    pub tags: &'static [(&'static str, &'static str)],
}

impl Field {
    /// The key the field is bound from: the value of the tag named
    /// `tag_name`, or else the field name.
    pub fn key(&self, tag_name: &str) -> &'static str {
        self.tags
            .iter()
            .find(|(tag, _)| *tag == tag_name)
            .map_or(self.name, |&(_, key)| key)
    }
}

/// A struct whose fields are bound by key.
pub trait Record {
    const FIELDS: &'static [Field];

    /// Binds the field at `index` in [`Record::FIELDS`].
    fn bind_field(&mut self, index: usize, value: &Expr, ctx: &Context<'_>) -> Result<(), Error>;
}

/// Binds each member of `object` to the field whose key matches. Members
/// without a field are skipped, and fields without a member are left alone.
pub fn bind_record<R: Record>(
    record: &mut R,
    object: &Object,
    ctx: &Context<'_>,
) -> Result<(), Error> {
    for (key, value) in object.iter() {
        let Some(index) = R::FIELDS
            .iter()
            .position(|field| field.key(ctx.field_tag_name) == key.as_str())
        else {
            trace!(key = %key, "no field to bind to");
            continue;
        };
        record
            .bind_field(index, value, ctx)
            .map_err(|e| e.at(key))?;
    }
    Ok(())
}

/// [`Bind::bind`] for records: the value must be an object.
pub fn bind_object<R: Record>(
    record: &mut R,
    value: &Expr,
    ctx: &Context<'_>,
) -> Result<(), Error> {
    match value {
        Expr::Object(object) => bind_record(record, object, ctx),
        other => Err(invalid_type("object", other)),
    }
}

macro_rules! bind_int {
    ($($ty:ty),* $(,)?) => {$(
        impl Bind for $ty {
            fn bind(&mut self, value: &Expr, _: &Context<'_>) -> Result<(), Error> {
                let Expr::Int(n) = value else {
                    return Err(invalid_type("int", value));
                };
                *self = <$ty>::try_from(*n).map_err(|_| Error::TypeOverflow {
                    value: n.to_string(),
                    target: stringify!($ty),
                })?;
                Ok(())
            }
        }
    )*};
}

bind_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Bind for f64 {
    fn bind(&mut self, value: &Expr, _: &Context<'_>) -> Result<(), Error> {
        let Expr::Float(n) = value else {
            return Err(invalid_type("float", value));
        };
        *self = *n;
        Ok(())
    }
}

impl Bind for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn bind(&mut self, value: &Expr, _: &Context<'_>) -> Result<(), Error> {
        let Expr::Float(n) = value else {
            return Err(invalid_type("float", value));
        };
        if n.abs() > f64::from(f32::MAX) {
            return Err(Error::TypeOverflow {
                value: n.to_string(),
                target: "f32",
            });
        }
        *self = *n as f32;
        Ok(())
    }
}

impl Bind for bool {
    fn bind(&mut self, value: &Expr, _: &Context<'_>) -> Result<(), Error> {
        let Expr::Bool(b) = value else {
            return Err(invalid_type("bool", value));
        };
        *self = *b;
        Ok(())
    }
}

impl Bind for String {
    fn bind(&mut self, value: &Expr, _: &Context<'_>) -> Result<(), Error> {
        let Expr::String(s) = value else {
            return Err(invalid_type("string", value));
        };
        self.clone_from(s);
        Ok(())
    }
}

impl Bind for PathBuf {
    fn bind(&mut self, value: &Expr, _: &Context<'_>) -> Result<(), Error> {
        let Expr::String(s) = value else {
            return Err(invalid_type("string", value));
        };
        *self = PathBuf::from(s);
        Ok(())
    }
}

/// The vector is replaced by one with exactly the elements of the array.
impl<T: Bind + Default> Bind for Vec<T> {
    fn bind(&mut self, value: &Expr, ctx: &Context<'_>) -> Result<(), Error> {
        let Expr::Array(elements) = value else {
            return Err(invalid_type("array", value));
        };
        let mut items = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let mut item = T::default();
            item.bind(element, ctx).map_err(|e| e.at(i))?;
            items.push(item);
        }
        *self = items;
        Ok(())
    }
}

/// Allocates the value if needed, at any depth of nesting.
impl<T: Bind + Default> Bind for Option<T> {
    fn bind(&mut self, value: &Expr, ctx: &Context<'_>) -> Result<(), Error> {
        self.get_or_insert_with(T::default).bind(value, ctx)
    }
}

impl<T: Bind + ?Sized> Bind for Box<T> {
    fn bind(&mut self, value: &Expr, ctx: &Context<'_>) -> Result<(), Error> {
        (**self).bind(value, ctx)
    }
}

macro_rules! bind_map {
    ($($map:ident),*) => {$(
        impl<T: Bind + Default> Bind for $map<String, T> {
            fn bind(&mut self, value: &Expr, ctx: &Context<'_>) -> Result<(), Error> {
                let Expr::Object(object) = value else {
                    return Err(invalid_type("object", value));
                };
                for (key, value) in object.iter() {
                    self.entry(key.clone())
                        .or_default()
                        .bind(value, ctx)
                        .map_err(|e| e.at(key))?;
                }
                Ok(())
            }
        }
    )*};
}

bind_map!(HashMap, BTreeMap);

impl Bind for serde_json::Value {
    fn bind(&mut self, value: &Expr, _: &Context<'_>) -> Result<(), Error> {
        *self = to_json(value)?;
        Ok(())
    }
}

/// Converts a resolved expression into an untyped JSON value, keeping the
/// member order of objects.
pub fn to_json(value: &Expr) -> Result<serde_json::Value, Error> {
    use serde_json::Value;
    Ok(match value {
        Expr::Object(object) => Value::Object(to_json_map(object)?),
        Expr::Array(elements) => Value::Array(
            elements
                .iter()
                .enumerate()
                .map(|(i, element)| to_json(element).map_err(|e| e.at(i)))
                .collect::<Result<_, _>>()?,
        ),
        Expr::String(s) => Value::String(s.clone()),
        Expr::Int(n) => Value::from(*n),
        Expr::Float(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .ok_or_else(|| Error::UnexpectedExpressionType {
                found: format!("float {n}"),
            })?,
        Expr::Bool(b) => Value::Bool(*b),
    })
}

pub fn to_json_map(object: &Object) -> Result<serde_json::Map<String, serde_json::Value>, Error> {
    let mut map = serde_json::Map::with_capacity(object.len());
    for (key, value) in object.iter() {
        map.insert(key.clone(), to_json(value).map_err(|e| e.at(key))?);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_utils::object;
    use pretty_assertions::assert_eq;

    fn bind<T: Bind + Default>(value: Expr) -> Result<T, Error> {
        let mut target = T::default();
        target.bind(&value, &Context::default())?;
        Ok(target)
    }

    #[test]
    fn test_signed_bounds() {
        assert_eq!(bind::<i8>(Expr::Int(127)), Ok(127));
        assert_eq!(bind::<i8>(Expr::Int(-128)), Ok(-128));
        assert_eq!(
            bind::<i8>(Expr::Int(128)),
            Err(Error::TypeOverflow {
                value: "128".into(),
                target: "i8"
            })
        );
        assert!(bind::<i16>(Expr::Int(-32_769)).is_err());
        assert_eq!(bind::<i64>(Expr::Int(i64::MIN)), Ok(i64::MIN));
    }

    #[test]
    fn test_unsigned_bounds() {
        assert_eq!(bind::<u8>(Expr::Int(255)), Ok(255));
        assert!(bind::<u8>(Expr::Int(256)).is_err());
        assert_eq!(
            bind::<u64>(Expr::Int(-1)),
            Err(Error::TypeOverflow {
                value: "-1".into(),
                target: "u64"
            })
        );
        assert_eq!(bind::<usize>(Expr::Int(0)), Ok(0));
    }

    macro_rules! int_bounds_tests {
        ($($name:ident: $ty:ty,)*) => {$(
            #[test]
            fn $name() {
                let (min, max) = (i64::from(<$ty>::MIN), i64::from(<$ty>::MAX));
                assert_eq!(bind::<$ty>(Expr::Int(min)), Ok(<$ty>::MIN));
                assert_eq!(bind::<$ty>(Expr::Int(max)), Ok(<$ty>::MAX));
                for value in [min - 1, max + 1] {
                    assert_eq!(
                        bind::<$ty>(Expr::Int(value)),
                        Err(Error::TypeOverflow {
                            value: value.to_string(),
                            target: stringify!($ty),
                        })
                    );
                }
            }
        )*};
    }

    int_bounds_tests! {
        test_i8_bounds: i8,
        test_i16_bounds: i16,
        test_i32_bounds: i32,
        test_u8_bounds: u8,
        test_u16_bounds: u16,
        test_u32_bounds: u32,
    }

    #[test]
    fn test_pointer_sized_bounds() {
        let min = i64::try_from(isize::MIN).unwrap();
        let max = i64::try_from(isize::MAX).unwrap();
        assert_eq!(bind::<isize>(Expr::Int(min)), Ok(isize::MIN));
        assert_eq!(bind::<isize>(Expr::Int(max)), Ok(isize::MAX));
        for value in [min.checked_sub(1), max.checked_add(1)].into_iter().flatten() {
            assert!(matches!(
                bind::<isize>(Expr::Int(value)),
                Err(Error::TypeOverflow { target: "isize", .. })
            ));
        }

        assert_eq!(bind::<u64>(Expr::Int(i64::MAX)), Ok(i64::MAX.unsigned_abs()));
        assert_eq!(
            bind::<usize>(Expr::Int(-1)),
            Err(Error::TypeOverflow {
                value: "-1".into(),
                target: "usize"
            })
        );
    }

    #[test]
    fn test_float_bounds() {
        assert_eq!(bind::<f64>(Expr::Float(f64::MAX)), Ok(f64::MAX));
        assert_eq!(bind::<f32>(Expr::Float(1.5)), Ok(1.5));
        assert!(matches!(
            bind::<f32>(Expr::Float(1e39)),
            Err(Error::TypeOverflow { target: "f32", .. })
        ));
        assert!(bind::<f32>(Expr::Float(-1e39)).is_err());
    }

    #[test]
    fn test_kind_mismatch() {
        let cases = [
            (bind::<i32>(Expr::Float(1.0)).unwrap_err(), "int", "float"),
            (bind::<f64>(Expr::Int(1)).unwrap_err(), "float", "int"),
            (bind::<String>(Expr::Bool(true)).unwrap_err(), "string", "bool"),
            (
                bind::<bool>(Expr::String("true".into())).unwrap_err(),
                "bool",
                "string",
            ),
        ];
        for (error, expected, found) in cases {
            assert_eq!(error, Error::InvalidType { expected, found });
        }
        assert_eq!(
            bind::<Vec<i32>>(Expr::Int(1)).unwrap_err(),
            Error::InvalidType {
                expected: "array",
                found: "int"
            }
        );
    }

    #[test]
    fn test_vec_takes_array_length() {
        let mut target = vec![9, 9, 9, 9];
        target
            .bind(
                &Expr::Array(vec![Expr::Int(1), Expr::Int(2)]),
                &Context::default(),
            )
            .unwrap();
        assert_eq!(target, [1, 2]);
    }

    #[test]
    fn test_nested_options_are_allocated() {
        let target: Option<Option<Box<Option<i32>>>> = bind(Expr::Int(7)).unwrap();
        assert_eq!(target, Some(Some(Box::new(Some(7)))));
    }

    #[test]
    fn test_error_path() {
        let value = Expr::Object(object([(
            "servers",
            Expr::Array(vec![Expr::Int(1), Expr::Int(300)]),
        )]));
        let error = bind::<HashMap<String, Vec<u8>>>(value).unwrap_err();
        assert_eq!(error.to_string(), "servers.1: 300 does not fit in u8");
        assert!(matches!(error.kind(), Error::TypeOverflow { .. }));
    }

    #[test]
    fn test_maps() {
        let value = Expr::Object(object([("b", Expr::Int(2)), ("a", Expr::Int(1))]));
        let map: BTreeMap<String, i32> = bind(value).unwrap();
        assert_eq!(map, BTreeMap::from([("a".into(), 1), ("b".into(), 2)]));
    }

    #[test]
    fn test_to_json_keeps_order() {
        let tree = object([
            ("z", Expr::Int(1)),
            ("a", Expr::Array(vec![Expr::Float(0.5), Expr::Bool(false)])),
            ("m", Expr::Object(object([("s", Expr::String("x".into()))]))),
        ]);
        let json = serde_json::Value::Object(to_json_map(&tree).unwrap());
        assert_eq!(
            serde_json::to_string(&json).unwrap(),
            r#"{"z":1,"a":[0.5,false],"m":{"s":"x"}}"#
        );
    }

    #[test]
    fn test_to_json_rejects_non_finite() {
        let tree = object([("x", Expr::Float(f64::NAN))]);
        let error = to_json_map(&tree).unwrap_err();
        assert!(matches!(
            error.kind(),
            Error::UnexpectedExpressionType { .. }
        ));
    }

    #[derive(Debug, Default, PartialEq)]
    struct Limits {
        max: u8,
        ratio: f32,
    }

    impl Record for Limits {
        const FIELDS: &'static [Field] = &[
            Field {
                name: "max",
                tags: &[("atmc", "maximum"), ("json", "max_value")],
            },
            Field {
                name: "ratio",
                tags: &[],
            },
        ];

        fn bind_field(
            &mut self,
            index: usize,
            value: &Expr,
            ctx: &Context<'_>,
        ) -> Result<(), Error> {
            match index {
                0 => self.max.bind(value, ctx),
                1 => self.ratio.bind(value, ctx),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn test_record_keys_follow_tag_name() {
        let tree = object([
            ("maximum", Expr::Int(3)),
            ("max_value", Expr::Int(4)),
            ("ratio", Expr::Float(0.25)),
        ]);

        let mut limits = Limits::default();
        bind_record(&mut limits, &tree, &Context::default()).unwrap();
        assert_eq!(limits, Limits { max: 3, ratio: 0.25 });

        let mut limits = Limits::default();
        let ctx = Context {
            field_tag_name: "json",
        };
        bind_record(&mut limits, &tree, &ctx).unwrap();
        assert_eq!(limits, Limits { max: 4, ratio: 0.25 });

        let mut limits = Limits::default();
        let ctx = Context {
            field_tag_name: "yaml",
        };
        bind_record(&mut limits, &tree, &ctx).unwrap();
        assert_eq!(limits, Limits { max: 0, ratio: 0.25 });
    }

    #[test]
    fn test_record_error_path() {
        let tree = object([("maximum", Expr::Int(-1))]);
        let mut limits = Limits::default();
        let error = bind_record(&mut limits, &tree, &Context::default()).unwrap_err();
        assert_eq!(error.to_string(), "maximum: -1 does not fit in u8");
    }
}
