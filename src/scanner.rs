use std::collections::{BTreeMap, HashMap};

use crate::{
    bind::{self, to_json, Bind, Context},
    error::Result,
    resolved::Object,
};

/// A target the resolved root object can be scanned into.
///
/// Implemented by `#[derive(Record)]` structs, which are bound field by
/// field, and by untyped maps, which take every member.
pub trait Scan {
    fn scan(&mut self, object: &Object, ctx: &Context<'_>) -> Result<(), bind::Error>;
}

impl Scan for serde_json::Map<String, serde_json::Value> {
    fn scan(&mut self, object: &Object, _: &Context<'_>) -> Result<(), bind::Error> {
        for (key, value) in object.iter() {
            let value = to_json(value).map_err(|e| e.at(key))?;
            self.insert(key.clone(), value);
        }
        Ok(())
    }
}

macro_rules! scan_map {
    ($($map:ident),*) => {$(
        impl<T: Bind + Default> Scan for $map<String, T> {
            fn scan(&mut self, object: &Object, ctx: &Context<'_>) -> Result<(), bind::Error> {
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

scan_map!(HashMap, BTreeMap);

/// Holds a resolved tree, ready to be scanned into targets.
#[derive(Debug, Clone)]
pub struct Scanner {
    resolved: Object,
    field_tag_name: String,
}

impl Scanner {
    pub fn new(resolved: Object, field_tag_name: impl Into<String>) -> Scanner {
        Scanner {
            resolved,
            field_tag_name: field_tag_name.into(),
        }
    }

    /// Binds the resolved tree into `target`.
    pub fn scan(&self, target: &mut impl Scan) -> Result<()> {
        let ctx = Context {
            field_tag_name: &self.field_tag_name,
        };
        target.scan(&self.resolved, &ctx)?;
        Ok(())
    }

    pub fn resolved(&self) -> &Object {
        &self.resolved
    }

    pub fn into_resolved(self) -> Object {
        self.resolved
    }
}
