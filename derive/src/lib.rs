//! Derive macros for `atmc`.

use proc_macro::TokenStream;

mod record;

/// Derives `atmc::bind::Record`, `atmc::bind::Bind` and `atmc::Scan` for a
/// struct with named fields, so that it can be scanned from a resolved tree.
///
/// Each field is bound from the member whose key is the field name, unless a
/// tag overrides it. The tag used is the one named by the field tag option
/// (`atmc` by default). Every field type must implement `Bind`.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, Record)]
/// struct Server {
///     #[tag(atmc = "listen", json = "port")]
///     port: u16,
///     hosts: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(tag))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record_impl(input)
}
