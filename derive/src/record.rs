use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

pub fn derive_record_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => expanded.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Record requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Record only works on structs",
            ))
        }
    };

    let mut descriptors = Vec::with_capacity(fields.len());
    let mut arms = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = &field.ident else {
            continue;
        };
        let field_name = ident.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name);
        let tags = parse_tags(&field.attrs)?;
        let tag_names = tags.iter().map(|(tag, _)| tag);
        let tag_keys = tags.iter().map(|(_, key)| key);

        descriptors.push(quote! {
            ::atmc::bind::Field {
                name: #field_name,
                tags: &[#((#tag_names, #tag_keys)),*],
            }
        });
        arms.push(quote! {
            #index => ::atmc::bind::Bind::bind(&mut self.#ident, value, ctx),
        });
    }

    Ok(quote! {
        impl #impl_generics ::atmc::bind::Record for #name #ty_generics #where_clause {
            const FIELDS: &'static [::atmc::bind::Field] = &[#(#descriptors),*];

            fn bind_field(
                &mut self,
                index: usize,
                value: &::atmc::resolved::Expr,
                ctx: &::atmc::bind::Context<'_>,
            ) -> ::std::result::Result<(), ::atmc::bind::Error> {
                match index {
                    #(#arms)*
                    _ => ::std::result::Result::Ok(()),
                }
            }
        }

        impl #impl_generics ::atmc::bind::Bind for #name #ty_generics #where_clause {
            fn bind(
                &mut self,
                value: &::atmc::resolved::Expr,
                ctx: &::atmc::bind::Context<'_>,
            ) -> ::std::result::Result<(), ::atmc::bind::Error> {
                ::atmc::bind::bind_object(self, value, ctx)
            }
        }

        impl #impl_generics ::atmc::Scan for #name #ty_generics #where_clause {
            fn scan(
                &mut self,
                object: &::atmc::resolved::Object,
                ctx: &::atmc::bind::Context<'_>,
            ) -> ::std::result::Result<(), ::atmc::bind::Error> {
                ::atmc::bind::bind_record(self, object, ctx)
            }
        }
    })
}

/// Parses `#[tag(atmc = "key", json = "other")]` into `(tag, key)` pairs.
fn parse_tags(attrs: &[syn::Attribute]) -> syn::Result<Vec<(String, String)>> {
    let mut tags = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("tag") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let Some(tag) = meta.path.get_ident() else {
                return Err(meta.error("expected a tag name"));
            };
            let key: LitStr = meta.value()?.parse()?;
            tags.push((tag.to_string(), key.value()));
            Ok(())
        })?;
    }
    Ok(tags)
}
