use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result, Type,
    parse::{Parse, ParseStream},
};

pub(crate) fn expand_from_elements(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new_spanned(
            input,
            "`FromElements` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new_spanned(
            input,
            "`FromElements` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .map(Result::transpose)
        .flatten() // Skip fields without an attribute.
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for field in &fields {
        if !seen.insert(field.path.value()) {
            Err(Error::new_spanned(&field.path, "Block paths must be unique."))?;
        }
    }

    let add_cases = fields.iter().map(|field| {
        let FieldMetadata { name, path, is_vec } = field;

        let assignment = if *is_vec {
            quote! {
                self.#name.push(Default::default());
                self.#name.last_mut().map(|r| r as _)
            }
        } else {
            quote! {
                Some(self.#name.get_or_insert_with(Default::default))
            }
        };

        quote! { #path => { #assignment } }
    });

    let get_cases = fields.iter().map(|field| {
        let FieldMetadata { name, path, is_vec } = field;

        let access = if *is_vec {
            quote! { self.#name.last_mut().map(|r| r as _) }
        } else {
            quote! { self.#name.as_mut().map(|r| r as _) }
        };

        quote! { #path => { #access } }
    });

    let name = &input.ident;

    let expanded = quote! {
        impl FromElements for #name {
            fn add_block(&mut self, path: &str) -> Option<&mut dyn FromElement> {
                match path {
                    #(#add_cases)*
                    _ => None,
                }
            }

            fn block(&mut self, path: &str) -> Option<&mut dyn FromElement> {
                match path {
                    #(#get_cases)*
                    _ => None,
                }
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    path: LitStr,
    is_vec: bool,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Option<Self>> {
        let name = field.ident.clone().unwrap();

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("block")) else {
            return Ok(None);
        };

        let BlockAttribute { path } = attr.meta.require_list()?.parse_args()?;

        let Type::Path(ty) = &field.ty else {
            Err(Error::new_spanned(
                &field.ty,
                "Field must have a type annotation.",
            ))?
        };

        let Some(segment) = ty.path.segments.first() else {
            Err(Error::new_spanned(
                &ty.path.segments,
                "Field must have an `Option<T>` or `Vec<T>` type.",
            ))?
        };

        let is_vec = if segment.ident == "Option" {
            false
        } else if segment.ident == "Vec" {
            true
        } else {
            Err(Error::new_spanned(
                &segment.ident,
                "Field must have an `Option<T>` or `Vec<T>` type.",
            ))?
        };

        Ok(Some(Self { name, path, is_vec }))
    }
}

#[derive(Debug)]
struct BlockAttribute {
    path: LitStr,
}

impl Parse for BlockAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let path = input.parse::<LitStr>()?;

        if path.value().split('/').any(str::is_empty) {
            Err(Error::new_spanned(
                &path,
                "Block path must be a `/`-separated list of element names.",
            ))?
        }

        Ok(Self { path })
    }
}
