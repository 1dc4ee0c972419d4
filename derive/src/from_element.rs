use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, LitStr, PathArguments,
    Result, Type,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

pub(crate) fn expand_from_element(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(
            input.span(),
            "`FromElement` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`FromElement` may only be derived on structs with named fields.",
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
        if !seen.insert(field.element.value()) {
            Err(Error::new(
                field.element.span(),
                "Element names must be unique.",
            ))?;
        }
    }

    let cases = fields.iter().map(|field| {
        let FieldMetadata {
            name,
            element,
            inner,
        } = field;

        quote! {
            #element => {
                self.#name = Some(<#inner as From<&str>>::from(text));
            }
        }
    });

    let name = &input.ident;

    let expanded = quote! {
        impl FromElement for #name {
            fn add_text(&mut self, name: &str, text: &str) {
                match name {
                    #(#cases)*
                    _ => {}
                }
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    element: LitStr,
    inner: Type,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Option<Self>> {
        let name = field.ident.clone().unwrap();

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("element")) else {
            return Ok(None);
        };

        let ElementAttribute { element } = attr.meta.require_list()?.parse_args()?;

        let Type::Path(path) = &field.ty else {
            Err(Error::new_spanned(
                &field.ty,
                "Field must have a type annotation.",
            ))?
        };

        let Some(segment) = path.path.segments.first() else {
            Err(Error::new_spanned(
                &path.path.segments,
                "Field must have a type annotation.",
            ))?
        };

        if segment.ident != "Option" {
            Err(Error::new_spanned(
                &segment.ident,
                "Field must have type `Option<T>`.",
            ))?
        }

        let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
            Err(Error::new_spanned(
                &segment.arguments,
                "Field of type `Option<T>` must have a generic parameter.",
            ))?
        };

        let Some(GenericArgument::Type(inner)) = arguments.args.first() else {
            Err(Error::new_spanned(
                &arguments.args,
                "Generic argument of a field of type `Option<T>` must be a type.",
            ))?
        };

        Ok(Some(Self {
            name,
            element,
            inner: inner.clone(),
        }))
    }
}

#[derive(Debug)]
struct ElementAttribute {
    element: LitStr,
}

impl Parse for ElementAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let element = input.parse::<LitStr>()?;

        if element.value().is_empty() || element.value().contains(['/', ':']) {
            Err(Error::new(
                element.span(),
                "Element name must be a non-empty local name.",
            ))?
        }

        Ok(Self { element })
    }
}
