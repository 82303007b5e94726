//! Derive macro for `logsafe`.
//!
//! `#[derive(Loggable)]` collects a static redaction schema for a struct:
//! one entry per named field, carrying the serialized field name, whether the
//! field is marked `#[redact]`, and the declared field type. The schema is
//! what the redactor walks at capture time, so no type introspection happens
//! on the request path.
//!
//! Field names honor `#[serde(rename_all = "...")]` on the container and
//! `#[serde(rename = "...")]` on individual fields, so markers line up with
//! the JSON actually on the wire.

extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, LitStr, Meta, Result, Token,
};

/// Derives `logsafe::schema::Loggable` for a struct with named fields.
///
/// # Field attribute
///
/// - `#[redact]`: the field's value is always replaced by the redaction
///   sentinel wherever it appears in a captured body, at any nesting depth.
///
/// Unannotated fields pass through; fields of types that are themselves
/// registered `Loggable` records are traversed using their own schema.
///
/// Enums, unions, tuple structs, and generic types are rejected at compile
/// time. Enums are opaque leaves by design; register only your record types.
#[proc_macro_derive(Loggable, attributes(redact))]
pub fn derive_loggable(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;

    if let Some(param) = input.generics.params.first() {
        return Err(syn::Error::new(
            param.span(),
            "`Loggable` cannot be derived for generic types; schemas are registered per concrete type",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(unnamed) => {
                return Err(syn::Error::new(
                    unnamed.span(),
                    "`Loggable` requires named fields",
                ));
            }
        },
        Data::Enum(data) => {
            return Err(syn::Error::new(
                data.enum_token.span(),
                "`Loggable` cannot be derived for enums; enums are treated as opaque leaves",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "`Loggable` cannot be derived for unions",
            ));
        }
    };

    let rename_all = container_rename_all(&input.attrs);

    let mut field_tokens = Vec::with_capacity(fields.len());
    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .expect("named field should have an identifier");
        let raw_name = field_ident.to_string();
        let raw_name = raw_name.strip_prefix("r#").unwrap_or(&raw_name).to_owned();

        let redact = field_redact_marker(field)?;
        let name = match field_rename(&field.attrs) {
            Some(renamed) => renamed,
            None => match &rename_all {
                Some(style) => apply_rename_all(style, &raw_name),
                None => raw_name,
            },
        };

        let ty = &field.ty;
        field_tokens.push(quote! {
            ::logsafe::schema::FieldSchema {
                name: #name,
                redact: #redact,
                type_path: ::std::any::type_name::<#ty>(),
            }
        });
    }

    Ok(quote! {
        #[automatically_derived]
        impl ::logsafe::schema::Loggable for #ident {
            fn schema() -> &'static ::logsafe::schema::RecordSchema {
                static SCHEMA: ::std::sync::OnceLock<::logsafe::schema::RecordSchema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| ::logsafe::schema::RecordSchema {
                    type_path: ::std::any::type_name::<#ident>(),
                    fields: ::std::vec![#(#field_tokens),*],
                })
            }
        }
    })
}

/// Checks for the `#[redact]` marker and rejects any argument form.
fn field_redact_marker(field: &syn::Field) -> Result<bool> {
    for attr in &field.attrs {
        if attr.path().is_ident("redact") {
            if !matches!(attr.meta, Meta::Path(_)) {
                return Err(syn::Error::new(
                    attr.span(),
                    "`#[redact]` does not take arguments",
                ));
            }
            return Ok(true);
        }
    }
    Ok(false)
}

/// Extracts `rename_all = "..."` from container-level serde attributes.
fn container_rename_all(attrs: &[syn::Attribute]) -> Option<String> {
    let mut style = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if let Ok(value) = meta.value() {
                    if let Ok(lit) = value.parse::<LitStr>() {
                        style = Some(lit.value());
                    }
                }
                return Ok(());
            }
            skip_nested(&meta)
        });
    }
    style
}

/// Extracts `rename = "..."` (or `rename(serialize = "..."))`) from
/// field-level serde attributes. The serialize name wins, since schemas are
/// matched against serialized JSON.
fn field_rename(attrs: &[syn::Attribute]) -> Option<String> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    rename = Some(lit.value());
                } else {
                    meta.parse_nested_meta(|inner| {
                        if inner.path.is_ident("serialize") {
                            let lit: LitStr = inner.value()?.parse()?;
                            rename = Some(lit.value());
                            Ok(())
                        } else {
                            skip_nested(&inner)
                        }
                    })?;
                }
                return Ok(());
            }
            skip_nested(&meta)
        });
    }
    rename
}

/// Consumes the value or nested list of a meta item we don't care about, so
/// unrelated serde attributes never break the derive.
fn skip_nested(meta: &syn::meta::ParseNestedMeta<'_>) -> Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_nested(&inner))?;
    }
    Ok(())
}

/// Applies a serde `rename_all` style to a snake_case field identifier.
fn apply_rename_all(style: &str, name: &str) -> String {
    match style {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "PascalCase" => pascal_case(name),
        "camelCase" => camel_case(name),
        "SCREAMING_SNAKE_CASE" => name.to_uppercase(),
        "kebab-case" => name.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => name.to_uppercase().replace('_', "-"),
        _ => name.to_owned(),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn camel_case(name: &str) -> String {
    let pascal = pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}
