use syn::punctuated::Punctuated;
use syn::{Attribute, DeriveInput, Expr, ExprLit, Lit, Meta, Token};

use crate::errors::KeelMacroError;

const STRUCT_ATTRIBUTES: &str = "table";
const FIELD_ATTRIBUTES: &str = "id, column = \"..\", foreign_key, lazy, skip";

/// Options collected from the `#[keel(...)]` attributes of one field
#[derive(Debug, Default, Clone)]
pub struct FieldAttrs {
    pub id: bool,
    pub skip: bool,
    pub foreign_key: bool,
    pub lazy: bool,
    pub column: Option<String>,
}

fn keel_metas(attrs: &[Attribute]) -> syn::Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("keel")) {
        let nested = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        metas.extend(nested);
    }
    Ok(metas)
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => Ok(lit.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn unknown(meta: &Meta, expected: &'static str) -> syn::Error {
    let attribute = meta
        .path()
        .get_ident()
        .map(|i| i.to_string())
        .unwrap_or_else(|| "?".to_string());
    KeelMacroError::UnknownAttribute {
        attribute,
        expected,
    }
    .into_syn(syn::spanned::Spanned::span(meta))
}

/// Table name from `#[keel(table = "...")]` on the struct
pub fn extract_table_name(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut table = None;
    for meta in keel_metas(&input.attrs)? {
        match &meta {
            Meta::NameValue(nv) if nv.path.is_ident("table") => {
                table = Some(string_value(&nv.value)?);
            }
            _ => return Err(unknown(&meta, STRUCT_ATTRIBUTES)),
        }
    }
    Ok(table)
}

pub fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for meta in keel_metas(attrs)? {
        match &meta {
            Meta::Path(path) if path.is_ident("id") => parsed.id = true,
            Meta::Path(path) if path.is_ident("skip") => parsed.skip = true,
            Meta::Path(path) if path.is_ident("foreign_key") => parsed.foreign_key = true,
            // `lazy` only makes sense on a foreign key, so it implies one
            Meta::Path(path) if path.is_ident("lazy") => {
                parsed.foreign_key = true;
                parsed.lazy = true;
            }
            Meta::NameValue(nv) if nv.path.is_ident("column") => {
                parsed.column = Some(string_value(&nv.value)?);
            }
            _ => return Err(unknown(&meta, FIELD_ATTRIBUTES)),
        }
    }
    Ok(parsed)
}
