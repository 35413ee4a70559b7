mod attributes;

use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Type};

use crate::errors::KeelMacroError;
use crate::primary_key::extract_primary_key;
use attributes::{extract_table_name, parse_field_attrs, FieldAttrs};

/// A named field with its parsed `#[keel(...)]` options
pub struct ParsedField {
    pub ident: Ident,
    pub name: String,
    pub ty: Type,
    pub attrs: FieldAttrs,
}

pub fn generate_entity_impl(input: TokenStream) -> TokenStream {
    let input = match syn::parse2::<DeriveInput>(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };
    expand(&input).unwrap_or_else(|err| err.to_compile_error())
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &input.ident;
    let entity_name = struct_name.to_string();

    let named = match &input.data {
        Data::Struct(data) if input.generics.params.is_empty() => match &data.fields {
            Fields::Named(named) => named,
            _ => return Err(KeelMacroError::UnsupportedShape.into_syn(struct_name.span())),
        },
        _ => return Err(KeelMacroError::UnsupportedShape.into_syn(struct_name.span())),
    };

    let table = extract_table_name(input)?.ok_or_else(|| {
        KeelMacroError::NoTableName {
            entity_name: entity_name.clone(),
        }
        .into_syn(struct_name.span())
    })?;

    let mut fields = Vec::new();
    for field in &named.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        fields.push(ParsedField {
            name: ident.unraw().to_string(),
            ident,
            ty: field.ty.clone(),
            attrs,
        });
    }

    let id_index = extract_primary_key(&entity_name, &fields, struct_name.span())?;
    let id = &fields[id_index];
    if id.attrs.foreign_key {
        return Err(KeelMacroError::IdForeignKey {
            field_name: id.name.clone(),
        }
        .into_syn(id.ident.span()));
    }
    if !is_last_segment(&id.ty, "Option") {
        return Err(KeelMacroError::IdNotOptional {
            field_name: id.name.clone(),
        }
        .into_syn(id.ident.span()));
    }

    let id_registration = {
        let ident = &id.ident;
        let name = &id.name;
        let column = id.attrs.column.clone().unwrap_or_else(|| name.clone());
        quote! {
            .id(#name, #column, |entity| &entity.#ident, |entity| &mut entity.#ident)
        }
    };

    let mut registrations = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        if index == id_index {
            continue;
        }
        let ident = &field.ident;
        let name = &field.name;
        if field.attrs.foreign_key {
            if !is_last_segment(&field.ty, "Reference") {
                return Err(KeelMacroError::ForeignKeyType {
                    field_name: name.clone(),
                }
                .into_syn(ident.span()));
            }
            let column = field
                .attrs
                .column
                .as_ref()
                .map(|column| quote! { .column(#column) });
            let lazy = field.attrs.lazy;
            registrations.push(quote! {
                .foreign_key(
                    ::keel::ForeignKeyDef::new(#name) #column .lazy(#lazy),
                    |entity| &entity.#ident,
                    |entity| &mut entity.#ident,
                )
            });
        } else {
            let column = field.attrs.column.clone().unwrap_or_else(|| name.clone());
            registrations.push(quote! {
                .column(#name, #column, |entity| &entity.#ident, |entity| &mut entity.#ident)
            });
        }
    }

    Ok(quote! {
        impl ::keel::Entity for #struct_name {
            fn descriptor() -> ::keel::KeelResult<::keel::EntityDescriptor<Self>> {
                ::keel::EntityDescriptor::builder(
                    #table,
                    <Self as ::core::default::Default>::default,
                )
                #id_registration
                #(#registrations)*
                .build()
            }
        }
    })
}

/// Whether `ty` is a path type ending in `name`, e.g. `Reference<T>` or
/// `std::option::Option<T>`
fn is_last_segment(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map_or(false, |segment| segment.ident == name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(src: &str) -> Result<String, String> {
        let input: DeriveInput = syn::parse_str(src).map_err(|e| e.to_string())?;
        expand(&input).map(|t| t.to_string()).map_err(|e| e.to_string())
    }

    #[test]
    fn registers_id_columns_and_foreign_keys() {
        let out = expand_str(
            r#"
            #[keel(table = "product")]
            struct Product {
                id: Option<i32>,
                #[keel(column = "label")]
                name: Option<String>,
                #[keel(foreign_key, lazy)]
                category: Reference<Category>,
                #[keel(skip)]
                scratch: u8,
            }
            "#,
        )
        .unwrap();
        assert!(out.contains("builder (\"product\""));
        assert!(out.contains(". id (\"id\" , \"id\""));
        assert!(out.contains(". column (\"name\" , \"label\""));
        assert!(out.contains("ForeignKeyDef :: new (\"category\") . lazy (true)"));
        assert!(!out.contains("scratch"));
    }

    #[test]
    fn explicit_id_attribute_wins() {
        let out = expand_str(
            r#"
            #[keel(table = "sku")]
            struct Sku {
                #[keel(id, column = "code")]
                code: Option<String>,
                id: Option<i32>,
            }
            "#,
        )
        .unwrap();
        assert!(out.contains(". id (\"code\" , \"code\""));
        assert!(out.contains(". column (\"id\" , \"id\""));
    }

    #[test]
    fn missing_table_is_rejected() {
        let err = expand_str("struct Loose { id: Option<i32> }").unwrap_err();
        assert!(err.contains("No table specified"));
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = expand_str(r#"#[keel(table = "t")] struct T { name: String }"#).unwrap_err();
        assert!(err.contains("No id field"));
    }

    #[test]
    fn two_ids_are_rejected() {
        let err = expand_str(
            r#"#[keel(table = "t")]
            struct T { #[keel(id)] a: Option<i32>, #[keel(id)] b: Option<i32> }"#,
        )
        .unwrap_err();
        assert!(err.contains("Multiple id fields"));
    }

    #[test]
    fn foreign_key_must_be_a_reference() {
        let err = expand_str(
            r#"#[keel(table = "t")]
            struct T { id: Option<i32>, #[keel(foreign_key)] owner: Option<i32> }"#,
        )
        .unwrap_err();
        assert!(err.contains("not keel::Reference"));
    }

    #[test]
    fn id_must_be_optional() {
        let err = expand_str(
            r#"#[keel(table = "tag")] struct Tag { id: i32, label: Option<String> }"#,
        )
        .unwrap_err();
        assert!(err.contains("Id field 'id' must be an Option<T>"));

        let out =
            expand_str(r#"#[keel(table = "tag")] struct Tag { id: std::option::Option<i32> }"#);
        assert!(out.is_ok());
    }

    #[test]
    fn unknown_attributes_are_rejected() {
        let err =
            expand_str(r#"#[keel(table = "t")] struct T { #[keel(primary)] id: Option<i32> }"#)
                .unwrap_err();
        assert!(err.contains("Unknown keel attribute 'primary'"));
    }
}
