//! Locating the id field of an entity

use proc_macro2::Span;

use crate::entity::ParsedField;
use crate::errors::KeelMacroError;

/// Index of the id field: the one marked `#[keel(id)]`, else the field named `id`
pub fn extract_primary_key(
    entity_name: &str,
    fields: &[ParsedField],
    span: Span,
) -> syn::Result<usize> {
    let marked: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.attrs.id)
        .map(|(i, _)| i)
        .collect();

    match marked.as_slice() {
        [index] => Ok(*index),
        [] => fields
            .iter()
            .position(|f| f.name == "id" && !f.attrs.foreign_key)
            .ok_or_else(|| {
                KeelMacroError::NoPrimaryKey {
                    entity_name: entity_name.to_string(),
                }
                .into_syn(span)
            }),
        many => {
            let names: Vec<&str> = many.iter().map(|i| fields[*i].name.as_str()).collect();
            Err(KeelMacroError::MultiplePrimaryKeys {
                entity_name: entity_name.to_string(),
                fields: names.join(", "),
            }
            .into_syn(fields[many[1]].ident.span()))
        }
    }
}
