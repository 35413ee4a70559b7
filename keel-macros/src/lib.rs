#![crate_type = "proc-macro"]

extern crate proc_macro;
mod entity;
mod errors;
mod primary_key;

use proc_macro::TokenStream;

/// Derive `keel::Entity` for a struct with named fields that implements `Default`.
///
/// ```ignore
/// #[derive(Entity, Debug, Default)]
/// #[keel(table = "product")]
/// struct Product {
///     id: Option<i32>,
///     name: Option<String>,
///     #[keel(column = "unit_price")]
///     price: Option<Decimal>,
///     #[keel(foreign_key)]
///     category: Reference<Category>,
///     #[keel(skip)]
///     dirty: bool,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(keel))]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let input: proc_macro2::TokenStream = input.into();
    entity::generate_entity_impl(input).into()
}
