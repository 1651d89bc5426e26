//! Derive macros for borm
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive `Record` and `Destination` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use borm::Entity;
///
/// #[derive(Default, Entity)]
/// #[borm(table = "test")]
/// struct Person {
///     #[borm(column = "name")]
///     pub x: String,
///     #[borm(column = "age")]
///     pub y: i64,
///     #[borm(column = "ctime", time)]
///     pub z1: i64,
///     #[borm(last_insert_id)]
///     pub id: i64,
///     #[borm(column = "nick", get = "nick", set = "set_nick")]
///     nick: String,
///     #[borm(skip)]
///     pub cached: Vec<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[borm(table = "name")]` - Table used instead of the handle's table name
/// - `#[borm(column = "name")]` - Map field to a different column name (default: lower-cased field name)
/// - `#[borm(time)]` - Integer field holding unix seconds, stored as a time value
/// - `#[borm(skip)]` - Never bound
/// - `#[borm(last_insert_id)]` / `#[borm(last_insert_id = "col")]` - Receives the generated id after a single-record insert
/// - `#[borm(get = "method", set = "method")]` - Bind a non-`pub` field through accessor methods
///
/// Non-`pub` fields without accessors are not bound. A field named `borm_last_id` acts as
/// `#[borm(last_insert_id)]`. The struct must implement `Default`.
#[proc_macro_derive(Entity, attributes(borm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
