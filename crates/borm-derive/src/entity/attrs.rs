//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level and field-level `#[borm(...)]` attributes.

use syn::{Attribute, LitStr, Result, Token};

/// Parsed field-level attributes.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    pub time: bool,
    pub skip: bool,
    /// `Some(None)` for a bare `last_insert_id`, `Some(Some(col))` when a column is named.
    pub last_insert_id: Option<Option<String>>,
    pub get: Option<syn::Ident>,
    pub set: Option<syn::Ident>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            let value: Option<LitStr> = if input.peek(Token![=]) {
                let _: Token![=] = input.parse()?;
                Some(input.parse()?)
            } else {
                None
            };

            let method = |v: &Option<LitStr>| -> Result<syn::Ident> {
                match v {
                    Some(lit) => lit.parse(),
                    None => Err(syn::Error::new_spanned(&key, "expected `= \"method\"`")),
                }
            };

            match key.to_string().as_str() {
                "column" => match value {
                    Some(lit) => attr.column = Some(lit.value()),
                    None => return Err(syn::Error::new_spanned(&key, "expected `column = \"name\"`")),
                },
                "time" => attr.time = true,
                "skip" => attr.skip = true,
                "last_insert_id" => attr.last_insert_id = Some(value.map(|lit| lit.value())),
                "get" => attr.get = Some(method(&value)?),
                "set" => attr.set = Some(method(&value)?),
                other => {
                    return Err(syn::Error::new_spanned(
                        &key,
                        format!("unknown borm attribute `{other}`"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                let _: Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Merge every `#[borm(...)]` on a field.
pub(super) fn field_attr(attrs: &[Attribute]) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("borm")) {
        let parsed: FieldAttr = attr.parse_args()?;
        merged.column = parsed.column.or(merged.column);
        merged.time |= parsed.time;
        merged.skip |= parsed.skip;
        merged.last_insert_id = parsed.last_insert_id.or(merged.last_insert_id);
        merged.get = parsed.get.or(merged.get);
        merged.set = parsed.set.or(merged.set);
    }
    Ok(merged)
}

/// Extract the table name from struct-level `#[borm(table = "...")]`, if present.
pub(super) fn table_name(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut table = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("borm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                table = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unknown borm attribute; expected `table = \"name\"`"))
            }
        })?;
    }
    Ok(table)
}
