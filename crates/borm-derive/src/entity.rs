//! Entity derive macro implementation

mod attrs;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result, Visibility};

/// Field name (any case) that acts as `#[borm(last_insert_id)]`.
const LAST_ID_FIELD: &str = "borm_last_id";

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let table = match attrs::table_name(&input.attrs)? {
        Some(t) => quote! { ::core::option::Option::Some(#t) },
        None => quote! { ::core::option::Option::None },
    };

    let mut decls = Vec::new();
    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();

    for (idx, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attr = attrs::field_attr(&field.attrs)?;
        let field_name = ident.to_string();
        let is_pub = matches!(field.vis, Visibility::Public(_));
        let is_last_id =
            attr.last_insert_id.is_some() || field_name.eq_ignore_ascii_case(LAST_ID_FIELD);

        if attr.skip && (is_last_id || attr.get.is_some() || attr.set.is_some()) {
            return Err(syn::Error::new_spanned(
                ident,
                "`skip` cannot be combined with `last_insert_id`, `get` or `set`",
            ));
        }

        let mut decl = quote! { ::borm::FieldDecl::new(#field_name) };
        if let Some(column) = &attr.column {
            decl = quote! { #decl.column(#column) };
        }
        if attr.time {
            decl = quote! { #decl.time() };
        }
        let binding = if attr.skip {
            quote! { ::borm::Binding::Skipped }
        } else if is_pub {
            quote! { ::borm::Binding::Public }
        } else if attr.get.is_some() || attr.set.is_some() {
            let get = attr.get.is_some();
            let set = attr.set.is_some();
            quote! { ::borm::Binding::Accessor { get: #get, set: #set } }
        } else {
            quote! { ::borm::Binding::Private }
        };
        decl = quote! { #decl.binding(#binding) };
        if let Some(returning) = &attr.last_insert_id {
            decl = match returning {
                Some(col) => {
                    quote! { #decl.last_insert_id(::core::option::Option::Some(#col)) }
                }
                None => quote! { #decl.last_insert_id(::core::option::Option::None) },
            };
        }
        decls.push(decl);

        if attr.skip {
            continue;
        }

        if is_last_id {
            set_arms.push(quote! {
                #idx => self.#ident = ::borm::FromValue::from_value(value)?,
            });
        } else if is_pub {
            get_arms.push(quote! {
                #idx => ::borm::ToValue::to_value(&self.#ident),
            });
            set_arms.push(quote! {
                #idx => self.#ident = ::borm::FromValue::from_value(value)?,
            });
        } else {
            if let Some(getter) = &attr.get {
                get_arms.push(quote! {
                    #idx => ::borm::ToValue::to_value(&self.#getter()),
                });
            }
            if let Some(setter) = &attr.set {
                set_arms.push(quote! {
                    #idx => self.#setter(::borm::FromValue::from_value(value)?),
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::borm::Record for #name #ty_generics #where_clause {
            fn describe() -> ::core::option::Option<::borm::StructDecl> {
                ::core::option::Option::Some(::borm::StructDecl {
                    type_name: #type_name,
                    table: #table,
                    fields: ::std::vec![#(#decls),*],
                })
            }

            fn blank() -> Self {
                <Self as ::core::default::Default>::default()
            }

            #[allow(unused_variables)]
            fn get(&self, field: usize) -> ::borm::Value {
                match field {
                    #(#get_arms)*
                    _ => ::borm::Value::Null,
                }
            }

            #[allow(unused_variables)]
            fn set(
                &mut self,
                field: usize,
                value: ::borm::Value,
            ) -> ::core::result::Result<(), ::std::string::String> {
                match field {
                    #(#set_arms)*
                    _ => {}
                }
                ::core::result::Result::Ok(())
            }
        }

        impl #impl_generics ::borm::Destination for #name #ty_generics #where_clause {
            type Item = Self;
            const MANY: bool = false;

            fn reset(&mut self) {}

            fn put(&mut self, item: Self) {
                *self = item;
            }

            fn items(&self) -> ::std::vec::Vec<&Self> {
                ::std::vec![self]
            }

            fn items_mut(&mut self) -> ::std::vec::Vec<&mut Self> {
                ::std::vec![self]
            }
        }
    })
}
