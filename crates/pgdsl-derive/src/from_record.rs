//! FromRecord derive macro implementation

use crate::attr::{column_override, struct_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match struct_fields(&input, "FromRecord")? {
        Fields::Named(fields) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRecord can only be derived for structs with named fields",
            ));
        }
    };

    let mut field_extracts = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let column = column_override(field)?.unwrap_or_else(|| field_name.to_string());
        field_extracts.push(quote! {
            #field_name: record.get::<#ty>(#column)?
        });
    }

    Ok(quote! {
        impl #impl_generics pgdsl::FromRecord for #name #ty_generics #where_clause {
            fn from_record(record: &pgdsl::Record) -> ::core::result::Result<Self, pgdsl::ProjectionError> {
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
