//! FromArgs derive macro implementation

use crate::attr::struct_fields;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = struct_fields(&input, "FromArgs")?;
    let types: Vec<_> = fields.iter().map(|f| &f.ty).collect();
    let arity = types.len();

    let binds = types.iter().enumerate().map(|(idx, ty)| {
        quote! { pgdsl::bind_arg::<#ty>(args, #idx)? }
    });

    let construct = match fields {
        Fields::Named(named) => {
            let names = named.named.iter().filter_map(|f| f.ident.as_ref());
            quote! { Self { #(#names: #binds),* } }
        }
        Fields::Unnamed(_) => quote! { Self ( #(#binds),* ) },
        Fields::Unit => quote! { Self },
    };
    Ok(quote! {
        impl #impl_generics pgdsl::FromArgs for #name #ty_generics #where_clause {
            const ARITY: usize = #arity;

            fn arg_kinds() -> ::std::vec::Vec<pgdsl::ValueKind> {
                ::std::vec![#(<#types as pgdsl::FromValue>::KIND),*]
            }

            fn from_args(args: &[pgdsl::Value]) -> ::core::result::Result<Self, pgdsl::ProjectionError> {
                pgdsl::check_arity(args, Self::ARITY)?;
                Ok(#construct)
            }
        }
    })
}
