//! Field attribute parsing.

use syn::{Data, DeriveInput, Field, Fields, Result};

/// Fields of a struct, or an error spanned on the input.
pub fn struct_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<&'a Fields> {
    match &input.data {
        Data::Struct(data) => Ok(&data.fields),
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

/// `#[dsl(column = "...")]`, if present.
pub fn column_override(field: &Field) -> Result<Option<String>> {
    for attr in &field.attrs {
        if !attr.path().is_ident("dsl") {
            continue;
        }
        let mut column = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                column = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported dsl attribute; expected `column = \"...\"`"))
            }
        })?;
        if column.is_some() {
            return Ok(column);
        }
    }
    Ok(None)
}
