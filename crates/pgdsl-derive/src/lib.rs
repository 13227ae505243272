//! Derive macros for pgdsl
//!
//! Provides `#[derive(FromRecord)]` (bind by name) and `#[derive(FromArgs)]`
//! (bind by position) for projection targets.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attr;
mod from_args;
mod from_record;

/// Derive `FromRecord` for a struct with named fields.
///
/// Each field reads the result column whose label matches the field name.
///
/// ```ignore
/// use pgdsl::FromRecord;
///
/// #[derive(FromRecord)]
/// struct UserDto {
///     name: Option<String>,
///     #[dsl(column = "member_age")]
///     age: i32,
/// }
/// ```
///
/// # Attributes
///
/// - `#[dsl(column = "label")]` - Read a differently named column
#[proc_macro_derive(FromRecord, attributes(dsl))]
pub fn derive_from_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromArgs` for a struct.
///
/// Fields are bound from the selected columns in declaration order, like a
/// constructor call. Works for named and tuple structs.
///
/// ```ignore
/// use pgdsl::FromArgs;
///
/// #[derive(FromArgs)]
/// struct MemberDto {
///     username: Option<String>,
///     age: i32,
/// }
///
/// let projection = pgdsl::constructor::<MemberDto>([
///     member.username.item(),
///     member.age.item(),
/// ])?;
/// ```
#[proc_macro_derive(FromArgs)]
pub fn derive_from_args(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_args::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
