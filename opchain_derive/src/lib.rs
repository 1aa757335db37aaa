//! Derive macros for the opchain crate.
//!
//! Provides `#[derive(Error)]`, which generates `Display` and
//! `std::error::Error` implementations from `#[error("...")]` attributes.

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` for an error enum or struct.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
