//! `#[derive(Error)]` expansion.
//!
//! ```ignore
//! use opchain_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum EngineError {
//!     #[error("slot {slot} out of range")]
//!     SlotOutOfRange { slot: u8 },
//!
//!     #[error("decode error: {0}")]
//!     Decode(String),
//!
//!     #[error("engine already ran")]
//!     AlreadyRan,
//! }
//! ```
//!
//! Tuple fields are referenced positionally (`{0}`), named fields by name.
//! Every variant must carry a message.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let ident = &variant.ident;
                    let message = message_from(&variant.attrs, variant)?;
                    Ok(match &variant.fields {
                        Fields::Unit => quote! { Self::#ident => write!(f, #message), },
                        Fields::Unnamed(fields) => {
                            let bindings = positional_bindings(fields.unnamed.len());
                            let format = positional_to_named(&message, fields.unnamed.len());
                            quote! {
                                Self::#ident(#(#bindings),*) => write!(f, #format, #(#bindings = #bindings),*),
                            }
                        }
                        Fields::Named(fields) => {
                            let names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                            // Only interpolate the fields the message actually mentions.
                            let used: Vec<_> = names
                                .iter()
                                .filter(|n| mentions(&message, n))
                                .collect();
                            quote! {
                                #[allow(unused_variables)]
                                Self::#ident { #(#names),* } => write!(f, #message, #(#used = #used),*),
                            }
                        }
                    })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! { match self { #(#arms)* } }
        }
        Data::Struct(data) => {
            let message = message_from(&input.attrs, &input.ident)?;
            match &data.fields {
                Fields::Unit => quote! { write!(f, #message) },
                Fields::Named(fields) => {
                    let used: Vec<_> = fields
                        .named
                        .iter()
                        .map(|f| &f.ident)
                        .filter(|n| mentions(&message, n))
                        .collect();
                    quote! { write!(f, #message, #(#used = self.#used),*) }
                }
                Fields::Unnamed(fields) => {
                    let bindings = positional_bindings(fields.unnamed.len());
                    let indices = (0..fields.unnamed.len()).map(syn::Index::from);
                    let format = positional_to_named(&message, fields.unnamed.len());
                    quote! { write!(f, #format, #(#bindings = self.#indices),*) }
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Reads the string literal out of `#[error("...")]`.
fn message_from<T: ToTokens>(attrs: &[Attribute], target: &T) -> syn::Result<String> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                target,
                "missing #[error(\"...\")] attribute; every error needs a display message",
            )
        })?;
    attr.parse_args::<LitStr>()
        .map(|lit| lit.value())
        .map_err(|_| {
            syn::Error::new_spanned(
                &attr.meta,
                "expected a string literal, e.g. #[error(\"slot {slot} out of range\")]",
            )
        })
}

fn positional_bindings(count: usize) -> Vec<syn::Ident> {
    (0..count).map(|i| format_ident!("f{}", i)).collect()
}

/// Rewrites `{0}` / `{1:?}` into `{f0}` / `{f1:?}` so tuple fields can be
/// passed as named format arguments.
fn positional_to_named(message: &str, count: usize) -> String {
    let mut out = message.to_string();
    for i in (0..count).rev() {
        out = out
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    out
}

fn mentions(message: &str, field: &Option<syn::Ident>) -> bool {
    let Some(field) = field else { return false };
    let field = field.to_string();
    message.contains(&format!("{{{field}}}")) || message.contains(&format!("{{{field}:"))
}
