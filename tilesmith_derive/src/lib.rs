//! Attribute macros used across the tilesmith workspace.
//!
//! The only macro is [`context`](macro@context): it wraps the body of a function returning
//! `anyhow::Result` and attaches a formatted context message to every error leaving it.
//!
//! ```
//! use anyhow::{Result, bail};
//! use tilesmith_derive::context;
//!
//! #[context("parsing zoom level '{}'", text)]
//! fn parse_level(text: &str) -> Result<u8> {
//! 	if text.is_empty() {
//! 		bail!("empty input");
//! 	}
//! 	Ok(text.parse()?)
//! }
//!
//! let err = parse_level("").unwrap_err();
//! assert_eq!(format!("{err:#}"), "parsing zoom level '': empty input");
//! ```

mod args;

use crate::args::ContextArgs;
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::{ItemFn, ReturnType, parse_macro_input};

/// Adds `anyhow` context to all errors returned by the annotated function.
///
/// The arguments are passed to `format!`, so they may reference the function's parameters.
/// Prefix them with `move,` when the body has to take ownership of captured values.
#[proc_macro_attribute]
pub fn context(args: TokenStream, input: TokenStream) -> TokenStream {
	let ContextArgs { move_token, format_args } = parse_macro_input!(args as ContextArgs);
	let mut function = parse_macro_input!(input as ItemFn);

	let wrapped = if function.sig.asyncness.is_some() {
		match wrap_async(&function, move_token.as_ref(), &format_args) {
			Ok(body) => body,
			Err(error) => return error.to_compile_error().into(),
		}
	} else {
		wrap_sync(&function, move_token.as_ref(), &format_args)
	};

	function.block.stmts = vec![syn::Stmt::Expr(syn::Expr::Verbatim(wrapped), None)];
	function.into_token_stream().into()
}

fn wrap_async(
	function: &ItemFn,
	move_token: Option<&syn::Token![move]>,
	format_args: &TokenStream2,
) -> syn::Result<TokenStream2> {
	let ReturnType::Type(_, return_type) = &function.sig.output else {
		return Err(syn::Error::new_spanned(
			&function.sig,
			"#[context] requires the function to return a Result",
		));
	};
	let body = &function.block;
	let result = Ident::new("__context_result", Span::mixed_site());
	let err = Ident::new("__context_err", Span::mixed_site());
	Ok(quote! {
		let #result: #return_type = async #move_token { #body }.await;
		#result.map_err(|#err| #err.context(format!(#format_args)).into())
	})
}

fn wrap_sync(function: &ItemFn, move_token: Option<&syn::Token![move]>, format_args: &TokenStream2) -> TokenStream2 {
	let body = &function.block;
	let return_type = &function.sig.output;
	let err = Ident::new("__context_err", Span::mixed_site());
	// a non-Copy value moved into the closure makes borrowck treat it as FnOnce
	let once = Ident::new("__context_once", Span::mixed_site());
	quote! {
		let #once = ::core::iter::empty::<()>();
		(#move_token || #return_type {
			::core::mem::drop(#once);
			#body
		})().map_err(|#err| #err.context(format!(#format_args)).into())
	}
}
