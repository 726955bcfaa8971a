//! Derive macros for Gatherly action enums.
//!
//! Every store in Gatherly is driven by one action enum that mixes three kinds
//! of variants: commands (requests), events (accepted changes) and rejections
//! (validation outcomes that leave state untouched). `#[derive(Action)]`
//! generates the classification helpers so reducers and tests can ask which
//! kind they are holding.
//!
//! # Example
//!
//! ```ignore
//! use gatherly_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum UserAction {
//!     #[command]
//!     FollowUser { actor: UserId, target: UserId },
//!
//!     #[event]
//!     Followed { actor: UserId, target: UserId },
//!
//!     #[rejection]
//!     ValidationFailed { error: UserRejection },
//! }
//!
//! assert!(UserAction::FollowUser { .. }.is_command());
//! assert_eq!(UserAction::Followed { .. }.event_type(), "Followed.v1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, Variant};

const KINDS: [&str; 3] = ["command", "event", "rejection"];

/// Derive macro for action enums
///
/// Generates:
/// - `is_command()` - variant marked `#[command]`
/// - `is_event()` - variant marked `#[event]`
/// - `is_rejection()` - variant marked `#[rejection]`
/// - `event_type()` - `"<Variant>.v1"` for events, `"unknown"` otherwise
///
/// A variant may carry at most one of the three attributes; violating that,
/// or deriving on a non-enum, is a compile error.
#[proc_macro_derive(Action, attributes(command, event, rejection))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut commands = Vec::new();
    let mut events = Vec::new();
    let mut rejections = Vec::new();

    for variant in &data_enum.variants {
        let marked: Vec<&str> = KINDS
            .iter()
            .copied()
            .filter(|kind| has_attribute(&variant.attrs, kind))
            .collect();

        if marked.len() > 1 {
            return syn::Error::new_spanned(
                variant,
                "Variant can carry only one of #[command], #[event] or #[rejection]",
            )
            .to_compile_error()
            .into();
        }

        match marked.first() {
            Some(&"command") => commands.push(variant),
            Some(&"event") => events.push(variant),
            Some(&"rejection") => rejections.push(variant),
            _ => {}
        }
    }

    let is_command_arms = commands.iter().map(|v| arm(v, &quote! { true }));
    let is_event_arms = events.iter().map(|v| arm(v, &quote! { true }));
    let is_rejection_arms = rejections.iter().map(|v| arm(v, &quote! { true }));
    let event_type_arms = events.iter().map(|v| {
        let type_name = format!("{}.v1", v.ident);
        arm(v, &quote! { #type_name })
    });

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an accepted event
            #[must_use]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#is_event_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action records a rejected command
            #[must_use]
            pub const fn is_rejection(&self) -> bool {
                match self {
                    #(#is_rejection_arms)*
                    _ => false,
                }
            }

            /// Returns the versioned event type name
            ///
            /// Only events have type names. Everything else returns "unknown".
            #[must_use]
            pub const fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                    _ => "unknown",
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Builds `Self::Variant { .. } => body,` with the right pattern for the field shape
fn arm(variant: &Variant, body: &proc_macro2::TokenStream) -> proc_macro2::TokenStream {
    let ident: &Ident = &variant.ident;
    match variant.fields {
        Fields::Named(_) => quote! { Self::#ident { .. } => #body, },
        Fields::Unnamed(_) => quote! { Self::#ident(..) => #body, },
        Fields::Unit => quote! { Self::#ident => #body, },
    }
}

fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
