//! Procedural macros for cppabi
//!
//! Provides:
//! - `#[mirror_enum(...)]` - Turn a fieldless enum into a fixed-width interop tag
//!
//! ## Mirroring
//!
//! The C API hands out enumerations that are numerically identical to the
//! compiler front-end's own enumerations (optionally shifted by a constant so
//! that `0` can mean `Invalid`). `#[mirror_enum]` writes that contract down once:
//!
//! ```ignore
//! #[mirror_enum(repr = i32, upstream = layout::ComponentKind, convert)]
//! pub enum VTableEntryKind {
//!     VCallOffset,
//!     #[mirror(Rtti)]
//!     RTTI,
//!     #[mirror(skip)]
//!     Invalid,
//! }
//! ```
//!
//! For every non-skipped variant the macro emits a `const` assertion
//! `Mirror::Variant == upstream::Variant + offset`, so drift in the front-end
//! breaks the build instead of silently changing the wire format. With
//! `convert` it also emits an exhaustive `From<upstream>` match, which fails to
//! compile when the front-end grows a variant the mirror does not know about.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Fields, Ident, ItemEnum, LitInt, LitStr, Path, parse_macro_input, spanned::Spanned};

/// Configuration parsed from the `#[mirror_enum(...)]` arguments
#[derive(Default)]
struct MirrorConfig {
    /// Integer representation (`repr = i32`)
    repr: Option<Ident>,
    /// Front-end enumeration or constant module the variants mirror
    upstream: Option<Path>,
    /// Added to every upstream value (`offset = 1`)
    offset: i64,
    /// Generate `From<upstream>`
    convert: bool,
}

/// How a single variant relates to the upstream enumeration
enum VariantMirror {
    /// Mirrors the upstream item with this name
    Named(Ident),
    /// Local-only variant (Invalid sentinels)
    Skip,
}

/// Mirror a front-end enumeration as a fixed-width interop enum.
///
/// # Arguments
/// - `repr = <int>` - required integer representation
/// - `upstream = <path>` - optional path of the mirrored enum or constant module
/// - `offset = <int>` - optional shift applied to upstream values
/// - `convert` - generate `From<upstream>` (requires `upstream` to be an enum)
///
/// Variants may carry `#[mirror(UpstreamName)]` when the names differ, or
/// `#[mirror(skip)]` for local sentinels.
///
/// Generates `#[repr]`, the usual derives, `from_raw`/`to_raw` and the
/// compile-time checks described in the crate docs.
#[proc_macro_attribute]
pub fn mirror_enum(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut config = MirrorConfig::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("repr") {
            config.repr = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("upstream") {
            config.upstream = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("offset") {
            let lit: LitInt = meta.value()?.parse()?;
            config.offset = lit.base10_parse()?;
            Ok(())
        } else if meta.path.is_ident("convert") {
            config.convert = true;
            Ok(())
        } else {
            Err(meta.error("unsupported mirror_enum argument, expected `repr`, `upstream`, `offset` or `convert`"))
        }
    });
    parse_macro_input!(attr with parser);

    let input = parse_macro_input!(item as ItemEnum);

    match mirror_enum_internal(config, input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn mirror_enum_internal(config: MirrorConfig, mut input: ItemEnum) -> Result<TokenStream2, syn::Error> {
    let Some(repr) = config.repr.clone() else {
        return Err(syn::Error::new(
            input.ident.span(),
            "mirror_enum requires `repr = <integer type>`",
        ));
    };
    validate_repr(&repr)?;
    validate_enum(&input, &config)?;

    let name = input.ident.clone();
    let mut mirrors = Vec::with_capacity(input.variants.len());
    for variant in &mut input.variants {
        let mirror = take_mirror_attr(&mut variant.attrs)?.unwrap_or_else(|| VariantMirror::Named(variant.ident.clone()));
        mirrors.push((variant.ident.clone(), mirror));
    }

    let all_variants: Vec<&Ident> = mirrors.iter().map(|(ident, _)| ident).collect();
    let mirrored: Vec<(&Ident, &Ident)> = mirrors
        .iter()
        .filter_map(|(ident, mirror)| match mirror {
            VariantMirror::Named(upstream) => Some((ident, upstream)),
            VariantMirror::Skip => None,
        })
        .collect();

    let checks = match &config.upstream {
        Some(upstream) => {
            let offset = config.offset;
            let asserts = mirrored.iter().map(|(ident, upstream_ident)| {
                let message = LitStr::new(
                    &format!("{name}::{ident} no longer matches its front-end value"),
                    ident.span(),
                );
                quote! {
                    assert!((#name::#ident as i64) == (#upstream::#upstream_ident as i64) + #offset, #message);
                }
            });
            quote! {
                const _: () = {
                    #(#asserts)*
                };
            }
        }
        None => quote! {},
    };

    let conversion = match (&config.upstream, config.convert) {
        (Some(upstream), true) => {
            let arms = mirrored.iter().map(|(ident, upstream_ident)| {
                quote! { #upstream::#upstream_ident => Self::#ident, }
            });
            quote! {
                impl ::core::convert::From<#upstream> for #name {
                    fn from(value: #upstream) -> Self {
                        match value {
                            #(#arms)*
                        }
                    }
                }
            }
        }
        _ => quote! {},
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let variants = input.variants.iter();

    Ok(quote! {
        #(#attrs)*
        #[repr(#repr)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #vis enum #name {
            #(#variants,)*
        }

        impl #name {
            /// Returns the variant with the given raw value, if any
            pub const fn from_raw(raw: #repr) -> ::core::option::Option<Self> {
                #(
                    if raw == Self::#all_variants as #repr {
                        return ::core::option::Option::Some(Self::#all_variants);
                    }
                )*
                ::core::option::Option::None
            }

            /// Returns the raw value passed across the C API
            pub const fn to_raw(self) -> #repr {
                self as #repr
            }
        }

        #checks

        #conversion
    })
}

/// Validates that `repr` names a primitive integer type
fn validate_repr(repr: &Ident) -> Result<(), syn::Error> {
    const INTEGERS: &[&str] = &["u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64"];
    if INTEGERS.iter().any(|int| repr == int) {
        Ok(())
    } else {
        Err(syn::Error::new(
            repr.span(),
            format!("mirror_enum repr must be a primitive integer type, got `{repr}`"),
        ))
    }
}

/// Validates the enum shape and argument combination
fn validate_enum(input: &ItemEnum, config: &MirrorConfig) -> Result<(), syn::Error> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "mirror_enum does not support generic enums",
        ));
    }
    if input.variants.is_empty() {
        return Err(syn::Error::new(
            input.ident.span(),
            "mirror_enum requires at least one variant",
        ));
    }
    for variant in &input.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "mirror_enum variants must not carry data",
            ));
        }
    }
    for attr in &input.attrs {
        if attr.path().is_ident("repr") {
            return Err(syn::Error::new(
                attr.span(),
                "mirror_enum emits #[repr] itself, pass `repr = ...` instead",
            ));
        }
    }
    if config.convert && config.upstream.is_none() {
        return Err(syn::Error::new(
            input.ident.span(),
            "`convert` requires `upstream = <enum path>`",
        ));
    }
    if config.offset != 0 && config.upstream.is_none() {
        return Err(syn::Error::new(
            input.ident.span(),
            "`offset` requires `upstream = <path>`",
        ));
    }
    Ok(())
}

/// Removes `#[mirror(...)]` from a variant's attributes and parses it
fn take_mirror_attr(attrs: &mut Vec<Attribute>) -> Result<Option<VariantMirror>, syn::Error> {
    let mut found = None;
    let mut error = None;
    attrs.retain(|attr| {
        if !attr.path().is_ident("mirror") {
            return true;
        }
        match attr.parse_args::<Ident>() {
            Ok(ident) if ident == "skip" => found = Some(VariantMirror::Skip),
            Ok(ident) => found = Some(VariantMirror::Named(ident)),
            Err(_) => {
                error = Some(syn::Error::new(
                    attr.span(),
                    "expected `#[mirror(UpstreamName)]` or `#[mirror(skip)]`",
                ))
            }
        }
        false
    });
    match error {
        Some(err) => Err(err),
        None => Ok(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(attr: TokenStream2, item: TokenStream2) -> Result<String, String> {
        let mut config = MirrorConfig::default();
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("repr") {
                config.repr = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("upstream") {
                config.upstream = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("offset") {
                let lit: LitInt = meta.value()?.parse()?;
                config.offset = lit.base10_parse()?;
            } else if meta.path.is_ident("convert") {
                config.convert = true;
            }
            Ok(())
        });
        syn::parse::Parser::parse2(parser, attr).map_err(|e| e.to_string())?;
        let input: ItemEnum = syn::parse2(item).map_err(|e| e.to_string())?;
        mirror_enum_internal(config, input)
            .map(|tokens| tokens.to_string())
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_requires_repr() {
        let err = expand(quote! {}, quote! { enum Kind { A } }).unwrap_err();
        assert!(err.contains("requires `repr"));
    }

    #[test]
    fn test_rejects_non_integer_repr() {
        let err = expand(quote! { repr = f32 }, quote! { enum Kind { A } }).unwrap_err();
        assert!(err.contains("primitive integer"));
    }

    #[test]
    fn test_rejects_data_variants() {
        let err = expand(quote! { repr = i32 }, quote! { enum Kind { A(u8) } }).unwrap_err();
        assert!(err.contains("must not carry data"));
    }

    #[test]
    fn test_convert_requires_upstream() {
        let err = expand(quote! { repr = i32, convert }, quote! { enum Kind { A } }).unwrap_err();
        assert!(err.contains("requires `upstream"));
    }

    #[test]
    fn test_skip_variant_has_no_check() {
        let out = expand(
            quote! { repr = i32, upstream = up::Kind, offset = 1, convert },
            quote! {
                enum Kind {
                    #[mirror(skip)]
                    Invalid,
                    #[mirror(Renamed)]
                    A,
                }
            },
        )
        .unwrap();
        assert!(out.contains("up :: Kind :: Renamed"));
        assert!(!out.contains("up :: Kind :: Invalid"));
        assert!(!out.contains("# [mirror"));
    }

    #[test]
    fn test_extra_derives_and_default_pass_through() {
        let out = expand(
            quote! { repr = i32 },
            quote! {
                #[derive(Default)]
                enum Kind {
                    #[default]
                    A,
                    B,
                }
            },
        )
        .unwrap();
        assert!(out.contains("# [derive (Default)]"));
        assert!(out.contains("# [default] A"));
    }
}
