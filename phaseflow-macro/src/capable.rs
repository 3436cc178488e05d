use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

const CAPABILITIES: [(&str, &str); 4] = [
    ("initialise", "Initialise"),
    ("start", "Start"),
    ("stop", "Stop"),
    ("dispose", "Dispose"),
];

pub fn derive_capable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    generate_capable_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn generate_capable_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let variants = parse_capabilities(input)?
        .into_iter()
        .map(|variant| syn::Ident::new(variant, proc_macro2::Span::call_site()));

    Ok(quote! {
        impl #impl_generics ::phaseflow::lifecycle::Capable for #name #ty_generics #where_clause {
            const CAPABILITIES: ::phaseflow::lifecycle::Capabilities =
                ::phaseflow::lifecycle::Capabilities::NONE
                    #(.with(::phaseflow::lifecycle::Capability::#variants))*;
        }
    })
}

/// Collect the enum variants named by every `#[lifecycle(...)]` attribute,
/// in lifecycle order and without duplicates
fn parse_capabilities(input: &DeriveInput) -> syn::Result<Vec<&'static str>> {
    let mut selected = [false; CAPABILITIES.len()];

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("lifecycle")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("all") {
                selected = [true; CAPABILITIES.len()];
                return Ok(());
            }
            let position = CAPABILITIES
                .iter()
                .position(|(key, _)| meta.path.is_ident(key))
                .ok_or_else(|| {
                    meta.error("expected one of `initialise`, `start`, `stop`, `dispose`, `all`")
                })?;
            selected[position] = true;
            Ok(())
        })?;
    }

    Ok(CAPABILITIES
        .iter()
        .zip(selected)
        .filter(|(_, on)| *on)
        .map(|((_, variant), _)| *variant)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_collects_in_lifecycle_order() {
        let input: DeriveInput = parse_quote! {
            #[lifecycle(dispose, initialise)]
            #[lifecycle(dispose)]
            struct Store;
        };
        assert_eq!(parse_capabilities(&input).unwrap(), vec!["Initialise", "Dispose"]);
    }

    #[test]
    fn test_all() {
        let input: DeriveInput = parse_quote! {
            #[lifecycle(all)]
            struct Connector;
        };
        assert_eq!(parse_capabilities(&input).unwrap().len(), 4);
    }

    #[test]
    fn test_no_attribute_means_no_capabilities() {
        let input: DeriveInput = parse_quote! {
            struct Plain;
        };
        assert!(parse_capabilities(&input).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unknown_name() {
        let input: DeriveInput = parse_quote! {
            #[lifecycle(restart)]
            struct Broken;
        };
        let err = parse_capabilities(&input).unwrap_err();
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn test_generates_impl_for_generics() {
        let input: DeriveInput = parse_quote! {
            #[lifecycle(start)]
            struct Pool<T: Send> { inner: T }
        };
        let tokens = generate_capable_impl(&input).unwrap().to_string();
        assert!(tokens.contains("Capable for Pool < T >"));
        assert!(tokens.contains("Capability :: Start"));
    }
}
