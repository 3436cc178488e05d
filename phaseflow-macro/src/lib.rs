use proc_macro::TokenStream;

mod capable;

/// Derive macro declaring which lifecycle behaviors a type supports
///
/// Generates an implementation of `phaseflow::lifecycle::Capable` whose
/// `CAPABILITIES` constant holds the listed behaviors. Accepted names are
/// `initialise`, `start`, `stop`, `dispose` and `all`; several
/// `#[lifecycle]` attributes are merged.
///
/// # Example
/// ```ignore
/// use phaseflow::prelude::*;
///
/// #[derive(Capable)]
/// #[lifecycle(start, stop)]
/// pub struct HttpListener {
///     port: u16,
/// }
///
/// assert!(HttpListener::CAPABILITIES.contains(Capability::Start));
/// ```
#[proc_macro_derive(Capable, attributes(lifecycle))]
pub fn derive_capable(input: TokenStream) -> TokenStream {
    capable::derive_capable(input)
}
