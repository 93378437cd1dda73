use proc_macro::TokenStream;

mod persistable;
mod util;

/// Generate `Path` and `Persistable` for a struct with named fields.
///
/// Container attributes: `path = "..."`, `crate = "..."`, and one
/// `callback = "method"` per lifecycle callback method. Field attributes:
/// `skip`, `rename = "..."`, `association`.
#[proc_macro_derive(Persistable, attributes(persistable))]
pub fn derive_persistable(input: TokenStream) -> TokenStream {
    persistable::derive_persistable(input.into()).into()
}
