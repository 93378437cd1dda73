use crate::util::type_mentions;
use darling::{FromDeriveInput, FromField, ast::Data, util::Ignored};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Generics, Ident, Type};

///
/// PersistableInput
///

#[derive(FromDeriveInput)]
#[darling(attributes(persistable), supports(struct_named))]
struct PersistableInput {
    ident: Ident,
    generics: Generics,
    data: Data<Ignored, PersistableField>,

    #[darling(default)]
    path: Option<String>,

    #[darling(default, rename = "crate")]
    krate: Option<syn::Path>,

    #[darling(default, multiple, rename = "callback")]
    callbacks: Vec<String>,
}

///
/// PersistableField
///

#[derive(FromField)]
#[darling(attributes(persistable))]
struct PersistableField {
    ident: Option<Ident>,
    ty: Type,

    #[darling(default)]
    skip: bool,

    #[darling(default)]
    rename: Option<String>,

    /// Force association handling for a field whose type does not name `Ref`.
    #[darling(default)]
    association: bool,
}

impl PersistableField {
    fn is_association(&self) -> bool {
        self.association || type_mentions(&self.ty, "Ref")
    }
}

// derive_persistable
pub fn derive_persistable(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let node = match PersistableInput::from_derive_input(&input) {
        Ok(node) => node,
        Err(err) => return err.write_errors(),
    };

    expand(&node)
}

fn expand(node: &PersistableInput) -> TokenStream {
    let ident = &node.ident;
    let (impl_generics, ty_generics, where_clause) = node.generics.split_for_impl();
    let krate = node
        .krate
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::ormkit));

    let path = node.path.as_ref().map_or_else(
        || {
            let local = ident.to_string();
            quote!(concat!(module_path!(), "::", #local))
        },
        |path| quote!(#path),
    );

    // named fields only, enforced by `supports(struct_named)`
    let fields: Vec<(&Ident, String, &PersistableField)> = node
        .data
        .as_ref()
        .take_struct()
        .map(|fields| fields.fields)
        .unwrap_or_default()
        .into_iter()
        .filter(|field| !field.skip)
        .filter_map(|field| {
            let field_ident = field.ident.as_ref()?;
            let name = field
                .rename
                .clone()
                .unwrap_or_else(|| field_ident.to_string());
            Some((field_ident, name, field))
        })
        .collect();

    let (associations, values): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .partition(|(_, _, field)| field.is_association());

    let get_arms = values.iter().map(|(field_ident, name, _)| {
        quote! {
            #name => Some(#krate::traits::FieldValue::to_value(&self.#field_ident)),
        }
    });

    let set_arms = values.iter().map(|(field_ident, name, _)| {
        quote! {
            #name => {
                self.#field_ident = #krate::traits::FieldValue::from_value(value).map_err(|source| {
                    #krate::object::AccessError::invalid_value(<Self as #krate::traits::Path>::PATH, field, source)
                })?;
                Ok(())
            }
        }
    });

    let value_param = if values.is_empty() {
        quote!(_value)
    } else {
        quote!(value)
    };

    let association_methods = if associations.is_empty() {
        quote!()
    } else {
        let get_arms = associations.iter().map(|(field_ident, name, _)| {
            quote! {
                #name => Some(#krate::traits::AssociationValue::to_association(&self.#field_ident)),
            }
        });
        let set_arms = associations.iter().map(|(field_ident, name, _)| {
            quote! {
                #name => {
                    self.#field_ident = #krate::traits::AssociationValue::from_association(association)
                        .map_err(|source| {
                            #krate::object::AccessError::invalid_value(<Self as #krate::traits::Path>::PATH, name, source)
                        })?;
                    Ok(())
                }
            }
        });

        quote! {
            fn get_association(&self, name: &str) -> Option<#krate::object::Association> {
                match name {
                    #(#get_arms)*
                    _ => None,
                }
            }

            fn set_association(
                &mut self,
                name: &str,
                association: #krate::object::Association,
            ) -> Result<(), #krate::object::AccessError> {
                match name {
                    #(#set_arms)*
                    _ => Err(#krate::object::AccessError::unknown_field(<Self as #krate::traits::Path>::PATH, name)),
                }
            }
        }
    };

    let callback_method = if node.callbacks.is_empty() {
        quote!()
    } else {
        let arms = node.callbacks.iter().map(|method| {
            let method_ident = Ident::new(method, ident.span());
            quote! {
                #method => Some(#krate::event::CallbackResult::into_callback_result(
                    self.#method_ident(args),
                )),
            }
        });

        quote! {
            fn invoke_callback(
                &mut self,
                method: &str,
                args: &#krate::event::EventArgs,
            ) -> Option<Result<(), #krate::event::ListenerError>> {
                match method {
                    #(#arms)*
                    _ => None,
                }
            }
        }
    };

    quote! {
        impl #impl_generics #krate::traits::Path for #ident #ty_generics #where_clause {
            const PATH: &'static str = #path;
        }

        impl #impl_generics #krate::object::Persistable for #ident #ty_generics #where_clause {
            fn type_path(&self) -> &'static str {
                <Self as #krate::traits::Path>::PATH
            }

            fn get_value(&self, field: &str) -> Option<#krate::value::Value> {
                match field {
                    #(#get_arms)*
                    _ => None,
                }
            }

            fn set_value(
                &mut self,
                field: &str,
                #value_param: #krate::value::Value,
            ) -> Result<(), #krate::object::AccessError> {
                match field {
                    #(#set_arms)*
                    _ => Err(#krate::object::AccessError::unknown_field(
                        <Self as #krate::traits::Path>::PATH,
                        field,
                    )),
                }
            }

            #association_methods

            #callback_method
        }
    }
}
