use syn::{GenericArgument, PathArguments, Type};

/// Whether `ident` appears as a path segment anywhere inside `ty`,
/// including generic arguments.
pub fn type_mentions(ty: &Type, ident: &str) -> bool {
    match ty {
        Type::Path(path) => path.path.segments.iter().any(|segment| {
            if segment.ident == ident {
                return true;
            }

            let PathArguments::AngleBracketed(args) = &segment.arguments else {
                return false;
            };

            args.args.iter().any(|arg| match arg {
                GenericArgument::Type(inner) => type_mentions(inner, ident),
                _ => false,
            })
        }),
        Type::Group(group) => type_mentions(&group.elem, ident),
        Type::Paren(paren) => type_mentions(&paren.elem, ident),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn finds_nested_ref_segments() {
        let one: Type = parse_quote!(Option<Ref<Author>>);
        let many: Type = parse_quote!(Vec<ormkit::object::Ref<Tag>>);
        let plain: Type = parse_quote!(Option<String>);

        assert!(type_mentions(&one, "Ref"));
        assert!(type_mentions(&many, "Ref"));
        assert!(!type_mentions(&plain, "Ref"));
    }
}
