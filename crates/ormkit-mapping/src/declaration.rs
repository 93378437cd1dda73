//! Module: declaration
//! Responsibility: the source-level shape of a mapped type, as read by the
//! scanner or registered in code.
//! Does not own: tag interpretation (see `tag` and `driver`).

use ormkit_core::value::Value;
use quote::ToTokens;
use std::{fmt, path::PathBuf};

///
/// DeclaredType
///
/// A member's declared value type, kept as written: the path and its
/// generic arguments.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeclaredType {
    pub name: String,
    pub args: Vec<Self>,
}

impl DeclaredType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: Self) -> Self {
        self.args.push(arg);
        self
    }

    /// Parse Rust type syntax such as `Option<Vec<Ref<User>>>`.
    pub fn parse(text: &str) -> Result<Self, syn::Error> {
        syn::parse_str::<syn::Type>(text).map(|ty| Self::from_syn(&ty))
    }

    #[must_use]
    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(path) if path.qself.is_none() => {
                let name = path
                    .path
                    .segments
                    .iter()
                    .map(|segment| segment.ident.to_string())
                    .collect::<Vec<_>>()
                    .join("::");
                let args = path
                    .path
                    .segments
                    .last()
                    .map(|segment| match &segment.arguments {
                        syn::PathArguments::AngleBracketed(generic) => generic
                            .args
                            .iter()
                            .filter_map(|arg| match arg {
                                syn::GenericArgument::Type(ty) => Some(Self::from_syn(ty)),
                                _ => None,
                            })
                            .collect(),
                        _ => Vec::new(),
                    })
                    .unwrap_or_default();

                Self { name, args }
            }
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Paren(inner) => Self::from_syn(&inner.elem),
            syn::Type::Group(inner) => Self::from_syn(&inner.elem),
            other => Self::new(other.to_token_stream().to_string()),
        }
    }

    /// Last path segment.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn is_option(&self) -> bool {
        self.local_name() == "Option" && self.args.len() == 1
    }

    /// `Option<T>` unwrapped to `T`; anything else is returned as is.
    #[must_use]
    pub fn without_option(&self) -> &Self {
        if self.is_option() { &self.args[0] } else { self }
    }

    /// Element type of a collection (`Vec<T>`, `BTreeSet<T>`, ...).
    #[must_use]
    pub fn collection_element(&self) -> Option<&Self> {
        match (self.local_name(), self.args.as_slice()) {
            ("Vec" | "VecDeque" | "BTreeSet" | "HashSet" | "IndexSet" | "LinkedList", [element]) => {
                Some(element)
            }
            _ => None,
        }
    }

    /// Strip handle wrappers that stand in for the referenced type.
    #[must_use]
    pub fn referent(&self) -> &Self {
        match (self.local_name(), self.args.as_slice()) {
            ("Ref" | "Box" | "Rc" | "Arc", [inner]) => inner.referent(),
            _ => self,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }

        Ok(())
    }
}

///
/// Representative
///
/// The value a member holds on a freshly constructed instance.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Representative {
    Null,
    Scalar(Value),

    /// A list; only representable as a default when encoded as JSON.
    Array(serde_json::Value),

    /// A structured value with an optional plain text form.
    Object {
        text: Option<String>,
        json: serde_json::Value,
    },
}

impl Representative {
    /// Build from JSON: arrays and objects keep their structure, everything
    /// else becomes a scalar.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Array(_) => Self::Array(json),
            serde_json::Value::Object(_) => Self::Object { text: None, json },
            scalar => Self::Scalar(Value::from_json(scalar)),
        }
    }

    /// What `Default::default()` yields for a declared type, when that is
    /// known without running code.
    #[must_use]
    pub fn for_type(declared: &DeclaredType) -> Option<Self> {
        if declared.is_option() {
            return Some(Self::Null);
        }
        if declared.collection_element().is_some() {
            return Some(Self::Array(serde_json::Value::Array(Vec::new())));
        }

        let representative = match declared.local_name() {
            "bool" => Self::Scalar(Value::Bool(false)),
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => Self::Scalar(Value::Int(0)),
            "f32" | "f64" => Self::Scalar(Value::Float(0.0)),
            "String" | "str" => Self::Scalar(Value::Text(String::new())),
            "HashMap" | "BTreeMap" | "IndexMap" => Self::Object {
                text: None,
                json: serde_json::Value::Object(serde_json::Map::new()),
            },
            "Value" if declared.name.starts_with("serde_json") => Self::Null,
            _ => return None,
        };

        Some(representative)
    }
}

///
/// PropertyDeclaration
///

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDeclaration {
    pub name: String,
    pub doc: Vec<String>,
    pub declared_type: Option<DeclaredType>,
    pub public: bool,
    pub default: Option<Representative>,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: Vec::new(),
            declared_type: None,
            public: false,
            default: None,
        }
    }

    #[must_use]
    pub fn doc(mut self, line: impl Into<String>) -> Self {
        self.doc.push(line.into());
        self
    }

    #[must_use]
    pub fn typed(mut self, declared_type: DeclaredType) -> Self {
        self.declared_type = Some(declared_type);
        self
    }

    #[must_use]
    pub const fn public(mut self) -> Self {
        self.public = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Representative) -> Self {
        self.default = Some(default);
        self
    }
}

///
/// MethodDeclaration
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodDeclaration {
    pub name: String,
    pub public: bool,

    /// No `self` receiver.
    pub is_static: bool,
}

impl MethodDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: true,
            is_static: false,
        }
    }
}

///
/// TypeDeclaration
///

#[derive(Clone, Debug, PartialEq)]
pub struct TypeDeclaration {
    /// Fully qualified path, e.g. `app::model::Bug`.
    pub name: String,
    pub doc: Vec<String>,

    /// Declaring file; `None` for declarations registered in code.
    pub file: Option<PathBuf>,
    pub is_abstract: bool,
    pub parent: Option<String>,

    /// Local alias to fully qualified path, from `use` items.
    pub imports: Vec<(String, String)>,
    pub properties: Vec<PropertyDeclaration>,
    pub methods: Vec<MethodDeclaration>,
}

impl TypeDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: Vec::new(),
            file: None,
            is_abstract: false,
            parent: None,
            imports: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn doc(mut self, line: impl Into<String>) -> Self {
        self.doc.push(line.into());
        self
    }

    #[must_use]
    pub const fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn import(mut self, alias: impl Into<String>, path: impl Into<String>) -> Self {
        self.imports.push((alias.into(), path.into()));
        self
    }

    #[must_use]
    pub fn property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.name.rsplit_once("::").map_or("", |(ns, _)| ns)
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&MethodDeclaration> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Resolve a type name as written inside this declaration's module:
    /// imports first, then the module itself. Paths that already contain a
    /// separator are resolved by their first segment only.
    #[must_use]
    pub fn qualify(&self, written: &str) -> String {
        let written = written.trim_start_matches("::");
        let (head, tail) = match written.split_once("::") {
            Some((head, tail)) => (head, Some(tail)),
            None => (written, None),
        };

        let imported = self
            .imports
            .iter()
            .rev()
            .find(|(alias, _)| alias == head)
            .map(|(_, path)| path.clone());

        match (imported, tail) {
            (Some(path), Some(tail)) => format!("{path}::{tail}"),
            (Some(path), None) => path,
            (None, Some(_)) => written.to_string(),
            (None, None) if self.namespace().is_empty() => written.to_string(),
            (None, None) => format!("{}::{written}", self.namespace()),
        }
    }
}
