//! Module: source::scan
//! Responsibility: read type declarations out of Rust source with `syn`.
//! Named structs become `TypeDeclaration`s; inherent impl methods and `use`
//! imports of the same module are attached to them.

use crate::declaration::{
    DeclaredType, MethodDeclaration, PropertyDeclaration, Representative, TypeDeclaration,
};
use ormkit_core::{config::SourceRoot, metadata::MappingError, value::Value};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};
use syn::{Attribute, Expr, ImplItem, Item, Lit, Meta, UseTree, Visibility};
use thiserror::Error as ThisError;

const ABSTRACT_MARKER: &str = "@abstract";
const EXTENDS_MARKER: &str = "@extends";
const DEFAULT_MARKER: &str = "@default";

///
/// ScanError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum ScanError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },
}

impl ScanError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<ScanError> for MappingError {
    fn from(err: ScanError) -> Self {
        let (path, message) = match err {
            ScanError::Io { path, source } => (path, source.to_string()),
            ScanError::Parse { path, source } => (path, source.to_string()),
        };

        Self::Scan { path, message }
    }
}

/// Every `.rs` file below `dir`, sorted so scans are deterministic.
pub(crate) fn rust_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    collect_rust_files(dir, &mut files).map_err(|source| ScanError::io(dir, source))?;
    files.sort();

    Ok(files)
}

fn collect_rust_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            collect_rust_files(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("rs"))
        {
            out.push(path);
        }
    }

    Ok(())
}

/// Module path of a file below a source root. `lib.rs`, `main.rs`, and
/// `mod.rs` name their directory's module.
#[must_use]
pub fn module_path(root: &SourceRoot, file: &Path) -> String {
    let relative = file.strip_prefix(&root.path).unwrap_or(file);
    let mut segments: Vec<String> = root
        .namespace
        .split("::")
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(parent) = relative.parent() {
        segments.extend(
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        );
    }
    if let Some(stem) = relative.file_stem().map(|s| s.to_string_lossy())
        && !matches!(stem.as_ref(), "lib" | "main" | "mod")
    {
        segments.push(stem.into_owned());
    }

    segments.join("::")
}

/// Read and scan one file.
pub fn scan_file(
    path: &Path,
    module: &str,
    crate_root: &str,
) -> Result<Vec<TypeDeclaration>, ScanError> {
    let source = fs::read_to_string(path).map_err(|source| ScanError::io(path, source))?;

    scan_source(&source, module, crate_root)
        .map(|declarations| {
            declarations
                .into_iter()
                .map(|mut declaration| {
                    declaration.file = Some(path.to_path_buf());
                    declaration
                })
                .collect()
        })
        .map_err(|source| ScanError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Scan source text as the body of `module`. `crate_root` is what a
/// `crate::` path resolves to.
pub fn scan_source(
    source: &str,
    module: &str,
    crate_root: &str,
) -> Result<Vec<TypeDeclaration>, syn::Error> {
    let file = syn::parse_file(source)?;
    let mut out = Vec::new();
    scan_items(&file.items, module, crate_root, &mut out);

    Ok(out)
}

fn scan_items(items: &[Item], module: &str, crate_root: &str, out: &mut Vec<TypeDeclaration>) {
    let mut imports = Vec::new();
    for item in items {
        if let Item::Use(item) = item {
            flatten_use(&item.tree, &mut Vec::new(), &mut imports);
        }
    }
    let imports: Vec<(String, String)> = imports
        .into_iter()
        .filter_map(|(alias, path)| Some((alias, resolve_path(&path, module, crate_root)?)))
        .collect();

    let mut methods: HashMap<String, Vec<MethodDeclaration>> = HashMap::new();
    for item in items {
        if let Item::Impl(block) = item
            && block.trait_.is_none()
            && let syn::Type::Path(self_ty) = block.self_ty.as_ref()
            && let Some(segment) = self_ty.path.segments.last()
        {
            methods
                .entry(segment.ident.to_string())
                .or_default()
                .extend(block.items.iter().filter_map(method_declaration));
        }
    }

    for item in items {
        match item {
            Item::Struct(item) => {
                let local = item.ident.to_string();
                let mut declaration = struct_declaration(item, module);
                declaration.imports.clone_from(&imports);
                declaration.methods = methods.remove(&local).unwrap_or_default();
                let parent = declaration
                    .parent
                    .as_deref()
                    .map(|parent| declaration.qualify(parent));
                declaration.parent = parent;

                out.push(declaration);
            }
            Item::Mod(inner) => {
                if let Some((_, items)) = &inner.content {
                    let nested = join(module, &inner.ident.to_string());
                    scan_items(items, &nested, crate_root, out);
                }
            }
            _ => {}
        }
    }
}

fn struct_declaration(item: &syn::ItemStruct, module: &str) -> TypeDeclaration {
    let mut declaration = TypeDeclaration::new(join(module, &item.ident.to_string()));
    declaration.doc = doc_lines(&item.attrs);

    for line in &declaration.doc {
        if line == ABSTRACT_MARKER {
            declaration.is_abstract = true;
        } else if let Some(parent) = marker_text(line, EXTENDS_MARKER) {
            declaration.parent = Some(parent.to_string());
        }
    }

    if let syn::Fields::Named(fields) = &item.fields {
        declaration.properties = fields
            .named
            .iter()
            .filter_map(|field| {
                let name = field.ident.as_ref()?.to_string();
                let doc = doc_lines(&field.attrs);
                let default = doc
                    .iter()
                    .find_map(|line| marker_text(line, DEFAULT_MARKER))
                    .map(parse_default);

                Some(PropertyDeclaration {
                    name,
                    doc,
                    declared_type: Some(DeclaredType::from_syn(&field.ty)),
                    public: matches!(field.vis, Visibility::Public(_)),
                    default,
                })
            })
            .collect();
    }

    declaration
}

fn method_declaration(item: &ImplItem) -> Option<MethodDeclaration> {
    let ImplItem::Fn(method) = item else {
        return None;
    };

    Some(MethodDeclaration {
        name: method.sig.ident.to_string(),
        public: matches!(method.vis, Visibility::Public(_)),
        is_static: method.sig.receiver().is_none(),
    })
}

/// `///` and `#[doc = "..."]` lines, one entry per source line.
fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(text) => Some(text.value()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .flat_map(|text| {
            text.lines()
                .map(|line| line.trim().trim_start_matches('*').trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Text after a marker word, or `None` when the line is another tag.
fn marker_text<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    Some(rest.trim())
}

/// JSON when it parses, plain text otherwise.
fn parse_default(text: &str) -> Representative {
    serde_json::from_str::<serde_json::Value>(text).map_or_else(
        |_| Representative::Scalar(Value::Text(text.to_string())),
        Representative::from_json,
    )
}

fn flatten_use(tree: &UseTree, prefix: &mut Vec<String>, out: &mut Vec<(String, Vec<String>)>) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            flatten_use(&path.tree, prefix, out);
            prefix.pop();
        }
        UseTree::Name(name) if name.ident == "self" => {
            if let Some(last) = prefix.last() {
                out.push((last.clone(), prefix.clone()));
            }
        }
        UseTree::Name(name) => {
            let mut path = prefix.clone();
            path.push(name.ident.to_string());
            out.push((name.ident.to_string(), path));
        }
        UseTree::Rename(rename) => {
            let mut path = prefix.clone();
            if rename.ident != "self" {
                path.push(rename.ident.to_string());
            }
            out.push((rename.rename.to_string(), path));
        }
        UseTree::Group(group) => {
            for tree in &group.items {
                flatten_use(tree, prefix, out);
            }
        }
        UseTree::Glob(_) => {}
    }
}

/// Absolute module path for a `use` path; `None` when `super` climbs past
/// the crate root.
fn resolve_path(segments: &[String], module: &str, crate_root: &str) -> Option<String> {
    let mut base: Vec<&str> = Vec::new();
    let mut rest = segments;

    match segments.first().map(String::as_str) {
        Some("crate") => {
            base = split(crate_root);
            rest = &segments[1..];
        }
        Some("self") => {
            base = split(module);
            rest = &segments[1..];
        }
        Some("super") => {
            base = split(module);
            while let Some((first, tail)) = rest.split_first()
                && first == "super"
            {
                base.pop()?;
                rest = tail;
            }
        }
        _ => {}
    }

    let path: Vec<&str> = base
        .into_iter()
        .chain(rest.iter().map(String::as_str))
        .collect();

    Some(path.join("::"))
}

fn split(path: &str) -> Vec<&str> {
    path.split("::").filter(|s| !s.is_empty()).collect()
}

fn join(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{module}::{name}")
    }
}
