//! Module: source
//! Responsibility: the set of known type declarations, either registered in
//! code or scanned from source roots.
//! Does not own: tag interpretation (see `driver`).

mod scan;


pub use scan::{ScanError, module_path, scan_file, scan_source};

use crate::declaration::TypeDeclaration;
use indexmap::IndexMap;
use ormkit_core::config::SourceRoot;

///
/// SourceIndex
///
/// Declarations keyed by fully qualified type name, in discovery order.
///

#[derive(Clone, Debug, Default)]
pub struct SourceIndex {
    types: IndexMap<String, TypeDeclaration>,
}

impl SourceIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every `.rs` file below each root. `crate::` paths resolve to
    /// the first segment of the root's namespace.
    pub fn scan(roots: &[SourceRoot]) -> Result<Self, ScanError> {
        let mut index = Self::new();
        for root in roots {
            index.scan_root(root)?;
        }

        Ok(index)
    }

    pub fn scan_root(&mut self, root: &SourceRoot) -> Result<(), ScanError> {
        let crate_root = root.namespace.split("::").next().unwrap_or_default();

        for file in scan::rust_files(&root.path)? {
            let module = module_path(root, &file);
            let declarations = scan_file(&file, &module, crate_root)?;
            tracing::trace!(
                file = %file.display(),
                module = module.as_str(),
                types = declarations.len(),
                "scanned source file"
            );

            for declaration in declarations {
                self.register(declaration);
            }
        }

        Ok(())
    }

    /// Add a declaration, replacing one with the same name.
    pub fn register(&mut self, declaration: TypeDeclaration) -> Option<TypeDeclaration> {
        let replaced = self
            .types
            .insert(declaration.name.clone(), declaration);
        if let Some(replaced) = &replaced {
            tracing::debug!(type_name = %replaced.name, "replacing type declaration");
        }

        replaced
    }

    #[must_use]
    pub fn with(mut self, declaration: TypeDeclaration) -> Self {
        self.register(declaration);
        self
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&TypeDeclaration> {
        self.types.get(type_name)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.types.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
