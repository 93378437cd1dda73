//! Module: driver
//! Responsibility: the reflection mapping driver. Reads type and member tags
//! from declarations and loads them into class metadata.
//! Does not own: inheritance composition or caching of finished metadata
//! (see `ormkit_core::factory`).
//!
//! Invariants:
//! - Declarations from files outside the configured roots are rejected.
//! - Untagged types are transient; untagged abstract types are mapped
//!   superclasses.
//! - Member collection is cached per type; failed collections are not.

mod join;
mod member;


use crate::{
    declaration::TypeDeclaration,
    descriptor::Parameters,
    inflector::table_name,
    source::{ScanError, SourceIndex},
    tag::{DocBlock, TagKind, parse_parameters},
};
use member::{Collected, GeneratorChoice};
use ormkit_core::{
    config::{Configuration, DriverFlags},
    event::Event,
    factory::MappingDriver,
    metadata::{ClassMetadata, ListenerBinding, MappingError, TableInfo},
};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

///
/// ReflectionDriver
///

pub struct ReflectionDriver {
    index: SourceIndex,
    roots: Vec<PathBuf>,
    flags: DriverFlags,
    prefix: String,
    collected: RwLock<HashMap<String, Arc<Collected>>>,
}

impl ReflectionDriver {
    /// Scan the configured source roots and build a driver over them.
    pub fn new(config: &Configuration) -> Result<Self, ScanError> {
        let index = SourceIndex::scan(&config.source_roots)?;

        Ok(Self::from_index(index, config))
    }

    /// Driver over an existing index. Declarations without a file are
    /// always in scope.
    #[must_use]
    pub fn from_index(index: SourceIndex, config: &Configuration) -> Self {
        let roots = config
            .source_roots
            .iter()
            .map(|root| canonical(&root.path))
            .collect();

        Self {
            index,
            roots,
            flags: config.driver,
            prefix: config.tag_prefix.clone(),
            collected: RwLock::new(HashMap::new()),
        }
    }

    /// Driver over registered declarations with default settings.
    #[must_use]
    pub fn with_declarations(declarations: impl IntoIterator<Item = TypeDeclaration>) -> Self {
        let index = declarations
            .into_iter()
            .fold(SourceIndex::new(), SourceIndex::with);

        Self::from_index(index, &Configuration::default())
    }

    #[must_use]
    pub fn with_flags(mut self, flags: DriverFlags) -> Self {
        self.flags = flags;
        self.clear_collected();
        self
    }

    #[must_use]
    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.clear_collected();
        self
    }

    #[must_use]
    pub const fn index(&self) -> &SourceIndex {
        &self.index
    }

    #[must_use]
    pub const fn flags(&self) -> DriverFlags {
        self.flags
    }

    #[must_use]
    pub fn tag_prefix(&self) -> &str {
        &self.prefix
    }

    ///
    /// LOOKUP
    ///

    /// A declared type, checked against the source roots.
    fn declaration(&self, type_name: &str) -> Result<&TypeDeclaration, MappingError> {
        let declaration = self
            .index
            .get(type_name)
            .ok_or_else(|| MappingError::UnknownType {
                type_name: type_name.to_string(),
            })?;

        if let Some(file) = &declaration.file {
            let file = canonical(file);
            if !self.roots.iter().any(|root| file.starts_with(root)) {
                return Err(MappingError::OutOfScope {
                    type_name: type_name.to_string(),
                    file,
                });
            }
        }

        Ok(declaration)
    }

    fn type_block(&self, declaration: &TypeDeclaration) -> Result<DocBlock, MappingError> {
        DocBlock::parse(&declaration.doc, self.tag_prefix(), &declaration.name, "")
    }

    /// Declared and tagged as a persistent object.
    fn is_entity(&self, type_name: &str) -> Result<bool, MappingError> {
        match self.index.get(type_name) {
            Some(declaration) => Ok(self.type_block(declaration)?.has(TagKind::Object)),
            None => Ok(false),
        }
    }

    fn parent_of(&self, type_name: &str) -> Option<String> {
        let declaration = self.index.get(type_name)?;

        declaration
            .parent
            .as_deref()
            .map(|parent| declaration.qualify(parent))
    }

    /// Member mappings of a type's own declarations, cached after the first
    /// successful collection.
    fn collected(&self, type_name: &str) -> Result<Arc<Collected>, MappingError> {
        if let Some(collected) = self
            .collected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
        {
            return Ok(Arc::clone(collected));
        }

        let declaration = self.declaration(type_name)?;
        let mut collected = Collected::default();
        let mut visited = HashSet::new();
        self.collect_properties(declaration, declaration, &mut visited, &mut collected)?;

        if self.flags.embed_parent {
            let mut seen = HashSet::from([type_name.to_string()]);
            let mut parent = self.parent_of(type_name);

            while let Some(name) = parent {
                let Some(parent_declaration) = self.index.get(&name) else {
                    break;
                };
                if !seen.insert(name.clone()) {
                    break;
                }
                self.collect_properties(
                    declaration,
                    parent_declaration,
                    &mut visited,
                    &mut collected,
                )?;
                parent = self.parent_of(&name);
            }
        }

        let collected = Arc::new(collected);
        self.collected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.to_string(), Arc::clone(&collected));

        Ok(collected)
    }

    fn clear_collected(&self) {
        self.collected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    ///
    /// TYPE-LEVEL TAGS
    ///

    fn load_entity_tag(
        declaration: &TypeDeclaration,
        block: &DocBlock,
        metadata: &mut ClassMetadata,
    ) -> Result<(), MappingError> {
        let params = Parameters::parse(
            TagKind::Object,
            block.first(TagKind::Object).unwrap_or_default(),
            &declaration.name,
            "",
        )?;

        metadata.set_table(TableInfo {
            name: params
                .text("table")
                .map_or_else(|| table_name(&declaration.name), str::to_string),
            schema: params.text("schema").map(str::to_string),
        });
        if params.flag("readOnly") == Some(true) {
            metadata.set_read_only(true);
        }
        if let Some(repository) = params.text("repositoryClass") {
            metadata.set_repository(declaration.qualify(repository));
        }

        Ok(())
    }

    fn load_lifecycle_callbacks(
        &self,
        declaration: &TypeDeclaration,
        block: &DocBlock,
        metadata: &mut ClassMetadata,
    ) -> Result<(), MappingError> {
        let tags: Vec<&str> = block.all(TagKind::LifecycleCallbacks).collect();

        for text in &tags {
            let parameters = parse_parameters(text).map_err(|reason| {
                MappingError::invalid_tag(
                    &declaration.name,
                    "",
                    TagKind::LifecycleCallbacks.name(),
                    reason,
                )
            })?;

            // a lone bare tag binds every method named after an event
            if tags.len() == 1 && parameters.is_empty() {
                for event in Event::ALL {
                    for method in declaration
                        .methods
                        .iter()
                        .filter(|method| event.matches_method(&method.name))
                    {
                        metadata.add_lifecycle_callback(event, method.name.clone());
                    }
                }
                continue;
            }

            for (key, method) in parameters {
                match Event::from_name(&key) {
                    Some(event) if !method.is_empty() => {
                        metadata.add_lifecycle_callback(event, method);
                    }
                    _ => {
                        tracing::trace!(
                            type_name = %declaration.name,
                            key = key.as_str(),
                            "ignoring callback parameter"
                        );
                    }
                }
            }
        }

        if self.flags.lifecycle_method_auto_mapping {
            for event in Event::ALL {
                if !metadata.lifecycle_callbacks(event).is_empty() {
                    continue;
                }
                if let Some(method) = declaration.methods.iter().find(|method| {
                    method.public && !method.is_static && event.matches_method(&method.name)
                }) {
                    metadata.add_lifecycle_callback(event, method.name.clone());
                }
            }
        }

        Ok(())
    }

    fn load_listeners(
        declaration: &TypeDeclaration,
        block: &DocBlock,
        metadata: &mut ClassMetadata,
    ) -> Result<(), MappingError> {
        for text in block.all(TagKind::Listener) {
            let mut parameters = parse_parameters(text).map_err(|reason| {
                MappingError::invalid_tag(&declaration.name, "", TagKind::Listener.name(), reason)
            })?;

            let listener = parameters
                .shift_remove("class")
                .filter(|class| !class.is_empty())
                .ok_or_else(|| MappingError::ListenerClassMissing {
                    type_name: declaration.name.clone(),
                })?;
            let listener = declaration.qualify(&listener);

            if parameters.is_empty() {
                tracing::debug!(
                    type_name = %declaration.name,
                    listener = listener.as_str(),
                    "listener tag binds no events"
                );
                continue;
            }

            for (key, method) in parameters {
                match Event::from_name(&key) {
                    Some(event) if !method.is_empty() => metadata.add_listener(
                        event,
                        ListenerBinding {
                            listener: listener.clone(),
                            method,
                        },
                    ),
                    _ => {
                        tracing::trace!(
                            type_name = %declaration.name,
                            key = key.as_str(),
                            "ignoring listener parameter"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    ///
    /// MEMBERS
    ///

    fn load_members(
        &self,
        declaration: &TypeDeclaration,
        metadata: &mut ClassMetadata,
    ) -> Result<(), MappingError> {
        let collected = self.collected(&declaration.name)?;

        for field in &collected.fields {
            let name = &field.mapping.field_name;
            if field.embedded && (metadata.has_field(name) || metadata.has_association(name)) {
                continue;
            }

            if field.overrides {
                metadata.override_field(field.mapping.clone())?;
            } else {
                metadata.map_field(field.mapping.clone())?;
            }
        }

        match &collected.generator {
            Some(GeneratorChoice::Some(generator)) => {
                metadata.set_id_generator(Some(generator.clone()));
            }
            Some(GeneratorChoice::None) => metadata.set_id_generator(None),
            None => {}
        }

        let source_column = collected.identifier_column().map(str::to_string).or_else(|| {
            metadata
                .identifier_field_names()
                .first()
                .and_then(|name| metadata.field_mapping(name).ok())
                .map(|field| field.column().to_string())
        });

        for association in &collected.associations {
            let name = &association.mapping.field_name;
            if association.embedded && (metadata.has_field(name) || metadata.has_association(name)) {
                continue;
            }

            let mut mapping = association.mapping.clone();
            self.apply_join(
                &declaration.name,
                source_column.as_deref(),
                &association.target,
                &mut mapping,
            )?;
            metadata.map_association(mapping)?;
        }

        Ok(())
    }
}

impl MappingDriver for ReflectionDriver {
    fn all_type_names(&self) -> Result<Vec<String>, MappingError> {
        let mut names = Vec::new();
        for declaration in self.index.iter() {
            if self.type_block(declaration)?.has(TagKind::Object) {
                names.push(declaration.name.clone());
            }
        }

        Ok(names)
    }

    fn is_transient(&self, type_name: &str) -> Result<bool, MappingError> {
        Ok(!self.is_entity(type_name)?)
    }

    fn is_mapped_superclass(&self, type_name: &str) -> Result<bool, MappingError> {
        Ok(self
            .index
            .get(type_name)
            .is_some_and(|declaration| declaration.is_abstract))
    }

    fn parent_type_name(&self, type_name: &str) -> Result<Option<String>, MappingError> {
        self.declaration(type_name)?;

        Ok(self.parent_of(type_name))
    }

    fn load_metadata_for_type(
        &self,
        type_name: &str,
        metadata: &mut ClassMetadata,
    ) -> Result<(), MappingError> {
        let declaration = self.declaration(type_name)?;
        let block = self.type_block(declaration)?;
        tracing::debug!(type_name, "loading mapping metadata");

        if block.has(TagKind::Object) {
            Self::load_entity_tag(declaration, &block, metadata)?;
        } else if !declaration.is_abstract {
            return Err(MappingError::NotPersistent {
                type_name: type_name.to_string(),
            });
        }
        metadata.set_mapped_superclass(declaration.is_abstract);

        self.load_lifecycle_callbacks(declaration, &block, metadata)?;
        Self::load_listeners(declaration, &block, metadata)?;
        self.load_members(declaration, metadata)
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
