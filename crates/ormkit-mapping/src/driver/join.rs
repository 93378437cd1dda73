//! Join information for associations whose target is a persistent type.
//! Derived from identifier columns and table names only, so mutually
//! associated types never need each other's finished metadata.

use super::ReflectionDriver;
use crate::inflector::table_name;
use ormkit_core::metadata::{AssociationKind, AssociationMapping, JoinColumn, JoinTable, MappingError};
use std::collections::HashSet;

impl ReflectionDriver {
    /// Fill in join columns or a join table. `source_column` is the
    /// declaring type's identifier column, when it has one.
    pub(super) fn apply_join(
        &self,
        source: &str,
        source_column: Option<&str>,
        target: &str,
        association: &mut AssociationMapping,
    ) -> Result<(), MappingError> {
        if !self.is_entity(target)? {
            return Ok(());
        }

        let target_column = match association
            .referenced_column_name
            .as_ref()
            .or(association.referenced_field_name.as_ref())
        {
            Some(column) => column.clone(),
            None => match self.identifier_column(target)? {
                Some(column) => column,
                None => {
                    tracing::debug!(source, target, "join skipped, target has no identifier");
                    return Ok(());
                }
            },
        };

        match association.kind {
            AssociationKind::ManyToOne if association.join_columns.is_empty() => {
                association.join_columns = vec![JoinColumn {
                    name: None,
                    referenced_column_name: target_column,
                }];
            }
            AssociationKind::ManyToMany if association.join_table.is_none() => {
                let Some(source_column) = source_column else {
                    tracing::debug!(source, target, "join skipped, source has no identifier");
                    return Ok(());
                };

                association.join_table = Some(JoinTable {
                    name: format!(
                        "{}_{}_{}",
                        table_name(source),
                        association.field_name,
                        table_name(target)
                    ),
                    join_columns: vec![JoinColumn {
                        name: None,
                        referenced_column_name: source_column.to_string(),
                    }],
                    inverse_join_columns: vec![JoinColumn {
                        name: None,
                        referenced_column_name: target_column,
                    }],
                });
            }
            _ => {}
        }

        Ok(())
    }

    /// Identifier column of a type, looking through its parents when the
    /// type declares none itself.
    pub(super) fn identifier_column(&self, type_name: &str) -> Result<Option<String>, MappingError> {
        let mut seen = HashSet::new();
        let mut current = Some(type_name.to_string());

        while let Some(name) = current {
            if !seen.insert(name.clone()) || !self.index.contains(&name) {
                break;
            }
            if let Some(column) = self.collected(&name)?.identifier_column() {
                return Ok(Some(column.to_string()));
            }
            current = self.parent_of(&name);
        }

        Ok(None)
    }
}
