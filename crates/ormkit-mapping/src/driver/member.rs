//! Per-member classification: a declared property becomes a field, an
//! association, or nothing, depending on its tags.

use super::ReflectionDriver;
use crate::{
    declaration::{DeclaredType, PropertyDeclaration, Representative, TypeDeclaration},
    descriptor::Parameters,
    tag::{DocBlock, TagKind, parse_parameters},
};
use convert_case::{Case, Casing};
use indexmap::IndexMap;
use ormkit_core::{
    metadata::{AssociationMapping, DEFAULT_FIELD_TYPE, FieldMapping, IdGeneratorType, MappingError},
    value::Value,
};
use std::collections::HashSet;

/// Rust type names that can never be an association target.
const BUILTIN_TYPES: &[&str] = &[
    "bool", "char", "str", "String", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16",
    "u32", "u64", "u128", "usize", "f32", "f64", "Value", "Option", "Vec", "HashMap", "BTreeMap",
];

///
/// Collected
///
/// Mappings read from one type's own members, before they meet inherited
/// state. Kept per type so join processing can read a target's identifier
/// without building its metadata.
///

#[derive(Debug, Default)]
pub(super) struct Collected {
    pub(super) fields: Vec<CollectedField>,
    pub(super) associations: Vec<CollectedAssociation>,

    /// Set when an identifier member names a generator, `none` included.
    pub(super) generator: Option<GeneratorChoice>,
}

#[derive(Debug)]
pub(super) enum GeneratorChoice {
    None,
    Some(IdGeneratorType),
}

#[derive(Debug)]
pub(super) struct CollectedField {
    pub(super) mapping: FieldMapping,
    pub(super) overrides: bool,

    /// Read from a parent declaration through parent embedding.
    pub(super) embedded: bool,
}

#[derive(Debug)]
pub(super) struct CollectedAssociation {
    pub(super) mapping: AssociationMapping,

    /// Fully qualified target, whatever form `mapping.target_type` takes.
    pub(super) target: String,
    pub(super) embedded: bool,
}

impl Collected {
    /// Column of the first identifier field, if any.
    pub(super) fn identifier_column(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.mapping.id)
            .map(|field| field.mapping.column())
    }
}

///
/// MemberContext
///

struct MemberContext<'a> {
    /// Type whose metadata is being collected.
    owner: &'a TypeDeclaration,

    /// Type that declares the property; differs from `owner` when embedding.
    declaring: &'a TypeDeclaration,
    property: &'a PropertyDeclaration,
    block: DocBlock,
}

impl MemberContext<'_> {
    fn invalid(&self, key: &str, value: impl Into<String>) -> MappingError {
        MappingError::InvalidParameter {
            type_name: self.owner.name.clone(),
            member: self.property.name.clone(),
            key: key.to_string(),
            value: value.into(),
        }
    }
}

impl ReflectionDriver {
    /// Visit the declaring type's properties, skipping names already seen.
    pub(super) fn collect_properties(
        &self,
        owner: &TypeDeclaration,
        declaring: &TypeDeclaration,
        visited: &mut HashSet<String>,
        collected: &mut Collected,
    ) -> Result<(), MappingError> {
        let embedded = owner.name != declaring.name;

        for property in &declaring.properties {
            if visited.contains(&property.name) {
                continue;
            }

            let block = DocBlock::parse(&property.doc, &self.prefix, &owner.name, &property.name)?;
            let cx = MemberContext {
                owner,
                declaring,
                property,
                block,
            };

            let is_field = cx.block.has(TagKind::Id) || cx.block.has(TagKind::Field);
            let association = TagKind::ASSOCIATIONS
                .into_iter()
                .find(|kind| cx.block.has(*kind));

            if is_field {
                self.collect_field(&cx, embedded, collected)?;
            } else if let Some(kind) = association {
                self.collect_association(&cx, kind, embedded, collected)?;
            } else if property.public && self.flags.public_property_auto_mapping {
                self.collect_field(&cx, embedded, collected)?;
            } else {
                continue;
            }

            tracing::trace!(
                type_name = %owner.name,
                member = %property.name,
                "collected member mapping"
            );
            visited.insert(property.name.clone());
        }

        Ok(())
    }

    ///
    /// FIELDS
    ///

    fn collect_field(
        &self,
        cx: &MemberContext<'_>,
        embedded: bool,
        collected: &mut Collected,
    ) -> Result<(), MappingError> {
        let owner = &cx.owner.name;
        let member = &cx.property.name;

        let mut params = Parameters::default();
        if let Some(text) = cx.block.first(TagKind::Field) {
            params.extend(Parameters::parse(TagKind::Field, text, owner, member)?);
        }
        let id = cx.block.has(TagKind::Id);
        if let Some(text) = cx.block.first(TagKind::Id) {
            params.extend(Parameters::parse(TagKind::Id, text, owner, member)?);
        }

        let declared = cx.property.declared_type.as_ref();
        let type_name = params
            .text("type")
            .map_or_else(|| self.infer_field_type(declared, cx.declaring), str::to_string);

        let mut field = FieldMapping::new(
            params.text("fieldName").unwrap_or(member),
            type_name,
        );
        field.id = id;
        field.nullable = params
            .flag("nullable")
            .unwrap_or_else(|| declared.is_some_and(DeclaredType::is_option));
        field.column_name = params.text("columnName").map(str::to_string);
        field.length = dimension(cx, &params, "length")?;
        field.precision = dimension(cx, &params, "precision")?;
        field.scale = dimension(cx, &params, "scale")?;
        field.enum_type = params.text("enumType").map(str::to_string);
        field.column_definition = params.text("columnDefinition").map(str::to_string);
        field.generated = params.text("generated").map(str::to_string);
        field.unique = params.flag("unique").unwrap_or(false);
        field.version = params.flag("version").unwrap_or(false);
        field.insertable = params.flag("insertable").unwrap_or(true);
        field.updatable = params.flag("updatable").unwrap_or(true);
        if embedded {
            field.declared = Some(cx.declaring.name.clone());
        }

        field.options = member_options(cx, &params)?;
        field.extra = tag_map(cx, TagKind::Extra, IndexMap::new())?;

        field.default = match field.options.get("default") {
            Some(explicit) => Some(coerce_default(explicit, &field.type_name)),
            None if id => None,
            None => cx
                .property
                .default
                .clone()
                .or_else(|| declared.and_then(Representative::for_type))
                .and_then(|representative| representative_default(representative, &field.type_name)),
        };
        field.comment = match field.options.get("comment") {
            Some(comment) => comment.as_text().map(str::to_string),
            None => cx.block.summary().map(str::to_string),
        };

        if id && let Some(choice) = generator_choice(cx, &params)? {
            collected.generator = Some(choice);
        }

        collected.fields.push(CollectedField {
            mapping: field,
            overrides: params.flag("override").unwrap_or(false),
            embedded,
        });

        Ok(())
    }

    /// Storage type from a declared Rust type: primitives by family, time
    /// types, collections, then declared types by their full name.
    fn infer_field_type(&self, declared: Option<&DeclaredType>, declaring: &TypeDeclaration) -> String {
        let Some(declared) = declared else {
            return DEFAULT_FIELD_TYPE.to_string();
        };
        let declared = declared.without_option().referent();

        if let Some(element) = declared.collection_element() {
            let is_bytes = element.local_name() == "u8" && declared.local_name() == "Vec";
            return if is_bytes { "blob" } else { "array" }.to_string();
        }

        let storage = match declared.local_name() {
            "bool" => "boolean",
            "i8" | "i16" | "u8" | "u16" => "smallint",
            "i32" | "u32" | "i64" | "isize" => "integer",
            "u64" | "i128" | "u128" | "usize" => "bigint",
            "f32" | "f64" => "float",
            "String" | "str" | "char" => "string",
            "Value" if declared.name.starts_with("serde_json") => "json",
            "HashMap" | "BTreeMap" | "IndexMap" => "json",
            "OffsetDateTime" | "PrimitiveDateTime" | "SystemTime" | "DateTime" => "datetime",
            "Date" | "NaiveDate" => "date",
            "Time" | "NaiveTime" => "time",
            _ => {
                let qualified = declaring.qualify(&declared.name);
                return if self.index.contains(&qualified) {
                    qualified
                } else {
                    DEFAULT_FIELD_TYPE.to_string()
                };
            }
        };

        storage.to_string()
    }

    ///
    /// ASSOCIATIONS
    ///

    fn collect_association(
        &self,
        cx: &MemberContext<'_>,
        kind: TagKind,
        embedded: bool,
        collected: &mut Collected,
    ) -> Result<(), MappingError> {
        let owner = &cx.owner.name;
        let member = &cx.property.name;
        let text = cx.block.first(kind).unwrap_or_default();
        let params = Parameters::parse(kind, text, owner, member)?;
        let Some(association_kind) = kind.association_kind() else {
            return Ok(());
        };

        let target = match params.text("targetEntity") {
            Some(explicit) => cx.declaring.qualify(explicit),
            None => infer_target(cx, association_kind.is_to_many())?,
        };
        let target_namespace = target.rsplit_once("::").map_or("", |(ns, _)| ns);
        let target_type = if self.flags.association_target_short_name
            && target_namespace == cx.declaring.namespace()
        {
            target.rsplit("::").next().unwrap_or(&target).to_string()
        } else {
            target.clone()
        };

        let mut association = AssociationMapping::new(
            params.text("fieldName").unwrap_or(member),
            association_kind,
            target_type,
        );
        association.mapped_by = params.text("mappedBy").map(str::to_string);
        association.inversed_by = params.text("inversedBy").map(str::to_string);
        association.referenced_field_name = params.text("referencedFieldName").map(str::to_string);
        association.referenced_column_name =
            params.text("referencedColumnName").map(str::to_string);
        association.fetch = params.fetch("fetch");
        association.options = tag_map(cx, TagKind::Options, IndexMap::new())?;
        association.extra = tag_map(cx, TagKind::Extra, IndexMap::new())?;
        if embedded {
            association.declared = Some(cx.declaring.name.clone());
        }

        collected.associations.push(CollectedAssociation {
            mapping: association,
            target,
            embedded,
        });

        Ok(())
    }
}

/// Target type from the member's declared type: `Ref<T>`, `Option<Ref<T>>`,
/// or for to-many a collection of those.
fn infer_target(cx: &MemberContext<'_>, to_many: bool) -> Result<String, MappingError> {
    let missing = || MappingError::MissingTargetType {
        type_name: cx.owner.name.clone(),
        member: cx.property.name.clone(),
    };

    let declared = cx
        .property
        .declared_type
        .as_ref()
        .ok_or_else(missing)?
        .without_option();
    let target = if to_many {
        declared.collection_element().ok_or_else(missing)?
    } else {
        declared
    }
    .without_option()
    .referent();

    if BUILTIN_TYPES.contains(&target.local_name()) {
        return Err(missing());
    }

    Ok(cx.declaring.qualify(&target.name))
}

///
/// OPTIONS
///

/// The `options=` JSON parameter merged with `options` tags.
fn member_options(
    cx: &MemberContext<'_>,
    params: &Parameters,
) -> Result<IndexMap<String, Value>, MappingError> {
    let mut options = IndexMap::new();

    if let Some(text) = params.text("options") {
        let Ok(serde_json::Value::Object(object)) = serde_json::from_str(text) else {
            return Err(cx.invalid("options", text));
        };
        for (key, value) in object {
            options.insert(key.to_case(Case::Camel), Value::from_json(value));
        }
    }

    tag_map(cx, TagKind::Options, options)
}

/// Fold every tag of `kind` into `map` with camelCased keys. A key defined
/// twice is an error.
fn tag_map(
    cx: &MemberContext<'_>,
    kind: TagKind,
    mut map: IndexMap<String, Value>,
) -> Result<IndexMap<String, Value>, MappingError> {
    for text in cx.block.all(kind).filter(|text| !text.is_empty()) {
        let parameters = parse_parameters(text).map_err(|reason| {
            MappingError::invalid_tag(&cx.owner.name, &cx.property.name, kind.name(), reason)
        })?;

        for (key, value) in parameters {
            let key = key.to_case(Case::Camel);
            if map.contains_key(&key) {
                return Err(MappingError::DuplicateOption {
                    type_name: cx.owner.name.clone(),
                    member: cx.property.name.clone(),
                    key,
                });
            }
            map.insert(key, Value::Text(value));
        }
    }

    Ok(map)
}

fn dimension(
    cx: &MemberContext<'_>,
    params: &Parameters,
    key: &str,
) -> Result<Option<u32>, MappingError> {
    params
        .int(key)
        .map(|value| u32::try_from(value).map_err(|_| cx.invalid(key, value.to_string())))
        .transpose()
}

fn generator_choice(
    cx: &MemberContext<'_>,
    params: &Parameters,
) -> Result<Option<GeneratorChoice>, MappingError> {
    let Some(name) = params.text("generator") else {
        return Ok(None);
    };

    let generator = match name {
        "none" => return Ok(Some(GeneratorChoice::None)),
        "auto" => IdGeneratorType::Auto,
        "uniqid" => IdGeneratorType::Uniqid,
        "sequence" => IdGeneratorType::Sequence {
            name: params.text("sequenceName").map(str::to_string),
            allocation_size: params
                .int("sequenceAllocationSize")
                .map(|size| {
                    u32::try_from(size)
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| cx.invalid("sequence-allocation-size", size.to_string()))
                })
                .transpose()?
                .unwrap_or(1),
            initial_value: params.int("sequenceInitialValue").unwrap_or(1),
        },
        "custom" => {
            let class = params
                .text("customIdGeneratorClass")
                .ok_or_else(|| cx.invalid("custom-id-generator-class", ""))?;
            IdGeneratorType::Custom(cx.declaring.qualify(class))
        }
        other => return Err(cx.invalid("generator", other)),
    };

    Ok(Some(GeneratorChoice::Some(generator)))
}

///
/// DEFAULTS
///

/// Turn a representative into a column default. Null, empty text, and
/// structured values that have no storable form yield nothing.
fn representative_default(representative: Representative, type_name: &str) -> Option<Value> {
    let is_json = type_name.eq_ignore_ascii_case("json");

    match representative {
        Representative::Null => None,
        Representative::Scalar(Value::Text(text)) if text.is_empty() => None,
        Representative::Scalar(value) => Some(value),
        Representative::Array(json) => is_json.then(|| Value::Text(json.to_string())),
        Representative::Object { text, json } => {
            if is_json {
                Some(Value::Text(json.to_string()))
            } else {
                text.map(Value::Text)
            }
        }
    }
}

/// An explicit `default` option is text; read it as the field's type.
fn coerce_default(value: &Value, type_name: &str) -> Value {
    let Some(text) = value.as_text() else {
        return value.clone();
    };

    let coerced = match type_name {
        "integer" | "smallint" | "bigint" => text.parse().ok().map(Value::Int),
        "float" | "decimal" => text.parse().ok().map(Value::Float),
        "boolean" => match text {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };

    coerced.unwrap_or_else(|| value.clone())
}
