use super::*;
use crate::{
    test_support::{Membership, Note, author_metadata, membership_metadata, note_metadata},
    value::Value,
};

#[test]
fn names_split_into_namespace_and_local_name() {
    let metadata = ClassMetadata::new("app::model::BlogPost");

    assert_eq!(metadata.name(), "app::model::BlogPost");
    assert_eq!(metadata.local_name(), "BlogPost");
    assert_eq!(metadata.namespace(), "app::model");
    assert_eq!(ClassMetadata::new("Bare").namespace(), "");
}

#[test]
fn field_and_association_accessors() {
    let metadata = note_metadata();

    assert_eq!(metadata.field_names(), ["id", "title", "body"]);
    assert_eq!(metadata.association_names(), ["author"]);
    assert_eq!(metadata.identifier_field_names(), ["id"]);
    assert!(!metadata.is_identifier_composite());
    assert!(metadata.is_identifier("id").unwrap());
    assert!(!metadata.is_identifier("author").unwrap());
    assert_eq!(metadata.type_of_field("body").unwrap(), "text");
    assert!(metadata.is_single_valued_association("author").unwrap());
    assert!(!metadata.is_collection_valued_association("author").unwrap());
    assert_eq!(metadata.association_target_type("author").unwrap(), "app::Author");
    assert!(!metadata.is_association_inverse_side("author").unwrap());
    assert_eq!(metadata.association_mapped_by_target_field("author").unwrap(), None);
    assert_eq!(
        metadata.lifecycle_callbacks(crate::event::Event::PreUpdate),
        ["pre_update"]
    );
}

#[test]
fn unknown_names_are_not_mapped() {
    let metadata = note_metadata();

    assert!(matches!(
        metadata.field_mapping("missing"),
        Err(MetadataError::NotMapped { ref name, .. }) if name == "missing"
    ));
    assert!(metadata.is_identifier("missing").is_err());
    assert!(metadata.association_target_type("title").is_err());
}

#[test]
fn composite_identifier_values_follow_declaration_order() {
    let metadata = membership_metadata();
    let object = ObjectRef::new(Membership::new(4, 9));

    assert!(metadata.is_identifier_composite());
    assert_eq!(metadata.identifier_field_names(), ["group_id", "member_id"]);

    let identifier = metadata.identifier_values(&object);
    assert_eq!(
        identifier,
        Identifier::new().with("member_id", 9_i64).with("group_id", 4_i64)
    );

    metadata
        .set_identifier_values(
            &object,
            &Identifier::new()
                .with("group_id", 5_i64)
                .with("role", "ignored"),
        )
        .unwrap();
    assert_eq!(object.get_value("group_id"), Some(Value::Int(5)));
    assert_eq!(object.get_value("role"), Some(Value::from("member")));
}

#[test]
fn unset_identifier_reads_as_null() {
    let metadata = note_metadata();
    let object = ObjectRef::new(Note::titled("a"));

    let identifier = metadata.identifier_values(&object);

    assert_eq!(identifier.get("id"), Some(&Value::Null));
    assert!(!identifier.is_complete());
}

#[test]
fn field_and_association_names_are_disjoint() {
    let mut metadata = note_metadata();

    let err = metadata
        .map_association(AssociationMapping::new(
            "title",
            AssociationKind::ManyToOne,
            "app::Author",
        ))
        .unwrap_err();
    assert!(matches!(err, MappingError::DuplicateMapping { ref field, .. } if field == "title"));

    assert!(metadata.map_field(FieldMapping::new("author", "string")).is_err());
}

#[test]
fn inherit_from_copies_parent_state_forward() {
    let mut parent = ClassMetadata::new("app::Base");
    parent
        .map_field(FieldMapping::new("id", "integer").identifier())
        .unwrap();
    parent
        .map_field(FieldMapping::new("created", "datetime"))
        .unwrap();
    parent.set_inheritance(InheritanceType::SingleTable);
    parent.set_id_generator(Some(IdGeneratorType::Uniqid));
    parent.add_lifecycle_callback(crate::event::Event::PrePersist, "stamp");

    let mut child = ClassMetadata::new("app::Post");
    child.inherit_from(&parent).unwrap();
    child.map_field(FieldMapping::new("title", "string")).unwrap();

    assert_eq!(child.parent_types(), ["app::Base"]);
    assert_eq!(child.inheritance(), InheritanceType::SingleTable);
    assert_eq!(child.id_generator(), Some(&IdGeneratorType::Uniqid));
    assert_eq!(child.lifecycle_callbacks(crate::event::Event::PrePersist), ["stamp"]);

    let created = child.field_mapping("created").unwrap();
    assert_eq!(created.inherited.as_deref(), Some("app::Base"));
    assert_eq!(created.declared.as_deref(), Some("app::Base"));

    let title = child.field_mapping("title").unwrap();
    assert_eq!(title.inherited, None);
    assert_eq!(title.declared.as_deref(), Some("app::Post"));
}

#[test]
fn override_replaces_only_inherited_fields() {
    let mut parent = ClassMetadata::new("app::Base");
    parent.map_field(FieldMapping::new("name", "string")).unwrap();

    let mut child = ClassMetadata::new("app::Post");
    child.inherit_from(&parent).unwrap();
    child
        .override_field(FieldMapping::new("name", "text").nullable(true))
        .unwrap();

    let name = child.field_mapping("name").unwrap();
    assert_eq!(name.type_name, "text");
    assert_eq!(name.declared.as_deref(), Some("app::Post"));

    // a second redeclaration hits the child's own mapping
    assert!(child.override_field(FieldMapping::new("name", "string")).is_err());
}

#[test]
fn grandparents_are_listed_nearest_first() {
    let root = ClassMetadata::new("app::Root");
    let mut middle = ClassMetadata::new("app::Middle");
    middle.inherit_from(&root).unwrap();
    let mut leaf = ClassMetadata::new("app::Leaf");
    leaf.inherit_from(&middle).unwrap();

    assert_eq!(leaf.parent_types(), ["app::Middle", "app::Root"]);
}

#[test]
fn version_field_is_tracked() {
    let mut metadata = ClassMetadata::new("app::Doc");
    let mut revision = FieldMapping::new("revision", "integer");
    revision.version = true;
    metadata.map_field(revision).unwrap();

    assert_eq!(metadata.version_field(), Some("revision"));
}

#[test]
fn callbacks_and_listeners_are_deduplicated() {
    let mut metadata = author_metadata();
    let binding = ListenerBinding {
        listener: "audit".to_string(),
        method: "on_saved".to_string(),
    };

    metadata.add_lifecycle_callback(crate::event::Event::PostPersist, "touch");
    metadata.add_lifecycle_callback(crate::event::Event::PostPersist, "touch");
    metadata.add_listener(crate::event::Event::PostPersist, binding.clone());
    metadata.add_listener(crate::event::Event::PostPersist, binding);

    assert_eq!(metadata.lifecycle_callbacks(crate::event::Event::PostPersist).len(), 1);
    assert_eq!(metadata.listeners(crate::event::Event::PostPersist).len(), 1);
    assert!(metadata.listeners(crate::event::Event::PreRemove).is_empty());
}

#[test]
fn inverse_side_rules() {
    let owning = AssociationMapping::new("author", AssociationKind::ManyToOne, "app::Author")
        .inversed_by("notes");
    let inverse = AssociationMapping::new("notes", AssociationKind::OneToMany, "app::Note");
    let mapped = AssociationMapping::new("profile", AssociationKind::OneToOne, "app::Profile")
        .mapped_by("user");

    assert!(owning.is_owning_side());
    assert!(inverse.is_inverse_side());
    assert!(mapped.is_inverse_side());
    assert!(AssociationKind::ManyToMany.is_to_many());
    assert_eq!(AssociationKind::OneToOne.to_string(), "one-to-one");
}

#[test]
fn generator_registry_keys() {
    assert_eq!(IdGeneratorType::Auto.registry_key(), "auto");
    assert_eq!(IdGeneratorType::Uniqid.registry_key(), "uniqid");
    assert_eq!(IdGeneratorType::Custom("snowflake".into()).registry_key(), "snowflake");
    assert_eq!(
        IdGeneratorType::Sequence {
            name: None,
            allocation_size: 1,
            initial_value: 1,
        }
        .registry_key(),
        "sequence"
    );
}

#[test]
fn field_helpers() {
    let field = FieldMapping::new("created_at", "datetime").with_column("created");

    assert_eq!(field.column(), "created");
    assert_eq!(FieldMapping::new("name", "string").column(), "name");
    assert!(is_datetime_type("datetimetz_immutable"));
    assert!(is_date_type("date"));
    assert!(is_integer_type("bigint"));
    assert!(is_scalar_type("json"));
    assert!(!is_scalar_type("app::Address"));
    assert_eq!(FetchMode::parse("extra-lazy"), Some(FetchMode::ExtraLazy));
    assert_eq!(FetchMode::parse("sometimes"), None);
}
