use ormkit::{
    config::Configuration,
    factory::MetadataFactory,
    memory::MemoryStore,
    metadata::IdGeneratorType,
    prelude::*,
};
use proptest::prelude::*;
use std::{fs, path::Path, rc::Rc, sync::Arc};

const MODEL: &str = r"
/// @persistent-object
pub struct Membership {
    /// @persistent-id
    pub group_id: Option<i64>,

    /// @persistent-id
    pub member_id: Option<i64>,

    /// @persistent-field
    pub role: String,
}

/// @abstract
pub struct ParentEntity {
    /// @persistent-id generator=uniqid
    pub id: Option<String>,

    /// @persistent-field
    pub first_name: String,
}

/// @persistent-object
/// @extends ParentEntity
pub struct ChildEntity {
    /// @persistent-field
    pub kind: String,
}
";

#[derive(Default, Persistable)]
#[persistable(path = "app::model::Membership")]
struct Membership {
    group_id: Option<i64>,
    member_id: Option<i64>,
    role: String,
}

impl Membership {
    fn new(group_id: i64, member_id: i64) -> Self {
        Self {
            group_id: Some(group_id),
            member_id: Some(member_id),
            role: "member".to_string(),
        }
    }
}

#[derive(Default, Persistable)]
#[persistable(path = "app::model::ChildEntity")]
struct ChildEntity {
    id: Option<String>,
    first_name: String,
    kind: String,
}

/// Write the model and a TOML configuration pointing at it.
fn write_project(dir: &Path) -> Configuration {
    fs::write(dir.join("model.rs"), MODEL).unwrap();

    let config_path = dir.join("ormkit.toml");
    fs::write(
        &config_path,
        format!(
            "cache_region = \"members\"\n\n[[source_roots]]\npath = '{}'\nnamespace = \"app\"\n",
            dir.display()
        ),
    )
    .unwrap();

    Configuration::load(&config_path).unwrap()
}

struct Project {
    _dir: tempfile::TempDir,
    factory: Arc<MetadataFactory>,
    manager: ObjectManager,
    memberships: Rc<MemoryStore>,
    children: Rc<MemoryStore>,
}

fn project() -> Project {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());

    let (factory, builder) = ormkit::manager_builder(&config).unwrap();
    let memberships = Rc::new(MemoryStore::new::<Membership>(Arc::clone(&factory)).unwrap());
    let children = Rc::new(MemoryStore::new::<ChildEntity>(Arc::clone(&factory)).unwrap());
    let manager = builder
        .store::<Membership, _>(Rc::clone(&memberships))
        .store::<ChildEntity, _>(Rc::clone(&children))
        .build();

    Project {
        _dir: dir,
        factory,
        manager,
        memberships,
        children,
    }
}

///
/// CONFIGURATION
///

#[test]
fn configuration_file_drives_the_factory() {
    let project = project();

    assert_eq!(project.factory.region(), "members");
    assert!(project.factory.is_transient("app::model::ParentEntity").unwrap());
    assert!(!project.factory.is_transient(Membership::PATH).unwrap());
}

///
/// COMPOSITE IDENTIFIERS
///

#[test]
fn composite_identifiers_key_rows_by_every_part() {
    let mut project = project();
    let metadata = project.manager.class_metadata(Membership::PATH).unwrap();
    assert_eq!(metadata.identifier_field_names(), ["group_id", "member_id"]);
    assert!(metadata.is_identifier_composite());

    let first = ObjectRef::new(Membership::new(1, 2));
    let second = ObjectRef::new(Membership::new(2, 1));
    project.manager.persist(&first).unwrap();
    project.manager.persist(&second).unwrap();
    project.manager.flush().unwrap();

    assert_eq!(project.memberships.len(), 2);
    assert!(
        project
            .memberships
            .row(&Identifier::single("group_id", 1_i64).with("member_id", 2_i64))
            .is_some()
    );
}

#[test]
fn incomplete_composite_lookup_finds_nothing() {
    let mut project = project();
    let membership = ObjectRef::new(Membership::new(3, 4));
    project.manager.persist(&membership).unwrap();
    project.manager.flush().unwrap();

    let partial = Identifier::single("group_id", 3_i64);
    assert!(project.manager.find(Membership::PATH, partial).unwrap().is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn composite_lookup_ignores_key_order(
        group in 1_i64..1_000,
        member in 1_i64..1_000,
        reversed in any::<bool>(),
        reload in any::<bool>()
    ) {
        let mut project = project();
        let membership = ObjectRef::new(Membership::new(group, member));
        project.manager.persist(&membership).unwrap();
        project.manager.flush().unwrap();
        if reload {
            project.manager.clear(None);
        }

        let identifier = if reversed {
            Identifier::single("member_id", member).with("group_id", group)
        } else {
            Identifier::single("group_id", group).with("member_id", member)
        };
        let found = project
            .manager
            .find(Membership::PATH, identifier)
            .unwrap()
            .unwrap();

        prop_assert_eq!(found.ptr_eq(&membership), !reload);
        prop_assert_eq!(found.get_value("group_id"), Some(Value::Int(group)));
        prop_assert_eq!(found.get_value("member_id"), Some(Value::Int(member)));
    }
}

///
/// INHERITANCE
///

#[test]
fn child_metadata_carries_the_mapped_superclass() {
    let project = project();
    let child = project.factory.metadata_for(ChildEntity::PATH).unwrap();

    assert_eq!(child.field_names(), ["id", "first_name", "kind"]);
    assert_eq!(child.parent_types(), ["app::model::ParentEntity"]);
    assert_eq!(child.id_generator(), Some(&IdGeneratorType::Uniqid));
    assert_eq!(
        child.field_mapping("first_name").unwrap().inherited.as_deref(),
        Some("app::model::ParentEntity")
    );
    assert!(child.table().is_some_and(|table| table.name == "child_entities"));
}

#[test]
fn inherited_generator_assigns_child_identifiers() {
    let mut project = project();
    let child = ObjectRef::new(ChildEntity {
        first_name: "Grace".to_string(),
        kind: "admin".to_string(),
        ..ChildEntity::default()
    });

    project.manager.persist(&child).unwrap();
    project.manager.flush().unwrap();

    let Some(Value::Text(id)) = child.get_value("id") else {
        panic!("uniqid generator should assign a text id");
    };
    assert!(id.starts_with("child_entity_"));

    let row = project
        .children
        .row(&Identifier::single("id", id.as_str()))
        .unwrap();
    assert_eq!(row.get("first_name"), Some(&Value::from("Grace")));
    assert_eq!(row.get("kind"), Some(&Value::from("admin")));
}
