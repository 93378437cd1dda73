use super::*;
use crate::{
    event::Event,
    metadata::{AssociationKind, AssociationMapping, FieldMapping},
    test_support::{StaticDriver, note_metadata},
};
use std::sync::atomic::Ordering;

fn base() -> ClassMetadata {
    let mut base = ClassMetadata::new("app::Base");
    base.map_field(FieldMapping::new("id", "integer").identifier())
        .unwrap();
    base.map_field(FieldMapping::new("created", "datetime"))
        .unwrap();
    base.add_lifecycle_callback(Event::PrePersist, "stamp");

    base
}

fn post() -> ClassMetadata {
    let mut post = ClassMetadata::new("app::Post");
    post.map_field(FieldMapping::new("title", "string")).unwrap();

    post
}

#[test]
fn metadata_is_built_once_and_shared() {
    let driver = StaticDriver::standard();
    let loads = driver.load_counter();
    let factory = MetadataFactory::new(driver);

    assert!(!factory.has_metadata_for("app::Note"));
    let first = factory.metadata_for("app::Note").unwrap();
    let second = factory.metadata_for("app::Note").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(factory.has_metadata_for("app::Note"));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(*first, note_metadata());
}

#[test]
fn child_composes_parent_before_its_own_declarations() {
    let factory = MetadataFactory::new(
        StaticDriver::new()
            .with_type(base())
            .with_child("app::Base", post()),
    );

    let post = factory.metadata_for("app::Post").unwrap();

    assert_eq!(post.field_names(), ["id", "created", "title"]);
    assert_eq!(post.parent_types(), ["app::Base"]);
    assert_eq!(post.identifier_field_names(), ["id"]);
    assert_eq!(post.lifecycle_callbacks(Event::PrePersist), ["stamp"]);
    assert_eq!(
        post.field_mapping("created").unwrap().inherited.as_deref(),
        Some("app::Base")
    );
    assert!(factory.has_metadata_for("app::Base"));
}

#[test]
fn mapped_superclass_parent_is_composed() {
    let mut base = base();
    base.set_mapped_superclass(true);
    let factory = MetadataFactory::new(
        StaticDriver::new()
            .with_transient(base, None)
            .with_child("app::Base", post()),
    );

    let post = factory.metadata_for("app::Post").unwrap();

    assert_eq!(post.field_names(), ["id", "created", "title"]);
    assert!(!post.is_mapped_superclass());
}

#[test]
fn transient_parent_is_skipped() {
    let factory = MetadataFactory::new(
        StaticDriver::new()
            .with_transient(base(), None)
            .with_child("app::Base", post()),
    );

    let post = factory.metadata_for("app::Post").unwrap();

    assert_eq!(post.field_names(), ["title"]);
    assert!(post.parent_types().is_empty());
}

#[test]
fn mapping_errors_are_returned_and_not_cached() {
    let mut bad = post();
    bad.map_association(AssociationMapping::new(
        "created",
        AssociationKind::ManyToOne,
        "app::User",
    ))
    .unwrap();

    let driver = StaticDriver::new()
        .with_type(base())
        .with_child("app::Base", bad);
    let loads = driver.load_counter();
    let factory = MetadataFactory::new(driver);

    let err = factory.metadata_for("app::Post").unwrap_err();
    assert!(err.is_duplicate_mapping());
    assert!(!factory.has_metadata_for("app::Post"));

    assert!(factory.metadata_for("app::Post").is_err());
    // parent once, child on each attempt
    assert_eq!(loads.load(Ordering::SeqCst), 3);
}

#[test]
fn unknown_type_is_not_found() {
    let factory = MetadataFactory::new(StaticDriver::standard());

    let err = factory.metadata_for("app::Missing").unwrap_err();

    assert_eq!(err.class, crate::error::ErrorClass::NotFound);
    assert_eq!(err.origin, crate::error::ErrorOrigin::Mapping);
}

#[test]
fn all_metadata_covers_non_transient_types() {
    let factory = MetadataFactory::new(
        StaticDriver::standard().with_transient(ClassMetadata::new("app::Helper"), None),
    );

    let names: Vec<String> = factory
        .all_metadata()
        .unwrap()
        .iter()
        .map(|m| m.name().to_string())
        .collect();

    assert_eq!(names, ["app::Note", "app::Author", "app::Membership"]);
    assert!(factory.is_transient("app::Helper").unwrap());
    assert!(!factory.is_transient("app::Note").unwrap());
}

#[test]
fn seeded_metadata_skips_the_driver() {
    let driver = StaticDriver::new();
    let loads = driver.load_counter();
    let factory = MetadataFactory::new(driver);

    factory.set_metadata_for(note_metadata());

    assert!(factory.has_metadata_for("app::Note"));
    assert_eq!(
        factory.metadata_for("app::Note").unwrap().field_names(),
        ["id", "title", "body"]
    );
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn external_cache_is_written_on_commit_and_read_by_other_factories() {
    let cache = Arc::new(MemoryMetadataCache::new());

    let first = MetadataFactory::new(StaticDriver::standard())
        .with_cache(Arc::clone(&cache) as Arc<dyn MetadataCache>)
        .with_region("tenant");
    let built = first.metadata_for("app::Author").unwrap();

    assert_eq!(cache.pending(), 1);
    assert!(cache.is_empty());
    first.commit_cache();
    assert_eq!(cache.pending(), 0);
    assert_eq!(cache.len(), 1);

    let driver = StaticDriver::standard();
    let loads = driver.load_counter();
    let second = MetadataFactory::new(driver)
        .with_cache(Arc::clone(&cache) as Arc<dyn MetadataCache>)
        .with_region("tenant");
    let cached = second.metadata_for("app::Author").unwrap();

    assert_eq!(*cached, *built);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn cache_regions_do_not_share_entries() {
    let cache = Arc::new(MemoryMetadataCache::new());
    let first = MetadataFactory::new(StaticDriver::standard())
        .with_cache(Arc::clone(&cache) as Arc<dyn MetadataCache>)
        .with_region("a");
    first.metadata_for("app::Note").unwrap();
    first.commit_cache();

    let driver = StaticDriver::standard();
    let loads = driver.load_counter();
    let second = MetadataFactory::new(driver)
        .with_cache(cache as Arc<dyn MetadataCache>)
        .with_region("b");
    second.metadata_for("app::Note").unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn cache_key_flattens_path_separators() {
    let factory = MetadataFactory::new(StaticDriver::new()).with_region("app::tenant");

    let key = factory.cache_key("app::Note");

    assert!(key.starts_with("app_tenant__"));
    assert!(key.ends_with("__app_Note"));
    assert!(!key.contains("::"));
}

#[test]
fn cache_key_names_region_implementation_and_type() {
    let factory = MetadataFactory::new(StaticDriver::new()).with_region("tenant");

    assert_eq!(
        factory.cache_key("app::Note"),
        "tenant__ormkit_core_metadata_ClassMetadata__app_Note"
    );
}

#[test]
fn factory_is_shareable_across_threads() {
    let factory = Arc::new(MetadataFactory::new(StaticDriver::standard()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let factory = Arc::clone(&factory);
            std::thread::spawn(move || factory.metadata_for("app::Membership").map(|m| m.name().to_string()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), "app::Membership");
    }
}
