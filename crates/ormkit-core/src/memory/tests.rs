use super::*;
use crate::{
    object::{Ref, Reference},
    test_support::{Author, Membership, Note, standard_factory},
};

fn notes() -> MemoryStore {
    MemoryStore::new::<Note>(standard_factory()).unwrap()
}

#[test]
fn persist_assigns_increasing_integer_ids() {
    let store = notes();
    let a = ObjectRef::new(Note::titled("a"));
    let b = ObjectRef::new(Note::titled("b"));

    store.persist(&a).unwrap();
    store.persist(&b).unwrap();

    assert_eq!(a.get_value("id"), Some(Value::Int(1)));
    assert_eq!(b.get_value("id"), Some(Value::Int(2)));
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.row(&Identifier::single("id", 2_i64)).unwrap()["title"],
        Value::from("b")
    );
}

#[test]
fn explicit_ids_move_the_counter_forward() {
    let store = notes();
    let explicit = ObjectRef::new(Note {
        id: Some(10),
        ..Note::titled("x")
    });
    let next = ObjectRef::new(Note::titled("y"));

    store.persist(&explicit).unwrap();
    store.persist(&next).unwrap();

    assert_eq!(next.get_value("id"), Some(Value::Int(11)));
}

#[test]
fn auto_ids_stop_at_the_largest_integer() {
    let store = notes();
    let last = ObjectRef::new(Note {
        id: Some(i64::MAX),
        ..Note::titled("last")
    });
    let overflow = ObjectRef::new(Note::titled("overflow"));

    store.persist(&last).unwrap();
    let err = store.persist(&overflow).unwrap_err();

    assert!(err.to_string().contains("auto-increment identifiers exhausted"));
    assert!(matches!(overflow.get_value("id"), Some(Value::Null) | None));
    assert_eq!(store.len(), 1);
}

#[test]
fn persisting_again_overwrites_the_row() {
    let store = notes();
    let note = ObjectRef::new(Note::titled("a"));
    store.persist(&note).unwrap();

    note.write::<Note, _>(|n| n.body = Some("more".into()));
    store.persist(&note).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(
        store.row(&Identifier::single("id", 1_i64)).unwrap()["body"],
        Value::from("more")
    );
}

#[test]
fn find_prefers_the_tracked_handle() {
    let store = notes();
    let note = ObjectRef::new(Note::titled("a"));
    store.persist(&note).unwrap();

    let found = store.find(&Identifier::single("id", 1_i64)).unwrap().unwrap();

    assert!(found.ptr_eq(&note));
    assert!(store.contains(&note));
}

#[test]
fn find_rebuilds_detached_rows() {
    let store = notes();
    let note = ObjectRef::new(Note {
        author: Some(Ref::unresolved(Value::from("author_7"))),
        ..Note::titled("a")
    });
    store.persist(&note).unwrap();
    store.detach_all();

    let found = store.find(&Identifier::single("id", 1_i64)).unwrap().unwrap();

    assert!(!found.ptr_eq(&note));
    assert_eq!(found.get_value("title"), Some(Value::from("a")));
    let author = found.read::<Note, _>(|n| n.author.clone().map(Ref::into_reference));
    assert!(matches!(
        author,
        Some(Some(Reference::Unresolved(Value::Text(ref id)))) if id == "author_7"
    ));
    assert!(store.original_copy(&found).is_some());
    assert_eq!(store.tracked(), 1);

    let again = store.find(&Identifier::single("id", 1_i64)).unwrap().unwrap();
    assert!(again.ptr_eq(&found));
}

#[test]
fn find_misses_unknown_identifiers() {
    let store = notes();

    assert!(store.find(&Identifier::single("id", 5_i64)).unwrap().is_none());
}

#[test]
fn resolved_references_are_stored_by_identifier() {
    let store = notes();
    let author = ObjectRef::new(Author {
        id: Some("author_1".into()),
        name: "Ada".into(),
    });
    let note = ObjectRef::new(Note {
        author: Some(Ref::resolved(author)),
        ..Note::titled("a")
    });

    store.persist(&note).unwrap();

    assert_eq!(
        store.row(&Identifier::single("id", 1_i64)).unwrap()["author"],
        Value::from("author_1")
    );
}

#[test]
fn removing_an_absent_row_is_a_no_op() {
    let store = notes();
    let note = ObjectRef::new(Note::titled("a"));

    store.remove(&note).unwrap();
    store.persist(&note).unwrap();
    store.remove(&note).unwrap();

    assert!(store.is_empty());
    assert!(!store.contains(&note));
}

#[test]
fn composite_identifiers_must_be_complete() {
    let store = MemoryStore::new::<Membership>(standard_factory()).unwrap();
    let partial = ObjectRef::new(Membership {
        member_id: None,
        ..Membership::new(1, 2)
    });

    let err = store.persist(&partial).unwrap_err();

    assert!(matches!(err, PersistError::UnresolvedIdentifier { .. }));
    assert!(store.is_empty());

    let full = ObjectRef::new(Membership::new(1, 2));
    store.persist(&full).unwrap();
    assert!(
        store
            .row(&Identifier::new().with("group_id", 1_i64).with("member_id", 2_i64))
            .is_some()
    );
}

#[test]
fn container_tracks_original_copies() {
    let store = notes();
    let note = ObjectRef::new(Note::titled("a"));
    let snapshot = Snapshot::capture(store.metadata(), &note);

    store.attach(&note);
    store.set_original_copy(&note, snapshot.clone());

    assert!(store.contains(&note));
    assert_eq!(store.original_copy(&note), Some(snapshot));

    store.detach(&note);
    assert!(!store.contains(&note));
    assert_eq!(store.original_copy(&note), None);
}

#[test]
fn unknown_type_cannot_back_a_store() {
    #[derive(Default, ormkit_derive::Persistable)]
    #[persistable(crate = "crate", path = "app::Unmapped")]
    struct Unmapped {
        id: i64,
    }

    assert!(MemoryStore::new::<Unmapped>(standard_factory()).is_err());
}
