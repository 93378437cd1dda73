use super::*;
use crate::test_support::{Author, Note};

#[test]
fn runtime_id_is_stable_and_shared_by_clones() {
    let a = ObjectRef::new(Note::titled("a"));
    let b = ObjectRef::new(Note::titled("b"));
    let a2 = a.clone();

    assert_eq!(a.runtime_id(), a.runtime_id());
    assert_eq!(a.runtime_id(), a2.runtime_id());
    assert_ne!(a.runtime_id(), b.runtime_id());
    assert!(a.ptr_eq(&a2));
    assert!(!a.ptr_eq(&b));
}

#[test]
fn values_round_trip_through_the_accessor() {
    let note = ObjectRef::new(Note::titled("a"));

    note.set_value("id", Value::Int(5)).unwrap();
    note.set_value("body", Value::from("text")).unwrap();

    assert_eq!(note.type_path(), "app::Note");
    assert_eq!(note.get_value("id"), Some(Value::Int(5)));
    assert_eq!(note.get_value("title"), Some(Value::from("a")));
    assert_eq!(note.get_value("body"), Some(Value::from("text")));

    note.set_value("body", Value::Null).unwrap();
    assert_eq!(note.read::<Note, _>(|n| n.body.clone()), Some(None));
}

#[test]
fn skipped_and_unknown_members_are_not_accessible() {
    let note = ObjectRef::new(Note::titled("a"));

    assert_eq!(note.get_value("log"), None);
    assert_eq!(note.get_value("nope"), None);

    let err = note.set_value("nope", Value::Int(1)).unwrap_err();
    assert!(matches!(err, AccessError::UnknownField { ref field, .. } if field == "nope"));
}

#[test]
fn wrong_value_shape_is_rejected() {
    let note = ObjectRef::new(Note::titled("a"));

    let err = note.set_value("title", Value::Int(1)).unwrap_err();

    assert!(matches!(
        err,
        AccessError::InvalidValue {
            source: ValueError::TypeMismatch { .. },
            ..
        }
    ));
    assert_eq!(note.get_value("title"), Some(Value::from("a")));
}

#[test]
fn typed_access_checks_the_concrete_type() {
    let note = ObjectRef::new(Note::titled("a"));

    assert!(note.is::<Note>());
    assert!(!note.is::<Author>());
    assert_eq!(note.read::<Author, _>(|a| a.name.clone()), None);

    note.write::<Note, _>(|n| n.title = "b".to_string());
    assert_eq!(note.get_value("title"), Some(Value::from("b")));
}

#[test]
fn associations_hold_unresolved_or_resolved_references() {
    let note = ObjectRef::new(Note::titled("a"));
    let author = ObjectRef::new(Author::default());

    assert!(matches!(note.get_association("author"), Some(Association::One(None))));

    note.set_association(
        "author",
        Association::One(Some(Reference::Unresolved(Value::from("author_1")))),
    )
    .unwrap();
    let raw = note.read::<Note, _>(|n| n.author.as_ref().and_then(|r| r.reference().raw().cloned()));
    assert_eq!(raw, Some(Some(Value::from("author_1"))));

    note.set_association("author", Association::One(Some(Reference::Resolved(author.clone()))))
        .unwrap();
    let resolved = note
        .get_association("author")
        .and_then(|a| a.references().first().and_then(|r| r.object().cloned()));
    assert!(resolved.is_some_and(|o| o.ptr_eq(&author)));
}

#[test]
fn collection_cannot_fill_a_single_valued_association() {
    let note = ObjectRef::new(Note::titled("a"));

    let err = note
        .set_association("author", Association::Many(Vec::new()))
        .unwrap_err();

    assert!(matches!(err, AccessError::InvalidValue { .. }));
}

#[test]
fn types_without_associations_reject_them() {
    let author = ObjectRef::new(Author::default());

    assert!(author.get_association("notes").is_none());
    assert!(author.set_association("notes", Association::Many(Vec::new())).is_err());
}

#[test]
fn unknown_callbacks_are_reported_as_missing() {
    let author = ObjectRef::new(Author::default());
    let args = EventArgs::lifecycle(crate::event::Event::PrePersist, author.clone());

    assert!(author.invoke_callback("pre_persist", &args).is_none());
}

#[test]
fn typed_ref_wraps_a_reference() {
    let r: Ref<Author> = Ref::unresolved(Value::Int(3));
    assert_eq!(r.reference().raw(), Some(&Value::Int(3)));
    assert!(r.object().is_none());

    let author = ObjectRef::new(Author::default());
    let r: Ref<Author> = Ref::resolved(author.clone());
    assert!(r.reference().is_resolved());
    assert!(r.clone().into_reference().object().is_some_and(|o| o.ptr_eq(&author)));
}
