use super::*;
use crate::{
    metadata::{ClassMetadata, ListenerBinding},
    test_support::{Note, RecordingListener, note_log, note_metadata},
    traits::Path,
};
use std::{cell::RefCell, rc::Rc};

fn shared_log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn bind(metadata: &mut ClassMetadata, event: Event, listener: &str, method: &str) {
    metadata.add_listener(
        event,
        ListenerBinding {
            listener: listener.to_string(),
            method: method.to_string(),
        },
    );
}

#[test]
fn event_names_accept_common_spellings() {
    assert_eq!(Event::from_name("prePersist"), Some(Event::PrePersist));
    assert_eq!(Event::from_name("pre_persist"), Some(Event::PrePersist));
    assert_eq!(Event::from_name("post-remove"), Some(Event::PostRemove));
    assert_eq!(Event::from_name("PostUpdate"), Some(Event::PostUpdate));
    assert_eq!(Event::from_name("onFlush"), None);

    assert!(Event::PreUpdate.matches_method("preUpdate"));
    assert!(Event::PreUpdate.matches_method("pre_update"));
    assert!(!Event::PreUpdate.matches_method("postUpdate"));
}

#[test]
fn invoker_runs_callbacks_then_listeners_then_event_manager() {
    let log = shared_log();
    let mut metadata = note_metadata();
    bind(&mut metadata, Event::PostPersist, "audit", "on_saved");

    let mut registry = ListenerRegistry::new();
    registry.register(
        "audit",
        Rc::new(RecordingListener {
            name: "audit",
            log: Rc::clone(&log),
        }),
    );

    let mut bus = EventBus::new();
    let bus_log = Rc::clone(&log);
    bus.subscribe(Event::PostPersist, move |args| {
        bus_log.borrow_mut().push(format!("bus:{}", args.event()));
        Ok(())
    });

    let invoker = ListenerInvoker::new()
        .with_resolver(Rc::new(registry))
        .with_event_manager(Rc::new(bus));
    let note = ObjectRef::new(Note::titled("a"));
    let args = EventArgs::lifecycle(Event::PostPersist, note.clone());

    invoker
        .invoke(&metadata, Event::PostPersist, &note, &args)
        .unwrap();

    assert_eq!(note_log(&note), ["postPersist"]);
    assert_eq!(*log.borrow(), ["audit:on_saved", "bus:postPersist"]);
}

#[test]
fn failing_callback_stops_later_stages() {
    let log = shared_log();
    let mut metadata = note_metadata();
    bind(&mut metadata, Event::PreUpdate, "audit", "on_update");

    let mut registry = ListenerRegistry::new();
    registry.register(
        "audit",
        Rc::new(RecordingListener {
            name: "audit",
            log: Rc::clone(&log),
        }),
    );
    let invoker = ListenerInvoker::new().with_resolver(Rc::new(registry));

    let note = ObjectRef::new(Note::titled("veto"));
    let args = EventArgs::pre_update(note.clone(), ChangeSet::default());
    let err = invoker
        .invoke(&metadata, Event::PreUpdate, &note, &args)
        .unwrap_err();

    assert!(matches!(err, ListenerError::Failed { event: Event::PreUpdate, .. }));
    assert_eq!(err.class(), ErrorClass::Internal);
    assert!(log.borrow().is_empty());
}

#[test]
fn mask_disables_stages() {
    let metadata = note_metadata();
    let note = ObjectRef::new(Note::titled("a"));
    let args = EventArgs::lifecycle(Event::PrePersist, note.clone());

    let invoker = ListenerInvoker::new().with_mask(InvokeMask {
        callbacks: false,
        ..InvokeMask::ALL
    });
    invoker
        .invoke(&metadata, Event::PrePersist, &note, &args)
        .unwrap();

    assert!(note_log(&note).is_empty());
    assert!(!invoker.has_listener_for(&metadata, Event::PrePersist));
    assert!(ListenerInvoker::new().has_listener_for(&metadata, Event::PrePersist));
    assert!(!ListenerInvoker::new().has_listener_for(&metadata, Event::PreRemove));
}

#[test]
fn has_listener_for_consults_the_event_manager() {
    let metadata = ClassMetadata::new("app::Bare");
    let mut bus = EventBus::new();
    bus.subscribe(Event::PreRemove, |_| Ok(()));

    let invoker = ListenerInvoker::new().with_event_manager(Rc::new(bus));

    assert!(invoker.has_listener_for(&metadata, Event::PreRemove));
    assert!(!invoker.has_listener_for(&metadata, Event::PostRemove));
    assert!(
        !invoker
            .with_mask(InvokeMask::NONE)
            .has_listener_for(&metadata, Event::PreRemove)
    );
}

#[test]
fn missing_callback_method_is_an_error() {
    let mut metadata = ClassMetadata::new(Note::PATH);
    metadata.add_lifecycle_callback(Event::PrePersist, "no_such_method");
    let note = ObjectRef::new(Note::titled("a"));
    let args = EventArgs::lifecycle(Event::PrePersist, note.clone());

    let err = ListenerInvoker::new()
        .invoke(&metadata, Event::PrePersist, &note, &args)
        .unwrap_err();

    assert!(matches!(err, ListenerError::CallbackNotFound { ref method, .. } if method == "no_such_method"));
}

#[test]
fn unresolvable_listener_is_an_error() {
    let mut metadata = ClassMetadata::new(Note::PATH);
    bind(&mut metadata, Event::PostRemove, "ghost", "on_removed");
    let note = ObjectRef::new(Note::titled("a"));
    let args = EventArgs::lifecycle(Event::PostRemove, note.clone());

    let err = ListenerInvoker::new()
        .invoke(&metadata, Event::PostRemove, &note, &args)
        .unwrap_err();

    assert!(matches!(err, ListenerError::ListenerNotFound { ref listener } if listener == "ghost"));
}

#[test]
fn event_bus_stops_at_the_first_failure() {
    let log = shared_log();
    let mut bus = EventBus::new();

    let first = Rc::clone(&log);
    bus.subscribe(Event::PostUpdate, move |_| {
        first.borrow_mut().push("first".to_string());
        Err(ListenerError::failed(Event::PostUpdate, "boom"))
    });
    let second = Rc::clone(&log);
    bus.subscribe(Event::PostUpdate, move |_| {
        second.borrow_mut().push("second".to_string());
        Ok(())
    });

    let note = ObjectRef::new(Note::titled("a"));
    let args = EventArgs::lifecycle(Event::PostUpdate, note);

    assert!(bus.dispatch(Event::PostUpdate, &args).is_err());
    assert_eq!(*log.borrow(), ["first"]);
}

#[test]
fn pre_update_args_expose_the_change_set() {
    let metadata = note_metadata();
    let note = ObjectRef::new(Note::titled("a"));
    let original = crate::changeset::Snapshot::capture(&metadata, &note);
    note.write::<Note, _>(|n| n.title = "b".to_string());
    let current = crate::changeset::Snapshot::capture(&metadata, &note);

    let args = EventArgs::pre_update(note, ChangeSet::compute(&metadata, &original, &current));

    assert_eq!(args.event(), Event::PreUpdate);
    assert!(args.has_changed_field("title"));
    assert!(!args.has_changed_field("body"));
    assert_eq!(args.old_value("title"), Some(&Value::from("a")));
    assert_eq!(args.new_value("title"), Some(&Value::from("b")));
}
