use super::*;
use proptest::prelude::*;

#[test]
fn composite_equality_ignores_insertion_order() {
    let left = Identifier::new().with("a", 1).with("b", "x");
    let right = Identifier::new().with("b", "x").with("a", 1);

    assert_eq!(left, right);
}

#[test]
fn subset_identifier_is_not_equal() {
    let partial = Identifier::single("a", 1);
    let full = Identifier::new().with("a", 1).with("b", "x");

    assert_ne!(partial, full);
}

#[test]
fn equality_does_not_coerce_numbers_and_text() {
    assert_ne!(Identifier::single("id", 1), Identifier::single("id", "1"));
}

#[test]
fn completeness_requires_non_null_values() {
    assert!(!Identifier::new().is_complete());
    assert!(!Identifier::single("id", Value::Null).is_complete());
    assert!(Identifier::single("id", 7).is_complete());
}

#[test]
fn scalar_binds_to_first_identifier_name() {
    let id = RawIdentifier::from(5).normalize(&["id", "tenant"]);

    assert_eq!(id, Identifier::single("id", 5));
}

#[test]
fn field_map_is_restricted_and_padded() {
    let raw = Identifier::new().with("tenant", "acme").with("noise", true);
    let id = RawIdentifier::from(raw).normalize(&["id", "tenant"]);

    assert_eq!(
        id,
        Identifier::new().with("id", Value::Null).with("tenant", "acme")
    );
}

#[test]
fn single_identifier_renders_as_scalar_value() {
    assert_eq!(Identifier::single("id", 3).to_value(), Value::Int(3));
    assert!(matches!(
        Identifier::new().with("a", 1).with("b", 2).to_value(),
        Value::Map(_)
    ));
}

proptest! {
    #[test]
    fn equality_is_order_independent(
        entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 1..6)
    ) {
        let forward: Identifier = entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::Int(*v)))
            .collect();
        let backward: Identifier = entries
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), Value::Int(*v)))
            .collect();

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.key(), backward.key());
    }

    #[test]
    fn dropping_any_key_breaks_equality(
        entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 2..6),
        drop_index in any::<prop::sample::Index>(),
    ) {
        let full: Identifier = entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::Int(*v)))
            .collect();
        let skip = drop_index.index(entries.len());
        let partial: Identifier = entries
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, (k, v))| (k.clone(), Value::Int(*v)))
            .collect();

        prop_assert_ne!(full, partial);
    }
}
