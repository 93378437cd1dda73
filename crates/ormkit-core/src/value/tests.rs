use super::*;

#[test]
fn json_numbers_prefer_signed_integers() {
    assert_eq!(Value::parse_json("42"), Some(Value::Int(42)));
    assert_eq!(
        Value::parse_json("18446744073709551615"),
        Some(Value::Uint(u64::MAX))
    );
    assert_eq!(Value::parse_json("1.5"), Some(Value::Float(1.5)));
    assert_eq!(Value::parse_json("not json"), None);
}

#[test]
fn json_objects_become_sorted_maps() {
    let value = Value::parse_json(r#"{"b": 1, "a": [true, null]}"#).unwrap();

    let Value::Map(map) = &value else {
        panic!("expected map, got {value:?}");
    };
    assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b"]);
    assert_eq!(value.to_json_string(), r#"{"a":[true,null],"b":1}"#);
}

#[test]
fn datetime_text_round_trips_through_rfc3339() {
    let parsed = Value::parse_datetime("2024-03-01T10:15:00Z").unwrap();

    assert_eq!(parsed.kind(), "datetime");
    assert_eq!(parsed.to_string(), "2024-03-01T10:15:00Z");
}

#[test]
fn invalid_datetime_reports_parse_error() {
    let err = Value::parse_datetime("yesterday").unwrap_err();

    assert!(matches!(
        err,
        ValueError::Parse {
            target: "datetime",
            ..
        }
    ));
}

#[test]
fn date_parsing_accepts_calendar_dates_only() {
    assert_eq!(
        Value::parse_date("2023-12-31").unwrap().to_string(),
        "2023-12-31"
    );
    assert!(Value::parse_date("2023-13-01").is_err());
    assert!(Value::parse_date("2023-02").is_err());
}

#[test]
fn integer_view_rejects_unsigned_overflow() {
    assert_eq!(Value::Uint(7).as_int(), Some(7));
    assert_eq!(Value::Uint(u64::MAX).as_int(), None);
    assert_eq!(Value::Text("7".into()).as_int(), None);
}
