//! Filters arrive over the wire (API payloads) and predicates may be cached
//! or shipped to a remote query executor, so both must survive a serde
//! round trip unchanged.

use filter_core::{
    CompareOp, EntityExample, EntityRef, Filter, Predicate, PropertyPath, StringMatch, Value,
};

#[test]
fn filter_list_round_trips_through_json() {
    let filters = vec![
        Filter::new("name", "Luc%"),
        Filter::new("active", true).negated(),
        Filter::new("parent", EntityRef::new("person", 42)).or(),
        Filter::new(
            "contacts",
            EntityExample::of("contact").set("value", "123456"),
        ),
    ];

    let json = serde_json::to_string(&filters).expect("serialize");
    let back: Vec<Filter> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(filters, back);
}

#[test]
fn missing_negative_and_operator_default_on_deserialize() {
    let json = r#"{"property":"name","value":{"String":"Luc"}}"#;
    let filter: Filter = serde_json::from_str(json).expect("deserialize");
    assert_eq!(filter, Filter::new("name", "Luc"));
}

#[test]
fn predicate_tree_round_trips_through_json() {
    let predicate = Predicate::All
        .and(Predicate::Like(
            PropertyPath::root("name"),
            StringMatch::Prefix,
            "Luc".into(),
        ))
        .and(
            Predicate::Compare(
                PropertyPath::root("parent"),
                CompareOp::Eq,
                Value::Reference(EntityRef::new("person", 7)),
            )
            .negate(),
        );

    let json = serde_json::to_string(&predicate).expect("serialize");
    let back: Predicate = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(predicate, back);
}
