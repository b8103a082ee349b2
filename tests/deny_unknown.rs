#![allow(missing_docs)]

use facet::Facet;
use facet_form::{FlatForm, Form, TypeSchema};

// ============================================================================
// Unknown keys are tolerated
// ============================================================================

#[derive(Facet, PartialEq, Debug)]
struct Inner {
    value: u8,
}

#[derive(Facet, PartialEq, Debug)]
struct Record {
    name: String,
    inner: Inner,
    maybe: Option<Inner>,
}

impl Form for Record {}

fn record() -> Record {
    Record {
        name: "name".into(),
        inner: Inner { value: 1 },
        maybe: None,
    }
}

#[test]
fn unknown_top_level_keys_are_ignored() {
    let schema = TypeSchema::of::<Record>().unwrap();
    let mut record = record();

    let form: FlatForm = [("nope", "1"), ("submit", "Save"), ("csrf.token", "abc")]
        .into_iter()
        .collect();
    let outcome = facet_form::load(&schema, &form, &mut record).unwrap();

    assert!(outcome.is_valid());
    assert_eq!(record, self::record());
}

#[test]
fn unknown_nested_keys_are_ignored() {
    let schema = TypeSchema::of::<Record>().unwrap();
    let mut record = record();

    let form: FlatForm = [("inner.other", "x"), ("inner.value", "7")]
        .into_iter()
        .collect();
    assert!(facet_form::load(&schema, &form, &mut record).unwrap().is_valid());
    assert_eq!(record.inner, Inner { value: 7 });
}

#[test]
fn unknown_keys_do_not_allocate() {
    let schema = TypeSchema::of::<Record>().unwrap();
    let mut record = record();

    let form: FlatForm = [("maybe.missing", "1")].into_iter().collect();
    assert!(facet_form::load(&schema, &form, &mut record).unwrap().is_valid());
    assert_eq!(record.maybe, None);
}

#[test]
fn prefixed_forms_only_see_their_keys() {
    let schema = TypeSchema::of::<Inner>().unwrap();
    let form: FlatForm = [("inner.value", "3"), ("value", "9")].into_iter().collect();
    let tree = facet_form::unflatten(&form, "inner.").unwrap();

    let mut slots = facet_form::Snapshot::read(&schema, &Inner { value: 0 }).unwrap();
    let errors = facet_form::apply(&schema, &tree, &mut slots).unwrap();
    assert!(errors.is_empty());

    let inner: Inner = slots.build(&schema).unwrap();
    assert_eq!(inner, Inner { value: 3 });
}
