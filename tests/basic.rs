#![allow(missing_docs)]

use facet::Facet;
use facet_form::{FlatForm, Form, FormContext, Outcome, TypeSchema, ValidationErrors, ValueMap};

#[derive(Facet, PartialEq, Debug)]
struct Point {
    x: i64,
    y: String,
    z: bool,
}

impl Form for Point {}

#[test]
fn scalars_from_strings() {
    let schema = TypeSchema::of::<Point>().unwrap();
    let mut point = Point {
        x: 0,
        y: String::new(),
        z: false,
    };

    let form: FlatForm = [("x", "20"), ("y", "foo"), ("z", "true")]
        .into_iter()
        .collect();
    let outcome = facet_form::load(&schema, &form, &mut point).unwrap();

    assert_eq!(outcome, Outcome::Validated(ValidationErrors::new()));
    assert_eq!(
        point,
        Point {
            x: 20,
            y: "foo".into(),
            z: true
        }
    );
}

#[test]
fn empty_form_changes_nothing() {
    let schema = TypeSchema::of::<Point>().unwrap();
    let mut point = Point {
        x: 7,
        y: "kept".into(),
        z: true,
    };

    let outcome = facet_form::load(&schema, &FlatForm::new(), &mut point).unwrap();

    assert!(outcome.is_valid());
    assert_eq!(
        point,
        Point {
            x: 7,
            y: "kept".into(),
            z: true
        }
    );
}

#[test]
fn missing_keys_keep_their_values() {
    let schema = TypeSchema::of::<Point>().unwrap();
    let mut point = Point {
        x: 7,
        y: "kept".into(),
        z: true,
    };

    let form: FlatForm = [("x", "8")].into_iter().collect();
    facet_form::load(&schema, &form, &mut point).unwrap();

    assert_eq!(
        point,
        Point {
            x: 8,
            y: "kept".into(),
            z: true
        }
    );
}

#[test]
fn only_the_first_value_counts() {
    let schema = TypeSchema::of::<Point>().unwrap();
    let mut point = Point {
        x: 0,
        y: String::new(),
        z: false,
    };

    let mut form = FlatForm::new();
    form.add("y", "first");
    form.add("y", "second");
    facet_form::load(&schema, &form, &mut point).unwrap();

    assert_eq!(point.y, "first");
}

#[test]
fn sibling_fields_are_independent() {
    #[derive(Facet, PartialEq, Debug)]
    struct Pair {
        x: i32,
        y: i32,
    }

    impl Form for Pair {}

    let schema = TypeSchema::of::<Pair>().unwrap();
    let mut pair = Pair { x: 1, y: 2 };

    let form: FlatForm = [("x", "abc"), ("y", "5")].into_iter().collect();
    let Outcome::Rejected(errors) = facet_form::load(&schema, &form, &mut pair).unwrap() else {
        panic!("expected the load to be rejected");
    };

    assert_eq!(errors.paths().collect::<Vec<_>>(), ["x"]);
    assert_eq!(pair, Pair { x: 1, y: 5 });
}

#[test]
fn nested_records_use_dotted_keys() {
    #[derive(Facet, PartialEq, Debug)]
    struct Inner {
        a: u8,
        b: String,
    }

    #[derive(Facet, PartialEq, Debug)]
    struct Outer {
        name: String,
        inner: Inner,
    }

    impl Form for Outer {}

    let schema = TypeSchema::of::<Outer>().unwrap();
    let mut outer = Outer {
        name: "n".into(),
        inner: Inner {
            a: 1,
            b: "b".into(),
        },
    };

    let form: FlatForm = [("inner.a", "9"), ("inner.b", "bee")].into_iter().collect();
    assert!(facet_form::load(&schema, &form, &mut outer).unwrap().is_valid());

    assert_eq!(
        outer,
        Outer {
            name: "n".into(),
            inner: Inner {
                a: 9,
                b: "bee".into()
            },
        }
    );

    let form: FlatForm = [("inner.a", "-1")].into_iter().collect();
    let outcome = facet_form::load(&schema, &form, &mut outer).unwrap();
    assert!(outcome.errors().contains("inner.a"));
    assert_eq!(outer.inner.a, 9);
}

#[test]
fn deep_errors_keep_their_dotted_path() {
    #[derive(Facet, Debug)]
    struct Leaf {
        d: u8,
    }

    #[derive(Facet, Debug)]
    struct Branch {
        c: Leaf,
    }

    #[derive(Facet, Debug)]
    struct Root {
        b: Branch,
        x: u8,
    }

    impl Form for Root {}

    let schema = TypeSchema::of::<Root>().unwrap();
    let mut root = Root {
        b: Branch { c: Leaf { d: 0 } },
        x: 0,
    };

    let form: FlatForm = [("b.c.d", "nope"), ("x", "300")].into_iter().collect();
    let outcome = facet_form::load(&schema, &form, &mut root).unwrap();
    assert_eq!(outcome.errors().paths().collect::<Vec<_>>(), ["b.c.d", "x"]);

    let context = FormContext::new(ValueMap::new(), outcome.into_errors());
    assert_eq!(context.error("b.c.d"), r#""nope" is not a valid u8"#);
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Facet, Debug)]
struct Account {
    email: String,
    age: u16,
    validated: bool,
}

impl Form for Account {
    fn validate(&mut self) -> ValidationErrors {
        self.validated = true;
        self.email = self.email.trim().to_lowercase();

        let mut errors = ValidationErrors::new();
        if !self.email.contains('@') {
            errors.add("email", "must contain an @");
        }
        if self.age < 18 {
            errors.add("age", "must be at least 18");
        }
        errors
    }
}

fn account() -> Account {
    Account {
        email: String::new(),
        age: 0,
        validated: false,
    }
}

#[test]
fn validate_runs_after_a_clean_load() {
    let schema = TypeSchema::of::<Account>().unwrap();
    let mut account = account();

    let form: FlatForm = [("email", "  Ada@Example.COM "), ("age", "36")]
        .into_iter()
        .collect();
    let outcome = facet_form::load(&schema, &form, &mut account).unwrap();

    assert!(outcome.is_valid());
    assert!(account.validated);
    assert_eq!(account.email, "ada@example.com");
}

#[test]
fn validate_reports_semantic_errors() {
    let schema = TypeSchema::of::<Account>().unwrap();
    let mut account = account();

    let form: FlatForm = [("email", "nobody"), ("age", "12")].into_iter().collect();
    let Outcome::Validated(errors) = facet_form::load(&schema, &form, &mut account).unwrap()
    else {
        panic!("expected validation to run");
    };

    assert_eq!(errors.len(), 2);
    assert_eq!(errors.get("age").unwrap().to_string(), "must be at least 18");
    assert_eq!(account.age, 12);
}

#[test]
fn validate_is_skipped_after_coercion_errors() {
    let schema = TypeSchema::of::<Account>().unwrap();
    let mut account = account();

    let form: FlatForm = [("email", "a@b.c"), ("age", "old")].into_iter().collect();
    let outcome = facet_form::load(&schema, &form, &mut account).unwrap();

    assert!(matches!(outcome, Outcome::Rejected(_)));
    assert!(!account.validated);
    assert_eq!(account.email, "a@b.c");
}
