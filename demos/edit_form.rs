//! A small admin backend: one edit handler serving every registered
//! collection through the type-erased binder.
//!
//! Run with: cargo run --example edit_form

use std::any::Any;

use facet::Facet;
use facet_form::{
    Binder, BinderConfig, ErrorMap, FlatForm, Form, FormError, FormErrorKind, Hex, Options,
    Outcome, Registry, ValidationErrors, ValueMap,
};
use indoc::indoc;

// ============================================================================
// Record types
// ============================================================================

#[derive(Facet, Debug, Clone, Copy, PartialEq)]
#[facet(transparent)]
struct UserId(u32);

impl Hex for UserId {
    fn hex(&self) -> String {
        format!("{:08x}", self.0)
    }
}

#[derive(Facet, Debug)]
#[allow(dead_code)]
struct Address {
    city: String,
    zip: Option<String>,
}

#[derive(Facet, Debug)]
#[allow(dead_code)]
struct User {
    #[facet(key)]
    id: UserId,
    name: String,
    age: u8,
    address: Option<Address>,
}

impl Form for User {
    fn validate(&mut self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "required");
        }
        errors
    }
}

#[derive(Facet, Debug)]
#[allow(dead_code)]
struct Product {
    sku: String,
    price: f64,
    in_stock: bool,
}

impl Form for Product {
    fn validate(&mut self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.price < 0.0 {
            errors.add("price", "must not be negative");
        }
        errors
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// What an edit handler hands to its template.
enum Page {
    Saved { id: String },
    Edit { values: ValueMap, errors: ErrorMap },
}

/// Loads a submission into `record` and decides which page to show.
fn edit(
    binder: &Binder,
    collection: &str,
    record: &mut dyn Any,
    submission: &FlatForm,
) -> Result<Page, FormError> {
    let errors = match binder.load_any(collection, submission, record)? {
        Outcome::Validated(errors) if errors.is_empty() => {
            return Ok(Page::Saved {
                id: binder.id_of(collection, record)?,
            });
        }
        Outcome::Validated(errors) | Outcome::Rejected(errors) => errors,
    };
    Ok(Page::Edit {
        values: binder.values_any(collection, record)?,
        errors,
    })
}

fn list(binder: &Binder, collection: &str, records: &[&dyn Any]) -> Result<(), FormError> {
    println!("  {}", binder.columns(collection)?.join(" | "));
    for record in records {
        println!("  {}", binder.row(collection, *record)?.join(" | "));
    }
    Ok(())
}

fn show(collection: &str, page: &Page) {
    match page {
        Page::Saved { id } => println!("{collection}: saved {id}"),
        Page::Edit { values, errors } => {
            println!("{collection}: please fix the form");
            for (path, message) in errors.messages() {
                let submitted = values.value(&path).unwrap_or_default();
                println!("  {path} = {submitted:?}: {message}");
            }
        }
    }
}

fn main() -> Result<(), FormError> {
    let config = BinderConfig::from_kdl(indoc! {r#"
        id-attribute "key"
        id-field "sku"
    "#})?;

    let mut registry = Registry::with_config(config);
    registry.hex::<UserId>();
    registry.register::<User>("shop.users", Options::columns(["id", "name"]))?;
    registry.register::<Product>("shop.products", Options::default())?;
    let binder = registry.freeze();

    for (database, collections) in binder.index() {
        println!("{database}: {}", collections.join(", "));
    }

    let submissions: [(&str, FlatForm); 4] = [
        (
            "shop.users",
            [
                ("id", "48879"),
                ("name", "Ada"),
                ("age", "36"),
                ("address.city", "London"),
            ]
            .into_iter()
            .collect(),
        ),
        (
            "shop.users",
            [("id", "7"), ("name", "Bob"), ("age", "300")]
                .into_iter()
                .collect(),
        ),
        (
            "shop.products",
            [("sku", "A-1"), ("price", "-3.5"), ("in_stock", "true")]
                .into_iter()
                .collect(),
        ),
        (
            "shop.products",
            [("sku", "B-2"), ("price", "12.25"), ("in_stock", "false")]
                .into_iter()
                .collect(),
        ),
    ];

    let mut saved: Vec<(&str, Box<dyn Any>)> = Vec::new();
    for (collection, submission) in &submissions {
        let mut record = binder.new_any(collection)?;
        let page = edit(&binder, collection, record.as_mut(), submission)?;
        show(collection, &page);
        if matches!(page, Page::Saved { .. }) {
            saved.push((*collection, record));
        }
    }

    for collection in binder.collections() {
        println!("{collection}");
        let records: Vec<&dyn Any> = saved
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, record)| record.as_ref())
            .collect();
        list(&binder, collection, &records)?;
    }

    // A record handed to the wrong collection is refused.
    let mut product = binder.new_record::<Product>()?;
    match binder.load_any("shop.users", &FlatForm::new(), &mut product) {
        Err(err) if matches!(err.kind(), FormErrorKind::WrongType { .. }) => {
            println!("refused: {err}");
        }
        other => println!("unexpected: {other:?}"),
    }

    Ok(())
}
