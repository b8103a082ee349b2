#![allow(missing_docs)]

use std::any::Any;

use facet::Facet;
use facet_form::{
    Binder, ErrorMap, FlatForm, Form, FormErrorKind, Hex, Options, Registry, ValidationErrors,
};

#[derive(Facet, Debug, PartialEq, Clone, Copy)]
#[facet(transparent)]
struct ObjectId(u64);

impl Hex for ObjectId {
    fn hex(&self) -> String {
        format!("{:012x}", self.0)
    }
}

#[derive(Facet, Debug, PartialEq)]
struct Author {
    #[facet(id)]
    id: ObjectId,
    name: String,
    karma: i32,
}

impl Form for Author {}

#[derive(Facet, Debug, PartialEq)]
struct Meta {
    views: u64,
    author: Option<ObjectId>,
}

#[derive(Facet, Debug, PartialEq)]
struct Post {
    #[facet(id)]
    slug: String,
    title: String,
    meta: Meta,
    published: bool,
}

impl Form for Post {
    fn validate(&mut self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.title.is_empty() {
            errors.add("title", "required");
        }
        errors
    }
}

fn binder() -> Binder {
    let mut registry = Registry::new();
    registry.hex::<ObjectId>();
    registry
        .register::<Author>("blog.authors", Options::default())
        .unwrap();
    registry
        .register::<Post>("blog.posts", Options::columns(["title", "slug"]))
        .unwrap();
    registry.freeze()
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn collections_need_a_database() {
    let mut registry = Registry::new();
    let err = registry
        .register::<Author>("authors", Options::default())
        .unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::InvalidCollection(c) if c == "authors"));
}

#[test]
fn collections_and_types_register_once() {
    let mut registry = Registry::new();
    registry
        .register::<Author>("blog.authors", Options::default())
        .unwrap();

    let err = registry
        .register::<Post>("blog.authors", Options::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"collection "blog.authors" already registered to Author, got Post"#
    );

    let err = registry
        .register::<Author>("blog.writers", Options::default())
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        FormErrorKind::DuplicateType { ty: "Author", collection } if collection == "blog.authors"
    ));
}

#[test]
fn unregister_frees_the_collection_and_type() {
    let mut registry = Registry::new();
    registry
        .register::<Author>("blog.authors", Options::default())
        .unwrap();
    registry.unregister("blog.authors").unwrap();
    assert!(!registry.has_collection("blog.authors"));

    registry
        .register::<Author>("blog.writers", Options::default())
        .unwrap();

    let err = registry.unregister("blog.authors").unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::UnknownCollection(_)));
}

#[test]
fn records_need_an_identifier() {
    #[derive(Facet)]
    struct Anonymous {
        name: String,
    }
    impl Form for Anonymous {}

    let mut registry = Registry::new();
    let err = registry
        .register::<Anonymous>("db.anonymous", Options::default())
        .unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::MissingIdentifier("Anonymous")));
}

#[test]
fn columns_must_be_scalar_fields() {
    let mut registry = Registry::new();
    let err = registry
        .register::<Post>("blog.posts", Options::columns(["meta"]))
        .unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::UnknownField { field, .. } if field == "meta"));
}

// ============================================================================
// The frozen binder
// ============================================================================

#[test]
fn typed_operations() {
    let binder = binder();
    assert_eq!(binder.collection_of::<Post>().unwrap(), "blog.posts");
    assert_eq!(binder.schema::<Author>().unwrap().type_name(), "Author");

    let mut post = binder.new_record::<Post>().unwrap();
    let form: FlatForm = [
        ("slug", "hello"),
        ("title", "Hello"),
        ("meta.views", "10"),
        ("meta.author", "255"),
    ]
    .into_iter()
    .collect();
    assert!(binder.load(&form, &mut post).unwrap().is_valid());
    assert_eq!(post.meta.author, Some(ObjectId(255)));

    let values = binder.values(&post).unwrap();
    assert_eq!(values.value("meta.author"), Some("0000000000ff"));
    assert_eq!(values.value("meta.views"), Some("10"));

    let mut errors = ErrorMap::new();
    errors.add("title", "too short");
    let context = binder.context(&post, errors).unwrap();
    assert_eq!(context.value("slug"), "hello");
    assert_eq!(context.error("title"), "too short");
    assert_eq!(context.error("slug"), "");
    assert_eq!(context.value("nothing.here"), "");
    assert!(context.is_group("meta"));

    let empty = binder.empty_values::<Post>().unwrap();
    assert_eq!(empty.value("meta.author"), Some(""));
}

#[test]
fn unregistered_types_are_reported() {
    #[derive(Facet, Debug)]
    struct Stranger {
        #[facet(id)]
        id: u8,
    }
    impl Form for Stranger {}

    let binder = binder();
    let err = binder.new_record::<Stranger>().unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::UnregisteredType("Stranger")));
}

#[test]
fn erased_operations_by_collection() {
    let binder = binder();

    let mut record = binder.new_any("blog.authors").unwrap();
    let form: FlatForm = [("id", "48879"), ("name", "Ada"), ("karma", "-3")]
        .into_iter()
        .collect();
    let outcome = binder.load_any("blog.authors", &form, record.as_mut()).unwrap();
    assert!(outcome.is_valid());

    let author = record.downcast_ref::<Author>().unwrap();
    assert_eq!(author.karma, -3);
    assert_eq!(binder.id_of("blog.authors", author).unwrap(), "00000000beef");
    assert_eq!(
        binder.values_any("blog.authors", author).unwrap().value("name"),
        Some("Ada")
    );
    assert_eq!(
        binder
            .empty_values_of("blog.authors")
            .unwrap()
            .value("karma"),
        Some("")
    );

    let err = binder
        .load_any("blog.posts", &form, record.as_mut())
        .unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::WrongType { expected: "Post" }));

    let err = binder.new_any("blog.comments").unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::UnknownCollection(_)));
}

#[test]
fn list_rows_follow_columns() {
    let binder = binder();

    assert_eq!(binder.columns("blog.authors").unwrap(), ["id", "name", "karma"]);
    assert_eq!(binder.columns("blog.posts").unwrap(), ["title", "slug"]);

    let author = Author {
        id: ObjectId(1),
        name: "Ada".into(),
        karma: 12,
    };
    assert_eq!(
        binder.row("blog.authors", &author).unwrap(),
        ["000000000001", "Ada", "12"]
    );

    let post: Box<dyn Any> = binder.new_any("blog.posts").unwrap();
    assert_eq!(binder.row("blog.posts", post.as_ref()).unwrap(), ["", ""]);
}

#[test]
fn hex_records_render_the_same_everywhere() {
    #[derive(Facet, Debug, PartialEq, Clone, Copy)]
    struct Rgb {
        r: u8,
        g: u8,
        b: u8,
    }

    impl Hex for Rgb {
        fn hex(&self) -> String {
            format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }

    #[derive(Facet, Debug)]
    struct Swatch {
        #[facet(id)]
        color: Rgb,
        label: String,
    }

    impl Form for Swatch {}

    let mut registry = Registry::new();
    registry.hex::<Rgb>();
    registry
        .register::<Swatch>("paint.swatches", Options::default())
        .unwrap();
    let binder = registry.freeze();

    let swatch = Swatch {
        color: Rgb {
            r: 255,
            g: 128,
            b: 0,
        },
        label: "orange".into(),
    };
    assert_eq!(binder.id_of("paint.swatches", &swatch).unwrap(), "ff8000");

    let values = binder.values(&swatch).unwrap();
    assert_eq!(values.value("color"), Some("ff8000"));
    assert_eq!(values.value("label"), Some("orange"));
}

#[test]
fn collections_are_indexed_by_database() {
    let mut registry = Registry::new();
    registry
        .register::<Post>("blog.posts", Options::default())
        .unwrap();
    registry
        .register::<Author>("accounts.authors", Options::default())
        .unwrap();
    let binder = registry.freeze();

    assert_eq!(
        binder.collections().collect::<Vec<_>>(),
        ["accounts.authors", "blog.posts"]
    );
    let index = binder.index();
    assert_eq!(index["blog"], ["posts"]);
    assert_eq!(index["accounts"], ["authors"]);
    assert!(binder.has_collection("blog.posts"));
    assert!(!binder.has_collection("blog.authors"));
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn binder_is_shared_between_threads() {
    fn assert_sync<T: Send + Sync>() {}
    assert_sync::<Binder>();

    let binder = binder();
    std::thread::scope(|scope| {
        for n in 0..8u64 {
            let binder = &binder;
            scope.spawn(move || {
                let mut author = binder.new_record::<Author>().unwrap();
                let form: FlatForm = [("id", n.to_string()), ("karma", (n * 2).to_string())]
                    .into_iter()
                    .collect();
                assert!(binder.load(&form, &mut author).unwrap().is_valid());
                assert_eq!(author.id, ObjectId(n));
                assert_eq!(author.karma, (n * 2) as i32);
                assert_eq!(
                    binder.id_of("blog.authors", &author).unwrap(),
                    format!("{n:012x}")
                );
            });
        }
    });
}
