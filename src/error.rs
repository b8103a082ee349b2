use std::{
    collections::BTreeMap,
    error::Error,
    fmt::{self, Display},
};

use facet_reflect::ReflectError;
use kdl::KdlError as KdlParseError;

use crate::coerce::CoercionError;

/// Error type for everything that aborts a binding call or a registration.
///
/// Per-field problems are never reported through this type: they are collected
/// in an [`ErrorMap`] instead.
#[derive(Debug)]
pub struct FormError {
    kind: FormErrorKind,
}

impl FormError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &FormErrorKind {
        &self.kind
    }

    /// A free-form error, for [`Loader`](crate::Loader) implementations.
    pub fn custom(message: impl Into<String>) -> Self {
        FormErrorKind::Custom(message.into()).into()
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}

impl Error for FormError {}

impl<K: Into<FormErrorKind>> From<K> for FormError {
    fn from(value: K) -> Self {
        let kind = value.into();
        FormError { kind }
    }
}

/// Detailed classification of binding errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum FormErrorKind {
    // Load errors
    /// A submitted key has an empty path segment (leading, trailing or doubled dot).
    MalformedKey(String),
    /// The submitted value tree disagrees with the record layout.
    SchemaMismatch {
        /// Dotted path of the offending field.
        path: String,
        /// Whether the schema wanted a nested group or a single value there.
        expected: Expected,
    },
    /// A value could not be read back out of a record.
    Unreadable {
        /// Dotted path of the offending field.
        path: String,
        /// What was expected at that path.
        expected: String,
    },

    // Registration errors
    /// A field's type cannot be bound generically.
    Unsupported {
        /// Dotted path of the offending field.
        path: String,
        /// Description of the unsupported type.
        ty: String,
    },
    /// The record type is not a struct.
    NotARecord(String),
    /// No identifier field was found on the record type.
    MissingIdentifier(&'static str),
    /// A collection specifier without a `database.` part.
    InvalidCollection(String),
    /// The collection is already taken by another type.
    DuplicateCollection {
        /// The collection specifier.
        collection: String,
        /// Type already registered under it.
        existing: &'static str,
        /// Type that was being registered.
        attempted: &'static str,
    },
    /// The type is already registered under another collection.
    DuplicateType {
        /// The type name.
        ty: &'static str,
        /// The collection it is registered under.
        collection: String,
    },
    /// No type is registered under the collection.
    UnknownCollection(String),
    /// A list column that is not a top-level scalar field.
    UnknownField {
        /// The record type.
        ty: &'static str,
        /// The requested column.
        field: String,
    },
    /// The type was never registered.
    UnregisteredType(&'static str),
    /// A type-erased record was not of the registered type.
    WrongType {
        /// Type registered for the collection.
        expected: &'static str,
    },

    // Plumbing
    /// Error from the reflection system while building a record.
    Reflect(ReflectError),
    /// The configuration document is not valid KDL.
    ConfigParse(KdlParseError),
    /// The configuration document is valid KDL but not a valid configuration.
    Config(String),
    /// Error raised by a hand-written loader.
    Custom(String),
}

/// Which side of a leaf/branch disagreement the schema was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// The schema has a nested record where the form supplied a single value.
    Branch,
    /// The schema has a single value where the form supplied nested keys.
    Value,
}

impl Display for FormErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormErrorKind::MalformedKey(key) => write!(f, "malformed form key {key:?}"),
            FormErrorKind::SchemaMismatch { path, expected } => match expected {
                Expected::Branch => write!(f, "field '{path}' is a record, got a single value"),
                Expected::Value => write!(f, "field '{path}' is a single value, got nested keys"),
            },
            FormErrorKind::Unreadable { path, expected } => {
                write!(f, "cannot read field '{path}' as {expected}")
            }
            FormErrorKind::Unsupported { path, ty } => {
                write!(f, "field '{path}' has unsupported type {ty}")
            }
            FormErrorKind::NotARecord(ty) => write!(f, "{ty} is not a struct"),
            FormErrorKind::MissingIdentifier(ty) => {
                write!(f, "no identifier field found on {ty}")
            }
            FormErrorKind::InvalidCollection(collection) => {
                write!(
                    f,
                    "collection specifier {collection:?} does not contain a '.'"
                )
            }
            FormErrorKind::DuplicateCollection {
                collection,
                existing,
                attempted,
            } => write!(
                f,
                "collection {collection:?} already registered to {existing}, got {attempted}"
            ),
            FormErrorKind::DuplicateType { ty, collection } => {
                write!(f, "{ty} already registered as {collection:?}")
            }
            FormErrorKind::UnknownCollection(collection) => {
                write!(f, "no type registered for collection {collection:?}")
            }
            FormErrorKind::UnknownField { ty, field } => {
                write!(f, "{ty} has no scalar field '{field}'")
            }
            FormErrorKind::UnregisteredType(ty) => write!(f, "{ty} is not registered"),
            FormErrorKind::WrongType { expected } => write!(f, "record is not a {expected}"),
            FormErrorKind::Reflect(reflect_error) => write!(f, "{reflect_error}"),
            FormErrorKind::ConfigParse(kdl_error) => write!(f, "{kdl_error}"),
            FormErrorKind::Config(msg) => write!(f, "invalid configuration: {msg}"),
            FormErrorKind::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<ReflectError> for FormErrorKind {
    fn from(value: ReflectError) -> Self {
        Self::Reflect(value)
    }
}

impl From<KdlParseError> for FormErrorKind {
    fn from(value: KdlParseError) -> Self {
        Self::ConfigParse(value)
    }
}

/// A problem with one field, reported inline next to it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The submitted text could not be parsed into the field's type.
    Coercion(CoercionError),
    /// A message from semantic validation or a hand-written loader.
    Message(String),
}

impl FieldError {
    /// A validation message.
    pub fn message(message: impl Into<String>) -> Self {
        FieldError::Message(message.into())
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Coercion(e) => write!(f, "{e}"),
            FieldError::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for FieldError {}

impl From<CoercionError> for FieldError {
    fn from(value: CoercionError) -> Self {
        FieldError::Coercion(value)
    }
}

/// Field errors keyed by dotted field path.
///
/// Both phases of a load report through this shape: see [`LoadErrors`] and
/// [`ValidationErrors`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorMap {
    errors: BTreeMap<String, FieldError>,
}

/// Errors from the structural binding phase.
pub type LoadErrors = ErrorMap;

/// Errors from a record's own semantic validation.
pub type ValidationErrors = ErrorMap;

impl ErrorMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for `path`, replacing any previous one.
    pub fn insert(&mut self, path: impl Into<String>, error: impl Into<FieldError>) {
        self.errors.insert(path.into(), error.into());
    }

    /// Records a message for `path`.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.insert(path, FieldError::message(message));
    }

    /// The error recorded for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors.get(path)
    }

    /// Whether an error is recorded for `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterates errors in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors.iter().map(|(path, error)| (path.as_str(), error))
    }

    /// The recorded paths, in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Moves every error of `nested` into `self`, keyed under `prefix.`.
    pub fn merge_prefixed(&mut self, prefix: &str, nested: ErrorMap) {
        for (path, error) in nested.errors {
            self.errors.insert(format!("{prefix}.{path}"), error);
        }
    }

    /// The rendered messages, for display next to form fields.
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|(path, error)| (path.clone(), error.to_string()))
            .collect()
    }
}

impl<P: Into<String>, E: Into<FieldError>> FromIterator<(P, E)> for ErrorMap {
    fn from_iter<I: IntoIterator<Item = (P, E)>>(iter: I) -> Self {
        let mut map = ErrorMap::new();
        for (path, error) in iter {
            map.insert(path, error);
        }
        map
    }
}

impl IntoIterator for ErrorMap {
    type Item = (String, FieldError);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
