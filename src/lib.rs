#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod coerce;
mod config;
mod error;
mod extract;
mod form;
mod registry;
mod schema;
mod slot;
mod tree;
mod walk;

pub use coerce::{CoercionError, CoercionReason, FloatWidth, IntWidth, Scalar, ScalarKind, coerce};
pub use config::BinderConfig;
pub use error::{
    ErrorMap, Expected, FieldError, FormError, FormErrorKind, LoadErrors, ValidationErrors,
};
pub use extract::{FormContext, create_empty_values, create_values};
pub use form::{Form, Loader, Outcome, bind, load, load_with_loader};
pub use registry::{Binder, Hex, Options, Registry};
pub use schema::{FieldDescriptor, FieldKind, HexFn, TypeSchema};
pub use slot::{Slot, Snapshot};
pub use tree::{FlatForm, Node, SEPARATOR, ValueMap, ValueTree, unflatten};
pub use walk::apply;
