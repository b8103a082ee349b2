//! Rendering records back into string maps for display.

use facet_core::Facet;
use facet_reflect::Peek;

use crate::{
    coerce::{FloatWidth, ScalarKind},
    error::{ErrorMap, FormError, FormErrorKind},
    schema::{FieldDescriptor, FieldKind, TypeSchema},
    slot::{Target, follow, join, read_scalar},
    tree::{Node, ValueMap},
};

/// Renders the fields of `record` as a nested map of strings.
///
/// `None` options are left out, so the map can be submitted back unchanged
/// without allocating them. Scalars render with `Display`, or through the
/// hex renderer resolved for the field's type.
pub fn create_values<T: Facet<'static>>(
    schema: &TypeSchema,
    record: &T,
) -> Result<ValueMap, FormError> {
    values_at(schema, Peek::new(record), "")
}

fn values_at(
    schema: &TypeSchema,
    peek: Peek<'_, 'static>,
    parent: &str,
) -> Result<ValueMap, FormError> {
    let record = peek
        .into_struct()
        .map_err(|_| unreadable(parent, schema.type_name()))?;

    let mut values = ValueMap::new();
    for (index, field) in schema.fields().iter().enumerate() {
        let path = join(parent, field.name);
        let value = record
            .field(index)
            .map_err(|_| unreadable(&path, field.name))?;
        let value = match follow(value, field.pointer, &path)? {
            Target::Value(value) => value,
            Target::Absent(_) => continue,
        };

        if let Some(text) = field.hex.and_then(|hex| hex(value)) {
            values.insert_value(field.name, text);
            continue;
        }
        match &field.kind {
            FieldKind::Struct(nested) => {
                values.insert_branch(field.name, values_at(nested, value, &path)?);
            }
            FieldKind::Scalar(_) => {
                values.insert_value(field.name, render(field, value, &path)?);
            }
            FieldKind::Unsupported(_) => {
                log::debug!("Not rendering {path}: unsupported type");
            }
        }
    }
    Ok(values)
}

/// A blank map for `schema`: `""` for every scalar and a nested blank map for
/// every record field, whether behind an `Option` or not.
pub fn create_empty_values(schema: &TypeSchema) -> ValueMap {
    let mut values = ValueMap::new();
    for field in schema.fields() {
        match &field.kind {
            FieldKind::Scalar(_) => values.insert_value(field.name, ""),
            FieldKind::Struct(nested) => {
                values.insert_branch(field.name, create_empty_values(nested))
            }
            FieldKind::Unsupported(_) => {}
        }
    }
    values
}

/// Renders one top-level field of `record`, or `""` if it is a `None` option.
pub(crate) fn render_field<T: Facet<'static>>(
    field: &FieldDescriptor,
    index: usize,
    record: &T,
) -> Result<String, FormError> {
    let record = Peek::new(record)
        .into_struct()
        .map_err(|_| unreadable("", field.name))?;
    let value = record
        .field(index)
        .map_err(|_| unreadable(field.name, field.name))?;
    match follow(value, field.pointer, field.name)? {
        Target::Value(value) => render(field, value, field.name),
        Target::Absent(_) => Ok(String::new()),
    }
}

fn render(field: &FieldDescriptor, value: Peek<'_, 'static>, path: &str) -> Result<String, FormError> {
    if let Some(text) = field.hex.and_then(|hex| hex(value)) {
        return Ok(text);
    }
    match field.kind {
        // Rendered at its own width, not widened.
        FieldKind::Scalar(ScalarKind::Float(FloatWidth::W32)) => value
            .innermost_peek()
            .get::<f32>()
            .map(f32::to_string)
            .map_err(|_| unreadable(path, "f32")),
        FieldKind::Scalar(kind) => Ok(read_scalar(kind, value, path)?.to_string()),
        _ => Err(unreadable(path, "a scalar")),
    }
}

fn unreadable(path: &str, expected: &str) -> FormError {
    FormErrorKind::Unreadable {
        path: path.to_owned(),
        expected: expected.to_owned(),
    }
    .into()
}

/// Values and errors for one rendered form.
///
/// Lookups take dotted paths and yield `""` when nothing is there, so a
/// template can ask for any field unconditionally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormContext {
    values: ValueMap,
    errors: ErrorMap,
}

impl FormContext {
    /// Pairs rendered values with the errors to show next to them.
    pub fn new(values: ValueMap, errors: ErrorMap) -> Self {
        FormContext { values, errors }
    }

    /// The value at `path`, or `""`.
    pub fn value(&self, path: &str) -> &str {
        self.values.value(path).unwrap_or_default()
    }

    /// The error message for `path`, or `""`.
    pub fn error(&self, path: &str) -> String {
        self.errors
            .get(path)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Whether `path` names a nested group of values.
    pub fn is_group(&self, path: &str) -> bool {
        matches!(self.values.lookup(path), Some(Node::Branch(_)))
    }

    /// Whether any error is shown.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All rendered values.
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// All errors.
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }
}
