//! Writing an unflattened submission into a record's slots.

use crate::{
    coerce::coerce,
    error::{Expected, FormError, FormErrorKind, LoadErrors},
    schema::{FieldKind, TypeSchema},
    slot::{Slot, Snapshot, join},
    tree::{Node, ValueTree},
};

/// Writes the values of `tree` into `slots`, field by field.
///
/// Fields without an entry in the tree are left alone, and entries naming no
/// field are ignored. Values that do not parse are collected in the returned
/// [`LoadErrors`] under their dotted path, and the field keeps its value.
///
/// A tree shape that contradicts the schema (a value where a nested record is
/// expected, or nested keys for a scalar) aborts with
/// [`FormErrorKind::SchemaMismatch`]; the slots may then be partially written
/// and should be discarded.
///
/// `Option` fields are allocated only if something is written below them.
pub fn apply(
    schema: &TypeSchema,
    tree: &ValueTree,
    slots: &mut Snapshot,
) -> Result<LoadErrors, FormError> {
    apply_at(schema, tree, slots, "")
}

fn apply_at(
    schema: &TypeSchema,
    tree: &ValueTree,
    slots: &mut Snapshot,
    parent: &str,
) -> Result<LoadErrors, FormError> {
    let mut errors = LoadErrors::new();

    for (name, _) in tree.iter() {
        if schema.field(name).is_none() {
            log::debug!("Ignoring form key {:?}: no such field", join(parent, name));
        }
    }

    for (index, field) in schema.fields().iter().enumerate() {
        let Some(node) = tree.get(field.name) else {
            continue;
        };
        let path = join(parent, field.name);
        log::trace!("Binding field {path}");

        match (&field.kind, node) {
            (FieldKind::Scalar(kind), Node::Leaf(text)) => match coerce(*kind, text) {
                Ok(value) => slots.put(index, Slot::Scalar(value)),
                Err(error) => {
                    log::trace!("Field {path}: {error}");
                    errors.insert(field.name, error);
                }
            },
            (FieldKind::Struct(nested), Node::Branch(branch)) => {
                let mut nested_slots = match slots.slot(index) {
                    Some(Slot::Record(existing)) => existing.clone(),
                    _ => Snapshot::zero(nested),
                };
                let nested_errors = apply_at(nested, branch, &mut nested_slots, &path)?;
                if nested_slots.is_dirty() {
                    log::trace!("Writing record {path}");
                    slots.put(index, Slot::Record(nested_slots));
                }
                errors.merge_prefixed(field.name, nested_errors);
            }
            (FieldKind::Struct(_), Node::Leaf(_)) => {
                return Err(FormErrorKind::SchemaMismatch {
                    path,
                    expected: Expected::Branch,
                }
                .into());
            }
            (FieldKind::Scalar(_), Node::Branch(_)) => {
                return Err(FormErrorKind::SchemaMismatch {
                    path,
                    expected: Expected::Value,
                }
                .into());
            }
            (FieldKind::Unsupported(ty), _) => {
                return Err(FormErrorKind::Unsupported {
                    path,
                    ty: ty.clone(),
                }
                .into());
            }
        }
    }

    Ok(errors)
}
