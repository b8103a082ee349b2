//! Addressable field slots: a typed copy of a record's bindable fields.
//!
//! A [`Snapshot`] is read out of a record through [`Peek`], edited in place by
//! the walker, and written back into a freshly built record through
//! [`Partial`]. Nothing touches the original record until [`Snapshot::commit`].

use facet_core::Facet;
use facet_reflect::{Partial, Peek};

use crate::{
    coerce::{FloatWidth, IntWidth, Scalar, ScalarKind},
    error::{FormError, FormErrorKind},
    schema::{FieldDescriptor, FieldKind, TypeSchema},
};

/// The content of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// An `Option` chain that ends in `None` after `present` `Some` layers.
    Absent {
        /// Number of `Some` layers before the `None`.
        present: usize,
    },
    /// A scalar value, with every `Option` layer present.
    Scalar(Scalar),
    /// A nested record, with every `Option` layer present.
    Record(Snapshot),
    /// A field that is not bound generically; built from its default.
    Default,
}

/// The bindable fields of one record, parallel to its [`TypeSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    slots: Vec<Slot>,
    dirty: bool,
}

impl Snapshot {
    /// A record with zero values: `false`, `0`, `0.0`, `""`, and `None` for
    /// every `Option`.
    pub fn zero(schema: &TypeSchema) -> Self {
        let slots = schema
            .fields()
            .iter()
            .map(|field| {
                if field.pointer > 0 {
                    return Slot::Absent { present: 0 };
                }
                match &field.kind {
                    FieldKind::Scalar(kind) => Slot::Scalar(kind.zero()),
                    FieldKind::Struct(nested) => Slot::Record(Snapshot::zero(nested)),
                    FieldKind::Unsupported(_) => Slot::Default,
                }
            })
            .collect();
        Snapshot {
            slots,
            dirty: false,
        }
    }

    /// Copies the bindable fields of `record`.
    ///
    /// Fails with [`FormErrorKind::Unsupported`] if the schema has a field
    /// that cannot be bound, since rebuilding the record would lose it.
    pub fn read<T: Facet<'static>>(schema: &TypeSchema, record: &T) -> Result<Self, FormError> {
        Self::read_at(schema, Peek::new(record), "")
    }

    fn read_at(
        schema: &TypeSchema,
        peek: Peek<'_, 'static>,
        parent: &str,
    ) -> Result<Self, FormError> {
        let record = peek
            .into_struct()
            .map_err(|_| unreadable(parent, schema.type_name()))?;

        let mut slots = Vec::with_capacity(schema.fields().len());
        for (index, field) in schema.fields().iter().enumerate() {
            let path = join(parent, field.name);
            let value = record
                .field(index)
                .map_err(|_| unreadable(&path, field.name))?;
            slots.push(read_slot(field, value, &path)?);
        }
        Ok(Snapshot {
            slots,
            dirty: false,
        })
    }

    /// The slot of the field at `index`.
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Whether anything was written since the snapshot was taken.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn put(&mut self, index: usize, slot: Slot) {
        if let Some(target) = self.slots.get_mut(index) {
            *target = slot;
            self.dirty = true;
        }
    }

    /// Builds a new record of type `T` from the snapshot.
    pub fn build<T: Facet<'static>>(&self, schema: &TypeSchema) -> Result<T, FormError> {
        let mut typed = Partial::alloc::<T>()?;
        log::trace!("Allocated partial for {}", typed.inner_mut().shape());
        self.write(schema, typed.inner_mut())?;
        let built = typed.build()?;
        Ok(*built)
    }

    /// Replaces `record` with the snapshot's content, if anything changed.
    pub fn commit<T: Facet<'static>>(
        &self,
        schema: &TypeSchema,
        record: &mut T,
    ) -> Result<(), FormError> {
        if self.dirty {
            *record = self.build(schema)?;
        }
        Ok(())
    }

    fn write(&self, schema: &TypeSchema, partial: &mut Partial<'static>) -> Result<(), FormError> {
        for (field, slot) in schema.fields().iter().zip(&self.slots) {
            partial.begin_field(field.name)?;
            write_slot(field, slot, partial)?;
            partial.end()?;
        }
        Ok(())
    }
}

/// Where an `Option` chain leads.
pub(crate) enum Target<'mem> {
    /// The value under every `Some` layer.
    Value(Peek<'mem, 'static>),
    /// A `None` after this many `Some` layers.
    Absent(usize),
}

/// Follows `depth` `Option` layers down from `peek`.
pub(crate) fn follow<'mem>(
    peek: Peek<'mem, 'static>,
    depth: usize,
    path: &str,
) -> Result<Target<'mem>, FormError> {
    let mut peek = peek;
    for present in 0..depth {
        let option = peek
            .into_option()
            .map_err(|_| unreadable(path, "an option"))?;
        match option.value() {
            Some(inner) => peek = inner,
            None => return Ok(Target::Absent(present)),
        }
    }
    Ok(Target::Value(peek))
}

fn read_slot(field: &FieldDescriptor, peek: Peek<'_, 'static>, path: &str) -> Result<Slot, FormError> {
    let value = match follow(peek, field.pointer, path)? {
        Target::Value(value) => value,
        Target::Absent(present) => return Ok(Slot::Absent { present }),
    };
    match &field.kind {
        FieldKind::Scalar(kind) => Ok(Slot::Scalar(read_scalar(*kind, value, path)?)),
        FieldKind::Struct(nested) => Ok(Slot::Record(Snapshot::read_at(nested, value, path)?)),
        FieldKind::Unsupported(ty) => Err(FormErrorKind::Unsupported {
            path: path.to_owned(),
            ty: ty.clone(),
        }
        .into()),
    }
}

/// Reads a scalar of `kind`, looking through transparent wrappers.
pub(crate) fn read_scalar(
    kind: ScalarKind,
    peek: Peek<'_, 'static>,
    path: &str,
) -> Result<Scalar, FormError> {
    let peek = peek.innermost_peek();
    let scalar = match kind {
        ScalarKind::Bool => peek.get::<bool>().map(|v| Scalar::Bool(*v)),
        ScalarKind::Int(IntWidth::W8) => peek.get::<i8>().map(|v| Scalar::Int((*v).into())),
        ScalarKind::Int(IntWidth::W16) => peek.get::<i16>().map(|v| Scalar::Int((*v).into())),
        ScalarKind::Int(IntWidth::W32) => peek.get::<i32>().map(|v| Scalar::Int((*v).into())),
        ScalarKind::Int(IntWidth::W64) => peek.get::<i64>().map(|v| Scalar::Int((*v).into())),
        ScalarKind::Int(IntWidth::W128) => peek.get::<i128>().map(|v| Scalar::Int(*v)),
        ScalarKind::Int(IntWidth::Size) => peek.get::<isize>().map(|v| Scalar::Int(*v as i128)),
        ScalarKind::Uint(IntWidth::W8) => peek.get::<u8>().map(|v| Scalar::Uint((*v).into())),
        ScalarKind::Uint(IntWidth::W16) => peek.get::<u16>().map(|v| Scalar::Uint((*v).into())),
        ScalarKind::Uint(IntWidth::W32) => peek.get::<u32>().map(|v| Scalar::Uint((*v).into())),
        ScalarKind::Uint(IntWidth::W64) => peek.get::<u64>().map(|v| Scalar::Uint((*v).into())),
        ScalarKind::Uint(IntWidth::W128) => peek.get::<u128>().map(|v| Scalar::Uint(*v)),
        ScalarKind::Uint(IntWidth::Size) => peek.get::<usize>().map(|v| Scalar::Uint(*v as u128)),
        ScalarKind::Float(FloatWidth::W32) => {
            peek.get::<f32>().map(|v| Scalar::Float(f64::from(*v)))
        }
        ScalarKind::Float(FloatWidth::W64) => peek.get::<f64>().map(|v| Scalar::Float(*v)),
        ScalarKind::String => peek.get::<String>().map(|v| Scalar::String(v.clone())),
    };
    scalar.map_err(|_| unreadable(path, &kind.to_string()))
}

fn write_slot(
    field: &FieldDescriptor,
    slot: &Slot,
    partial: &mut Partial<'static>,
) -> Result<(), FormError> {
    match slot {
        Slot::Absent { present } => {
            for _ in 0..*present {
                partial.begin_some()?;
            }
            partial.set_default()?;
            for _ in 0..*present {
                partial.end()?;
            }
        }
        Slot::Scalar(value) => {
            for _ in 0..field.pointer {
                partial.begin_some()?;
            }
            for _ in 0..field.transparent {
                partial.begin_inner()?;
            }
            if let FieldKind::Scalar(kind) = field.kind {
                set_scalar(partial, kind, value)?;
            }
            for _ in 0..field.pointer + field.transparent {
                partial.end()?;
            }
        }
        Slot::Record(snapshot) => {
            for _ in 0..field.pointer {
                partial.begin_some()?;
            }
            if let FieldKind::Struct(nested) = &field.kind {
                snapshot.write(nested, partial)?;
            }
            for _ in 0..field.pointer {
                partial.end()?;
            }
        }
        Slot::Default => {
            partial.set_default()?;
        }
    }
    Ok(())
}

// Scalars were range-checked against `kind` when they were coerced or read,
// so the narrowing casts are exact.
fn set_scalar(
    partial: &mut Partial<'static>,
    kind: ScalarKind,
    value: &Scalar,
) -> Result<(), FormError> {
    match (kind, value) {
        (ScalarKind::Bool, Scalar::Bool(v)) => partial.set(*v)?,
        (ScalarKind::Int(IntWidth::W8), Scalar::Int(v)) => partial.set(*v as i8)?,
        (ScalarKind::Int(IntWidth::W16), Scalar::Int(v)) => partial.set(*v as i16)?,
        (ScalarKind::Int(IntWidth::W32), Scalar::Int(v)) => partial.set(*v as i32)?,
        (ScalarKind::Int(IntWidth::W64), Scalar::Int(v)) => partial.set(*v as i64)?,
        (ScalarKind::Int(IntWidth::W128), Scalar::Int(v)) => partial.set(*v)?,
        (ScalarKind::Int(IntWidth::Size), Scalar::Int(v)) => partial.set(*v as isize)?,
        (ScalarKind::Uint(IntWidth::W8), Scalar::Uint(v)) => partial.set(*v as u8)?,
        (ScalarKind::Uint(IntWidth::W16), Scalar::Uint(v)) => partial.set(*v as u16)?,
        (ScalarKind::Uint(IntWidth::W32), Scalar::Uint(v)) => partial.set(*v as u32)?,
        (ScalarKind::Uint(IntWidth::W64), Scalar::Uint(v)) => partial.set(*v as u64)?,
        (ScalarKind::Uint(IntWidth::W128), Scalar::Uint(v)) => partial.set(*v)?,
        (ScalarKind::Uint(IntWidth::Size), Scalar::Uint(v)) => partial.set(*v as usize)?,
        (ScalarKind::Float(FloatWidth::W32), Scalar::Float(v)) => partial.set(*v as f32)?,
        (ScalarKind::Float(FloatWidth::W64), Scalar::Float(v)) => partial.set(*v)?,
        (ScalarKind::String, Scalar::String(v)) => partial.set(v.clone())?,
        (kind, value) => {
            return Err(FormErrorKind::Unreadable {
                path: partial.path().to_string(),
                expected: format!("{kind}, got {value:?}"),
            }
            .into());
        }
    };
    Ok(())
}

fn unreadable(path: &str, expected: &str) -> FormError {
    FormErrorKind::Unreadable {
        path: path.to_owned(),
        expected: expected.to_owned(),
    }
    .into()
}

pub(crate) fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}.{name}")
    }
}
