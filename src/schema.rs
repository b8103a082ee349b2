//! Registration-time description of a record type's bindable fields.

use facet_core::{Def, Facet, FieldAttribute, Shape, Type, UserType};
use facet_reflect::Peek;

use crate::{
    coerce::ScalarKind,
    config::BinderConfig,
    error::{FormError, FormErrorKind},
};

/// Renders a value through its type's [`Hex`](crate::Hex) capability.
///
/// Returns `None` when the value is not of the type the renderer was
/// registered for.
pub type HexFn = fn(Peek<'_, 'static>) -> Option<String>;

/// Hex renderers by the shape of the type they render.
pub(crate) type HexTable = [(&'static Shape, HexFn)];

/// What a field binds to.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A single value parsed from one form string.
    Scalar(ScalarKind),
    /// A nested record, addressed with dotted keys.
    Struct(TypeSchema),
    /// A type that cannot be bound generically, with a description of it.
    Unsupported(String),
}

/// One field of a [`TypeSchema`].
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Name used in form keys (after any rename).
    pub name: &'static str,
    /// What the field binds to once pointers and wrappers are peeled.
    pub kind: FieldKind,
    /// Number of `Option` layers around the value.
    pub pointer: usize,
    /// Number of transparent newtype layers around a scalar.
    pub transparent: usize,
    /// Hex renderer for the field's value type, if one was registered.
    pub hex: Option<HexFn>,
}

/// The bindable layout of a record type, built once from its reflected shape.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    shape: &'static Shape,
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    id: Option<usize>,
}

impl TypeSchema {
    /// Builds the schema of `T` with the default configuration and no hex
    /// renderers.
    pub fn of<T: Facet<'static>>() -> Result<Self, FormError> {
        Self::build(T::SHAPE, &BinderConfig::default(), &[])
    }

    /// Builds the schema of `T` with `config` deciding the identifier field.
    pub fn with_config<T: Facet<'static>>(config: &BinderConfig) -> Result<Self, FormError> {
        Self::build(T::SHAPE, config, &[])
    }

    pub(crate) fn build(
        shape: &'static Shape,
        config: &BinderConfig,
        hex: &HexTable,
    ) -> Result<Self, FormError> {
        log::trace!("Building schema for {shape}");
        let Type::User(UserType::Struct(struct_type)) = &shape.ty else {
            return Err(FormErrorKind::NotARecord(shape.to_string()).into());
        };

        let fields = struct_type
            .fields
            .iter()
            .map(|field| describe(field.name, field.shape, config, hex))
            .collect::<Result<Vec<_>, _>>()?;

        let tagged = struct_type.fields.iter().position(|field| {
            field.attributes.iter().any(
                |attr| matches!(attr, FieldAttribute::Arbitrary(a) if *a == config.id_attribute),
            )
        });
        let id = tagged.or_else(|| {
            let fallback = config.id_field.as_deref()?;
            fields.iter().position(|field| field.name == fallback)
        });

        Ok(TypeSchema {
            shape,
            type_name: shape.type_identifier,
            fields,
            id,
        })
    }

    /// Name of the record type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the schema was built from `shape`.
    pub fn describes(&self, shape: &'static Shape) -> bool {
        self.shape == shape
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The field named `name`.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Index of the identifier field.
    pub fn id_index(&self) -> Option<usize> {
        self.id
    }

    /// The identifier field.
    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.fields.get(self.id?)
    }

    /// The first field, searched depth-first, whose type cannot be bound,
    /// as its dotted path and type description.
    pub fn first_unsupported(&self) -> Option<(String, &str)> {
        self.fields.iter().find_map(|field| match &field.kind {
            FieldKind::Unsupported(ty) => Some((field.name.to_owned(), ty.as_str())),
            FieldKind::Struct(nested) => nested
                .first_unsupported()
                .map(|(path, ty)| (format!("{}.{path}", field.name), ty)),
            FieldKind::Scalar(_) => None,
        })
    }
}

fn describe(
    name: &'static str,
    shape: &'static Shape,
    config: &BinderConfig,
    hex: &HexTable,
) -> Result<FieldDescriptor, FormError> {
    let mut shape = shape;
    let mut pointer = 0;
    while let Def::Option(option) = shape.def {
        pointer += 1;
        shape = option.t();
    }

    let renderer = hex
        .iter()
        .find(|(hex_shape, _)| *hex_shape == shape)
        .map(|(_, render)| *render);

    let value_shape = shape;
    let mut transparent = 0;
    let kind = loop {
        if let Some(kind) = scalar_kind(shape) {
            break FieldKind::Scalar(kind);
        }
        match (&shape.ty, shape.inner) {
            (Type::User(UserType::Struct(_)), Some(inner)) => {
                transparent += 1;
                shape = inner();
            }
            (Type::User(UserType::Struct(_)), None) if transparent == 0 => {
                break FieldKind::Struct(TypeSchema::build(shape, config, hex)?);
            }
            _ => break FieldKind::Unsupported(value_shape.to_string()),
        }
    };

    log::trace!("Field {name}: {kind:?} behind {pointer} option(s), {transparent} wrapper(s)");
    Ok(FieldDescriptor {
        name,
        kind,
        pointer,
        transparent,
        hex: renderer,
    })
}

fn scalar_kind(shape: &Shape) -> Option<ScalarKind> {
    if matches!(shape.ty, Type::User(UserType::Struct(_) | UserType::Enum(_)))
        || matches!(shape.def, Def::Option(_))
    {
        return None;
    }
    ScalarKind::from_type_identifier(shape.type_identifier)
}
