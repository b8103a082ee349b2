//! Registering record types under collections, and the shared binder built
//! from them.

use std::{
    any::{Any, TypeId},
    collections::{BTreeMap, HashMap},
};

use facet_core::{Facet, Shape};
use facet_reflect::Peek;

use crate::{
    config::BinderConfig,
    error::{ErrorMap, FormError, FormErrorKind},
    extract::{FormContext, create_empty_values, create_values, render_field},
    form::{self, Form, Loader, Outcome},
    schema::{FieldDescriptor, FieldKind, HexFn, TypeSchema},
    slot::Snapshot,
    tree::{FlatForm, ValueMap},
};

/// Rendering for opaque identifier-like values, preferred over `Display`
/// wherever such a value is shown.
pub trait Hex {
    /// The value as hex text.
    fn hex(&self) -> String;
}

fn render_hex<T: Hex + Facet<'static>>(peek: Peek<'_, 'static>) -> Option<String> {
    peek.get::<T>().ok().map(Hex::hex)
}

/// Per-collection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Top-level fields shown in list views. Empty means every top-level
    /// scalar field, in declaration order.
    pub columns: Vec<String>,
}

impl Options {
    /// Shows `columns` in list views.
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Options {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Type-specific entry points, monomorphized at registration.
#[derive(Clone, Copy)]
struct Ops {
    load: fn(&TypeSchema, &FlatForm, &mut dyn Any) -> Result<Outcome, FormError>,
    values: fn(&TypeSchema, &dyn Any) -> Result<ValueMap, FormError>,
    empty_values: fn(&TypeSchema) -> ValueMap,
    new: fn(&TypeSchema) -> Result<Box<dyn Any>, FormError>,
    render: fn(&TypeSchema, usize, &dyn Any) -> Result<String, FormError>,
}

impl Ops {
    fn generic<T: Form>() -> Self {
        Ops {
            load: |schema, submission, record| {
                form::load(schema, submission, downcast_mut::<T>(record, schema)?)
            },
            values: |schema, record| create_values(schema, downcast::<T>(record, schema)?),
            empty_values: create_empty_values,
            new: new_boxed::<T>,
            render: render_boxed::<T>,
        }
    }

    fn custom<T: Form + Loader>() -> Self {
        Ops {
            load: |schema, submission, record| {
                form::load_with_loader(submission, downcast_mut::<T>(record, schema)?)
            },
            values: |schema, record| Ok(downcast::<T>(record, schema)?.values()),
            empty_values: |_| T::empty_values(),
            new: new_boxed::<T>,
            render: render_boxed::<T>,
        }
    }
}

fn downcast<'a, T: 'static>(record: &'a dyn Any, schema: &TypeSchema) -> Result<&'a T, FormError> {
    record.downcast_ref::<T>().ok_or_else(|| {
        FormErrorKind::WrongType {
            expected: schema.type_name(),
        }
        .into()
    })
}

fn downcast_mut<'a, T: 'static>(
    record: &'a mut dyn Any,
    schema: &TypeSchema,
) -> Result<&'a mut T, FormError> {
    record.downcast_mut::<T>().ok_or_else(|| {
        FormErrorKind::WrongType {
            expected: schema.type_name(),
        }
        .into()
    })
}

fn new_boxed<T: Form>(schema: &TypeSchema) -> Result<Box<dyn Any>, FormError> {
    let record: T = Snapshot::zero(schema).build(schema)?;
    Ok(Box::new(record))
}

fn render_boxed<T: Form>(
    schema: &TypeSchema,
    index: usize,
    record: &dyn Any,
) -> Result<String, FormError> {
    let record = downcast::<T>(record, schema)?;
    match schema.fields().get(index) {
        Some(field) => render_field(field, index, record),
        None => Ok(String::new()),
    }
}

struct Binding {
    type_id: TypeId,
    schema: TypeSchema,
    columns: Vec<String>,
    column_indices: Vec<usize>,
    ops: Ops,
}

/// Collects record types before any form is handled.
///
/// Registration takes `&mut self`; once every type is in, [`Registry::freeze`]
/// turns the registry into a [`Binder`] that can be shared between threads.
///
/// ```
/// use facet::Facet;
/// use facet_form::{FlatForm, Form, Options, Registry};
///
/// #[derive(Facet)]
/// struct Post {
///     #[facet(id)]
///     slug: String,
///     title: String,
/// }
///
/// impl Form for Post {}
///
/// # fn main() -> Result<(), facet_form::FormError> {
/// let mut registry = Registry::new();
/// registry.register::<Post>("blog.posts", Options::default())?;
/// let binder = registry.freeze();
///
/// let mut post = binder.new_record::<Post>()?;
/// let form: FlatForm = [("slug", "hello"), ("title", "Hello!")].into_iter().collect();
/// assert!(binder.load(&form, &mut post)?.is_valid());
/// assert_eq!(binder.id_of("blog.posts", &post)?, "hello");
/// # Ok(())
/// # }
/// ```
pub struct Registry {
    config: BinderConfig,
    hex: Vec<(&'static Shape, HexFn)>,
    bindings: BTreeMap<String, Binding>,
    by_type: HashMap<TypeId, String>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BinderConfig::default())
    }

    /// An empty registry.
    pub fn with_config(config: BinderConfig) -> Self {
        Registry {
            config,
            hex: Vec::new(),
            bindings: BTreeMap::new(),
            by_type: HashMap::new(),
        }
    }

    /// Renders values of type `T` through [`Hex`] in every type registered
    /// after this call.
    pub fn hex<T: Hex + Facet<'static>>(&mut self) -> &mut Self {
        log::debug!("Rendering {} as hex", T::SHAPE);
        self.hex.push((T::SHAPE, render_hex::<T>));
        self
    }

    /// Registers `T` for generic binding under `collection`.
    ///
    /// Every field of `T`, nested records included, must be bindable, and
    /// `T` must have an identifier field.
    pub fn register<T: Form>(&mut self, collection: &str, options: Options) -> Result<(), FormError> {
        let schema = self.schema_of::<T>()?;
        if let Some((path, ty)) = schema.first_unsupported() {
            return Err(FormErrorKind::Unsupported {
                path,
                ty: ty.to_owned(),
            }
            .into());
        }
        self.insert::<T>(collection, schema, options, Ops::generic::<T>())
    }

    /// Registers `T` under `collection`, loading and rendering through its
    /// [`Loader`].
    ///
    /// `T` must have an identifier field; other fields may be of any type.
    pub fn register_loader<T: Form + Loader>(
        &mut self,
        collection: &str,
        options: Options,
    ) -> Result<(), FormError> {
        let schema = self.schema_of::<T>()?;
        self.insert::<T>(collection, schema, options, Ops::custom::<T>())
    }

    /// Removes the type registered under `collection`.
    pub fn unregister(&mut self, collection: &str) -> Result<(), FormError> {
        let binding = self
            .bindings
            .remove(collection)
            .ok_or_else(|| FormErrorKind::UnknownCollection(collection.to_owned()))?;
        self.by_type.remove(&binding.type_id);
        log::info!("Unregistered {} from {collection}", binding.schema.type_name());
        Ok(())
    }

    /// Whether a type is registered under `collection`.
    pub fn has_collection(&self, collection: &str) -> bool {
        self.bindings.contains_key(collection)
    }

    /// Ends registration.
    pub fn freeze(self) -> Binder {
        log::debug!("Freezing {} collection(s)", self.bindings.len());
        Binder {
            bindings: self.bindings,
            by_type: self.by_type,
        }
    }

    fn schema_of<T: Form>(&self) -> Result<TypeSchema, FormError> {
        let schema = TypeSchema::build(T::SHAPE, &self.config, &self.hex)?;
        if schema.id_index().is_none() {
            return Err(FormErrorKind::MissingIdentifier(schema.type_name()).into());
        }
        Ok(schema)
    }

    fn insert<T: Form>(
        &mut self,
        collection: &str,
        schema: TypeSchema,
        options: Options,
        ops: Ops,
    ) -> Result<(), FormError> {
        if !collection.contains('.') {
            return Err(FormErrorKind::InvalidCollection(collection.to_owned()).into());
        }
        if let Some(existing) = self.bindings.get(collection) {
            return Err(FormErrorKind::DuplicateCollection {
                collection: collection.to_owned(),
                existing: existing.schema.type_name(),
                attempted: schema.type_name(),
            }
            .into());
        }
        let type_id = TypeId::of::<T>();
        if let Some(registered) = self.by_type.get(&type_id) {
            return Err(FormErrorKind::DuplicateType {
                ty: schema.type_name(),
                collection: registered.clone(),
            }
            .into());
        }

        let (columns, column_indices) = resolve_columns(&schema, options)?;
        log::info!("Registered {} as {collection}", schema.type_name());
        self.by_type.insert(type_id, collection.to_owned());
        self.bindings.insert(
            collection.to_owned(),
            Binding {
                type_id,
                schema,
                columns,
                column_indices,
                ops,
            },
        );
        Ok(())
    }
}

fn resolve_columns(
    schema: &TypeSchema,
    options: Options,
) -> Result<(Vec<String>, Vec<usize>), FormError> {
    let is_column = |field: &FieldDescriptor| matches!(field.kind, FieldKind::Scalar(_));

    if options.columns.is_empty() {
        let (columns, indices) = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| is_column(field))
            .map(|(index, field)| (field.name.to_owned(), index))
            .unzip();
        return Ok((columns, indices));
    }

    let mut indices = Vec::with_capacity(options.columns.len());
    for column in &options.columns {
        let index = schema
            .fields()
            .iter()
            .position(|field| field.name == column.as_str() && is_column(field))
            .ok_or_else(|| FormErrorKind::UnknownField {
                ty: schema.type_name(),
                field: column.clone(),
            })?;
        indices.push(index);
    }
    Ok((options.columns, indices))
}

/// The registered types, ready to bind forms.
///
/// Immutable and `Sync`: share it by reference between request handlers.
/// Typed methods find the binding by record type; the `_any`/`_of` methods
/// and the list view helpers take a collection name and work on `dyn Any`
/// records, for handlers that serve every collection alike.
pub struct Binder {
    bindings: BTreeMap<String, Binding>,
    by_type: HashMap<TypeId, String>,
}

impl Binder {
    fn binding(&self, collection: &str) -> Result<&Binding, FormError> {
        self.bindings
            .get(collection)
            .ok_or_else(|| FormErrorKind::UnknownCollection(collection.to_owned()).into())
    }

    fn binding_for<T: Form>(&self) -> Result<&Binding, FormError> {
        let collection = self
            .by_type
            .get(&TypeId::of::<T>())
            .ok_or(FormErrorKind::UnregisteredType(T::SHAPE.type_identifier))?;
        self.binding(collection)
    }

    /// The schema `T` was registered with.
    pub fn schema<T: Form>(&self) -> Result<&TypeSchema, FormError> {
        Ok(&self.binding_for::<T>()?.schema)
    }

    /// The collection `T` is registered under.
    pub fn collection_of<T: Form>(&self) -> Result<&str, FormError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(String::as_str)
            .ok_or_else(|| FormErrorKind::UnregisteredType(T::SHAPE.type_identifier).into())
    }

    /// Loads `form` into `record` and validates it.
    pub fn load<T: Form>(&self, form: &FlatForm, record: &mut T) -> Result<Outcome, FormError> {
        let binding = self.binding_for::<T>()?;
        (binding.ops.load)(&binding.schema, form, record)
    }

    /// Renders `record` for display.
    pub fn values<T: Form>(&self, record: &T) -> Result<ValueMap, FormError> {
        let binding = self.binding_for::<T>()?;
        (binding.ops.values)(&binding.schema, record)
    }

    /// Renders a blank form for `T`.
    pub fn empty_values<T: Form>(&self) -> Result<ValueMap, FormError> {
        let binding = self.binding_for::<T>()?;
        Ok((binding.ops.empty_values)(&binding.schema))
    }

    /// Renders `record` together with `errors` for an edit form.
    pub fn context<T: Form>(&self, record: &T, errors: ErrorMap) -> Result<FormContext, FormError> {
        Ok(FormContext::new(self.values(record)?, errors))
    }

    /// A new record of type `T` with zero values.
    pub fn new_record<T: Form>(&self) -> Result<T, FormError> {
        let binding = self.binding_for::<T>()?;
        Snapshot::zero(&binding.schema).build(&binding.schema)
    }

    /// Loads `form` into a record of the type registered under `collection`.
    pub fn load_any(
        &self,
        collection: &str,
        form: &FlatForm,
        record: &mut dyn Any,
    ) -> Result<Outcome, FormError> {
        let binding = self.binding(collection)?;
        (binding.ops.load)(&binding.schema, form, record)
    }

    /// Renders a record of the type registered under `collection`.
    pub fn values_any(&self, collection: &str, record: &dyn Any) -> Result<ValueMap, FormError> {
        let binding = self.binding(collection)?;
        (binding.ops.values)(&binding.schema, record)
    }

    /// Renders a blank form for the type registered under `collection`.
    pub fn empty_values_of(&self, collection: &str) -> Result<ValueMap, FormError> {
        let binding = self.binding(collection)?;
        Ok((binding.ops.empty_values)(&binding.schema))
    }

    /// A new record with zero values, of the type registered under
    /// `collection`.
    pub fn new_any(&self, collection: &str) -> Result<Box<dyn Any>, FormError> {
        let binding = self.binding(collection)?;
        (binding.ops.new)(&binding.schema)
    }

    /// The identifier of `record`, hex-rendered if its type asks for it.
    pub fn id_of(&self, collection: &str, record: &dyn Any) -> Result<String, FormError> {
        let binding = self.binding(collection)?;
        let index = binding
            .schema
            .id_index()
            .ok_or(FormErrorKind::MissingIdentifier(binding.schema.type_name()))?;
        (binding.ops.render)(&binding.schema, index, record)
    }

    /// The list view columns of `collection`.
    pub fn columns(&self, collection: &str) -> Result<&[String], FormError> {
        Ok(&self.binding(collection)?.columns)
    }

    /// The list view cells of `record`, one per column.
    pub fn row(&self, collection: &str, record: &dyn Any) -> Result<Vec<String>, FormError> {
        let binding = self.binding(collection)?;
        binding
            .column_indices
            .iter()
            .map(|&index| (binding.ops.render)(&binding.schema, index, record))
            .collect()
    }

    /// Collection names grouped by database, both in name order.
    pub fn index(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut index: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for name in self.bindings.keys() {
            if let Some((database, collection)) = name.split_once('.') {
                index.entry(database).or_default().push(collection);
            }
        }
        index
    }

    /// Every registered collection, in name order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Whether a type is registered under `collection`.
    pub fn has_collection(&self, collection: &str) -> bool {
        self.bindings.contains_key(collection)
    }
}
