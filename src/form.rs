//! Loading submissions into records and validating them.

use facet_core::Facet;

use crate::{
    error::{ErrorMap, FormError, FormErrorKind, LoadErrors, ValidationErrors},
    schema::TypeSchema,
    slot::Snapshot,
    tree::{FlatForm, ValueMap, unflatten},
    walk::apply,
};

/// A record type that can be edited through forms.
///
/// ```
/// use facet::Facet;
/// use facet_form::{Form, ValidationErrors};
///
/// #[derive(Facet)]
/// struct Signup {
///     #[facet(id)]
///     email: String,
///     age: u8,
/// }
///
/// impl Form for Signup {
///     fn validate(&mut self) -> ValidationErrors {
///         let mut errors = ValidationErrors::new();
///         self.email = self.email.trim().to_lowercase();
///         if !self.email.contains('@') {
///             errors.add("email", "not an email address");
///         }
///         errors
///     }
/// }
/// ```
pub trait Form: Facet<'static> + Sized + 'static {
    /// Checks the record after a load that reported no structural errors.
    ///
    /// May normalize the record. The default accepts everything.
    fn validate(&mut self) -> ValidationErrors {
        ValidationErrors::new()
    }
}

/// Hand-written loading and rendering, replacing the generic binding of a
/// record type entirely.
///
/// Register such types with
/// [`Registry::register_loader`](crate::Registry::register_loader). Their
/// fields may have types that cannot be bound generically.
pub trait Loader {
    /// Loads the raw submission into `self`, returning per-field errors.
    fn load(&mut self, form: &FlatForm) -> Result<LoadErrors, FormError>;

    /// Renders `self` for display.
    fn values(&self) -> ValueMap;

    /// Renders a blank form.
    fn empty_values() -> ValueMap
    where
        Self: Sized,
    {
        ValueMap::new()
    }
}

/// How a load ended, short of a fatal error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Some values did not parse; validation did not run.
    Rejected(LoadErrors),
    /// Every value parsed and validation ran, reporting these errors.
    Validated(ValidationErrors),
}

impl Outcome {
    /// Whether the record is loaded and passed validation.
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Validated(errors) if errors.is_empty())
    }

    /// The errors of whichever phase ended the load.
    pub fn errors(&self) -> &ErrorMap {
        match self {
            Outcome::Rejected(errors) | Outcome::Validated(errors) => errors,
        }
    }

    /// Takes the errors of whichever phase ended the load.
    pub fn into_errors(self) -> ErrorMap {
        match self {
            Outcome::Rejected(errors) | Outcome::Validated(errors) => errors,
        }
    }
}

/// Loads `form` into `record` following `schema`, then validates it.
///
/// Fields the submission does not mention keep their values. If any value
/// fails to parse the result is [`Outcome::Rejected`] and
/// [`Form::validate`] is not called; the values that did parse are still
/// written. On a fatal error `record` is left exactly as it was.
pub fn load<T: Form>(
    schema: &TypeSchema,
    form: &FlatForm,
    record: &mut T,
) -> Result<Outcome, FormError> {
    let errors = bind(schema, form, record)?;
    Ok(finish(errors, record))
}

/// Loads `form` into `record` through its [`Loader`], then validates it.
pub fn load_with_loader<T: Form + Loader>(
    form: &FlatForm,
    record: &mut T,
) -> Result<Outcome, FormError> {
    log::trace!("Loading {} through its loader", T::SHAPE);
    let errors = record.load(form)?;
    Ok(finish(errors, record))
}

/// Unflattens `form` and writes it into `record`, without validating.
pub fn bind<T: Facet<'static>>(
    schema: &TypeSchema,
    form: &FlatForm,
    record: &mut T,
) -> Result<LoadErrors, FormError> {
    if !schema.describes(T::SHAPE) {
        return Err(FormErrorKind::WrongType {
            expected: schema.type_name(),
        }
        .into());
    }

    let tree = unflatten(form, "")?;
    if tree.is_empty() {
        return Ok(LoadErrors::new());
    }

    let mut slots = Snapshot::read(schema, record)?;
    let errors = apply(schema, &tree, &mut slots)?;
    slots.commit(schema, record)?;
    Ok(errors)
}

fn finish<T: Form>(errors: LoadErrors, record: &mut T) -> Outcome {
    if !errors.is_empty() {
        log::debug!("{} rejected with {} field error(s)", T::SHAPE, errors.len());
        return Outcome::Rejected(errors);
    }
    Outcome::Validated(record.validate())
}
