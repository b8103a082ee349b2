//! Binder configuration, read from KDL.

use std::str::FromStr;

use kdl::{KdlDocument, KdlNode, KdlValue};

use crate::error::{FormError, FormErrorKind};

/// Settings that apply to every registered type.
///
/// ```kdl
/// id-attribute "id"
/// id-field "_id"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfig {
    /// Field attribute marking the identifier field, as in `#[facet(id)]`.
    pub id_attribute: String,
    /// Name of the identifier field for types without the attribute.
    pub id_field: Option<String>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        BinderConfig {
            id_attribute: "id".to_owned(),
            id_field: None,
        }
    }
}

impl BinderConfig {
    /// Reads a configuration document. Settings it does not mention keep
    /// their defaults.
    pub fn from_kdl(kdl: &str) -> Result<Self, FormError> {
        let document: KdlDocument = kdl.parse()?;
        log::trace!("Configuration parsed");

        let mut config = BinderConfig::default();
        for node in document.nodes() {
            match node.name().value() {
                "id-attribute" => config.id_attribute = string_argument(node)?,
                "id-field" => config.id_field = Some(string_argument(node)?),
                other => {
                    return Err(FormErrorKind::Config(format!("unknown setting `{other}`")).into());
                }
            }
        }
        Ok(config)
    }
}

impl FromStr for BinderConfig {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_kdl(s)
    }
}

fn string_argument(node: &KdlNode) -> Result<String, FormError> {
    let name = node.name().value();
    let mut arguments = node.entries().iter().filter(|entry| entry.name().is_none());
    let (Some(entry), None) = (arguments.next(), arguments.next()) else {
        return Err(FormErrorKind::Config(format!("`{name}` takes exactly one argument")).into());
    };
    if node.entries().len() > 1 || node.children().is_some() {
        return Err(FormErrorKind::Config(format!("`{name}` takes no properties or children")).into());
    }
    match entry.value() {
        KdlValue::String(value) if !value.is_empty() => Ok(value.clone()),
        KdlValue::String(_) => Err(FormErrorKind::Config(format!("`{name}` cannot be empty")).into()),
        other => Err(FormErrorKind::Config(format!("`{name}` expects a string, got {other}")).into()),
    }
}
