//! Flat submissions and the nested value trees built from them.

use std::collections::{BTreeMap, btree_map};

use crate::error::{FormError, FormErrorKind};

/// Separator between the segments of a form key.
pub const SEPARATOR: char = '.';

/// A decoded submission: keys mapped to one or more values.
///
/// Keys are kept in lexicographic order, which is also the order in which
/// [`unflatten`] resolves collisions. Only the first value of a key is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatForm {
    values: BTreeMap<String, Vec<String>>,
}

impl FlatForm {
    /// An empty submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces all values of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    /// The first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the submission has no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates keys with their first value, skipping keys without values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(key, values)| Some((key.as_str(), values.first()?.as_str())))
    }

    /// Flattens a value map back into a submission, joining nested names with dots.
    pub fn from_tree(tree: &ValueTree) -> Self {
        let mut form = FlatForm::new();
        flatten_into(&mut form, "", tree);
        form
    }
}

fn flatten_into(form: &mut FlatForm, prefix: &str, tree: &ValueTree) {
    for (name, node) in tree.iter() {
        let key = format!("{prefix}{name}");
        match node {
            Node::Leaf(value) => form.set(key, value.clone()),
            Node::Branch(branch) => flatten_into(form, &format!("{key}{SEPARATOR}"), branch),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FlatForm::new();
        for (key, value) in iter {
            form.add(key, value);
        }
        form
    }
}

/// One entry of a [`ValueTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A single value.
    Leaf(String),
    /// A nested group of values.
    Branch(ValueTree),
}

/// A nested map from path segment to a value or a nested map.
///
/// This is both what [`unflatten`] builds from a submission and what value
/// extraction renders for display, so one can be fed back into the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueTree {
    entries: BTreeMap<String, Node>,
}

/// Rendered field values of a record, for pre-filling forms.
pub type ValueMap = ValueTree;

impl ValueTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry named `name`.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    /// Follows a dotted path down the tree.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let (head, rest) = match path.split_once(SEPARATOR) {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        match (self.entries.get(head)?, rest) {
            (node, None) => Some(node),
            (Node::Branch(branch), Some(rest)) => branch.lookup(rest),
            (Node::Leaf(_), Some(_)) => None,
        }
    }

    /// The value at a dotted path, if it is a leaf.
    pub fn value(&self, path: &str) -> Option<&str> {
        match self.lookup(path)? {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    /// Sets a leaf, replacing whatever was there.
    pub fn insert_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), Node::Leaf(value.into()));
    }

    /// Sets a branch, replacing whatever was there.
    pub fn insert_branch(&mut self, name: impl Into<String>, branch: ValueTree) {
        self.entries.insert(name.into(), Node::Branch(branch));
    }

    /// Whether the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of direct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates direct entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }
}

/// Builds a [`ValueTree`] from the keys of `form` that start with `prefix`.
///
/// The prefix is stripped and the rest of each key is split on dots. Keys are
/// visited in lexicographic order and the first key to claim a name wins:
/// later keys landing on a name already holding a value or a group are
/// dropped. A key sorts before every key it is a prefix of, so a value at `A`
/// always shadows `A.B`.
///
/// Keys with an empty segment are rejected with
/// [`FormErrorKind::MalformedKey`].
pub fn unflatten(form: &FlatForm, prefix: &str) -> Result<ValueTree, FormError> {
    log::trace!("Unflattening {} keys under {prefix:?}", form.values.len());

    let mut tree = ValueTree::new();
    for (key, value) in form.iter() {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        let segments: Vec<&str> = rest.split(SEPARATOR).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(FormErrorKind::MalformedKey(key.to_owned()).into());
        }
        if !insert_path(&mut tree, &segments, value) {
            log::debug!("Dropping form key {key:?}: name already taken");
        }
    }
    Ok(tree)
}

/// Inserts `value` at `segments`, unless a name on the way is already taken
/// by the other kind of node. Returns whether the value was kept.
fn insert_path(tree: &mut ValueTree, segments: &[&str], value: &str) -> bool {
    let Some((name, rest)) = segments.split_first() else {
        return false;
    };

    if rest.is_empty() {
        return match tree.entries.entry((*name).to_owned()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(Node::Leaf(value.to_owned()));
                true
            }
            btree_map::Entry::Occupied(_) => false,
        };
    }

    let node = tree
        .entries
        .entry((*name).to_owned())
        .or_insert_with(|| Node::Branch(ValueTree::new()));
    match node {
        Node::Branch(branch) => insert_path(branch, rest, value),
        Node::Leaf(_) => false,
    }
}
