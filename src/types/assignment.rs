use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::types::{
    attributes::{AttributeCatalog, AttributeKind, AttributeValue},
    errors::ValidationError,
};

/// Attribute values bound to one entity, keyed by attribute name (DBC `BA_` statements).
///
/// Keys iterate in sorted order, so validation reports the same first error on every run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeAssignment {
    values: BTreeMap<String, AttributeValue>,
}

impl AttributeAssignment {
    /// Binds `value` to `name`, returning the previously assigned value if any.
    pub fn assign(&mut self, name: &str, value: AttributeValue) -> Option<AttributeValue> {
        self.values.insert(name.to_string(), value)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks every assignment against `catalog`, the definitions for entities of `kind`.
    ///
    /// Fails fast: the first name missing from the catalog gives `UnknownAttribute`,
    /// the first value outside its definition's domain gives `AttributeValueOutOfDomain`.
    pub fn validate(
        &self,
        kind: AttributeKind,
        catalog: &AttributeCatalog,
    ) -> Result<(), ValidationError> {
        for (name, value) in &self.values {
            let Some(definition) = catalog.get(name) else {
                return Err(ValidationError::UnknownAttribute {
                    name: name.clone(),
                    kind,
                });
            };
            definition.check_value(name, value)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a AttributeAssignment {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeAssignment {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Capability shared by Node, Message and Signal: each owns its own
/// [`AttributeAssignment`] and checks it against the catalog of its kind.
pub trait AttributeCarrier {
    /// Kind selecting the catalog this entity's assignments are checked against.
    const KIND: AttributeKind;

    fn attributes(&self) -> &AttributeAssignment;

    fn attributes_mut(&mut self) -> &mut AttributeAssignment;

    fn assign_attribute(&mut self, name: &str, value: AttributeValue) -> Option<AttributeValue> {
        self.attributes_mut().assign(name, value)
    }

    fn validate_attributes(&self, catalog: &AttributeCatalog) -> Result<(), ValidationError> {
        self.attributes().validate(Self::KIND, catalog)
    }
}
