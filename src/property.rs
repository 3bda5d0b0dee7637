use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::{Fingerprint, StableHasher};
use std::collections::BTreeMap;

/// Typed property payload. Every property is a (possibly empty) array of one scalar type.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// Integer array.
    Int(Vec<i32>),
    /// Float array.
    Float(Vec<f32>),
    /// String array.
    String(Vec<String>),
}

impl PropertyValue {
    /// Single-element integer value.
    pub fn int(v: i32) -> Self {
        Self::Int(vec![v])
    }

    /// Single-element float value.
    pub fn float(v: f32) -> Self {
        Self::Float(vec![v])
    }

    /// Single-element string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self::String(vec![v.into()])
    }

    /// Name of the element type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    /// `true` when the value holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn same_type(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn hash_into(&self, h: &mut StableHasher) {
        match self {
            Self::Int(v) => {
                h.write_u8(0);
                h.write_u64(v.len() as u64);
                v.iter().for_each(|x| h.write_i32(*x));
            }
            Self::Float(v) => {
                h.write_u8(1);
                h.write_u64(v.len() as u64);
                v.iter().for_each(|x| h.write_f32(*x));
            }
            Self::String(v) => {
                h.write_u8(2);
                h.write_u64(v.len() as u64);
                v.iter().for_each(|x| h.write_str(x));
            }
        }
    }
}

/// Named, typed property storage owned by a node.
///
/// Writes go through [`crate::Graph::set_property`] so that the owning node's invalidation hook
/// runs; the container itself only enforces the declared types and reports whether a write
/// changed anything.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PropertyContainer {
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyContainer {
    /// Empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Container seeded with declared defaults.
    pub fn from_declared(declared: &BTreeMap<String, PropertyValue>) -> Self {
        Self {
            values: declared.clone(),
        }
    }

    /// Add a property or replace its declaration, including its type.
    pub fn declare(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    /// Remove a property, returning its last value.
    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.values.remove(name)
    }

    /// Write a value, enforcing the declared element type.
    ///
    /// Undeclared names are rejected. Returns `true` if the stored value changed.
    pub fn set(&mut self, name: &str, value: PropertyValue) -> GraphResult<bool> {
        let Some(slot) = self.values.get_mut(name) else {
            return Err(GraphError::not_found(format!("property '{name}'")));
        };
        if !slot.same_type(&value) {
            return Err(GraphError::validation(format!(
                "property '{name}' is {}, got {}",
                slot.type_name(),
                value.type_name()
            )));
        }
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        Ok(true)
    }

    /// Raw value lookup.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// `true` when `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Integer array, empty when missing or of another type.
    pub fn ints(&self, name: &str) -> &[i32] {
        match self.values.get(name) {
            Some(PropertyValue::Int(v)) => v,
            _ => &[],
        }
    }

    /// Float array, empty when missing or of another type.
    pub fn floats(&self, name: &str) -> &[f32] {
        match self.values.get(name) {
            Some(PropertyValue::Float(v)) => v,
            _ => &[],
        }
    }

    /// String array, empty when missing or of another type.
    pub fn strings(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(PropertyValue::String(v)) => v,
            _ => &[],
        }
    }

    /// First integer element or `default`.
    pub fn int_or(&self, name: &str, default: i32) -> i32 {
        self.ints(name).first().copied().unwrap_or(default)
    }

    /// First float element or `default`.
    pub fn float_or(&self, name: &str, default: f32) -> f32 {
        self.floats(name).first().copied().unwrap_or(default)
    }

    /// First string element or `default`.
    pub fn string_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.strings(name)
            .first()
            .map(String::as_str)
            .unwrap_or(default)
    }

    /// Integer property interpreted as a flag.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.int_or(name, i32::from(default)) != 0
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Order-independent digest of every name and value.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = StableHasher::new();
        self.hash_into(&mut h);
        h.finish()
    }

    pub(crate) fn hash_into(&self, h: &mut StableHasher) {
        h.write_u64(self.values.len() as u64);
        for (k, v) in &self.values {
            h.write_str(k);
            v.hash_into(h);
        }
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<String, PropertyValue> {
        &self.values
    }
}

#[cfg(test)]
#[path = "../tests/unit/property.rs"]
mod tests;
