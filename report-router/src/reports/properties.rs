//! Flattening of report fields into the string property bag of a log event.
//!
//! Every report kind declares its fields as a fixed list of
//! `(wire name, value)` pairs. Values that are missing or empty are left out
//! of the bag entirely.

use indexmap::IndexMap;

pub trait PropertyValue {
    /// `None` when the field should not appear in the bag.
    fn to_property(&self) -> Option<String>;
}

impl PropertyValue for str {
    fn to_property(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl PropertyValue for String {
    fn to_property(&self) -> Option<String> {
        self.as_str().to_property()
    }
}

impl PropertyValue for bool {
    fn to_property(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl PropertyValue for u16 {
    fn to_property(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl PropertyValue for Vec<String> {
    fn to_property(&self) -> Option<String> {
        let values: Vec<&str> = self
            .iter()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn to_property(&self) -> Option<String> {
        self.as_ref().and_then(PropertyValue::to_property)
    }
}

pub type Field<'a> = (&'static str, &'a dyn PropertyValue);

pub fn flatten(fields: &[Field<'_>]) -> IndexMap<String, String> {
    fields
        .iter()
        .filter_map(|(name, value)| value.to_property().map(|v| (name.to_string(), v)))
        .collect()
}
