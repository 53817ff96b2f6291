//! Column names for a time series

use crate::config::FIELD_NAME_PREFIX;
use serde::Serialize;

/// Ordered column names, one per data column.
///
/// Names are set when the catalog is populated and are not renamed
/// afterwards. Missing or empty names become `field_<index>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldCatalog {
    names: Vec<String>,
}

impl FieldCatalog {
    /// Create a catalog of `columns` synthesized names
    pub fn synthesized(columns: usize) -> Self {
        Self {
            names: (0..columns).map(synthesize_name).collect(),
        }
    }

    /// Populate from optional names in column order
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                name.map(Into::into)
                    .filter(|n: &String| !n.is_empty())
                    .unwrap_or_else(|| synthesize_name(index))
            })
            .collect();
        Self { names }
    }

    /// Append synthesized names until the catalog covers `columns`
    pub fn extend_to(&mut self, columns: usize) {
        while self.names.len() < columns {
            let index = self.names.len();
            self.names.push(synthesize_name(index));
        }
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of a column
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Position of a column by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// All names as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Iterate over names
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Name given to a column that has none
pub fn synthesize_name(index: usize) -> String {
    format!("{}{}", FIELD_NAME_PREFIX, index)
}
