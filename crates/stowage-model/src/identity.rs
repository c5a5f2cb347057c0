//! Identity API wire types.
//!
//! Only the compartment listing is consumed, and the endpoint has been
//! observed answering with both a bare JSON array and a `{"data": […]}`
//! wrapper, so [`CompartmentCollection`] accepts either shape.

use serde::{Deserialize, Serialize};

/// One compartment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compartment {
    /// Compartment OCID.
    pub id: String,
    /// Compartment name.
    pub name: String,
    /// Lifecycle state, e.g. `ACTIVE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,
}

/// A compartment listing in either of the two observed response shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CompartmentCollection {
    /// Bare JSON array.
    Bare(Vec<Compartment>),
    /// `{"data": […]}` wrapper.
    Wrapped {
        /// The wrapped records.
        data: Vec<Compartment>,
    },
}

impl CompartmentCollection {
    /// Unwrap into the compartment records.
    #[must_use]
    pub fn into_items(self) -> Vec<Compartment> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_bare_array_shape() {
        let json = r#"[{"id":"ocid1.compartment.oc1..xyz","name":"cp-infra-ddw3-dev","lifecycleState":"ACTIVE"}]"#;
        let collection: CompartmentCollection = serde_json::from_str(json).unwrap();
        let items = collection.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "ocid1.compartment.oc1..xyz");
        assert_eq!(items[0].name, "cp-infra-ddw3-dev");
    }

    #[test]
    fn test_should_accept_data_wrapper_shape() {
        let json = r#"{"data":[{"id":"ocid1.compartment.oc1..xyz","name":"cp-infra-ddw3-prd"}]}"#;
        let collection: CompartmentCollection = serde_json::from_str(json).unwrap();
        let items = collection.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].lifecycle_state, None);
    }

    #[test]
    fn test_should_accept_empty_listing() {
        let collection: CompartmentCollection = serde_json::from_str("[]").unwrap();
        assert!(collection.into_items().is_empty());
    }
}
