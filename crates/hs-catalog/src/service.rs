//! Service entries and their file format.

use serde::{Deserialize, Serialize};

/// A service shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Service {
    /// Display name.
    pub name: String,
    /// Link target.
    pub url: String,
    /// Short description.
    pub desc: String,
}

/// Contents of one catalog file.
///
/// A file is either a single service with top-level keys or a
/// `[[service]]` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ServiceFile {
    Many {
        #[serde(rename = "service")]
        services: Vec<Service>,
    },
    One(Service),
}

impl ServiceFile {
    /// Parse a catalog file.
    pub(crate) fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Services in file order.
    pub(crate) fn into_services(self) -> Vec<Service> {
        match self {
            Self::Many { services } => services,
            Self::One(service) => vec![service],
        }
    }
}
