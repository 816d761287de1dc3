//! Navigation links kept in a singleton `links` document.

use serde::{Deserialize, Serialize};

/// Discriminator of the singleton links document.
pub const LINKS_TYPE: &str = "links";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// Shape of the singleton links document; a missing `links` member decodes
/// as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LinksDocument {
    #[serde(default)]
    pub links: Vec<Link>,
}
