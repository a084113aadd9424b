mod draft;
mod taxonomy;

pub use draft::{parse_topics, WorksheetDraft, WorksheetPatch};
pub(crate) use draft::NewWorksheet;
pub use taxonomy::{Category, Difficulty};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

/// A downloadable worksheet as seen by callers of the catalog. Field names are
/// the stable client contract, backends map their own storage schema onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub file_url: String,
    #[serde(default)]
    pub preview_image_url: Option<String>,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    pub created_date: DateTime<Utc>,
}

/// The identity behind the current session. The role only drives which
/// affordances a UI shows, it is not enforced by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}
