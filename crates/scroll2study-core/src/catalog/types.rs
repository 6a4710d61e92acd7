use serde::{Deserialize, Serialize};

/// A study subject (one grid column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    /// Display sort key, unique across subjects.
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A complexity level (one grid row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityLevel {
    pub level: u32,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A catalog video occupying one (subject, level) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub subject_id: String,
    pub complexity_level: u32,
    pub duration_seconds: u64,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Raw catalog contents as loaded from the store or an import file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub levels: Vec<ComplexityLevel>,
    #[serde(default)]
    pub videos: Vec<CatalogItem>,
}

fn default_true() -> bool {
    true
}
