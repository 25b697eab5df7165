//! Requirement catalog: the regulatory obligations a document is audited against.
//!
//! The catalog file is a JSON object keyed by requirement name:
//!
//! ```json
//! {
//!   "Risk management": {
//!     "id": "REQ-01",
//!     "descriptive_text": "The organization shall establish an AI risk process.",
//!     "related_articles": [{"ref": "Art. 9", "text": "A risk management system shall be ..."}]
//!   }
//! }
//! ```
//!
//! Key order is preserved, and it fixes the order of rows in every audit report.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// A normative clause related to a requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedArticle {
    #[serde(rename = "ref", alias = "article", default)]
    pub reference: String,
    #[serde(default)]
    pub text: String,
}

/// One catalog entry as stored on disk.
#[derive(Debug, Deserialize)]
struct RawRequirement {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, alias = "iso_control_text")]
    descriptive_text: String,
    #[serde(default, alias = "ai_act_articles")]
    related_articles: Vec<RelatedArticle>,
}

/// A single regulatory obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Stable external identifier.
    pub id: String,
    /// Catalog key.
    pub name: String,
    pub descriptive_text: String,
    pub related_articles: Vec<RelatedArticle>,
}

impl Requirement {
    /// Retrieval query: descriptive text followed by every article text.
    pub fn query_text(&self) -> String {
        let articles: Vec<&str> = self
            .related_articles
            .iter()
            .map(|a| a.text.as_str())
            .collect();
        format!("{} {}", self.descriptive_text, articles.join(" "))
            .trim()
            .to_string()
    }
}

/// Read-only, ordered set of requirements.
#[derive(Debug, Clone, Default)]
pub struct RequirementCatalog {
    requirements: Vec<Requirement>,
}

impl RequirementCatalog {
    /// Load a catalog file. A missing file is [`AuditError::CatalogNotFound`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuditError::CatalogNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let catalog = Self::from_json(&content)?;
        info!(path = %path.display(), requirements = catalog.len(), "loaded requirement catalog");
        Ok(catalog)
    }

    /// Parse a catalog from a JSON object.
    pub fn from_json(content: &str) -> Result<Self> {
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| AuditError::InvalidCatalog(e.to_string()))?;

        let mut requirements = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let raw: RawRequirement = serde_json::from_value(value)
                .map_err(|e| AuditError::InvalidCatalog(format!("{}: {}", name, e)))?;
            requirements.push(Requirement {
                id: raw.id.unwrap_or_else(|| name.clone()),
                name,
                descriptive_text: raw.descriptive_text,
                related_articles: raw.related_articles,
            });
        }

        Ok(Self { requirements })
    }

    pub fn from_requirements(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Look up a requirement by catalog key.
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.name == name)
    }

    /// Look up a requirement by its external id.
    pub fn by_id(&self, id: &str) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.id == id)
    }
}
