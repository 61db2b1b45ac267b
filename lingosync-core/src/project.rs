//! Projects and shareable project export
//!
//! A project pairs a hosting configuration with its row table and the last
//! fetched target document. Projects can be exported as pretty JSON (file
//! export) or as a URL-safe base64 token (URL embedding), and imported back
//! from either form.

use crate::codec::unflatten;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::rows::RowTable;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields an imported project must carry
const REQUIRED_FIELDS: [&str; 4] = ["id", "name", "config", "rows"];

/// Where the locale files live on the hosting provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Path of the source-locale file
    pub source_path: String,
    /// Path of the target-locale file
    pub target_path: String,
    /// Display label of the source language
    pub source_lang: String,
    /// Display label of the target language
    pub target_lang: String,
}

/// One localization project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub config: RepoConfig,
    pub rows: RowTable,
    /// Raw target document of the last fetch, base shape for commits
    #[serde(default)]
    pub original_target_data: Option<Document>,
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

impl Project {
    /// Create an empty project with a fresh identity
    pub fn new(name: impl Into<String>, config: RepoConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            config,
            rows: RowTable::new(),
            original_target_data: None,
            last_modified: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Rebuild the target document from the current rows, on top of the last
    /// fetched target so untranslated structure survives.
    pub fn target_document(&self) -> Result<Document> {
        unflatten(
            &self.rows.target_entries(),
            self.original_target_data.as_ref(),
        )
    }

    /// Pretty JSON export
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compact URL-safe token
    pub fn share_token(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}

/// Parse an exported project (JSON or share token).
///
/// The imported project always gets a new identity so it never collides with
/// an existing project carrying the same id.
pub fn import_project(text: &str) -> Result<Project> {
    let trimmed = text.trim();
    let json = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .map_err(|e| Error::structural("$", format!("invalid share token: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::structural("$", format!("share token is not UTF-8: {e}")))?
    };

    let value: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| Error::structural("$", format!("invalid project JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::structural("$", "project must be a JSON object"))?;

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(Error::structural(*missing, "missing required field"));
    }

    let mut project: Project = serde_json::from_value(value)
        .map_err(|e| Error::structural("$", format!("invalid project: {e}")))?;
    let previous_id = std::mem::replace(&mut project.id, uuid::Uuid::new_v4().to_string());
    project.touch();

    tracing::info!(
        previous_id = %previous_id,
        id = %project.id,
        rows = project.rows.len(),
        "Imported project"
    );

    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::TranslationRow;

    fn sample() -> Project {
        let mut project = Project::new(
            "Docs site",
            RepoConfig {
                owner: "acme".to_string(),
                repo: "docs".to_string(),
                branch: "main".to_string(),
                source_path: "locales/en.json".to_string(),
                target_path: "locales/fr.json".to_string(),
                source_lang: "English".to_string(),
                target_lang: "French".to_string(),
            },
        );
        project.rows = RowTable::from_rows(vec![TranslationRow::new("a.b", "Hello", "Bonjour")]);
        project.original_target_data =
            Some(Document::from_json_str(r#"{"a": {"b": "Bonjour"}, "extra": []}"#).unwrap());
        project
    }

    #[test]
    fn test_json_export_import_assigns_new_id() {
        let project = sample();
        let imported = import_project(&project.export_json().unwrap()).unwrap();
        assert_ne!(imported.id, project.id);
        assert_eq!(imported.name, project.name);
        assert_eq!(imported.config, project.config);
        assert_eq!(imported.rows, project.rows);
        assert_eq!(imported.original_target_data, project.original_target_data);
    }

    #[test]
    fn test_share_token_round_trip() {
        let project = sample();
        let token = project.share_token().unwrap();
        assert!(!token.contains('+') && !token.contains('/') && !token.contains('='));
        let imported = import_project(&token).unwrap();
        assert_eq!(imported.rows, project.rows);
        assert_ne!(imported.id, project.id);
    }

    #[test]
    fn test_import_rejects_missing_fields() {
        for field in REQUIRED_FIELDS {
            let mut value = serde_json::to_value(sample()).unwrap();
            value.as_object_mut().unwrap().remove(field);
            match import_project(&value.to_string()) {
                Err(Error::Structural { path, .. }) => assert_eq!(path, field),
                other => panic!("expected structural error for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(
            import_project("not a token!"),
            Err(Error::Structural { .. })
        ));
        assert!(matches!(
            import_project("[1, 2]"),
            Err(Error::Structural { .. })
        ));
    }

    #[test]
    fn test_target_document_keeps_base_shape() {
        let mut project = sample();
        project.rows.set_target("a.b", "Salut").unwrap();
        let doc = project.target_document().unwrap();
        assert_eq!(
            doc,
            Document::from_json_str(r#"{"a": {"b": "Salut"}, "extra": []}"#).unwrap()
        );
    }
}
