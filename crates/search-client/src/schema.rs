//! Index schema sent when the index is created.
//!
//! The default schema matches the [`Document`](crate::Document) shape. A
//! custom schema can be loaded from YAML:
//!
//! ```yaml
//! fields:
//!   - name: id
//!     type: Edm.String
//!     key: true
//!   - name: content
//!     type: Edm.String
//!   - name: tag
//!     type: Edm.String
//!     searchable: true
//! ```

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fields every document carries.
const DOCUMENT_FIELDS: [&str; 3] = ["id", "content", "tag"];

/// One field of the index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
}

impl IndexField {
    /// A non-key `Edm.String` field.
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: "Edm.String".to_string(),
            key: false,
            searchable: None,
            filterable: None,
        }
    }

    pub fn as_key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = Some(searchable);
        self
    }
}

/// Field layout of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub fields: Vec<IndexField>,
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self {
            fields: vec![
                IndexField::string("id").as_key(),
                IndexField::string("content"),
                IndexField::string("tag").searchable(true),
            ],
        }
    }
}

impl IndexSchema {
    /// Parse and validate a schema from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let schema: IndexSchema = serde_yaml::from_str(yaml)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load and validate a schema from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Check the schema can hold the generated documents.
    ///
    /// Requires exactly one key field, named `id`, and a field for each of
    /// `id`, `content` and `tag`.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let keys: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.key)
            .map(|f| f.name.as_str())
            .collect();
        match keys.as_slice() {
            ["id"] => {}
            [] => return Err(SchemaError::Invalid("no key field defined".to_string())),
            [other] => {
                return Err(SchemaError::Invalid(format!(
                    "key field must be 'id', found '{other}'"
                )))
            }
            many => {
                return Err(SchemaError::Invalid(format!(
                    "exactly one key field allowed, found {many:?}"
                )))
            }
        }

        for required in DOCUMENT_FIELDS {
            if !self.fields.iter().any(|f| f.name == required) {
                return Err(SchemaError::Invalid(format!(
                    "missing required field '{required}'"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_valid() {
        let schema = IndexSchema::default();
        schema.validate().unwrap();

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json["fields"][0],
            serde_json::json!({"name": "id", "type": "Edm.String", "key": true})
        );
        assert_eq!(json["fields"][2]["searchable"], serde_json::json!(true));
    }

    #[test]
    fn test_from_yaml() {
        let schema = IndexSchema::from_yaml(
            r#"
fields:
  - name: id
    type: Edm.String
    key: true
  - name: content
    type: Edm.String
    searchable: false
  - name: tag
    type: Edm.String
    filterable: true
"#,
        )
        .unwrap();

        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields[1].searchable, Some(false));
        assert_eq!(schema.fields[2].filterable, Some(true));
        assert!(!schema.fields[2].key);
    }

    #[test]
    fn test_validate_rejects_missing_key() {
        let result = IndexSchema::from_yaml(
            r#"
fields:
  - name: id
    type: Edm.String
  - name: content
    type: Edm.String
  - name: tag
    type: Edm.String
"#,
        );
        assert!(matches!(result, Err(SchemaError::Invalid(msg)) if msg.contains("no key")));
    }

    #[test]
    fn test_validate_rejects_wrong_key() {
        let schema = IndexSchema {
            fields: vec![
                IndexField::string("id"),
                IndexField::string("content").as_key(),
                IndexField::string("tag"),
            ],
        };
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_field() {
        let schema = IndexSchema {
            fields: vec![IndexField::string("id").as_key(), IndexField::string("tag")],
        };
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn test_from_file_missing() {
        let result = IndexSchema::from_file("/nonexistent/schema.yaml");
        assert!(matches!(result, Err(SchemaError::Io { .. })));
    }

    #[test]
    fn test_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), serde_yaml::to_string(&IndexSchema::default()).unwrap())
            .unwrap();

        let schema = IndexSchema::from_file(file.path()).unwrap();
        assert_eq!(schema, IndexSchema::default());
    }
}
