//! Documents and batches as they travel to the service.

use serde::{Deserialize, Serialize};

/// One synthetic document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique document key
    pub id: String,
    /// Generated text
    pub content: String,
    /// Run identifier shared by every document of one run
    pub tag: String,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            tag: tag.into(),
        }
    }
}

/// Ordered group of documents submitted as one request.
///
/// Serializes as the request body the service expects: `{"value": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "value")]
    documents: Vec<Document>,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            documents: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

impl From<Vec<Document>> for Batch {
    fn from(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

impl FromIterator<Document> for Batch {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}
