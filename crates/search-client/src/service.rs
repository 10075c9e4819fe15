//! The operations the load generator needs from the indexing service.

use crate::document::Batch;
use crate::error::ServiceError;
use crate::schema::IndexSchema;
use async_trait::async_trait;

/// Remote document-indexing service.
///
/// Every call is one round-trip. Implementations report any non-success
/// outcome as [`ServiceError`] and never retry internally.
#[async_trait]
pub trait IndexService: Send + Sync {
    /// Create the index with the given schema.
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ServiceError>;

    /// Delete the index.
    async fn delete_index(&self) -> Result<(), ServiceError>;

    /// Submit one batch of documents.
    async fn post_batch(&self, batch: &Batch) -> Result<(), ServiceError>;

    /// Count searchable documents matching a server-side filter expression.
    async fn count_matching(&self, filter: &str) -> Result<u64, ServiceError>;
}

/// Filter expression matching the documents of one run.
pub fn tag_filter(tag: &str) -> String {
    format!("tag:{tag}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_filter() {
        assert_eq!(
            tag_filter("3f2a9c0d1e7b4a55"),
            "tag:3f2a9c0d1e7b4a55".to_string()
        );
    }
}
