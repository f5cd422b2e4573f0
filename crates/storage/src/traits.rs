//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use time::OffsetDateTime;

/// One object in a directory listing.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    /// Last modification time, when the backend reports one.
    pub last_modified: Option<OffsetDateTime>,
}

/// One page of a paginated directory listing.
///
/// Pages for the same prefix must be merged by the caller, strictly in the
/// order continuation tokens are issued. There is no caching: every poll
/// re-lists the prefix from scratch.
#[derive(Clone, Debug, Default)]
pub struct ListedPage {
    /// Entries in this page, in the backend's listing order.
    pub entries: Vec<ObjectEntry>,
    /// Whether more pages follow.
    pub truncated: bool,
    /// Opaque token for the next page. Present exactly when `truncated`.
    pub next_token: Option<String>,
}

/// Read-only object store abstraction.
///
/// The ingestion pipeline only lists and fetches; uploads belong to the
/// aircraft-side collector, outside this system's boundary.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Stream an object into a local file, returning the bytes written.
    async fn download(&self, key: &str, dest: &Path) -> StorageResult<u64>;

    /// List one page of objects under a prefix.
    ///
    /// Pass the previous page's `next_token` to continue; `None` starts from
    /// the beginning. Callers must keep requesting pages while `truncated`
    /// holds and must never treat a single page as exhaustive.
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> StorageResult<ListedPage>;

    /// Static identifier for the backend type, for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify backend connectivity. The default is a no-op for backends that
    /// need no check.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Convenience operations built on [`ObjectStore::list_page`].
///
/// Automatically implemented for every `ObjectStore`; do not implement
/// manually.
#[async_trait]
pub trait ObjectStoreExt: ObjectStore {
    /// The lexicographically first key under a prefix, if any.
    ///
    /// Pages through the whole listing rather than trusting the first page's
    /// first entry, so backends that do not sort still answer correctly.
    async fn first_key_with_prefix(&self, prefix: &str) -> StorageResult<Option<String>> {
        let mut first: Option<String> = None;
        let mut token: Option<String> = None;
        loop {
            let page = self.list_page(prefix, token.as_deref()).await?;
            for entry in page.entries {
                match &first {
                    Some(existing) if *existing <= entry.key => {}
                    _ => first = Some(entry.key),
                }
            }
            if !page.truncated {
                break;
            }
            token = page.next_token;
        }
        Ok(first)
    }
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStoreExt for T {}
