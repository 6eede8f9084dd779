//! Data returned by resource clients

use crate::error::ClientError;
use futures::stream::BoxStream;

/// Result of a full list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<K> {
    /// Items in server order
    pub items: Vec<K>,
    /// Collection resource version at the time of the list
    pub resource_version: String,
}

impl<K> ListPage<K> {
    /// Create a list page.
    pub fn new(items: Vec<K>, resource_version: impl Into<String>) -> Self {
        Self {
            items,
            resource_version: resource_version.into(),
        }
    }
}

/// One change notification from a watch stream.
#[derive(Debug)]
pub enum WatchEvent<K> {
    /// Object was created
    Added(K),
    /// Object was changed
    Modified(K),
    /// Object was removed; carries its final state
    Deleted(K),
    /// Progress marker carrying only a resource version
    Bookmark(String),
    /// In-band error reported by the server; ends the watch
    Error(ClientError),
}

impl<K> WatchEvent<K> {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Modified(_) => "modified",
            Self::Deleted(_) => "deleted",
            Self::Bookmark(_) => "bookmark",
            Self::Error(_) => "error",
        }
    }
}

impl<K> From<kube::core::WatchEvent<K>> for WatchEvent<K> {
    fn from(event: kube::core::WatchEvent<K>) -> Self {
        match event {
            kube::core::WatchEvent::Added(obj) => Self::Added(obj),
            kube::core::WatchEvent::Modified(obj) => Self::Modified(obj),
            kube::core::WatchEvent::Deleted(obj) => Self::Deleted(obj),
            kube::core::WatchEvent::Bookmark(bookmark) => {
                Self::Bookmark(bookmark.metadata.resource_version)
            }
            kube::core::WatchEvent::Error(status) => {
                Self::Error(ClientError::from_status(status.code, status.message.clone()))
            }
        }
    }
}

/// Owned stream of watch events. Transport failures surface as `Err` items.
pub type WatchStream<K> = BoxStream<'static, Result<WatchEvent<K>, ClientError>>;
