use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque pagination token handed out by the feed endpoint.
///
/// The client only stores and echoes cursors back; it never builds or
/// inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity that scopes an independent page chain and cache entry
/// (typically the user whose feed is being viewed).
///
/// `Arc<str>` keeps clones cheap: every request ticket and cache key holds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(Arc<str>);

impl SubjectId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Author summary embedded in every post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_img: Option<String>,
}

/// File attached to a post (image, video, document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub url: String,
    /// MIME-ish kind reported by the server, e.g. "image" or "application/pdf".
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Attachment {
    /// Name to show for the attachment, falling back to the last URL segment.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self
                .url
                .rsplit('/')
                .find(|segment| !segment.is_empty())
                .unwrap_or(&self.url),
        }
    }
}

/// A single feed post as served by the feed endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId", default)]
    pub author: Option<Author>,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub file: Option<Attachment>,
    #[serde(default)]
    pub has_liked: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub edit_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
}

impl Post {
    /// The attachment, if the post carries one with a non-empty URL.
    ///
    /// Edited posts can keep a `file` object whose URL was cleared.
    pub fn attachment(&self) -> Option<&Attachment> {
        self.file.as_ref().filter(|f| !f.url.trim().is_empty())
    }

    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown")
    }

    pub fn is_edited(&self) -> bool {
        self.edit_at.is_some()
    }
}

/// One page of results from a single fetch.
///
/// `next_cursor == None` marks the last page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, deserialize_with = "null_as_default")]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn new(posts: Vec<Post>, next_cursor: Option<Cursor>) -> Self {
        Self { posts, next_cursor }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// The server sends `null` for empty collections on older documents.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
