//! Defines the [`Tag`] type, which represents a [`crate::post::Document`] tag,
//! and the [`TagIndex`] that groups published posts by tag.

use crate::post::Document;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The tag given to posts whose metadata has no `tags` key.
pub const UNTAGGED: &str = "untagged";

/// Represents a post tag. Tags are compared by their exact name, so `C` and
/// `C++` (or `rust` and `Rust`) are distinct listings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    /// The tag's name as written in the post metadata.
    pub name: String,
}

impl Tag {
    pub fn new(name: &str) -> Tag {
        Tag {
            name: name.to_owned(),
        }
    }
}

/// The posts carrying one tag, in site order (newest first).
#[derive(Debug)]
pub struct TagEntry {
    pub tag: Tag,
    pub posts: Vec<Arc<Document>>,
}

/// Published posts grouped by tag, ordered by tag name.
#[derive(Debug, Default)]
pub struct TagIndex {
    entries: BTreeMap<String, TagEntry>,
}

impl TagIndex {
    /// Indexes `posts`, which must already be in site order so that each
    /// tag's posts come out sorted too.
    pub fn build(posts: &[Arc<Document>]) -> TagIndex {
        let mut entries: BTreeMap<String, TagEntry> = BTreeMap::new();
        for post in posts {
            for tag in &post.tags {
                entries
                    .entry(tag.name.clone())
                    .or_insert_with(|| TagEntry {
                        tag: tag.clone(),
                        posts: Vec::new(),
                    })
                    .posts
                    .push(Arc::clone(post));
            }
        }
        TagIndex { entries }
    }

    pub fn get(&self, name: &str) -> Option<&TagEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
