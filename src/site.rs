//! The loaded content of a blog: published posts in site order, pages, and the
//! tag index. [`Content`] owns the two collections (and their caches) and
//! produces a fresh [`Site`] on every [`Content::load`].

use crate::config::Config;
use crate::parser::Collection;
use crate::post::{Document, Kind};
use crate::tag::TagIndex;
use crate::url::Urls;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The page and post collections of a blog.
pub struct Content {
    pages: Collection,
    posts: Collection,
}

impl Content {
    /// Sets up the collections configured in `config`. Markdown links and
    /// footnotes are rendered against `urls`.
    pub fn new(config: &Config, urls: &Urls) -> Content {
        Content {
            pages: Collection::new(
                Kind::Page,
                &config.page_root,
                &config.page_extensions,
                urls,
                &config.post_extensions,
            ),
            posts: Collection::new(
                Kind::Post,
                &config.post_root,
                &config.post_extensions,
                urls,
                &config.post_extensions,
            ),
        }
    }

    /// Reads both collections, re-parsing only files that changed since the
    /// last load.
    pub fn load(&mut self) -> Site {
        Site::new(self.pages.load(), self.posts.load())
    }
}

/// A snapshot of the blog's content.
#[derive(Debug, Default)]
pub struct Site {
    /// Pages sorted by path.
    pub pages: Vec<Arc<Document>>,

    /// Published posts, newest first.
    pub posts: Vec<Arc<Document>>,

    pub tags: TagIndex,

    pages_by_path: HashMap<String, usize>,
    posts_by_path: HashMap<String, usize>,
}

impl Site {
    /// Builds the site from parsed documents. Drafts are dropped, and of two
    /// documents with the same path only the first in walk order is kept.
    pub fn new(pages: Vec<Arc<Document>>, posts: Vec<Arc<Document>>) -> Site {
        let mut pages = dedup(pages);
        pages.sort_by(|a, b| a.path.cmp(&b.path));

        let mut posts: Vec<Arc<Document>> = dedup(posts)
            .into_iter()
            .filter(|post| match post.date {
                Some(_) => true,
                None => {
                    log::debug!("not publishing draft {}", post.source.display());
                    false
                }
            })
            .collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));

        Site {
            tags: TagIndex::build(&posts),
            pages_by_path: index(&pages),
            posts_by_path: index(&posts),
            pages,
            posts,
        }
    }

    pub fn page(&self, path: &str) -> Option<&Arc<Document>> {
        self.pages_by_path.get(path).map(|&i| &self.pages[i])
    }

    pub fn post(&self, path: &str) -> Option<&Arc<Document>> {
        self.posts_by_path.get(path).map(|&i| &self.posts[i])
    }

    /// Returns the posts published right after (newer) and right before
    /// (older) the post at `path`.
    pub fn neighbours(&self, path: &str) -> (Option<&Arc<Document>>, Option<&Arc<Document>>) {
        match self.posts_by_path.get(path) {
            None => (None, None),
            Some(&i) => (
                match i {
                    0 => None,
                    _ => self.posts.get(i - 1),
                },
                self.posts.get(i + 1),
            ),
        }
    }
}

fn dedup(documents: Vec<Arc<Document>>) -> Vec<Arc<Document>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(documents.len());
    for document in documents {
        if !seen.insert(document.path.clone()) {
            log::warn!(
                "skipping {}: another source file already has path `{}`",
                document.source.display(),
                document.path
            );
            continue;
        }
        kept.push(document);
    }
    kept
}

fn index(documents: &[Arc<Document>]) -> HashMap<String, usize> {
    documents
        .iter()
        .enumerate()
        .map(|(i, d)| (d.path.clone(), i))
        .collect()
}
