//! Finds content source files on disk and parses them into [`Document`]s.
//! [`sources`] walks a collection root lazily; a [`Collection`] turns the walk
//! into documents, going through its [`Cache`] so unchanged files aren't
//! parsed twice.

use crate::cache::Cache;
use crate::post::{Document, Kind, ParseError};
use crate::url::Urls;
use crate::util::relative_posix;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// A candidate source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub path: PathBuf,

    /// The `/`-separated path relative to the collection root, with extension.
    pub relative: String,

    pub modified: SystemTime,
}

/// Lazily yields every file under `root` (recursively, sorted by file name)
/// whose name ends in one of `extensions`. Hidden files and directories are
/// skipped. A missing `root` yields nothing.
pub fn sources<'a>(
    root: &'a Path,
    extensions: &'a [String],
) -> impl Iterator<Item = io::Result<Source>> + 'a {
    let walk = match root.is_dir() {
        true => Some(
            WalkDir::new(root)
                .follow_links(true)
                .sort_by(|a, b| a.file_name().cmp(b.file_name()))
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry)),
        ),
        false => None,
    };

    walk.into_iter().flatten().filter_map(move |result| {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => return Some(Err(io::Error::from(e))),
        };
        if !entry.file_type().is_file() {
            return None;
        }
        let relative = relative_posix(root, entry.path())?;
        if !has_extension(&relative, extensions) {
            return None;
        }
        Some(
            entry
                .metadata()
                .map_err(io::Error::from)
                .and_then(|metadata| metadata.modified())
                .map(|modified| Source {
                    path: entry.path().to_owned(),
                    relative,
                    modified,
                }),
        )
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn has_extension(relative: &str, extensions: &[String]) -> bool {
    let file_name = relative.rsplit('/').next().unwrap_or(relative);
    extensions
        .iter()
        .any(|ext| file_name.len() > ext.len() && file_name.ends_with(ext.as_str()))
}

/// One content collection (the pages or the posts) and the cache of its
/// parsed documents.
pub struct Collection {
    kind: Kind,
    root: PathBuf,
    extensions: Vec<String>,

    /// Used to build post URLs while rendering Markdown.
    urls: Urls,

    /// The post extensions, used to recognize links between post sources.
    post_extensions: Vec<String>,

    cache: Cache<Document>,
}

impl Collection {
    pub fn new(
        kind: Kind,
        root: &Path,
        extensions: &[String],
        urls: &Urls,
        post_extensions: &[String],
    ) -> Collection {
        Collection {
            kind,
            root: root.to_owned(),
            extensions: extensions.to_vec(),
            urls: urls.clone(),
            post_extensions: post_extensions.to_vec(),
            cache: Cache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yields the documents of this collection in walk order. Files
    /// that can't be read or parsed are logged and skipped.
    pub fn documents(&mut self) -> impl Iterator<Item = Arc<Document>> + '_ {
        let kind = self.kind;
        let root: &Path = &self.root;
        let extensions: &[String] = &self.extensions;
        let urls = &self.urls;
        let post_extensions: &[String] = &self.post_extensions;
        let cache = &mut self.cache;

        sources(root, extensions).filter_map(move |source| {
            let source = match source {
                Ok(source) => source,
                Err(e) => {
                    log::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                    return None;
                }
            };
            let parsed = cache.get_or_try_insert_with(&source.path, source.modified, || {
                let bytes = fs::read(&source.path).map_err(ParseError::from)?;
                Document::parse(
                    kind,
                    &source.path,
                    &source.relative,
                    &bytes,
                    urls,
                    post_extensions,
                )
            });
            match parsed {
                Ok(document) => Some(document),
                Err(e) => {
                    log::warn!("skipping {}: {}", source.path.display(), e);
                    None
                }
            }
        })
    }

    /// Collects [`Collection::documents`] and forgets cached documents whose
    /// source files are gone.
    pub fn load(&mut self) -> Vec<Arc<Document>> {
        let documents: Vec<Arc<Document>> = self.documents().collect();
        let seen: HashSet<&Path> = documents.iter().map(|d| d.source.as_path()).collect();
        self.cache.retain(|path| seen.contains(path));
        documents
    }

    /// The number of cached documents.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write(root: &Path, relative: &str, contents: &str) -> io::Result<()> {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap())?;
        File::create(path)?.write_all(contents.as_bytes())
    }

    fn markdown() -> Vec<String> {
        vec![String::from(".markdown")]
    }

    #[test]
    fn test_sources_filters_and_sorts() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "b.markdown", "")?;
        write(dir.path(), "a.markdown", "")?;
        write(dir.path(), "2014/c.markdown", "")?;
        write(dir.path(), "notes.txt", "")?;
        write(dir.path(), ".hidden.markdown", "")?;
        write(dir.path(), ".git/x.markdown", "")?;

        let extensions = markdown();
        let found: Vec<String> = sources(dir.path(), &extensions)
            .map(|s| s.map(|s| s.relative))
            .collect::<io::Result<_>>()?;
        assert_eq!(vec!["2014/c.markdown", "a.markdown", "b.markdown"], found);
        Ok(())
    }

    #[test]
    fn test_missing_root_is_empty() {
        let extensions = markdown();
        assert_eq!(0, sources(Path::new("/does/not/exist"), &extensions).count());
    }

    #[test]
    fn test_collection_skips_malformed_and_forgets_deleted() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "good.markdown", "title: Good\ndate: 2014-01-11\n\nBody")?;
        write(dir.path(), "bad.markdown", "title: Bad\ndate: yesterday\n\nBody")?;
        write(dir.path(), "other.markdown", "title: Other\ndate: 2014-01-12\n\nBody")?;

        let extensions = markdown();
        let mut posts = Collection::new(Kind::Post, dir.path(), &extensions, &Urls::root(), &extensions);
        let titles: Vec<String> = posts.load().iter().map(|d| d.title.clone()).collect();
        assert_eq!(vec!["Good", "Other"], titles);
        assert_eq!(2, posts.cached());

        fs::remove_file(dir.path().join("other.markdown"))?;
        assert_eq!(1, posts.load().len());
        assert_eq!(1, posts.cached());
        Ok(())
    }

    #[test]
    fn test_collection_reparses_edited_file() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hello.markdown");
        write(dir.path(), "hello.markdown", "title: Hello\ndate: 2014-01-11\n\nHi")?;

        let extensions = markdown();
        let mut posts = Collection::new(Kind::Post, dir.path(), &extensions, &Urls::root(), &extensions);
        assert_eq!("<p>Hi</p>\n", posts.load()[0].body);

        let before = fs::metadata(&path)?.modified()?;
        write(dir.path(), "hello.markdown", "title: Hello\ndate: 2014-01-11\n\nBye")?;
        File::options()
            .write(true)
            .open(&path)?
            .set_modified(before + std::time::Duration::from_secs(10))?;

        let reloaded = posts.load();
        assert_eq!("<p>Bye</p>\n", reloaded[0].body);
        assert_eq!(1, posts.cached());
        Ok(())
    }
}
