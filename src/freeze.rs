//! Freezing: renders every route of the site and writes the results under
//! the destination directory, then deletes whatever the destination holds
//! that this run didn't write.

use crate::config::Config;
use crate::routes::{self, Renderer};
use crate::site::Content;
use crate::theme::{self, Theme};
use crate::url::{decode_path, output_file, Relativizer};
use crate::util::{relative_posix, write_if_changed};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;
use wax::{Glob, Pattern};

/// Destination paths that extra-file removal leaves alone. A pattern without
/// a `/` is matched against every component of a path (so `.*` protects
/// `.git/config`); a pattern with a `/` is matched against the whole
/// destination-relative path.
pub struct Ignore {
    component_globs: Vec<Glob<'static>>,
    path_globs: Vec<Glob<'static>>,
}

impl Ignore {
    pub fn new(patterns: &[String]) -> Result<Ignore> {
        let mut ignore = Ignore {
            component_globs: Vec::new(),
            path_globs: Vec::new(),
        };
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Ignore {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?
                .into_owned();
            match pattern.contains('/') {
                true => ignore.path_globs.push(glob),
                false => ignore.component_globs.push(glob),
            }
        }
        Ok(ignore)
    }

    /// Whether the `/`-separated destination-relative `path` is ignored.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.path_globs.iter().any(|glob| glob.is_match(path))
            || path
                .split('/')
                .any(|component| self.component_globs.iter().any(|glob| glob.is_match(component)))
    }
}

/// What a freeze did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Routes frozen.
    pub items: usize,

    /// Output files whose content changed (or that didn't exist).
    pub written: usize,

    /// Extra files and emptied directories deleted from the destination.
    pub removed: usize,
}

/// Freezes the site described by `config`.
pub fn freeze(config: &Config) -> Result<Report> {
    if config.debug {
        log::warn!("freezing in debug mode is slow; set DEBUG: false in freezing.yaml for a speed boost");
    }
    log::info!("freezing into {}", config.destination.display());
    let start = Instant::now();

    let urls = config.frozen_urls();
    let site = Content::new(config, &urls).load();
    let theme = Theme::load(&config.template_root)?;
    let renderer = Renderer::new(config, &site, &theme, &urls);
    let relativizer = match config.relative_urls {
        true => Some(Relativizer::new(&config.base_url)?),
        false => None,
    };
    let ignore = Ignore::new(&config.destination_ignore)?;

    let mut report = Report::default();
    let mut recorded: HashSet<String> = HashSet::new();
    for route in renderer.routes()? {
        let url = route.url(&urls);
        let rendered = match renderer.render(&route) {
            Ok(Some(rendered)) => rendered,
            Ok(None) => continue,
            Err(err) => return Err(Error::Render { url, err }),
        };
        let file = match urls.strip_prefix(&url) {
            Some(route_path) => output_file(&decode_path(route_path)),
            None => continue,
        };

        let body = match (&relativizer, route.is_html()) {
            (Some(relativizer), true) => relativizer
                .rewrite(&url, &String::from_utf8_lossy(&rendered.body))
                .into_bytes(),
            _ => rendered.body,
        };

        let path = config.destination.join(&file);
        if write_if_changed(&path, &body).map_err(|err| Error::Write {
            path: path.clone(),
            err,
        })? {
            log::debug!("wrote {}", path.display());
            report.written += 1;
        }
        recorded.insert(file);
        report.items += 1;
    }

    if config.remove_extra_files {
        report.removed = remove_extra_files(&config.destination, &recorded, &ignore)?;
    }

    log::info!("Frozen: {} items.", report.items);
    log::info!(
        "Time: {:.3} seconds ({} written, {} removed).",
        start.elapsed().as_secs_f64(),
        report.written,
        report.removed
    );
    Ok(report)
}

/// Deletes the files under `destination` that aren't in `recorded` and
/// aren't ignored, then the directories that this leaves empty. Returns the
/// number of entries deleted.
fn remove_extra_files(destination: &Path, recorded: &HashSet<String>, ignore: &Ignore) -> Result<usize> {
    if !destination.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in WalkDir::new(destination).min_depth(1).contents_first(true) {
        let entry = entry?;
        let relative = match relative_posix(destination, entry.path()) {
            Some(relative) => relative,
            None => continue,
        };
        if ignore.is_ignored(&relative) {
            continue;
        }

        let remove = |result: io::Result<()>| {
            result.map_err(|err| Error::Write {
                path: entry.path().to_owned(),
                err,
            })
        };
        if entry.file_type().is_dir() {
            let empty = fs::read_dir(entry.path())
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if empty {
                log::debug!("removing empty directory {}", entry.path().display());
                remove(fs::remove_dir(entry.path()))?;
                removed += 1;
            }
        } else if !recorded.contains(&relative) {
            log::debug!("removing {}", entry.path().display());
            remove(fs::remove_file(entry.path()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem freezing the site. Freezing stops at the first one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("loading templates: {0}")]
    Theme(#[from] theme::Error),

    #[error("rendering {url}: {err}")]
    Render {
        url: String,
        #[source]
        err: routes::Error,
    },

    #[error("writing `{}`: {err}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("walking the destination: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("listing static files: {0}")]
    Io(#[from] io::Error),

    #[error("building the link rewriter: {0}")]
    Relativize(#[from] regex::Error),

    #[error("invalid ignore pattern `{pattern}`: {reason}")]
    Ignore { pattern: String, reason: String },
}

#[cfg(test)]
mod test {
    use super::*;

    fn ignore(patterns: &[&str]) -> Ignore {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        Ignore::new(&patterns).unwrap()
    }

    #[test]
    fn test_component_patterns() {
        let ignore = ignore(&[".*"]);
        assert!(ignore.is_ignored(".nojekyll"));
        assert!(ignore.is_ignored(".git/config"));
        assert!(ignore.is_ignored("a/.hidden/b.html"));
        assert!(!ignore.is_ignored("post/a/index.html"));
    }

    #[test]
    fn test_path_patterns() {
        let ignore = ignore(&["downloads/**", "CNAME"]);
        assert!(ignore.is_ignored("downloads/a/b.zip"));
        assert!(ignore.is_ignored("CNAME"));
        assert!(!ignore.is_ignored("post/downloads.html"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            Ignore::new(&[String::from("[unclosed")]),
            Err(Error::Ignore { .. })
        ));
    }

    #[test]
    fn test_remove_extra_files() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        for file in &["index.html", "old/index.html", ".git/HEAD", "keep/.keep"] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap())?;
            fs::write(path, "x")?;
        }
        let recorded: HashSet<String> = vec![String::from("index.html")].into_iter().collect();

        let removed = remove_extra_files(root, &recorded, &ignore(&[".*"]))?;
        assert_eq!(2, removed); // old/index.html and old/
        assert!(root.join("index.html").exists());
        assert!(!root.join("old").exists());
        assert!(root.join(".git/HEAD").exists());
        assert!(root.join("keep/.keep").exists());
        Ok(())
    }
}
