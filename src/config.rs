//! Loads the blog configuration from `blog.yaml` and, for freezing, the
//! `freezing.yaml` overlay. Both files live in the project root and are
//! optional; every key has a default.

use crate::freeze::Ignore;
use crate::url::Urls;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// The main configuration file.
pub const CONFIG_FILE: &str = "blog.yaml";

/// Overrides applied on top of [`CONFIG_FILE`] when freezing.
pub const FREEZING_FILE: &str = "freezing.yaml";

/// The raw contents of one options file. Every key is optional so that files
/// can be overlaid.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
struct Options {
    debug: Option<bool>,
    site_title: Option<String>,
    site_author: Option<String>,
    page_root: Option<PathBuf>,
    page_extensions: Option<Vec<String>>,
    post_root: Option<PathBuf>,
    post_extensions: Option<Vec<String>>,
    template_root: Option<PathBuf>,
    static_root: Option<PathBuf>,
    posts_per_page: Option<usize>,
    freezer_base_url: Option<Url>,
    freezer_destination: Option<PathBuf>,
    freezer_destination_ignore: Option<Vec<String>>,
    freezer_relative_urls: Option<bool>,
    freezer_remove_extra_files: Option<bool>,
    www_host: Option<String>,
    www_port: Option<u16>,
}

impl Options {
    /// Reads the options file at `path`. A missing file, or one holding only
    /// blank lines and comments, yields no options.
    fn from_file(path: &Path) -> Result<Options> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Options::default()),
            Err(err) => {
                return Err(Error::Read {
                    path: path.to_owned(),
                    err,
                })
            }
        };
        Options::parse(&text).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })
    }

    fn parse(text: &str) -> std::result::Result<Options, serde_yaml::Error> {
        let blank = text.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#') || line == "---"
        });
        match blank {
            true => Ok(Options::default()),
            false => match serde_yaml::from_str::<serde_yaml::Value>(text)? {
                serde_yaml::Value::Null => Ok(Options::default()),
                value => serde_yaml::from_value(value),
            },
        }
    }

    /// Returns `self` with every option set in `top` replaced.
    fn overlay(self, top: Options) -> Options {
        Options {
            debug: top.debug.or(self.debug),
            site_title: top.site_title.or(self.site_title),
            site_author: top.site_author.or(self.site_author),
            page_root: top.page_root.or(self.page_root),
            page_extensions: top.page_extensions.or(self.page_extensions),
            post_root: top.post_root.or(self.post_root),
            post_extensions: top.post_extensions.or(self.post_extensions),
            template_root: top.template_root.or(self.template_root),
            static_root: top.static_root.or(self.static_root),
            posts_per_page: top.posts_per_page.or(self.posts_per_page),
            freezer_base_url: top.freezer_base_url.or(self.freezer_base_url),
            freezer_destination: top.freezer_destination.or(self.freezer_destination),
            freezer_destination_ignore: top
                .freezer_destination_ignore
                .or(self.freezer_destination_ignore),
            freezer_relative_urls: top.freezer_relative_urls.or(self.freezer_relative_urls),
            freezer_remove_extra_files: top
                .freezer_remove_extra_files
                .or(self.freezer_remove_extra_files),
            www_host: top.www_host.or(self.www_host),
            www_port: top.www_port.or(self.www_port),
        }
    }
}

/// The resolved configuration. Paths are joined onto the project root.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub root: PathBuf,
    pub debug: bool,
    pub site_title: String,
    pub site_author: Option<String>,
    pub page_root: PathBuf,
    pub page_extensions: Vec<String>,
    pub post_root: PathBuf,
    pub post_extensions: Vec<String>,
    pub template_root: PathBuf,
    pub static_root: PathBuf,
    pub posts_per_page: usize,

    /// Where the frozen site will be hosted. Its path is the site prefix of
    /// every frozen URL, and the feed's absolute links start with it.
    pub base_url: Url,

    pub destination: PathBuf,
    pub destination_ignore: Vec<String>,
    pub relative_urls: bool,
    pub remove_extra_files: bool,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Loads `blog.yaml` from `root`, overlaid with `freezing.yaml` when
    /// `freezing` is set.
    pub fn load(root: &Path, freezing: bool) -> Result<Config> {
        let mut options = Options::from_file(&root.join(CONFIG_FILE))?;
        if freezing {
            options = options.overlay(Options::from_file(&root.join(FREEZING_FILE))?);
        }
        Config::from_options(root, options)
    }

    /// Parses a configuration from YAML text, resolving paths against `root`.
    pub fn from_yaml(root: &Path, yaml: &str) -> Result<Config> {
        let options = Options::parse(yaml).map_err(|err| Error::Parse {
            path: root.join(CONFIG_FILE),
            err,
        })?;
        Config::from_options(root, options)
    }

    fn from_options(root: &Path, options: Options) -> Result<Config> {
        let extensions = |key: &'static str, value: Option<Vec<String>>, default: &str| {
            let extensions = value.unwrap_or_else(|| vec![default.to_owned()]);
            if extensions.is_empty() {
                return Err(Error::invalid(key, "at least one extension is required"));
            }
            match extensions.iter().find(|ext| !ext.starts_with('.') || ext.len() < 2) {
                Some(ext) => Err(Error::invalid(
                    key,
                    format!("`{}` must start with a `.`, e.g. `.markdown`", ext),
                )),
                None => Ok(extensions),
            }
        };

        let posts_per_page = options.posts_per_page.unwrap_or(10);
        if posts_per_page == 0 {
            return Err(Error::invalid("POSTS_PER_PAGE", "must be at least 1"));
        }

        let base_url = match options.freezer_base_url {
            Some(url) => url,
            None => Url::parse("http://localhost/")
                .map_err(|e| Error::invalid("FREEZER_BASE_URL", e.to_string()))?,
        };
        if base_url.cannot_be_a_base() {
            return Err(Error::invalid(
                "FREEZER_BASE_URL",
                format!("`{}` can't be used as a base URL", base_url),
            ));
        }

        let destination = options.freezer_destination.unwrap_or_else(|| PathBuf::from("build"));
        if destination.as_os_str().is_empty() {
            return Err(Error::invalid("FREEZER_DESTINATION", "must not be empty"));
        }

        let destination_ignore = options
            .freezer_destination_ignore
            .unwrap_or_else(|| vec![String::from(".*")]);
        Ignore::new(&destination_ignore)
            .map_err(|e| Error::invalid("FREEZER_DESTINATION_IGNORE", e.to_string()))?;

        Ok(Config {
            root: root.to_owned(),
            debug: options.debug.unwrap_or(true),
            site_title: options.site_title.unwrap_or_else(|| String::from("Frozen-Blog")),
            site_author: options.site_author,
            page_root: root.join(options.page_root.unwrap_or_else(|| PathBuf::from("page"))),
            page_extensions: extensions("PAGE_EXTENSIONS", options.page_extensions, ".html")?,
            post_root: root.join(options.post_root.unwrap_or_else(|| PathBuf::from("post"))),
            post_extensions: extensions("POST_EXTENSIONS", options.post_extensions, ".markdown")?,
            template_root: root.join(
                options
                    .template_root
                    .unwrap_or_else(|| PathBuf::from("templates")),
            ),
            static_root: root.join(options.static_root.unwrap_or_else(|| PathBuf::from("static"))),
            posts_per_page,
            base_url,
            destination: root.join(destination),
            destination_ignore,
            relative_urls: options.freezer_relative_urls.unwrap_or(false),
            remove_extra_files: options.freezer_remove_extra_files.unwrap_or(true),
            host: options.www_host.unwrap_or_else(|| String::from("127.0.0.1")),
            port: options.www_port.unwrap_or(8000),
        })
    }

    /// The URLs of the frozen site, prefixed with the base URL's path.
    pub fn frozen_urls(&self) -> Urls {
        Urls::new(self.base_url.path())
    }

    /// Makes a root-absolute URL absolute against the base URL's origin.
    pub fn absolute_url(&self, url: &str) -> String {
        match self.base_url.join(url) {
            Ok(url) => url.to_string(),
            Err(_) => url.to_owned(),
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the configuration. All of these are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading `{}`: {err}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("parsing `{}`: {err}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: serde_yaml::Error,
    },

    #[error("invalid `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Error {
    fn invalid<S: Into<String>>(key: &'static str, reason: S) -> Error {
        Error::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() -> Result<()> {
        let root = Path::new("/blog");
        let config = Config::from_yaml(root, "# nothing here\n\n")?;
        assert!(config.debug);
        assert_eq!("Frozen-Blog", config.site_title);
        assert_eq!(root.join("post"), config.post_root);
        assert_eq!(vec![".markdown"], config.post_extensions);
        assert_eq!(vec![".html"], config.page_extensions);
        assert_eq!(10, config.posts_per_page);
        assert_eq!("http://localhost/", config.base_url.as_str());
        assert_eq!(root.join("build"), config.destination);
        assert_eq!(vec![".*"], config.destination_ignore);
        assert!(!config.relative_urls);
        assert!(config.remove_extra_files);
        assert_eq!(("127.0.0.1", 8000), (config.host.as_str(), config.port));
        assert_eq!("/", config.frozen_urls().prefix());
        Ok(())
    }

    #[test]
    fn test_explicit_values() -> Result<()> {
        let config = Config::from_yaml(
            Path::new("/blog"),
            "DEBUG: false\nPOSTS_PER_PAGE: 3\nFREEZER_BASE_URL: https://example.org/blog/\n\
             POST_EXTENSIONS: [.md, .markdown]\nFREEZER_DESTINATION: /srv/www\n",
        )?;
        assert!(!config.debug);
        assert_eq!(3, config.posts_per_page);
        assert_eq!("/blog/", config.frozen_urls().prefix());
        assert_eq!(
            "https://example.org/blog/post/a/",
            config.absolute_url("/blog/post/a/")
        );
        assert_eq!(vec![".md", ".markdown"], config.post_extensions);
        assert_eq!(PathBuf::from("/srv/www"), config.destination);
        Ok(())
    }

    #[test]
    fn test_invalid() {
        let cases = &[
            ("POSTS_PER_PAGE: 0", "POSTS_PER_PAGE"),
            ("POST_EXTENSIONS: []", "POST_EXTENSIONS"),
            ("PAGE_EXTENSIONS: [html]", "PAGE_EXTENSIONS"),
            ("FREEZER_BASE_URL: 'mailto:me@example.org'", "FREEZER_BASE_URL"),
            ("FREEZER_DESTINATION_IGNORE: ['[unclosed']", "FREEZER_DESTINATION_IGNORE"),
            ("FREEZER_DESTINATION: ''", "FREEZER_DESTINATION"),
        ];
        for (yaml, wanted) in cases {
            match Config::from_yaml(Path::new("/blog"), yaml) {
                Err(Error::Invalid { key, .. }) => assert_eq!(*wanted, key, "{}", yaml),
                other => panic!("expected an invalid `{}`, got {:?}", wanted, other),
            }
        }

        for yaml in &["NOT_A_KEY: 1", "DEBUG: maybe", "FREEZER_BASE_URL: not a url"] {
            assert!(
                matches!(Config::from_yaml(Path::new("/blog"), yaml), Err(Error::Parse { .. })),
                "{}",
                yaml
            );
        }
    }

    #[test]
    fn test_freezing_overlay() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(CONFIG_FILE), "DEBUG: true\nSITE_TITLE: Mine\n")?;
        fs::write(dir.path().join(FREEZING_FILE), "DEBUG: false\n")?;

        let serving = Config::load(dir.path(), false)?;
        assert!(serving.debug);

        let freezing = Config::load(dir.path(), true)?;
        assert!(!freezing.debug);
        assert_eq!("Mine", freezing.site_title);
        Ok(())
    }

    #[test]
    fn test_missing_files_are_defaults() -> Result<()> {
        let config = Config::load(Path::new("/does/not/exist"), true)?;
        assert_eq!(10, config.posts_per_page);
        Ok(())
    }
}
