//! The blog's routes: resolving request paths to [`Route`]s, enumerating
//! every route of a site, and rendering a route to bytes.
//!
//! | Route    | URL (under the site prefix) | Template       |
//! |----------|-----------------------------|----------------|
//! | Index    | `/`, `/<n>/`                | `index.html`   |
//! | Archive  | `/archive/`                 | `archive.html` |
//! | Page     | `/page/<path>/`             | `page.html`    |
//! | Post     | `/post/<path>/`             | `post.html`    |
//! | Tag      | `/tag/<name>/`              | `tag.html`     |
//! | Feed     | `/feed.atom`                |                |
//! | Static   | `/static/<file>`            |                |

use crate::config::Config;
use crate::feed::{self, FeedConfig};
use crate::pagination::Pagination;
use crate::post::Document;
use crate::site::Site;
use crate::tag::TagEntry;
use crate::theme::{self, Theme};
use crate::url::Urls;
use crate::util::relative_posix;
use crate::value::{self, object, optional};
use gtmpl::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

const HTML: &str = "text/html; charset=utf-8";
const ATOM: &str = "application/atom+xml; charset=utf-8";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// An index page, numbered from 1.
    Index(usize),
    Archive,
    Page(String),
    Post(String),
    /// A tag listing, by tag name.
    Tag(String),
    Feed,
    /// A file under the static directory, by `/`-separated relative path.
    Static(String),
}

impl Route {
    /// The root-absolute URL of this route.
    pub fn url(&self, urls: &Urls) -> String {
        match self {
            Route::Index(n) => urls.index(*n),
            Route::Archive => urls.archive(),
            Route::Page(path) => urls.page(path),
            Route::Post(path) => urls.post(path),
            Route::Tag(name) => urls.tag(name),
            Route::Feed => urls.feed(),
            Route::Static(file) => urls.static_file(file),
        }
    }

    /// Whether the output is an HTML page rendered from a template.
    pub fn is_html(&self) -> bool {
        !matches!(self, Route::Feed | Route::Static(_))
    }
}

/// The outcome of resolving a request path.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolved {
    Route(Route),

    /// The path names a route but in a non-canonical form. Holds the
    /// canonical route path.
    Redirect(String),

    NotFound,
}

/// Resolves `path`, a decoded request path relative to the site prefix with
/// no leading slash (`post/2014/hello/`).
pub fn resolve(path: &str) -> Resolved {
    if path.is_empty() {
        return Resolved::Route(Route::Index(1));
    }
    if path == "feed.atom" {
        return Resolved::Route(Route::Feed);
    }
    if let Some(file) = path.strip_prefix("static/") {
        return match is_clean(file) {
            true => Resolved::Route(Route::Static(file.to_owned())),
            false => Resolved::NotFound,
        };
    }

    let inner = match path.strip_suffix('/') {
        Some(inner) => inner,
        None => {
            let slashed = format!("{}/", path);
            return match resolve(&slashed) {
                Resolved::Route(_) => Resolved::Redirect(slashed),
                _ => Resolved::NotFound,
            };
        }
    };

    if inner == "archive" {
        return Resolved::Route(Route::Archive);
    }
    if let Ok(n) = inner.parse::<usize>() {
        if inner.chars().all(|c| c.is_ascii_digit()) {
            return match n {
                0 => Resolved::NotFound,
                1 => Resolved::Redirect(String::new()),
                n => Resolved::Route(Route::Index(n)),
            };
        }
    }

    let (kind, rest) = match inner.find('/') {
        Some(i) => (&inner[..i], &inner[i + 1..]),
        None => return Resolved::NotFound,
    };
    if !is_clean(rest) {
        return Resolved::NotFound;
    }
    match kind {
        "page" => Resolved::Route(Route::Page(rest.to_owned())),
        "post" => Resolved::Route(Route::Post(rest.to_owned())),
        "tag" if !rest.contains('/') => Resolved::Route(Route::Tag(rest.to_owned())),
        _ => Resolved::NotFound,
    }
}

/// Whether `path` is a non-empty relative path without empty, `.` or `..`
/// segments.
fn is_clean(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// A rendered route.
#[derive(Debug)]
pub struct Rendered {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

/// Renders the routes of one [`Site`] through one [`Theme`].
pub struct Renderer<'a> {
    config: &'a Config,
    site: &'a Site,
    theme: &'a Theme,
    urls: &'a Urls,

    /// The site-wide template fields, shared by every route.
    base: HashMap<String, Value>,
}

impl<'a> Renderer<'a> {
    /// Creates a renderer. `urls` decides the site prefix of every URL handed
    /// to templates.
    pub fn new(config: &'a Config, site: &'a Site, theme: &'a Theme, urls: &'a Urls) -> Renderer<'a> {
        let mut base: HashMap<String, Value> = HashMap::new();
        base.insert(
            "site".to_owned(),
            object(vec![
                ("title", Value::from(config.site_title.as_str())),
                ("author", optional(config.site_author.clone())),
                ("base_url", Value::from(config.base_url.as_str())),
                ("debug", Value::Bool(config.debug)),
            ]),
        );
        base.insert(
            "urls".to_owned(),
            object(vec![
                ("prefix", Value::from(urls.prefix())),
                ("index", Value::String(urls.index(1))),
                ("archive", Value::String(urls.archive())),
                ("feed", Value::String(urls.feed())),
                ("static", Value::String(urls.static_root())),
            ]),
        );

        let pages: Vec<(String, Value)> = site
            .pages
            .iter()
            .map(|p| (p.path.clone(), value::page_listing(p, urls)))
            .collect();
        let posts: Vec<(String, Value)> = site
            .posts
            .iter()
            .map(|p| (p.path.clone(), value::post_listing(p, urls)))
            .collect();
        base.insert("pages".to_owned(), Value::Array(pages.iter().map(|(_, v)| v.clone()).collect()));
        base.insert("pages_by_path".to_owned(), Value::Object(pages.into_iter().collect()));
        base.insert("posts".to_owned(), Value::Array(posts.iter().map(|(_, v)| v.clone()).collect()));
        base.insert("posts_by_path".to_owned(), Value::Object(posts.into_iter().collect()));

        let listings = |entry: &TagEntry| {
            Value::Array(entry.posts.iter().map(|p| value::post_listing(p, urls)).collect())
        };
        base.insert(
            "posts_by_tag".to_owned(),
            Value::Object(
                site.tags
                    .iter()
                    .map(|entry| (entry.tag.name.clone(), listings(entry)))
                    .collect(),
            ),
        );
        base.insert(
            "tags".to_owned(),
            Value::Array(
                site.tags
                    .iter()
                    .map(|entry| {
                        let mut tag = value::tag(&entry.tag, urls);
                        if let Value::Object(m) = &mut tag {
                            m.insert("count".to_owned(), Value::from(entry.posts.len() as u64));
                            m.insert("posts".to_owned(), listings(entry));
                        }
                        tag
                    })
                    .collect(),
            ),
        );

        Renderer {
            config,
            site,
            theme,
            urls,
            base,
        }
    }

    fn pagination(&self, page: usize) -> Pagination<'a, Arc<Document>> {
        Pagination::new(&self.site.posts, page, self.config.posts_per_page)
    }

    /// Every route of the site, in a stable order: index pages, the archive,
    /// pages, posts, tags, the feed and static files.
    pub fn routes(&self) -> io::Result<Vec<Route>> {
        let mut routes: Vec<Route> = (1..=self.pagination(1).total_pages()).map(Route::Index).collect();
        routes.push(Route::Archive);
        routes.extend(self.site.pages.iter().map(|p| Route::Page(p.path.clone())));
        routes.extend(self.site.posts.iter().map(|p| Route::Post(p.path.clone())));
        routes.extend(self.site.tags.iter().map(|e| Route::Tag(e.tag.name.clone())));
        routes.push(Route::Feed);
        for file in static_files(&self.config.static_root)? {
            routes.push(Route::Static(file));
        }
        Ok(routes)
    }

    /// Renders `route`. Returns `None` when the route doesn't exist for this
    /// site (unknown post, out-of-range index page, missing static file).
    pub fn render(&self, route: &Route) -> Result<Option<Rendered>> {
        let html = |body: String| {
            Some(Rendered {
                body: body.into_bytes(),
                content_type: HTML,
            })
        };
        match route {
            Route::Index(n) => {
                let pagination = self.pagination(*n);
                if !pagination.exists() {
                    return Ok(None);
                }
                let context = self.context(vec![("pagination", self.pagination_value(&pagination))]);
                Ok(html(self.theme.render("index.html", context)?))
            }
            Route::Archive => Ok(html(self.theme.render("archive.html", self.context(vec![]))?)),
            Route::Page(path) => match self.site.page(path) {
                None => Ok(None),
                Some(page) => {
                    let page = self.templatized(page, "page")?;
                    let context = self.context(vec![("page", value::page(&page, self.urls))]);
                    Ok(html(self.theme.render("page.html", context)?))
                }
            },
            Route::Post(path) => match self.site.post(path) {
                None => Ok(None),
                Some(post) => {
                    let post = self.templatized(post, "post")?;
                    let (newer, older) = self.site.neighbours(path);
                    let mut post_value = value::post(&post, self.urls);
                    if let Value::Object(m) = &mut post_value {
                        let listing = |d: Option<&Arc<Document>>| match d {
                            Some(d) => value::post_listing(d, self.urls),
                            None => Value::Nil,
                        };
                        m.insert("prev".to_owned(), listing(newer));
                        m.insert("next".to_owned(), listing(older));
                    }
                    let context = self.context(vec![("post", post_value)]);
                    Ok(html(self.theme.render("post.html", context)?))
                }
            },
            Route::Tag(name) => match self.site.tags.get(name) {
                None => Ok(None),
                Some(entry) => {
                    let context = self.context(vec![("tag", self.tag_value(entry))]);
                    Ok(html(self.theme.render("tag.html", context)?))
                }
            },
            Route::Feed => {
                let config = FeedConfig {
                    title: self.config.site_title.clone(),
                    author: self.config.site_author.clone(),
                    home_page: self.config.absolute_url(&self.urls.index(1)),
                    feed_url: self.config.absolute_url(&self.urls.feed()),
                };
                let body = feed::write_feed(
                    &config,
                    &self.site.posts,
                    self.urls,
                    |url| self.config.absolute_url(url),
                    Vec::new(),
                )?;
                Ok(Some(Rendered {
                    body,
                    content_type: ATOM,
                }))
            }
            Route::Static(file) => {
                let path = self.config.static_root.join(file);
                if !path.is_file() {
                    return Ok(None);
                }
                Ok(Some(Rendered {
                    body: fs::read(&path)?,
                    content_type: guess_content_type(&path),
                }))
            }
        }
    }

    /// The site-wide fields plus the route's own `fields`.
    fn context(&self, fields: Vec<(&str, Value)>) -> Value {
        let mut m = self.base.clone();
        for (k, v) in fields {
            m.insert(k.to_owned(), v);
        }
        Value::Object(m)
    }

    /// Returns `document` with its body executed as a template when it asks
    /// for it. The body sees the same context as the route template, with the
    /// document itself under `field`.
    fn templatized(&self, document: &Arc<Document>, field: &str) -> Result<Document> {
        let mut document = Document::clone(document);
        if document.templatize {
            let item = match field {
                "page" => value::page(&document, self.urls),
                _ => value::post(&document, self.urls),
            };
            let context = self.context(vec![(field, item)]);
            let name = document.source.display().to_string();
            document.body = self.theme.render_source(&name, &document.body, context)?;
        }
        Ok(document)
    }

    fn pagination_value(&self, pagination: &Pagination<Arc<Document>>) -> Value {
        let page_url = |n: usize| Value::String(self.urls.index(n));
        object(vec![
            ("page", Value::from(pagination.page as u64)),
            ("per_page", Value::from(pagination.per_page as u64)),
            ("total_pages", Value::from(pagination.total_pages() as u64)),
            ("has_prev", Value::Bool(pagination.has_prev())),
            ("has_next", Value::Bool(pagination.has_next())),
            (
                "prev_url",
                match pagination.has_prev() {
                    true => page_url(pagination.page - 1),
                    false => Value::Nil,
                },
            ),
            (
                "next_url",
                match pagination.has_next() {
                    true => page_url(pagination.page + 1),
                    false => Value::Nil,
                },
            ),
            (
                "items",
                Value::Array(
                    pagination
                        .items()
                        .iter()
                        .map(|p| value::post(p, self.urls))
                        .collect(),
                ),
            ),
        ])
    }

    fn tag_value(&self, entry: &TagEntry) -> Value {
        let mut tag = value::tag(&entry.tag, self.urls);
        if let Value::Object(m) = &mut tag {
            m.insert(
                "posts".to_owned(),
                Value::Array(entry.posts.iter().map(|p| value::post(p, self.urls)).collect()),
            );
        }
        tag
    }
}

/// Lists the files under `root` as sorted `/`-separated relative paths. A
/// missing directory has no files.
pub fn static_files(root: &Path) -> io::Result<Vec<String>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = entry?;
        if entry.file_type().is_file() {
            if let Some(relative) = relative_posix(root, entry.path()) {
                files.push(relative);
            }
        }
    }
    Ok(files)
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
pub fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => HTML,
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("atom") => ATOM,
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem rendering a route.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Theme(#[from] theme::Error),

    #[error(transparent)]
    Feed(#[from] feed::Error),

    #[error("reading static file: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_routes() {
        let cases = &[
            ("", Route::Index(1)),
            ("2/", Route::Index(2)),
            ("archive/", Route::Archive),
            ("page/about/", Route::Page(String::from("about"))),
            ("post/2014/hello/", Route::Post(String::from("2014/hello"))),
            ("tag/rust/", Route::Tag(String::from("rust"))),
            ("feed.atom", Route::Feed),
            ("static/css/style.css", Route::Static(String::from("css/style.css"))),
        ];
        for (path, route) in cases {
            assert_eq!(Resolved::Route(route.clone()), resolve(path), "{}", path);
        }
    }

    #[test]
    fn test_resolve_redirects() {
        assert_eq!(Resolved::Redirect(String::from("archive/")), resolve("archive"));
        assert_eq!(Resolved::Redirect(String::from("post/a/")), resolve("post/a"));
        assert_eq!(Resolved::Redirect(String::from("3/")), resolve("3"));
        assert_eq!(Resolved::Redirect(String::new()), resolve("1/"));
    }

    #[test]
    fn test_resolve_not_found() {
        for path in &[
            "0/", "nope/", "post/", "post//x/", "post/../secret/", "tag/a/b/", "static/",
            "static/../blog.yaml", "+2/",
        ] {
            assert_eq!(Resolved::NotFound, resolve(path), "{}", path);
        }
    }

    #[test]
    fn test_route_urls() {
        let urls = Urls::new("/blog/");
        assert_eq!("/blog/", Route::Index(1).url(&urls));
        assert_eq!("/blog/2/", Route::Index(2).url(&urls));
        assert_eq!("/blog/feed.atom", Route::Feed.url(&urls));
        assert!(!Route::Feed.is_html());
        assert!(Route::Tag(String::from("x")).is_html());
    }

    #[test]
    fn test_static_files() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("css"))?;
        fs::write(dir.path().join("css").join("style.css"), "")?;
        fs::write(dir.path().join("a.png"), "")?;
        assert_eq!(vec!["a.png", "css/style.css"], static_files(dir.path())?);
        assert!(static_files(&dir.path().join("missing"))?.is_empty());
        assert_eq!("text/css; charset=utf-8", guess_content_type(Path::new("x.css")));
        Ok(())
    }
}
