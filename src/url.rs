//! URL construction for every route, plus the two link rewriters: the
//! [`Converter`] that turns links between post sources into post URLs while
//! rendering Markdown, and the [`Relativizer`] that the freezer uses to make
//! same-origin links relative to the page they appear on.

use regex::{Captures, Regex};
use url::Url;

/// The output file name for URLs that end in a slash.
pub const INDEX_FILE: &str = "index.html";

/// Builds root-absolute URLs for every route under a site prefix. The prefix
/// is `/` for the development server and the path of the base URL when
/// freezing (e.g. `/blog/` for `https://example.org/blog/`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Urls {
    prefix: String,
}

impl Urls {
    /// Normalizes `prefix` so it starts and ends with exactly one `/`.
    pub fn new(prefix: &str) -> Urls {
        let trimmed = prefix.trim_matches('/');
        Urls {
            prefix: match trimmed.is_empty() {
                true => String::from("/"),
                false => format!("/{}/", trimmed),
            },
        }
    }

    pub fn root() -> Urls {
        Urls::new("/")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The URL of index page `page`. Page 1 lives at the prefix itself.
    pub fn index(&self, page: usize) -> String {
        match page {
            0 | 1 => self.prefix.clone(),
            n => format!("{}{}/", self.prefix, n),
        }
    }

    pub fn archive(&self) -> String {
        format!("{}archive/", self.prefix)
    }

    pub fn page(&self, path: &str) -> String {
        format!("{}page/{}/", self.prefix, encode_path(path))
    }

    pub fn post(&self, path: &str) -> String {
        format!("{}post/{}/", self.prefix, encode_path(path))
    }

    /// The listing of the tag named `name`. Names are arbitrary text, so the
    /// whole name is one encoded segment.
    pub fn tag(&self, name: &str) -> String {
        format!("{}tag/{}/", self.prefix, urlencoding::encode(name))
    }

    pub fn feed(&self) -> String {
        format!("{}feed.atom", self.prefix)
    }

    /// The directory URL for static assets. Templates append file names.
    pub fn static_root(&self) -> String {
        format!("{}static/", self.prefix)
    }

    pub fn static_file(&self, file: &str) -> String {
        format!("{}static/{}", self.prefix, encode_path(file))
    }

    /// Strips the site prefix from a root-absolute URL path, yielding the
    /// route path (e.g. `/blog/post/a/` becomes `post/a/`).
    pub fn strip_prefix<'a>(&self, url: &'a str) -> Option<&'a str> {
        match url.strip_prefix(self.prefix.as_str()) {
            Some(rest) => Some(rest),
            None if format!("{}/", url) == self.prefix => Some(""),
            None => None,
        }
    }
}

/// Percent-encodes each segment of a `/`-separated path, so `c#/why?` becomes
/// `c%23/why%3F`.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<_>>()
        .join("/")
}

/// Reverses [`encode_path`]. Invalid escapes are left as they are.
pub fn decode_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_owned())
}

/// Maps a route path (no leading slash) to its output file path, appending
/// `index.html` to directory-style URLs.
pub fn output_file(route_path: &str) -> String {
    match route_path.is_empty() || route_path.ends_with('/') {
        true => format!("{}{}", route_path, INDEX_FILE),
        false => route_path.to_owned(),
    }
}

/// Computes the link from the page at root-absolute `from` to the
/// root-absolute `to`, keeping any query or fragment. Directory targets get
/// an explicit `index.html` so the result works from `file://` URLs too.
pub fn relative(from: &str, to: &str) -> String {
    let split = to.find(|c| c == '?' || c == '#').unwrap_or(to.len());
    let (target, suffix) = to.split_at(split);

    let from_dir = match from.rfind('/') {
        Some(i) => &from[..i],
        None => "",
    };
    let from_parts: Vec<&str> = from_dir.split('/').filter(|p| !p.is_empty()).collect();

    let target = output_file(target.trim_start_matches('/'));
    let target_parts: Vec<&str> = target.split('/').collect();

    let common = from_parts
        .iter()
        .zip(target_parts.iter())
        .take(target_parts.len() - 1)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from_parts.len() - common];
    parts.extend_from_slice(&target_parts[common..]);
    format!("{}{}", parts.join("/"), suffix)
}

/// Converts links found in a post's Markdown. Links that resolve to another
/// post source file (e.g. `../2013/older.markdown`) become that post's URL;
/// every other link is left untouched.
pub struct Converter<'a> {
    urls: &'a Urls,
    extensions: &'a [String],
    posts_root: Option<Url>,
    base: Option<Url>,
}

impl<'a> Converter<'a> {
    /// Constructs a new `Converter`
    ///
    /// # Arguments
    ///
    /// * `urls` - builds the URLs that converted links point at.
    /// * `source` - the `/`-separated path of the post's source file relative
    ///   to the posts directory, from which relative links are resolved.
    /// * `extensions` - the extensions that identify post source files.
    pub fn new(urls: &'a Urls, source: &str, extensions: &'a [String]) -> Converter<'a> {
        let posts_root = Url::parse("file:///post/").ok();
        let base = posts_root.as_ref().and_then(|root| root.join(source).ok());
        Converter {
            urls,
            extensions,
            posts_root,
            base,
        }
    }

    pub fn convert(&self, link: &str) -> String {
        self.convert_source_link(link)
            .unwrap_or_else(|| link.to_owned())
    }

    fn convert_source_link(&self, link: &str) -> Option<String> {
        if link.starts_with('#') || Url::parse(link).is_ok() {
            return None;
        }
        let root = self.posts_root.as_ref()?;
        let absolute = self.base.as_ref()?.join(link).ok()?;
        let relative = absolute.path().strip_prefix(root.path())?;
        let relative = urlencoding::decode(relative).ok()?;
        let extension = self
            .extensions
            .iter()
            .find(|ext| relative.len() > ext.len() && relative.ends_with(ext.as_str()))?;

        let mut url = self
            .urls
            .post(&relative[..relative.len() - extension.len()]);
        if let Some(query) = absolute.query() {
            url.push('?');
            url.push_str(query);
        }
        if let Some(fragment) = absolute.fragment() {
            url.push('#');
            url.push_str(fragment);
        }
        Some(url)
    }
}

/// Rewrites same-origin links in rendered HTML so they are relative to the
/// page being written. A link is same-origin when it is root-absolute (`/x`,
/// but not protocol-relative `//host/x`) or starts with the base URL's origin.
pub struct Relativizer {
    origin: String,
    attribute: Regex,
}

impl Relativizer {
    pub fn new(base_url: &Url) -> Result<Relativizer, regex::Error> {
        Ok(Relativizer {
            origin: base_url.origin().ascii_serialization(),
            attribute: Regex::new(r#"(?i)\b(href|src|action)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
        })
    }

    /// Rewrites every `href`, `src` and `action` attribute of `html`, which is
    /// the page at root-absolute URL `page`.
    pub fn rewrite(&self, page: &str, html: &str) -> String {
        self.attribute
            .replace_all(html, |caps: &Captures| {
                let (value, quote) = match (caps.get(2), caps.get(3)) {
                    (Some(value), _) => (value.as_str(), '"'),
                    (None, Some(value)) => (value.as_str(), '\''),
                    (None, None) => return caps[0].to_owned(),
                };
                match self.same_origin_path(value) {
                    Some(path) => format!(
                        "{}={}{}{}",
                        &caps[1],
                        quote,
                        relative(page, path),
                        quote
                    ),
                    None => caps[0].to_owned(),
                }
            })
            .into_owned()
    }

    fn same_origin_path<'v>(&self, value: &'v str) -> Option<&'v str> {
        if value.starts_with('/') && !value.starts_with("//") {
            return Some(value);
        }
        value
            .strip_prefix(self.origin.as_str())
            .filter(|rest| rest.starts_with('/'))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_urls() {
        let urls = Urls::new("blog");
        assert_eq!("/blog/", urls.prefix());
        assert_eq!("/blog/", urls.index(1));
        assert_eq!("/blog/3/", urls.index(3));
        assert_eq!("/blog/archive/", urls.archive());
        assert_eq!("/blog/post/2014/hello/", urls.post("2014/hello"));
        assert_eq!("/blog/tag/rust/", urls.tag("rust"));
        assert_eq!("/blog/static/style.css", urls.static_file("style.css"));
        assert_eq!(Some("post/a/"), urls.strip_prefix("/blog/post/a/"));
        assert_eq!(Some(""), urls.strip_prefix("/blog"));
        assert_eq!(None, urls.strip_prefix("/other/"));
        assert_eq!(Urls::root(), Urls::new(""));
    }

    #[test]
    fn test_urls_are_percent_encoded() {
        let urls = Urls::root();
        assert_eq!("/post/notes/c%23sharp/", urls.post("notes/c#sharp"));
        assert_eq!("/page/why%3F/", urls.page("why?"));
        assert_eq!("/tag/C%2B%2B/", urls.tag("C++"));
        assert_eq!("/tag/a%2Fb/", urls.tag("a/b"));
        assert_eq!("/static/my%20file.css", urls.static_file("my file.css"));
        assert_eq!("post/notes/c#sharp/", decode_path("post/notes/c%23sharp/"));
        assert_eq!("100%", decode_path("100%"));
    }

    #[test]
    fn test_output_file() {
        assert_eq!("index.html", output_file(""));
        assert_eq!("post/a/index.html", output_file("post/a/"));
        assert_eq!("feed.atom", output_file("feed.atom"));
    }

    #[test]
    fn test_relative() {
        assert_eq!("../../tag/x/index.html", relative("/post/a/", "/tag/x/"));
        assert_eq!("static/style.css", relative("/", "/static/style.css"));
        assert_eq!("index.html", relative("/post/a/", "/post/a/"));
        assert_eq!("../b/index.html#top", relative("/post/a/", "/post/b/#top"));
        assert_eq!("../../index.html", relative("/post/a/", "/"));
        assert_eq!("archive/index.html", relative("/feed.atom", "/archive/"));
        assert_eq!("../../2/index.html", relative("/post/2014/", "/2/"));
        assert_eq!(
            "../why%3F/index.html",
            relative("/post/c%23sharp/", "/post/why%3F/")
        );
    }

    #[test]
    fn test_convert_relative_post() {
        fixture("2014/hello.markdown", "other.markdown", "/post/2014/other/");
    }

    #[test]
    fn test_convert_relative_post_redundancies() {
        fixture("2014/hello.markdown", "../2013/../2013/old.markdown#x", "/post/2013/old/#x");
    }

    #[test]
    fn test_convert_leaves_other_links() {
        fixture("hello.markdown", "image.jpg", "image.jpg");
        fixture("hello.markdown", "/page/about/", "/page/about/");
        fixture("hello.markdown", "https://example.org/a.markdown", "https://example.org/a.markdown");
        fixture("hello.markdown", "#section", "#section");
        fixture("hello.markdown", "../../escape.markdown", "../../escape.markdown");
    }

    fn fixture(source: &str, link: &str, wanted: &str) {
        let urls = Urls::root();
        let extensions = vec![String::from(".markdown")];
        assert_eq!(wanted, Converter::new(&urls, source, &extensions).convert(link));
    }

    #[test]
    fn test_relativizer() {
        let base = Url::parse("http://localhost/").unwrap();
        let html = r##"<a href="/tag/x/">x</a> <img src='/static/a.png'> <a href="http://localhost/archive/">a</a> <a href="//cdn.example.org/x.js">c</a> <a href="https://example.org/">e</a> <a href="#top">t</a>"##;
        let wanted = r##"<a href="../../tag/x/index.html">x</a> <img src='../../static/a.png'> <a href="../../archive/index.html">a</a> <a href="//cdn.example.org/x.js">c</a> <a href="https://example.org/">e</a> <a href="#top">t</a>"##;
        assert_eq!(wanted, Relativizer::new(&base).unwrap().rewrite("/post/a/", html));
    }
}
