//! Defines the [`Document`] type shared by posts and pages, the metadata
//! header rules, and [`ParseError`]. See [`Document::parse`] for how a source
//! file becomes a document.

use crate::markdown;
use crate::metafile;
use crate::tag::{Tag, UNTAGGED};
use crate::url::{Converter, Urls};
use crate::util::strip_extension;
use chrono::{NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marks where a post's summary ends.
const FOLD_TAG: &str = "<!-- more -->";

/// Which collection a document belongs to. Pages keep their body as-is, posts
/// are rendered from Markdown and always carry at least the default tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Page,
    Post,
}

/// A parsed post or page.
#[derive(Clone, Debug)]
pub struct Document {
    /// The source path relative to its collection root, without extension,
    /// using `/` separators (e.g. `2014/hello`).
    pub path: String,

    /// Where the document was read from.
    pub source: PathBuf,

    pub title: String,

    /// The publish date. Posts without one are drafts.
    pub date: Option<NaiveDateTime>,

    pub tags: Vec<Tag>,

    /// The rendered HTML body.
    pub body: String,

    /// Whether the body should be rendered as a template on its own route.
    pub templatize: bool,

    /// Every other metadata key, exposed to templates as `meta`.
    pub meta: BTreeMap<String, Value>,
}

impl Document {
    /// Parses a document from the raw bytes of its source file. `relative` is
    /// the source path relative to the collection root, with extension.
    /// `extensions` are the post extensions, used to convert links between
    /// post sources into post URLs.
    pub fn parse(
        kind: Kind,
        source: &Path,
        relative: &str,
        bytes: &[u8],
        urls: &Urls,
        extensions: &[String],
    ) -> Result<Document, ParseError> {
        let text = metafile::decode(bytes)?;
        let (header, body) = metafile::split(&text);
        let metadata = Metadata::parse(header)?;
        let path = strip_extension(relative).to_owned();

        let tags = match (kind, metadata.tags) {
            (Kind::Post, None) => vec![Tag::new(UNTAGGED)],
            (Kind::Page, None) => Vec::new(),
            (_, Some(names)) => {
                let mut tags: Vec<Tag> = Vec::with_capacity(names.len());
                for tag in names.iter().map(|name| Tag::new(name)) {
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
                tags
            }
        };

        let body = match kind {
            Kind::Page => body.to_owned(),
            Kind::Post => {
                let mut html = String::with_capacity(body.len() * 2);
                markdown::to_html(
                    &mut html,
                    body,
                    &urls.post(&path),
                    &Converter::new(urls, relative, extensions),
                )?;
                html
            }
        };

        Ok(Document {
            path,
            source: source.to_owned(),
            title: metadata.title,
            date: metadata.date,
            tags,
            body,
            templatize: metadata.templatize,
            meta: metadata.extra,
        })
    }

    /// Returns the body up to the fold marker and whether the body was
    /// actually folded.
    pub fn summary(&self) -> (&str, bool) {
        match self.body.find(FOLD_TAG) {
            Some(i) => (&self.body[..i], true),
            None => (&self.body, false),
        }
    }
}

/// The metadata header block of a source file.
#[derive(Debug, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub date: Option<NaiveDateTime>,
    pub tags: Option<Vec<String>>,
    pub templatize: bool,
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    /// Parses a YAML header. `title` is required; `date`, `tags` and
    /// `templatize` are optional and type-checked; other keys are kept as-is.
    pub fn parse(header: &str) -> Result<Metadata, ParseError> {
        let mut mapping = match header.trim().is_empty() {
            true => Mapping::new(),
            false => match serde_yaml::from_str::<Value>(header)? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => return Err(ParseError::NotAMapping),
            },
        };

        let title = match mapping.remove(&key("title")) {
            Some(Value::String(title)) => title,
            Some(_) => {
                return Err(ParseError::InvalidType {
                    field: "title",
                    expected: "string",
                })
            }
            None => return Err(ParseError::MissingField("title")),
        };

        let date = match mapping.remove(&key("date")) {
            None | Some(Value::Null) => None,
            Some(Value::String(date)) => {
                Some(parse_date(&date).ok_or(ParseError::InvalidDate(date))?)
            }
            Some(other) => return Err(ParseError::InvalidDate(describe(&other))),
        };

        let tags = match mapping.remove(&key("tags")) {
            None | Some(Value::Null) => None,
            Some(Value::Sequence(items)) => Some(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(name) if is_tag_name(&name) => Ok(name),
                        Value::String(name) => Err(ParseError::InvalidTags(format!(
                            "tag `{}` can't name a listing directory",
                            name
                        ))),
                        other => Err(ParseError::InvalidTags(format!(
                            "expected a string, found `{}`",
                            describe(&other)
                        ))),
                    })
                    .collect::<Result<Vec<String>, ParseError>>()?,
            ),
            Some(other) => {
                return Err(ParseError::InvalidTags(format!(
                    "expected a list, found `{}`",
                    describe(&other)
                )))
            }
        };

        let templatize = match mapping.remove(&key("templatize")) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(templatize)) => templatize,
            Some(_) => {
                return Err(ParseError::InvalidType {
                    field: "templatize",
                    expected: "boolean",
                })
            }
        };

        let mut extra = BTreeMap::new();
        for (k, v) in mapping {
            match k {
                Value::String(k) => {
                    extra.insert(k, v);
                }
                other => return Err(ParseError::InvalidKey(describe(&other))),
            }
        }

        Ok(Metadata {
            title,
            date,
            tags,
            templatize,
            extra,
        })
    }
}

fn key(name: &str) -> Value {
    Value::String(name.to_owned())
}

/// Each tag becomes one directory of the frozen site, so a name can't be
/// empty, `.`, `..` or contain a `/`.
fn is_tag_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_start_matches("---").trim().to_owned())
        .unwrap_or_else(|_| format!("{:?}", value))
}

/// Parses a publish date. Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`,
/// `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
}

/// Represents an error parsing a source file into a [`Document`]. Files that
/// fail to parse are skipped with a warning.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reading source file: {0}")]
    Io(#[from] io::Error),

    #[error("source file is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("metadata header is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("metadata header must be a mapping of keys to values")]
    NotAMapping,

    #[error("metadata key `{0}` is not a string")]
    InvalidKey(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be a {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("invalid date `{0}`, expected YYYY-MM-DD, optionally followed by HH:MM[:SS]")]
    InvalidDate(String),

    #[error("invalid tag list: {0}")]
    InvalidTags(String),

    #[error("rendering markdown: {0}")]
    Markdown(#[from] markdown::Error),
}

/// Builds a post with the given path, date and tags for tests in other
/// modules.
#[cfg(test)]
pub fn test_document(path: &str, date: &str, tags: &[&str]) -> Document {
    Document {
        path: path.to_owned(),
        source: PathBuf::from(format!("post/{}.markdown", path)),
        title: path.to_owned(),
        date: parse_date(date),
        tags: tags.iter().map(|t| Tag::new(t)).collect(),
        body: format!("<p>{}</p>", path),
        templatize: false,
        meta: BTreeMap::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_post(input: &str) -> Result<Document, ParseError> {
        Document::parse(
            Kind::Post,
            Path::new("post/2014/hello.markdown"),
            "2014/hello.markdown",
            input.as_bytes(),
            &Urls::root(),
            &[String::from(".markdown")],
        )
    }

    #[test]
    fn test_parse_post() -> Result<(), ParseError> {
        let post = parse_post(
            "title: Hello\ndate: 2014-01-11 10:30\ntags: [Greet, meta, greet, meta]\nauthor: me\n\n\
             Intro.\n\n<!-- more -->\n\nRest.\n",
        )?;

        assert_eq!("2014/hello", post.path);
        assert_eq!("Hello", post.title);
        assert_eq!(parse_date("2014-01-11 10:30:00"), post.date);
        assert_eq!(
            vec!["Greet", "meta", "greet"],
            post.tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(Some(&Value::String("me".into())), post.meta.get("author"));

        let (summary, summarized) = post.summary();
        assert!(summarized);
        assert_eq!("<p>Intro.</p>\n", summary);
        assert!(post.body.contains("<p>Rest.</p>"));
        Ok(())
    }

    #[test]
    fn test_post_without_tags_is_untagged() -> Result<(), ParseError> {
        let post = parse_post("title: Hello\ndate: 2014-01-11\n\nBody")?;
        assert_eq!(vec![Tag::new(UNTAGGED)], post.tags);

        let post = parse_post("title: Hello\ndate: 2014-01-11\ntags: []\n\nBody")?;
        assert!(post.tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_post_without_date_is_draft() -> Result<(), ParseError> {
        assert_eq!(None, parse_post("title: Draft\n\nBody")?.date);
        Ok(())
    }

    #[test]
    fn test_page_body_is_raw() -> Result<(), ParseError> {
        let page = Document::parse(
            Kind::Page,
            Path::new("page/about.html"),
            "about.html",
            "\u{feff}title: About\r\n\r\n<p>*raw*</p>\r\n".as_bytes(),
            &Urls::root(),
            &[],
        )?;
        assert_eq!("about", page.path);
        assert_eq!("<p>*raw*</p>\n", page.body);
        assert!(page.tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_malformed_metadata() {
        let cases: &[(&str, fn(&ParseError) -> bool)] = &[
            ("date: 2014-01-11\n\nBody", |e| {
                matches!(e, ParseError::MissingField("title"))
            }),
            ("title: Hi\ndate: 11/01/2014\n\nBody", |e| {
                matches!(e, ParseError::InvalidDate(_))
            }),
            ("title: Hi\ndate: 2014-02-30\n\nBody", |e| {
                matches!(e, ParseError::InvalidDate(_))
            }),
            ("title: Hi\ntags: a, b\n\nBody", |e| {
                matches!(e, ParseError::InvalidTags(_))
            }),
            ("title: Hi\ntags: [[a]]\n\nBody", |e| {
                matches!(e, ParseError::InvalidTags(_))
            }),
            ("title: Hi\ntags: [a/b]\n\nBody", |e| {
                matches!(e, ParseError::InvalidTags(_))
            }),
            ("title: Hi\ntags: ['..']\n\nBody", |e| {
                matches!(e, ParseError::InvalidTags(_))
            }),
            ("title: Hi\ntags: ['']\n\nBody", |e| {
                matches!(e, ParseError::InvalidTags(_))
            }),
            ("- just\n- a list\n\nBody", |e| matches!(e, ParseError::NotAMapping)),
            ("title: [unclosed\n\nBody", |e| matches!(e, ParseError::Yaml(_))),
        ];

        for (input, is_expected) in cases {
            match parse_post(input) {
                Ok(_) => panic!("expected an error parsing {:?}", input),
                Err(e) => assert!(is_expected(&e), "unexpected error {:?} for {:?}", e, input),
            }
        }

        assert!(matches!(
            Document::parse(
                Kind::Page,
                Path::new("page/x.html"),
                "x.html",
                &[0xff, 0xfe],
                &Urls::root(),
                &[],
            ),
            Err(ParseError::Encoding(_))
        ));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2014-01-11").is_some());
        assert!(parse_date("2014-01-11 08:00").is_some());
        assert!(parse_date("2014-01-11 08:00:59").is_some());
        assert!(parse_date("2014-01-11T08:00:59").is_some());
        assert!(parse_date("January 11th").is_none());
    }
}
