//! Converts documents, tags and metadata into template [`Value`]s.
//!
//! Documents come in two shapes: the listing shape (`path`, `title`, `date`,
//! `datetime`, `url`, `tags`) used for the site-wide `posts` and `pages`
//! lists, and the full shape which adds `body`, `summary`, `summarized` and
//! `meta`.

use crate::post::Document;
use crate::tag::Tag;
use crate::url::Urls;
use chrono::NaiveDateTime;
use gtmpl::Value;
use std::collections::HashMap;

/// Builds a [`Value::Object`] from field names and values.
pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<HashMap<String, Value>>(),
    )
}

/// Converts an optional string, mapping `None` to `nil` so templates can test
/// it with `if`.
pub fn optional(value: Option<String>) -> Value {
    match value {
        Some(value) => Value::String(value),
        None => Value::Nil,
    }
}

/// Converts YAML metadata. Mapping keys that aren't strings are dropped.
pub fn from_yaml(value: &serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Value::from(i),
            (None, Some(u), _) => Value::from(u),
            (None, None, Some(f)) => Value::from(f),
            (None, None, None) => Value::Nil,
        },
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(from_yaml).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_owned(), from_yaml(v))))
                .collect(),
        ),
    }
}

pub fn tag(tag: &Tag, urls: &Urls) -> Value {
    object(vec![
        ("name", Value::from(tag.name.as_str())),
        ("url", Value::String(urls.tag(&tag.name))),
    ])
}

fn dates(date: Option<NaiveDateTime>) -> (Value, Value) {
    match date {
        Some(date) => (
            Value::String(date.format("%Y-%m-%d").to_string()),
            Value::String(date.format("%Y-%m-%dT%H:%M:%S").to_string()),
        ),
        None => (Value::Nil, Value::Nil),
    }
}

fn listing_fields(document: &Document, url: String, urls: &Urls) -> HashMap<String, Value> {
    let (date, datetime) = dates(document.date);
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("path".to_owned(), Value::from(document.path.as_str()));
    m.insert("title".to_owned(), Value::from(document.title.as_str()));
    m.insert("date".to_owned(), date);
    m.insert("datetime".to_owned(), datetime);
    m.insert("url".to_owned(), Value::String(url));
    m.insert(
        "tags".to_owned(),
        Value::Array(document.tags.iter().map(|t| tag(t, urls)).collect()),
    );
    m
}

fn full(mut m: HashMap<String, Value>, document: &Document) -> Value {
    let (summary, summarized) = document.summary();
    m.insert("body".to_owned(), Value::from(document.body.as_str()));
    m.insert("summary".to_owned(), Value::from(summary));
    m.insert("summarized".to_owned(), Value::Bool(summarized));
    m.insert(
        "meta".to_owned(),
        Value::Object(
            document
                .meta
                .iter()
                .map(|(k, v)| (k.clone(), from_yaml(v)))
                .collect(),
        ),
    );
    Value::Object(m)
}

/// A post in the listing shape.
pub fn post_listing(post: &Document, urls: &Urls) -> Value {
    Value::Object(listing_fields(post, urls.post(&post.path), urls))
}

/// A post in the full shape.
pub fn post(post: &Document, urls: &Urls) -> Value {
    full(listing_fields(post, urls.post(&post.path), urls), post)
}

/// A page in the listing shape.
pub fn page_listing(page: &Document, urls: &Urls) -> Value {
    Value::Object(listing_fields(page, urls.page(&page.path), urls))
}

/// A page in the full shape.
pub fn page(page: &Document, urls: &Urls) -> Value {
    full(listing_fields(page, urls.page(&page.path), urls), page)
}
