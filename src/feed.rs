//! Support for creating Atom feeds from a list of posts.

use crate::post::Document;
use crate::url::Urls;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::io::Write;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use thiserror::Error;

/// Bundled configuration for creating a feed. URLs are absolute.
pub struct FeedConfig {
    pub title: String,
    pub author: Option<String>,

    /// The site's home page. Also used as the feed's ID.
    pub home_page: String,

    /// The URL the feed itself is served from.
    pub feed_url: String,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// published posts (newest first) and writes the result to a
/// [`std::io::Write`]. `absolute` turns root-absolute URLs built by `urls`
/// into absolute ones.
pub fn write_feed<W: Write, F: Fn(&str) -> String>(
    config: &FeedConfig,
    posts: &[Arc<Document>],
    urls: &Urls,
    absolute: F,
    w: W,
) -> Result<W> {
    Ok(feed(config, posts, urls, absolute).write_to(w)?)
}

fn feed<F: Fn(&str) -> String>(
    config: &FeedConfig,
    posts: &[Arc<Document>],
    urls: &Urls,
    absolute: F,
) -> Feed {
    // Derived from the content rather than the clock so that re-freezing an
    // unchanged site writes the same bytes.
    let updated = posts
        .iter()
        .filter_map(|post| post.date)
        .max()
        .map(to_fixed)
        .unwrap_or_else(|| DateTime::<Utc>::from(UNIX_EPOCH).into());

    let mut feed = Feed::default();
    feed.set_title(config.title.as_str());
    feed.set_id(config.home_page.as_str());
    feed.set_updated(updated);
    feed.set_authors(author_to_people(&config.author));
    feed.set_links(vec![
        link(&config.home_page, "alternate"),
        link(&config.feed_url, "self"),
    ]);
    feed.set_entries(
        posts
            .iter()
            .filter_map(|post| post.date.map(|date| (post, to_fixed(date))))
            .map(|(post, date)| {
                let url = absolute(&urls.post(&post.path));
                let (summary, _) = post.summary();

                let mut entry = Entry::default();
                entry.set_id(url.as_str());
                entry.set_title(post.title.as_str());
                entry.set_updated(date);
                entry.set_published(Some(date));
                entry.set_authors(author_to_people(&config.author));
                entry.set_links(vec![link(&url, "alternate")]);
                entry.set_summary(Some(Text::html(summary)));
                entry.set_categories(
                    post.tags
                        .iter()
                        .map(|tag| {
                            let mut category = Category::default();
                            category.set_term(tag.name.as_str());
                            category
                        })
                        .collect::<Vec<Category>>(),
                );
                entry
            })
            .collect::<Vec<Entry>>(),
    );
    feed
}

fn to_fixed(date: NaiveDateTime) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&date).into()
}

fn link(href: &str, rel: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link
}

fn author_to_people(author: &Option<String>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.as_str());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing a feed.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    #[error("writing atom feed: {0}")]
    Atom(#[from] AtomError),
}
