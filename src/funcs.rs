//! Functions available to every template, registered on each
//! [`gtmpl::Template`] before it's parsed.
//!
//! gtmpl functions are plain function pointers, so the URL helpers can't
//! close over the site prefix. They take the context's `urls` object as
//! their first argument instead:
//!
//! ```text
//! {{url_post_by_path .urls "2014/hello"}}
//! {{url_tag .urls "C++"}}
//! {{range (paginate .posts 2 10).items}}...{{end}}
//! ```

use crate::pagination::Pagination;
use crate::url::Urls;
use crate::value::object;
use gtmpl::{Func, Value};

pub const FUNCS: &[(&str, Func)] = &[
    ("url_index", url_index),
    ("url_archive", url_archive),
    ("url_page", url_page),
    ("url_page_by_path", url_page_by_path),
    ("url_post", url_post),
    ("url_post_by_path", url_post_by_path),
    ("url_tag", url_tag),
    ("url_static", url_static),
    ("paginate", paginate),
];

/// `url_index URLS [PAGE]`: the URL of an index page, page 1 by default.
fn url_index(args: &[Value]) -> Result<Value, String> {
    let (urls, rest) = urls("url_index", args)?;
    let page = match rest {
        [] => 1,
        [page] => number("url_index", page)?,
        _ => return Err(String::from("url_index takes URLS and an optional page")),
    };
    Ok(Value::String(urls.index(page)))
}

/// `url_archive URLS`
fn url_archive(args: &[Value]) -> Result<Value, String> {
    let (urls, rest) = urls("url_archive", args)?;
    no_more("url_archive", rest)?;
    Ok(Value::String(urls.archive()))
}

/// `url_page URLS PAGE`: the URL of a page value (anything with a `path`).
fn url_page(args: &[Value]) -> Result<Value, String> {
    let (urls, path) = urls_and("url_page", args, document_path)?;
    Ok(Value::String(urls.page(&path)))
}

/// `url_page_by_path URLS PATH`
fn url_page_by_path(args: &[Value]) -> Result<Value, String> {
    let (urls, path) = urls_and("url_page_by_path", args, string)?;
    Ok(Value::String(urls.page(&path)))
}

/// `url_post URLS POST`
fn url_post(args: &[Value]) -> Result<Value, String> {
    let (urls, path) = urls_and("url_post", args, document_path)?;
    Ok(Value::String(urls.post(&path)))
}

/// `url_post_by_path URLS PATH`
fn url_post_by_path(args: &[Value]) -> Result<Value, String> {
    let (urls, path) = urls_and("url_post_by_path", args, string)?;
    Ok(Value::String(urls.post(&path)))
}

/// `url_tag URLS TAG`: `TAG` is a tag name or a tag value.
fn url_tag(args: &[Value]) -> Result<Value, String> {
    let (urls, name) = urls_and("url_tag", args, |name, value| match value {
        Value::Object(m) => m
            .get("name")
            .map(|name_value| string("url_tag", name_value))
            .unwrap_or_else(|| Err(String::from("url_tag: tag has no `name`"))),
        other => string(name, other),
    })?;
    Ok(Value::String(urls.tag(&name)))
}

/// `url_static URLS FILE`
fn url_static(args: &[Value]) -> Result<Value, String> {
    let (urls, file) = urls_and("url_static", args, string)?;
    Ok(Value::String(urls.static_file(&file)))
}

/// `paginate LIST PAGE PER_PAGE`: page `PAGE` of `LIST` as an object with
/// `page`, `per_page`, `total_pages`, `has_prev`, `has_next` and `items`.
fn paginate(args: &[Value]) -> Result<Value, String> {
    let (items, page, per_page) = match args {
        [Value::Array(items), page, per_page] => {
            (items, number("paginate", page)?, number("paginate", per_page)?)
        }
        _ => return Err(String::from("paginate takes a list, a page and a page size")),
    };
    if per_page == 0 {
        return Err(String::from("paginate: page size must be at least 1"));
    }
    let pagination = Pagination::new(items, page, per_page);
    Ok(object(vec![
        ("page", Value::from(page as u64)),
        ("per_page", Value::from(per_page as u64)),
        ("total_pages", Value::from(pagination.total_pages() as u64)),
        ("has_prev", Value::Bool(pagination.has_prev())),
        ("has_next", Value::Bool(pagination.has_next())),
        ("items", Value::Array(pagination.items().to_vec())),
    ]))
}

/// Rebuilds [`Urls`] from the context's `urls` object, which carries the
/// site prefix.
fn urls<'a>(name: &str, args: &'a [Value]) -> Result<(Urls, &'a [Value]), String> {
    match args {
        [Value::Object(m), rest @ ..] => match m.get("prefix") {
            Some(Value::String(prefix)) => Ok((Urls::new(prefix), rest)),
            _ => Err(format!("{}: first argument must be .urls", name)),
        },
        _ => Err(format!("{}: first argument must be .urls", name)),
    }
}

fn urls_and<T>(
    name: &str,
    args: &[Value],
    arg: impl Fn(&str, &Value) -> Result<T, String>,
) -> Result<(Urls, T), String> {
    let (urls, rest) = urls(name, args)?;
    match rest {
        [value] => Ok((urls, arg(name, value)?)),
        _ => Err(format!("{} takes .urls and one argument", name)),
    }
}

fn no_more(name: &str, rest: &[Value]) -> Result<(), String> {
    match rest.is_empty() {
        true => Ok(()),
        false => Err(format!("{} takes only .urls", name)),
    }
}

fn string(name: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("{}: expected a string, found {}", name, other)),
    }
}

fn number(name: &str, value: &Value) -> Result<usize, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| format!("{}: expected a non-negative integer, found {}", name, n)),
        other => Err(format!("{}: expected a number, found {}", name, other)),
    }
}

fn document_path(name: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::Object(m) => match m.get("path") {
            Some(path) => string(name, path),
            None => Err(format!("{}: document has no `path`", name)),
        },
        other => Err(format!("{}: expected a page or post, found {}", name, other)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn blog_urls() -> Value {
        object(vec![("prefix", Value::from("/blog/"))])
    }

    #[test]
    fn test_url_helpers() {
        let urls = blog_urls();
        let post = object(vec![("path", Value::from("2014/c#sharp"))]);
        let tag = object(vec![("name", Value::from("C++"))]);
        let cases: &[(Func, Vec<Value>, &str)] = &[
            (url_index, vec![urls.clone()], "/blog/"),
            (url_index, vec![urls.clone(), Value::from(3u64)], "/blog/3/"),
            (url_archive, vec![urls.clone()], "/blog/archive/"),
            (url_page_by_path, vec![urls.clone(), Value::from("about")], "/blog/page/about/"),
            (url_post, vec![urls.clone(), post], "/blog/post/2014/c%23sharp/"),
            (url_post_by_path, vec![urls.clone(), Value::from("a")], "/blog/post/a/"),
            (url_tag, vec![urls.clone(), tag], "/blog/tag/C%2B%2B/"),
            (url_tag, vec![urls.clone(), Value::from("C")], "/blog/tag/C/"),
            (url_static, vec![urls.clone(), Value::from("css/a.css")], "/blog/static/css/a.css"),
        ];
        for (func, args, wanted) in cases {
            assert_eq!(Ok(Value::from(*wanted)), (*func)(args.as_slice()), "{:?}", args);
        }
    }

    #[test]
    fn test_url_helpers_need_urls() {
        assert!(url_archive(&[]).is_err());
        assert!(url_post_by_path(&[Value::from("a")]).is_err());
        assert!(url_page(&[blog_urls(), Value::from("not a page")]).is_err());
    }

    #[test]
    fn test_paginate() {
        let list = Value::Array((1..=5u64).map(Value::from).collect());
        let page = paginate(&[list.clone(), Value::from(3u64), Value::from(2u64)]);
        match page {
            Ok(Value::Object(m)) => {
                assert_eq!(Some(&Value::Array(vec![Value::from(5u64)])), m.get("items"));
                assert_eq!(Some(&Value::from(3u64)), m.get("total_pages"));
                assert_eq!(Some(&Value::Bool(true)), m.get("has_prev"));
                assert_eq!(Some(&Value::Bool(false)), m.get("has_next"));
            }
            other => panic!("expected an object, got {:?}", other),
        }
        assert!(paginate(&[list, Value::from(1u64), Value::from(0u64)]).is_err());
    }
}
