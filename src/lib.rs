//! The library code for the `frozen-blog` static blog. A blog is a directory
//! holding `blog.yaml`, a `post/` directory of Markdown posts, a `page/`
//! directory of HTML pages, `templates/` and `static/`. The architecture can
//! be broken down into three steps:
//!
//! 1. Loading pages and posts from source files on disk ([`crate::parser`],
//!    [`crate::post`], [`crate::site`]), memoized by [`crate::cache`]
//! 2. Rendering routes through the templates ([`crate::routes`],
//!    [`crate::theme`])
//! 3. Either serving the routes live ([`crate::serve`]) or freezing them to
//!    static files ([`crate::freeze`])

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod cache;
pub mod config;
pub mod feed;
pub mod freeze;
pub mod funcs;
mod htmlrenderer;
pub mod markdown;
pub mod metafile;
pub mod pagination;
pub mod parser;
pub mod post;
pub mod routes;
pub mod serve;
pub mod site;
pub mod tag;
pub mod theme;
pub mod url;
pub mod util;
pub mod value;
