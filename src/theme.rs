//! Loads the page templates. Every template directory holds one file per
//! route (`index.html`, `archive.html`, `page.html`, `post.html`,
//! `tag.html`) plus any number of `_*.html` partials. The partials are
//! concatenated (sorted by name) in front of each route template so they can
//! hold shared `{{define}}` blocks. Template files are decoded like source
//! files, so CRLF templates still render pages with `\n` newlines.

use crate::funcs::FUNCS;
use crate::metafile;
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The route templates every theme must provide.
pub const TEMPLATES: &[&str] = &[
    "index.html",
    "archive.html",
    "page.html",
    "post.html",
    "tag.html",
];

pub struct Theme {
    partials: String,
    templates: HashMap<&'static str, Template>,
}

impl Theme {
    /// Reads and parses every template in `dir`.
    pub fn load(dir: &Path) -> Result<Theme> {
        let partials = load_partials(dir)?;
        let mut templates = HashMap::new();
        for name in TEMPLATES {
            let source = read(&dir.join(name))?;
            templates.insert(*name, parse(name, &partials, &source)?);
        }
        Ok(Theme {
            partials,
            templates,
        })
    }

    /// Executes the route template `name` against `context`.
    pub fn render(&self, name: &str, context: Value) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::Unknown(name.to_owned()))?;
        execute(name, template, context)
    }

    /// Parses `source` as a template (with the partials available) and
    /// executes it against `context`. Used for documents that opt into
    /// templating their own body.
    pub fn render_source(&self, name: &str, source: &str, context: Value) -> Result<String> {
        let template = parse(name, &self.partials, source)?;
        execute(name, &template, context)
    }
}

fn load_partials(dir: &Path) -> Result<String> {
    let open_err = |err: io::Error| Error::Open {
        path: dir.to_owned(),
        err,
    };
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(open_err)? {
        let path = entry.map_err(open_err)?.path();
        let is_partial = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('_') && name.ends_with(".html"))
            .unwrap_or(false);
        if is_partial && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut partials = String::new();
    for path in paths {
        partials.push_str(&read(&path)?);
        partials.push('\n');
    }
    Ok(partials)
}

fn read(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    metafile::decode(&bytes).map_err(|err| Error::Encoding {
        path: path.to_owned(),
        err,
    })
}

/// Parses `source` after the partials. The functions have to be registered
/// first, the parser rejects calls to unknown functions.
fn parse(name: &str, partials: &str, source: &str) -> Result<Template> {
    let mut template = Template::default();
    template.add_funcs(FUNCS);
    let contents = format!("{}{}", partials, source);
    template.parse(&contents).map_err(|err| Error::Parse {
        name: name.to_owned(),
        err: err.to_string(),
    })?;
    Ok(template)
}

fn execute(name: &str, template: &Template, context: Value) -> Result<String> {
    let execute_err = |err: String| Error::Execute {
        name: name.to_owned(),
        err,
    };
    let context = Context::from(context).map_err(|e| execute_err(e.to_string()))?;
    let mut output: Vec<u8> = Vec::new();
    template
        .execute(&mut output, &context)
        .map_err(|e| execute_err(e.to_string()))?;
    String::from_utf8(output).map_err(|e| execute_err(e.to_string()))
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or executing a template.
#[derive(Debug, Error)]
pub enum Error {
    #[error("opening template `{}`: {err}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("template `{}` is not valid UTF-8: {err}", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        err: std::str::Utf8Error,
    },

    #[error("parsing template `{name}`: {err}")]
    Parse { name: String, err: String },

    #[error("executing template `{name}`: {err}")]
    Execute { name: String, err: String },

    #[error("no template named `{0}`")]
    Unknown(String),
}
