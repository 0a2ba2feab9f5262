//! The development server. Serves the routes live with `tiny_http`, one
//! request at a time. In debug mode every view request (anything but a
//! static file) reloads the content through the parse cache and re-reads the
//! templates; `blog.yaml` is re-read whenever its modification time changes.

use crate::config::{self, Config, CONFIG_FILE};
use crate::routes::{resolve, Renderer, Resolved, Route};
use crate::site::{Content, Site};
use crate::theme::{self, Theme};
use crate::url::{decode_path, encode_path, Urls};
use crate::util::modified;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tiny_http::{Header, Request, Response, StatusCode};

/// A response, before it's handed to `tiny_http`.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,

    /// The redirect target of a 301.
    pub location: Option<String>,
}

impl Reply {
    fn text(status: u16, body: &str) -> Reply {
        Reply {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
            location: None,
        }
    }

    fn not_found() -> Reply {
        Reply::text(404, "404 Not Found")
    }

    fn server_error() -> Reply {
        Reply::text(500, "500 Internal Server Error")
    }

    fn redirect(location: String) -> Reply {
        Reply {
            location: Some(location),
            ..Reply::text(301, "301 Moved Permanently")
        }
    }
}

/// The state of a running development server.
pub struct Server {
    root: PathBuf,
    config: Config,
    config_modified: Option<SystemTime>,
    urls: Urls,
    content: Content,
    site: Site,
    theme: Theme,
}

impl Server {
    /// Loads the configuration, content and templates of the blog in `root`.
    pub fn new(root: &Path) -> Result<Server> {
        let config_modified = modified(&root.join(CONFIG_FILE)).ok();
        let config = Config::load(root, false)?;
        let urls = Urls::root();
        let mut content = Content::new(&config, &urls);
        let site = content.load();
        let theme = Theme::load(&config.template_root)?;
        Ok(Server {
            root: root.to_owned(),
            config,
            config_modified,
            urls,
            content,
            site,
            theme,
        })
    }

    /// Binds `WWW_HOST:WWW_PORT` and serves requests until the process is
    /// stopped.
    pub fn run(mut self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let server = tiny_http::Server::http(addr.as_str()).map_err(|e| Error::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
        log::info!("serving on http://{}/", addr);

        for request in server.incoming_requests() {
            let reply = self.handle(request.url());
            log::info!("{} {} {}", request.method(), request.url(), reply.status);
            if let Err(e) = respond(request, reply) {
                log::warn!("writing response: {}", e);
            }
        }
        Ok(())
    }

    /// Handles a request for the raw (percent-encoded) request URL `url`.
    pub fn handle(&mut self, url: &str) -> Reply {
        self.reload_config_if_changed();

        let path = url.split(|c| c == '?' || c == '#').next().unwrap_or("");
        let route_path = match self.urls.strip_prefix(path) {
            Some(route_path) => decode_path(route_path),
            None => return Reply::not_found(),
        };

        let route = match resolve(&route_path) {
            Resolved::Route(route) => route,
            Resolved::Redirect(canonical) => {
                return Reply::redirect(format!(
                    "{}{}",
                    self.urls.prefix(),
                    encode_path(&canonical)
                ))
            }
            Resolved::NotFound => return Reply::not_found(),
        };

        if self.config.debug && !matches!(route, Route::Static(_)) {
            if let Err(e) = self.reload() {
                log::error!("{}", e);
                return Reply::server_error();
            }
        }

        let renderer = Renderer::new(&self.config, &self.site, &self.theme, &self.urls);
        match renderer.render(&route) {
            Ok(Some(rendered)) => Reply {
                status: 200,
                content_type: rendered.content_type,
                body: rendered.body,
                location: None,
            },
            Ok(None) => Reply::not_found(),
            Err(e) => {
                log::error!("rendering {}: {}", path, e);
                Reply::server_error()
            }
        }
    }

    /// Re-reads the content (through the cache) and the templates.
    fn reload(&mut self) -> std::result::Result<(), theme::Error> {
        self.site = self.content.load();
        self.theme = Theme::load(&self.config.template_root)?;
        Ok(())
    }

    fn reload_config_if_changed(&mut self) {
        let current = modified(&self.root.join(CONFIG_FILE)).ok();
        if current == self.config_modified {
            return;
        }
        self.config_modified = current;

        match Config::load(&self.root, false) {
            Ok(config) if config == self.config => {}
            Ok(config) => {
                log::info!("{} changed, reloading", CONFIG_FILE);
                if config.host != self.config.host || config.port != self.config.port {
                    log::warn!("WWW_HOST and WWW_PORT changes take effect on restart");
                }
                self.content = Content::new(&config, &self.urls);
                self.site = self.content.load();
                match Theme::load(&config.template_root) {
                    Ok(theme) => self.theme = theme,
                    Err(e) => log::warn!("keeping the previous templates: {}", e),
                }
                self.config = config;
            }
            Err(e) => log::warn!("keeping the previous configuration: {}", e),
        }
    }
}

fn respond(request: Request, reply: Reply) -> std::io::Result<()> {
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
        response = response.with_header(header);
    }
    if let Some(location) = reply.location {
        if let Ok(header) = Header::from_bytes("Location", location.as_bytes()) {
            response = response.with_header(header);
        }
    }
    request.respond(response)
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem starting the development server.
#[derive(Debug, Error)]
pub enum Error {
    #[error("loading configuration: {0}")]
    Config(#[from] config::Error),

    #[error("loading templates: {0}")]
    Theme(#[from] theme::Error),

    #[error("binding {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn blog() -> std::io::Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        fs::write(root.join(CONFIG_FILE), "DEBUG: true\nPOSTS_PER_PAGE: 1\n")?;
        fs::create_dir_all(root.join("templates"))?;
        for name in theme::TEMPLATES {
            fs::write(root.join("templates").join(name), format!("{}", name))?;
        }
        fs::write(
            root.join("templates").join("post.html"),
            "{{.post.title}}|{{.post.body}}",
        )?;
        fs::create_dir_all(root.join("post"))?;
        fs::write(root.join("post").join("hello.markdown"), "title: Hello\ndate: 2014-01-11\n\nHi")?;
        fs::create_dir_all(root.join("static"))?;
        fs::write(root.join("static").join("style.css"), "body {}")?;
        Ok(dir)
    }

    #[test]
    fn test_routes() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = blog()?;
        let mut server = Server::new(dir.path())?;

        let reply = server.handle("/post/hello/");
        assert_eq!(200, reply.status);
        assert_eq!("Hello|<p>Hi</p>\n", String::from_utf8(reply.body)?);

        let reply = server.handle("/post/hello?x=1");
        assert_eq!(301, reply.status);
        assert_eq!(Some("/post/hello/"), reply.location.as_deref());

        assert_eq!(Some("/"), server.handle("/1/").location.as_deref());
        assert_eq!(404, server.handle("/post/missing/").status);
        assert_eq!(404, server.handle("/2/").status);
        assert_eq!(404, server.handle("/nowhere").status);

        let reply = server.handle("/static/style.css");
        assert_eq!(200, reply.status);
        assert_eq!("text/css; charset=utf-8", reply.content_type);
        Ok(())
    }

    #[test]
    fn test_debug_mode_picks_up_new_posts() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = blog()?;
        let mut server = Server::new(dir.path())?;
        assert_eq!(404, server.handle("/post/second/").status);

        fs::write(
            dir.path().join("post").join("second.markdown"),
            "title: Second\ndate: 2014-01-12\n\nMore",
        )?;
        assert_eq!(200, server.handle("/post/second/").status);
        assert_eq!(200, server.handle("/2/").status);
        Ok(())
    }

    #[test]
    fn test_render_error_is_500() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = blog()?;
        let mut server = Server::new(dir.path())?;
        fs::write(dir.path().join("templates").join("post.html"), "{{.post.title")?;
        assert_eq!(500, server.handle("/post/hello/").status);
        Ok(())
    }

    #[test]
    fn test_debug_mode_rereads_edited_post() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = blog()?;
        let mut server = Server::new(dir.path())?;
        assert_eq!("Hello|<p>Hi</p>\n", String::from_utf8(server.handle("/post/hello/").body)?);

        let path = dir.path().join("post").join("hello.markdown");
        let before = modified(&path)?;
        fs::write(&path, "title: Hello again\ndate: 2014-01-11\n\nBye")?;
        fs::File::options()
            .write(true)
            .open(&path)?
            .set_modified(before + std::time::Duration::from_secs(10))?;

        assert_eq!(
            "Hello again|<p>Bye</p>\n",
            String::from_utf8(server.handle("/post/hello/").body)?
        );
        Ok(())
    }

    #[test]
    fn test_encoded_paths() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = blog()?;
        fs::write(
            dir.path().join("post").join("c#sharp.markdown"),
            "title: Sharp\ndate: 2014-01-12\n\nSee [hello](hello.markdown).",
        )?;
        let mut server = Server::new(dir.path())?;

        let reply = server.handle("/post/c%23sharp/");
        assert_eq!(200, reply.status);
        assert!(String::from_utf8(reply.body)?.starts_with("Sharp|"));

        let reply = server.handle("/post/c%23sharp");
        assert_eq!(301, reply.status);
        assert_eq!(Some("/post/c%23sharp/"), reply.location.as_deref());
        Ok(())
    }
}
