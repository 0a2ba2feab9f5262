use crate::htmlrenderer::HtmlRenderer;
use crate::url::Converter as LinkConverter;
use pulldown_cmark::*;
use std::io;
use thiserror::Error;

/// Converts markdown to HTML, writing the result into [`w`].
///
/// * [`markdown`] is the body of the source file.
/// * [`footnote_prefix`] is the prefix to prepend onto footnote links, the
///   post's own URL, so footnote references in summaries shown on other pages
///   still lead to the post.
/// * [`link_converter`] rewrites links between post source files.
pub fn to_html<W: escape::StrWrite>(
    w: &mut W,
    markdown: &str,
    footnote_prefix: &str,
    link_converter: &LinkConverter,
) -> Result<(), Error> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter { link_converter };
    let mut html_renderer = HtmlRenderer::with_footnote_prefix(footnote_prefix);
    for ev in Parser::new_ext(markdown, options).map(|ev| event_converter.convert(ev)) {
        html_renderer.on_event(w, ev)?;
    }
    Ok(())
}

struct EventConverter<'a, 'b> {
    link_converter: &'a LinkConverter<'b>,
}

impl EventConverter<'_, '_> {
    fn convert_tag<'e>(&self, tag: Tag<'e>) -> Tag<'e> {
        match tag {
            // Links between posts are written against the source files
            // (`older.markdown`) and need to point at the rendered post.
            Tag::Link(
                link @ (LinkType::Inline
                | LinkType::Reference
                | LinkType::ReferenceUnknown
                | LinkType::Shortcut
                | LinkType::ShortcutUnknown
                | LinkType::Collapsed
                | LinkType::CollapsedUnknown),
                url,
                title,
            ) => Tag::Link(
                link,
                CowStr::Boxed(self.link_converter.convert(&url).into_boxed_str()),
                title,
            ),
            _ => tag,
        }
    }

    fn convert<'e>(&self, ev: Event<'e>) -> Event<'e> {
        match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)),
            _ => ev,
        }
    }
}

/// Represents an error converting markdown to HTML.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the output can't be written.
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::Urls;

    fn render(markdown: &str) -> String {
        let urls = Urls::root();
        let extensions = vec![String::from(".markdown")];
        let converter = LinkConverter::new(&urls, "2014/hello.markdown", &extensions);
        let mut html = String::new();
        to_html(&mut html, markdown, "/post/2014/hello/", &converter).unwrap();
        html
    }

    #[test]
    fn test_links_between_posts_are_converted() {
        assert_eq!(
            "<p><a href=\"/post/2014/other/\" title=\"\">other</a> \
             <a href=\"photo.jpg\" title=\"\">photo</a></p>\n",
            render("[other](other.markdown) [photo](photo.jpg)")
        );
    }

    #[test]
    fn test_footnotes_link_to_post() {
        let html = render("Claim.[^1]\n\n[^1]: Source.\n");
        assert!(html.contains(r##"<a href="/post/2014/hello/#1">1</a>"##), "{}", html);
        assert!(html.contains(r#"<div class="footnote-definition" id="1">"#), "{}", html);
    }

    #[test]
    fn test_fenced_code_gets_highlighter_classes() {
        assert_eq!(
            "<div class=\"codehilite\"><pre><code class=\"language-rust\">fn main() {}\n</code></pre></div>\n",
            render("```rust\nfn main() {}\n```\n")
        );
    }

    #[test]
    fn test_image_alt_text() {
        assert_eq!(
            "<p><img src=\"cat.png\" alt=\"a cat\" title=\"Tom\" /></p>\n",
            render("![a *cat*](cat.png \"Tom\")")
        );
    }
}
