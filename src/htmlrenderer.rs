//! HTML output for Markdown events. It differs from
//! [`pulldown_cmark::html::push_html`] in two places:
//!
//! * Footnote references link to `{prefix}#{name}`. A post summary shown on an
//!   index page carries the reference, but the definition only exists at the
//!   bottom of the post page, so the link has to name that page.
//! * Code blocks are wrapped as `<div class="codehilite"><pre><code
//!   class="language-x">` for highlighter stylesheets.

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, LinkType, Tag};
use std::io;

const CODE_BLOCK: &str = r#"<div class="codehilite"><pre><code"#;

/// Where the renderer is within the current table.
#[derive(Default)]
struct Table {
    alignments: Vec<Alignment>,
    in_body: bool,
    column: usize,
}

impl Table {
    fn cell(&self) -> &'static str {
        match self.in_body {
            true => "td",
            false => "th",
        }
    }

    fn align(&self) -> &'static str {
        match self.alignments.get(self.column) {
            Some(Alignment::Left) => r#" align="left""#,
            Some(Alignment::Center) => r#" align="center""#,
            Some(Alignment::Right) => r#" align="right""#,
            _ => "",
        }
    }
}

pub struct HtmlRenderer {
    footnote_prefix: String,
    table: Table,

    /// Titles of the images whose alt text is being written, innermost last.
    /// While any are open only text is written.
    image_titles: Vec<String>,
}

impl HtmlRenderer {
    pub fn with_footnote_prefix(footnote_prefix: &str) -> HtmlRenderer {
        HtmlRenderer {
            footnote_prefix: footnote_prefix.to_owned(),
            table: Table::default(),
            image_titles: Vec::new(),
        }
    }

    pub fn on_event<W: StrWrite>(&mut self, w: &mut W, event: Event) -> io::Result<()> {
        if !self.image_titles.is_empty() {
            return self.alt_text(w, event);
        }
        match event {
            Event::Start(tag) => self.start(w, tag),
            Event::End(tag) => self.end(w, tag),
            Event::Text(text) => escape_html(w, &text),
            Event::Code(code) => {
                w.write_str("<code>")?;
                escape_html(&mut *w, &code)?;
                w.write_str("</code>")
            }
            Event::Html(html) => w.write_str(&html),
            Event::FootnoteReference(name) => {
                w.write_str(r#"<sup class="footnote-reference"><a href=""#)?;
                escape_html(&mut *w, &self.footnote_prefix)?;
                w.write_str("#")?;
                escape_html(&mut *w, &name)?;
                w.write_str(r#"">"#)?;
                escape_html(&mut *w, &name)?;
                w.write_str("</a></sup>")
            }
            Event::SoftBreak => w.write_str("\n"),
            Event::HardBreak => w.write_str("<br />\n"),
            Event::Rule => w.write_str("<hr />\n"),
            Event::TaskListMarker(true) => {
                w.write_str(r#"<input disabled="" type="checkbox" checked="" />"#)
            }
            Event::TaskListMarker(false) => w.write_str(r#"<input disabled="" type="checkbox" />"#),
        }
    }

    fn alt_text<W: StrWrite>(&mut self, w: &mut W, event: Event) -> io::Result<()> {
        match event {
            Event::Start(Tag::Image(_, _, title)) => {
                self.image_titles.push(title.into_string());
                Ok(())
            }
            Event::End(Tag::Image(..)) => match self.image_titles.pop() {
                Some(title) if self.image_titles.is_empty() => {
                    w.write_str(r#"" title=""#)?;
                    escape_html(&mut *w, &title)?;
                    w.write_str(r#"" />"#)
                }
                _ => Ok(()),
            },
            Event::Text(text) | Event::Code(text) => escape_html(w, &text),
            Event::SoftBreak | Event::HardBreak => w.write_str(" "),
            _ => Ok(()),
        }
    }

    fn start<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Heading(level) => write!(w, "<h{}>", level),
            Tag::BlockQuote => w.write_str("<blockquote>\n"),
            Tag::CodeBlock(kind) => {
                w.write_str(CODE_BLOCK)?;
                if let Some(lang) = language(&kind) {
                    w.write_str(r#" class="language-"#)?;
                    escape_html(&mut *w, lang)?;
                    w.write_str(r#"""#)?;
                }
                w.write_str(">")
            }
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => write!(w, "<ol start=\"{}\">\n", start),
            Tag::Item => w.write_str("<li>"),
            Tag::FootnoteDefinition(name) => {
                w.write_str(r#"<div class="footnote-definition" id=""#)?;
                escape_html(&mut *w, &name)?;
                w.write_str(r#""><sup class="footnote-definition-label">"#)?;
                escape_html(&mut *w, &name)?;
                w.write_str("</sup>")
            }
            Tag::Table(alignments) => {
                self.table = Table {
                    alignments,
                    ..Table::default()
                };
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table.in_body = false;
                self.table.column = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table.column = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(w, "<{}{}>", self.table.cell(), self.table.align()),
            Tag::Emphasis => w.write_str("<em>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Link(kind, dest, title) => {
                w.write_str(r#"<a href=""#)?;
                if let LinkType::Email = kind {
                    w.write_str("mailto:")?;
                }
                escape_href(&mut *w, &dest)?;
                w.write_str(r#"" title=""#)?;
                escape_html(&mut *w, &title)?;
                w.write_str(r#"">"#)
            }
            Tag::Image(_, dest, title) => {
                self.image_titles.push(title.into_string());
                w.write_str(r#"<img src=""#)?;
                escape_href(&mut *w, &dest)?;
                w.write_str(r#"" alt=""#)
            }
        }
    }

    fn end<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::Paragraph => w.write_str("</p>\n"),
            Tag::Heading(level) => write!(w, "</h{}>\n", level),
            Tag::BlockQuote => w.write_str("</blockquote>\n"),
            Tag::CodeBlock(_) => w.write_str("</code></pre></div>\n"),
            Tag::List(None) => w.write_str("</ul>\n"),
            Tag::List(Some(_)) => w.write_str("</ol>\n"),
            Tag::Item => w.write_str("</li>\n"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>\n"),
            Tag::Table(_) => w.write_str("</tbody></table>\n"),
            Tag::TableHead => {
                self.table.in_body = true;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                let cell = self.table.cell();
                self.table.column += 1;
                write!(w, "</{}>", cell)
            }
            Tag::Emphasis => w.write_str("</em>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Link(..) => w.write_str("</a>"),
            // closed by the alt text
            Tag::Image(..) => Ok(()),
        }
    }
}

/// The first word of a fenced block's info string.
fn language<'a>(kind: &'a CodeBlockKind) -> Option<&'a str> {
    match kind {
        CodeBlockKind::Fenced(info) => info.split_whitespace().next(),
        CodeBlockKind::Indented => None,
    }
}
