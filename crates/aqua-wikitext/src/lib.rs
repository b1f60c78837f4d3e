//! Wikitext scanner that collects the resources a page embeds.
//!
//! This is not a renderer. It lexes just enough markup to find
//! `[[File:...]]` embeds, `{{Template}}` transclusions and ordinary
//! `[[Links]]`, which is what the transclusion extractor needs when the host
//! does not hand over its own render output.

use aqua_model::{PageRef, NS_FILE, NS_TEMPLATE};
use logos::Logos;
use serde::{Deserialize, Serialize};

/// Resources referenced by a rendered page, each in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub files: Vec<PageRef>,
    pub templates: Vec<PageRef>,
    pub links: Vec<PageRef>,
}

/// Produces render output for a page.
pub trait Renderer {
    fn render(&self, page_text: &str, title: &PageRef) -> RenderOutput;
}

/// [`Renderer`] backed by [`scan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WikitextRenderer;

impl Renderer for WikitextRenderer {
    fn render(&self, page_text: &str, _title: &PageRef) -> RenderOutput {
        scan(page_text)
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    #[token("[[")]
    LinkOpen,

    #[token("]]")]
    LinkClose,

    #[token("{{")]
    TemplateOpen,

    #[token("}}")]
    TemplateClose,

    #[token("|")]
    Pipe,

    #[regex(r"[^\[\]{}|]+")]
    #[regex(r"[\[\]{}]")]
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Link,
    Template,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    opened_at: usize,
    target: String,
    /// Cleared at the first pipe; the rest is arguments or a label.
    in_target: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Template,
    Link,
}

/// Collect files, templates and links referenced by `source`.
///
/// Nested constructs are found wherever they appear, including inside
/// template arguments and link labels. Results keep document order by
/// opening position and may contain duplicates.
pub fn scan(source: &str) -> RenderOutput {
    let mut stack: Vec<Frame> = Vec::new();
    let mut found: Vec<(usize, Kind, PageRef)> = Vec::new();
    let visible = strip_ignored(source);
    let mut lexer = Markup::lexer(&visible);

    while let Some(token) = lexer.next() {
        let token = token.unwrap_or(Markup::Text);
        let span = lexer.span();
        match token {
            Markup::LinkOpen | Markup::TemplateOpen => {
                if let Some(parent) = stack.last_mut() {
                    // A nested construct in a target makes that target dynamic.
                    if parent.in_target {
                        parent.target.clear();
                        parent.in_target = false;
                    }
                }
                let kind = if token == Markup::LinkOpen {
                    FrameKind::Link
                } else {
                    FrameKind::Template
                };
                stack.push(Frame {
                    kind,
                    opened_at: span.start,
                    target: String::new(),
                    in_target: true,
                });
            }
            Markup::LinkClose | Markup::TemplateClose => {
                let expected = if token == Markup::LinkClose {
                    FrameKind::Link
                } else {
                    FrameKind::Template
                };
                if stack.last().map(|f| f.kind) != Some(expected) {
                    continue;
                }
                if let Some(frame) = stack.pop() {
                    if let Some((kind, page)) = classify(&frame) {
                        found.push((frame.opened_at, kind, page));
                    }
                }
            }
            Markup::Pipe => {
                if let Some(frame) = stack.last_mut() {
                    frame.in_target = false;
                }
            }
            Markup::Text => {
                if let Some(frame) = stack.last_mut() {
                    if frame.in_target {
                        frame.target.push_str(lexer.slice());
                    }
                }
            }
        }
    }

    found.sort_by_key(|(at, _, _)| *at);
    let mut output = RenderOutput::default();
    for (_, kind, page) in found {
        match kind {
            Kind::File => output.files.push(page),
            Kind::Template => output.templates.push(page),
            Kind::Link => output.links.push(page),
        }
    }
    output
}

fn classify(frame: &Frame) -> Option<(Kind, PageRef)> {
    let target = frame.target.split('#').next().unwrap_or_default().trim();
    if target.is_empty() {
        return None;
    }
    match frame.kind {
        FrameKind::Link => {
            // `[[:File:X]]` links to the file page instead of embedding it.
            let escaped = target.starts_with(':');
            let page = PageRef::parse(target).ok()?;
            if page.namespace == NS_FILE && !escaped {
                Some((Kind::File, page))
            } else {
                Some((Kind::Link, page))
            }
        }
        FrameKind::Template => {
            let name = target.strip_prefix("subst:").unwrap_or(target).trim();
            // Parser functions and magic words are not pages.
            if name.starts_with('#') || is_magic_word(name) {
                return None;
            }
            if let Some(main) = name.strip_prefix(':') {
                return Some((Kind::Template, PageRef::parse(main).ok()?));
            }
            let page = PageRef::parse(name).ok()?;
            if page.namespace == aqua_model::NS_MAIN {
                let page = PageRef::new(NS_TEMPLATE, &page.dbkey).ok()?;
                Some((Kind::Template, page))
            } else {
                Some((Kind::Template, page))
            }
        }
    }
}

const MAGIC_WORDS: &[&str] = &[
    "PAGENAME",
    "FULLPAGENAME",
    "BASEPAGENAME",
    "SUBPAGENAME",
    "NAMESPACE",
    "SITENAME",
    "DISPLAYTITLE",
    "DEFAULTSORT",
    "CURRENTYEAR",
    "CURRENTMONTH",
    "CURRENTDAY",
    "CURRENTTIMESTAMP",
    "REVISIONID",
    "NUMBEROFARTICLES",
];

fn is_magic_word(name: &str) -> bool {
    let head = name.split(':').next().unwrap_or_default().trim();
    MAGIC_WORDS.contains(&head)
}

/// Drop `<!-- comments -->` and `<nowiki>` sections; an unterminated one
/// runs to the end of the text.
fn strip_ignored(source: &str) -> String {
    let mut visible = String::with_capacity(source.len());
    let mut rest = source;
    loop {
        let comment = rest.find("<!--").map(|i| (i, "<!--", "-->"));
        let nowiki = rest.find("<nowiki>").map(|i| (i, "<nowiki>", "</nowiki>"));
        let next = match (comment, nowiki) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        };
        let Some((start, open, close)) = next else {
            visible.push_str(rest);
            return visible;
        };
        visible.push_str(&rest[..start]);
        let body = &rest[start + open.len()..];
        match body.find(close) {
            Some(end) => rest = &body[end + close.len()..],
            None => return visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(pages: &[PageRef]) -> Vec<String> {
        pages.iter().map(PageRef::prefixed_dbkey).collect()
    }

    #[test]
    fn finds_files_templates_and_links() {
        let out = scan(
            "Intro {{Infobox|name=[[Paris]]}} see [[File:Map.png|thumb]] and [[Lyon|the city]].",
        );
        assert_eq!(titles(&out.files), vec!["File:Map.png"]);
        assert_eq!(titles(&out.templates), vec!["Template:Infobox"]);
        assert_eq!(titles(&out.links), vec!["Paris", "Lyon"]);
    }

    #[test]
    fn escaped_file_link_is_a_link() {
        let out = scan("[[:File:Map.png]]");
        assert!(out.files.is_empty());
        assert_eq!(titles(&out.links), vec!["File:Map.png"]);
    }

    #[test]
    fn skips_parser_functions_and_magic_words() {
        let out = scan("{{#if: x | {{Yes}} }} {{PAGENAME}} {{DISPLAYTITLE:Foo}}");
        assert_eq!(titles(&out.templates), vec!["Template:Yes"]);
    }

    #[test]
    fn explicit_namespaces_and_main_transclusion() {
        let out = scan("{{Template:Nav box}} {{:Main Page}} {{subst:Welcome}}");
        assert_eq!(
            titles(&out.templates),
            vec!["Template:Nav_box", "Main_Page", "Template:Welcome"]
        );
    }

    #[test]
    fn keeps_document_order_and_duplicates() {
        let out = scan("[[B]] [[A]] [[B]]");
        assert_eq!(titles(&out.links), vec!["B", "A", "B"]);
    }

    #[test]
    fn ignores_comments_nowiki_and_fragments() {
        let out = scan("<!-- [[Hidden]] --> <nowiki>[[Raw]]</nowiki> [[Page#Section]]");
        assert_eq!(titles(&out.links), vec!["Page"]);
    }

    #[test]
    fn uppercase_templates_are_not_magic() {
        let out = scan("{{USA}}");
        assert_eq!(titles(&out.templates), vec!["Template:USA"]);
    }

    #[test]
    fn unterminated_comment_hides_the_rest() {
        let out = scan("[[Seen]] <!-- [[Unseen]]");
        assert_eq!(titles(&out.links), vec!["Seen"]);
    }

    #[test]
    fn unbalanced_markup_is_tolerated() {
        let out = scan("[[Open {{Tpl}} ]] }} [[");
        assert_eq!(titles(&out.templates), vec!["Template:Tpl"]);
        assert!(out.links.is_empty());
    }
}
