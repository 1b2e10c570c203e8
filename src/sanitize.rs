//! HTML to plain text conversion for fetched pages

use scraper::{ElementRef, Html, Node};

/// Elements whose content is never shown as text
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "frame", "frameset", "object", "embed",
    "template", "svg",
];

/// Elements that start a new line of text
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "tr", "td",
    "th", "table", "article", "section", "main", "header", "footer", "nav", "aside",
    "blockquote", "pre", "figcaption", "dt", "dd", "title", "hr", "form",
];

/// Strip every tag, attribute and embedded frame from `html`, keeping its text
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut buf = String::with_capacity(html.len() / 2);
    collect_text(&doc.root_element(), &mut buf);

    normalize_whitespace(&buf)
}

fn collect_text(node: &ElementRef<'_>, buf: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                if SKIP_TAGS.contains(&tag) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    buf.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, buf);
                }
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse whitespace runs inside lines and blank-line runs between them
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }

    lines.join("\n").trim().to_string()
}
