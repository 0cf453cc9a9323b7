//! The Netscape bookmark-file format: tolerant parsing and serialization.
//!
//! This is the de facto browser interchange format: folders are
//! `<DT><H3>title</H3>` followed by a nested `<DL>` block, links are
//! `<DT><A HREF="url">title</A>`, optionally trailed by a `<DD>`
//! description. Folders nest arbitrarily deep, and real-world exports are
//! frequently unbalanced, so the parser is written to degrade to partial
//! results rather than fail: anything it cannot classify is skipped.
//!
//! Two vendor attributes on `<H3>` are recognized: `PAGE="true"` (the
//! folder is a standalone page container) and `BOOKMARKS="true"` (the
//! folder represents a tab collection). The import mapper gives them
//! special treatment.

use crate::AppState;
use regex::{Regex, RegexBuilder};

/// A node of the parsed bookmark tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedNode {
    Folder(ParsedFolder),
    Bookmark(ParsedBookmark),
}

/// A folder node: a title and its children, plus the vendor markers.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFolder {
    pub title: String,
    pub children: Vec<ParsedNode>,
    pub is_page: bool,
    pub is_tab_book: bool,
}

/// A bookmark leaf. `add_date` is the Unix timestamp some browsers attach.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBookmark {
    pub url: String,
    pub title: String,
    pub add_date: Option<i64>,
}

/// Parses a Netscape bookmark document into a tree of nodes.
///
/// Never fails: markup the parser cannot make sense of yields an empty or
/// partial result instead of an error.
pub fn parse_netscape(html: &str) -> Vec<ParsedNode> {
    Parser::new().parse(html)
}

/// Compiled patterns for one parse run. All matching is case-insensitive;
/// `(?s)` lets titles span line breaks the way browser exports wrap them.
struct Parser {
    re_comment: Regex,
    re_outer_dl: Regex,
    re_dt: Regex,
    re_h3: Regex,
    re_a: Regex,
    re_dl_open: Regex,
    re_dl_close: Regex,
    re_dd: Regex,
    re_href: Regex,
    re_add_date: Regex,
    re_page_attr: Regex,
    re_tab_book_attr: Regex,
}

impl Parser {
    fn new() -> Self {
        let ci = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .expect("static pattern")
        };
        Self {
            re_comment: ci(r"<!--.*?-->"),
            re_outer_dl: ci(r"<DL[^>]*>(.*)</DL>"),
            re_dt: ci(r"<DT[^>]*>"),
            re_h3: ci(r"<H3([^>]*)>(.*?)</H3>"),
            re_a: ci(r"<A\s+([^>]*)>(.*?)</A>"),
            re_dl_open: ci(r"<DL[^>]*>"),
            re_dl_close: ci(r"</DL>"),
            re_dd: ci(r"<DD[^>]*>"),
            re_href: ci(r#"HREF\s*=\s*["']([^"']+)["']"#),
            re_add_date: ci(r#"ADD_DATE\s*=\s*["']?(\d+)["']?"#),
            re_page_attr: ci(r#"PAGE\s*=\s*["']true["']"#),
            re_tab_book_attr: ci(r#"BOOKMARKS\s*=\s*["']true["']"#),
        }
    }

    fn parse(&self, html: &str) -> Vec<ParsedNode> {
        let stripped = self.re_comment.replace_all(html, "");

        // The outer capture is greedy, so it spans from the first <DL> to
        // the last </DL> in the document.
        match self.re_outer_dl.captures(&stripped) {
            Some(caps) => self.parse_dl_content(caps.get(1).map_or("", |m| m.as_str())),
            None => Vec::new(),
        }
    }

    /// Parses the inside of one `<DL>` block.
    fn parse_dl_content(&self, content: &str) -> Vec<ParsedNode> {
        let mut items = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let Some(dt) = self.re_dt.find_at(content, pos) else {
                break;
            };
            pos = dt.end();

            // A <DT> introduces whichever structural tag comes next. If the
            // next structural tag is another <DT> (or nothing), this entry
            // carries neither a folder nor a link and is skipped.
            let h3_caps = self.re_h3.captures_at(content, pos);
            let a_caps = self.re_a.captures_at(content, pos);
            let next_dt_start = self.re_dt.find_at(content, pos).map(|m| m.start());

            match (h3_caps, a_caps) {
                (None, None) => continue,
                (Some(h3), a)
                    if a.as_ref().map_or(true, |a| span_start(&h3) < span_start(a)) =>
                {
                    if next_dt_start.is_some_and(|dt_next| dt_next < span_start(&h3)) {
                        continue; // bare <DT>, the <H3> belongs to a later entry
                    }
                    let attrs = h3.get(1).map_or("", |m| m.as_str());
                    let title = decode_html(h3.get(2).map_or("", |m| m.as_str()).trim());
                    let is_page = self.re_page_attr.is_match(attrs);
                    let is_tab_book = self.re_tab_book_attr.is_match(attrs);
                    pos = span_end(&h3);

                    let mut children = Vec::new();
                    if let Some((child_content, after)) = self.child_dl_span(content, pos) {
                        children = self.parse_dl_content(child_content);
                        pos = after;
                    }

                    items.push(ParsedNode::Folder(ParsedFolder {
                        title,
                        children,
                        is_page,
                        is_tab_book,
                    }));
                }
                (_, Some(a)) => {
                    if next_dt_start.is_some_and(|dt_next| dt_next < span_start(&a)) {
                        continue; // bare <DT>, the <A> belongs to a later entry
                    }
                    let attrs = a.get(1).map_or("", |m| m.as_str());
                    let title = decode_html(a.get(2).map_or("", |m| m.as_str()).trim());
                    pos = span_end(&a);

                    if let Some(href) = self.re_href.captures(attrs) {
                        let url = decode_html(&href[1]);
                        let add_date = self
                            .re_add_date
                            .captures(attrs)
                            .and_then(|c| c[1].parse::<i64>().ok());
                        items.push(ParsedNode::Bookmark(ParsedBookmark {
                            url,
                            title,
                            add_date,
                        }));
                    }

                    // A trailing <DD> description is consumed but discarded;
                    // the bookmark model has no per-link description here.
                    pos = self.skip_dd(content, pos);
                }
                _ => continue,
            }
        }

        items
    }

    /// Finds the `<DL>` block that holds a folder's children, starting at
    /// `pos` just past the folder's `</H3>`. Returns the block's inner
    /// content and the offset just past its matching `</DL>`.
    ///
    /// The match uses explicit depth counting: nested `<DL>` opens
    /// increment, `</DL>` closes decrement, and the block ends where depth
    /// returns to zero. A greedy or first-close match would truncate nested
    /// folders.
    fn child_dl_span<'a>(&self, content: &'a str, pos: usize) -> Option<(&'a str, usize)> {
        let open = self.re_dl_open.find_at(content, pos)?;

        // Only a <DL> that belongs to this entry counts; if another <DT> or
        // the enclosing close comes first, the folder has no child list.
        if let Some(dt) = self.re_dt.find_at(content, pos) {
            if dt.start() < open.start() {
                return None;
            }
        }
        if let Some(close) = self.re_dl_close.find_at(content, pos) {
            if close.start() < open.start() {
                return None;
            }
        }

        let inner_start = open.end();
        let mut depth = 1;
        let mut search = inner_start;

        while depth > 0 {
            let next_open = self.re_dl_open.find_at(content, search);
            let next_close = self.re_dl_close.find_at(content, search)?;

            match next_open {
                Some(o) if o.start() < next_close.start() => {
                    depth += 1;
                    search = o.end();
                }
                _ => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((&content[inner_start..next_close.start()], next_close.end()));
                    }
                    search = next_close.end();
                }
            }
        }
        None
    }

    /// Consumes a `<DD>` that directly trails a bookmark, advancing to the
    /// next `<DT>` or `</DL>` (the description text is dropped).
    fn skip_dd(&self, content: &str, pos: usize) -> usize {
        let Some(dd) = self.re_dd.find_at(content, pos) else {
            return pos;
        };
        let next_dt = self.re_dt.find_at(content, pos).map(|m| m.start());
        let next_close = self.re_dl_close.find_at(content, pos).map(|m| m.start());
        for boundary in [next_dt, next_close].into_iter().flatten() {
            if boundary < dd.start() {
                return pos; // the <DD> belongs to something later
            }
        }
        let end_of_text = [next_dt, next_close]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(content.len());
        end_of_text.max(dd.end())
    }
}

/// Serializes a user's full hierarchy to a Netscape bookmark document.
///
/// Levels nest one `<DL>` per hierarchy level (workspace → folder → group →
/// bookmark), each sorted by position; `state` is already position-sorted
/// by [`Library::get_state`](crate::Library::get_state). A `<DD>` line is
/// written only for bookmarks with a non-empty description.
pub fn export_netscape(state: &AppState) -> String {
    let mut lines: Vec<String> = vec![
        "<!DOCTYPE NETSCAPE-Bookmark-file-1>".to_string(),
        "<!-- This is an automatically generated file.".to_string(),
        "     It will be read and overwritten.".to_string(),
        "     DO NOT EDIT! -->".to_string(),
        "<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">".to_string(),
        "<TITLE>Bookmarks</TITLE>".to_string(),
        "<H1>Bookmarks</H1>".to_string(),
        "<DL><p>".to_string(),
    ];

    for workspace in &state.workspaces {
        lines.push(format!("    <DT><H3>{}</H3>", escape_html(&workspace.title)));
        lines.push("    <DL><p>".to_string());

        for folder in state.folders.iter().filter(|f| f.workspace_id == workspace.id) {
            lines.push(format!("        <DT><H3>{}</H3>", escape_html(&folder.title)));
            lines.push("        <DL><p>".to_string());

            for group in state.groups.iter().filter(|g| g.folder_id == folder.id) {
                lines.push(format!("            <DT><H3>{}</H3>", escape_html(&group.title)));
                lines.push("            <DL><p>".to_string());

                for bookmark in state.bookmarks.iter().filter(|b| b.group_id == group.id) {
                    lines.push(format!(
                        "                <DT><A HREF=\"{}\">{}</A>",
                        escape_html(&bookmark.url),
                        escape_html(&bookmark.title)
                    ));
                    if !bookmark.description.is_empty() {
                        lines.push(format!(
                            "                <DD>{}",
                            escape_html(&bookmark.description)
                        ));
                    }
                }

                lines.push("            </DL><p>".to_string());
            }

            lines.push("        </DL><p>".to_string());
        }

        lines.push("    </DL><p>".to_string());
    }

    lines.push("</DL><p>".to_string());
    lines.join("\n")
}

fn span_start(caps: &regex::Captures) -> usize {
    caps.get(0).map_or(usize::MAX, |m| m.start())
}

fn span_end(caps: &regex::Captures) -> usize {
    caps.get(0).map_or(usize::MAX, |m| m.end())
}

/// Escapes text for embedding in bookmark HTML.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Decodes the entities [`escape_html`] produces. `&amp;` is decoded last
/// so double-escaped input cannot smuggle entities through.
pub fn decode_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
