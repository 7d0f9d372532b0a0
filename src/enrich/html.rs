//! Just enough HTML tokenizing to walk rendered article bodies.
//!
//! This is not a conforming HTML parser: it splits markup into tags, text and
//! opaque chunks, which is all the transforms below need to tell "inside a
//! link" from "plain prose".

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose body is not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    StartTag {
        name: String,
        raw: &'a str,
        self_closing: bool,
    },
    EndTag {
        name: String,
        raw: &'a str,
    },
    /// Comments, doctypes and raw-text element bodies.
    Raw(&'a str),
}

impl<'a> Token<'a> {
    pub fn raw(&self) -> &'a str {
        match self {
            Token::Text(raw) | Token::Raw(raw) => raw,
            Token::StartTag { raw, .. } | Token::EndTag { raw, .. } => raw,
        }
    }
}

fn tag_name(s: &str) -> String {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Index just past the `>` closing a tag that starts at `from`, honouring quotes.
fn tag_end(html: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (offset, byte) in html.as_bytes()[from..].iter().enumerate() {
        match (quote, *byte) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(*byte),
            (None, b'>') => return Some(from + offset + 1),
            _ => {}
        }
    }
    None
}

fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack[from..]
        .to_ascii_lowercase()
        .find(needle)
        .map(|idx| from + idx)
}

pub fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = vec![];
    let mut pos = 0;
    let bytes = html.as_bytes();

    while pos < html.len() {
        if bytes[pos] != b'<' {
            let end = html[pos..].find('<').map_or(html.len(), |idx| pos + idx);
            tokens.push(Token::Text(&html[pos..end]));
            pos = end;
            continue;
        }

        let rest = &html[pos..];
        let next = bytes.get(pos + 1).copied();

        let end = if rest.starts_with("<!--") {
            rest.find("-->").map(|idx| pos + idx + 3)
        } else if matches!(next, Some(b'!') | Some(b'?')) {
            tag_end(html, pos)
        } else {
            None
        };
        if let Some(end) = end {
            tokens.push(Token::Raw(&html[pos..end]));
            pos = end;
            continue;
        }

        if next == Some(b'/') {
            if let Some(end) = tag_end(html, pos) {
                tokens.push(Token::EndTag {
                    name: tag_name(&html[pos + 2..end]),
                    raw: &html[pos..end],
                });
                pos = end;
                continue;
            }
        }

        if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            if let Some(end) = tag_end(html, pos) {
                let raw = &html[pos..end];
                let name = tag_name(&raw[1..]);
                let self_closing = raw.ends_with("/>") || VOID_ELEMENTS.contains(&name.as_str());
                pos = end;

                let is_raw_text = RAW_TEXT_ELEMENTS.contains(&name.as_str());
                tokens.push(Token::StartTag {
                    name: name.clone(),
                    raw,
                    self_closing,
                });

                if is_raw_text && !self_closing {
                    let close = find_ignore_case(html, &format!("</{}", name), pos).unwrap_or(html.len());
                    if close > pos {
                        tokens.push(Token::Raw(&html[pos..close]));
                    }
                    pos = close;
                }
                continue;
            }
        }

        // A stray `<` is just text.
        let end = html[pos + 1..].find('<').map_or(html.len(), |idx| pos + 1 + idx);
        tokens.push(Token::Text(&html[pos..end]));
        pos = end;
    }

    tokens
}

/// Tracks which elements are open while walking a token stream.
#[derive(Default, Debug)]
pub struct ElementStack {
    open: Vec<String>,
}

impl ElementStack {
    pub fn push_token(&mut self, token: &Token) {
        match token {
            Token::StartTag {
                name,
                self_closing: false,
                ..
            } => self.open.push(name.clone()),
            Token::EndTag { name, .. } => {
                // Unbalanced end tags are ignored; otherwise close everything above the match.
                if let Some(idx) = self.open.iter().rposition(|open| open == name) {
                    self.open.truncate(idx);
                }
            }
            _ => {}
        }
    }

    pub fn inside_any(&self, names: &[&str]) -> bool {
        self.open.iter().any(|open| names.contains(&open.as_str()))
    }

    /// The innermost open element that is one of `names`.
    pub fn innermost<'s>(&'s self, names: &[&str]) -> Option<&'s str> {
        self.open
            .iter()
            .rev()
            .map(String::as_str)
            .find(|open| names.contains(open))
    }
}

/// Rewrite every text node that is not inside one of `skip`.
pub fn map_text<F>(html: &str, skip: &[&str], mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(html.len());
    let mut stack = ElementStack::default();

    for token in tokenize(html) {
        match &token {
            Token::Text(text) if !stack.inside_any(skip) => out.push_str(&f(text)),
            other => out.push_str(other.raw()),
        }
        stack.push_token(&token);
    }

    out
}

pub fn decode_entities(text: &str) -> String {
    htmlescape::decode_html(text).unwrap_or_else(|_| text.to_owned())
}

/// Concatenated, entity-decoded text of a fragment.
pub fn text_content(html: &str) -> String {
    tokenize(html)
        .iter()
        .filter_map(|token| match token {
            Token::Text(text) => Some(decode_entities(text)),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Quote,
    Preformatted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "ol", "p", "pre", "section",
    "table", "tbody", "thead", "tr", "ul",
];
const KIND_ELEMENTS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "li", "pre", "blockquote"];

fn block_kind(stack: &ElementStack) -> BlockKind {
    match stack.innermost(KIND_ELEMENTS) {
        Some("li") => BlockKind::ListItem,
        Some("pre") => BlockKind::Preformatted,
        Some("blockquote") => BlockKind::Quote,
        Some(heading) => BlockKind::Heading(heading[1..].parse().unwrap_or(6)),
        None => BlockKind::Paragraph,
    }
}

fn flush(blocks: &mut Vec<Block>, buffer: &mut String, kind: BlockKind) {
    let text = if kind == BlockKind::Preformatted {
        buffer.trim_matches('\n').to_owned()
    } else {
        buffer.split_whitespace().collect::<Vec<_>>().join(" ")
    };
    buffer.clear();

    if !text.trim().is_empty() {
        blocks.push(Block { kind, text });
    }
}

/// Flatten a fragment into text blocks for plain-text layouts such as the PDF export.
pub fn blocks(html: &str) -> Vec<Block> {
    let mut blocks = vec![];
    let mut buffer = String::new();
    let mut stack = ElementStack::default();

    for token in tokenize(html) {
        match &token {
            Token::StartTag { name, .. } | Token::EndTag { name, .. }
                if BLOCK_ELEMENTS.contains(&name.as_str()) =>
            {
                flush(&mut blocks, &mut buffer, block_kind(&stack));
            }
            Token::StartTag { name, .. } if name == "br" => buffer.push('\n'),
            Token::EndTag { name, .. } if name == "td" || name == "th" => buffer.push_str("  "),
            Token::Text(text) if !stack.inside_any(RAW_TEXT_ELEMENTS) => {
                buffer.push_str(&decode_entities(text))
            }
            _ => {}
        }
        stack.push_token(&token);
    }
    flush(&mut blocks, &mut buffer, block_kind(&stack));

    blocks
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tokenizes() {
        let tokens = tokenize(r#"<p class="a>b">Hi <a href="/x">there</a><br/></p><!-- c -->"#);
        assert_eq!(tokens.len(), 8);
        assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "p"));
        assert_eq!(tokens[1], Token::Text("Hi "));
        assert!(matches!(&tokens[5], Token::StartTag { name, self_closing: true, .. } if name == "br"));
        assert_eq!(tokens[7], Token::Raw("<!-- c -->"));
    }

    #[test]
    fn script_bodies_are_opaque() {
        let tokens = tokenize("<script>if (a < b) { x = '<a>'; }</script>ok");
        assert_eq!(tokens[1], Token::Raw("if (a < b) { x = '<a>'; }"));
        assert_eq!(tokens[3], Token::Text("ok"));
    }

    #[test]
    fn stray_angle_bracket() {
        assert_eq!(text_content("<p>a < b</p>"), "a < b");
    }

    #[test]
    fn map_text_skips_links() {
        let out = map_text("<p>x <a href='#'>x</a> <code>x</code> x</p>", &["a", "code"], |t| {
            t.replace('x', "y")
        });
        assert_eq!(out, "<p>y <a href='#'>x</a> <code>x</code> y</p>");
    }

    #[test]
    fn unbalanced_end_tag_does_not_leak_state() {
        let out = map_text("</a><p>x</p>", &["a"], |t| t.replace('x', "y"));
        assert_eq!(out, "</a><p>y</p>");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(text_content("<p>Na&#43; &amp; K&#x2B;</p>"), "Na+ & K+");
    }

    #[test]
    fn flattens_blocks() {
        let html = "<h2>Key Points</h2><ul><li>Rate <em>first</em></li><li>Then rhythm</li></ul><p>Done.</p>";
        assert_eq!(
            blocks(html),
            vec![
                Block { kind: BlockKind::Heading(2), text: "Key Points".into() },
                Block { kind: BlockKind::ListItem, text: "Rate first".into() },
                Block { kind: BlockKind::ListItem, text: "Then rhythm".into() },
                Block { kind: BlockKind::Paragraph, text: "Done.".into() },
            ]
        );
    }
}
