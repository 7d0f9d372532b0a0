//! Printable PDF export of an article.
//!
//! The article HTML is flattened into text blocks, wrapped at an estimated
//! Helvetica line width and sliced across A4 pages.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::enrich::html::{blocks, Block, BlockKind};
use crate::metadata::Article;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const FOOTER_Y: i64 = 32;
const CONTENT_BOTTOM: i64 = MARGIN + 16;

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub site_name: String,
    pub site_url: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    text: String,
    size: i64,
    bold: bool,
    indent: i64,
    gap_before: i64,
}

struct Style {
    size: i64,
    bold: bool,
    indent: i64,
    gap_before: i64,
}

fn style(kind: BlockKind) -> Style {
    let (size, bold, indent, gap_before) = match kind {
        BlockKind::Heading(1) => (16, true, 0, 14),
        BlockKind::Heading(2) => (14, true, 0, 12),
        BlockKind::Heading(_) => (12, true, 0, 10),
        BlockKind::Paragraph => (11, false, 0, 6),
        BlockKind::ListItem => (11, false, 14, 3),
        BlockKind::Quote => (11, false, 24, 6),
        BlockKind::Preformatted => (10, false, 8, 6),
    };
    Style { size, bold, indent, gap_before }
}

fn line_height(size: i64) -> i64 {
    size * 7 / 5
}

/// Characters that fit on a line. Helvetica averages about half an em per glyph.
fn max_chars(size: i64, indent: i64) -> usize {
    let width = PAGE_WIDTH - 2 * MARGIN - indent;
    ((width * 2) / size).max(10) as usize
}

fn wrap(text: &str, max: usize) -> Vec<String> {
    let mut lines = vec![];
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn block_lines(block: &Block) -> Vec<Line> {
    let style = style(block.kind);
    let max = max_chars(style.size, style.indent);

    let wrapped: Vec<String> = match block.kind {
        BlockKind::Preformatted => block.text.lines().flat_map(|l| wrap(l, max)).collect(),
        BlockKind::ListItem => wrap(&format!("\u{2022} {}", block.text), max),
        _ => wrap(&block.text, max),
    };

    wrapped
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Line {
            text,
            size: style.size,
            bold: style.bold,
            indent: style.indent,
            gap_before: if idx == 0 { style.gap_before } else { 0 },
        })
        .collect()
}

fn header_lines(article: &Article) -> Vec<Line> {
    let mut lines: Vec<Line> = wrap(&article.title, max_chars(18, 0))
        .into_iter()
        .map(|text| Line {
            text,
            size: 18,
            bold: true,
            indent: 0,
            gap_before: 0,
        })
        .collect();

    lines.push(Line {
        text: format!(
            "By {} \u{b7} {} \u{b7} {} min read",
            article.author,
            article.published_at.format("%B %-d, %Y"),
            article.reading_minutes
        ),
        size: 9,
        bold: false,
        indent: 0,
        gap_before: 4,
    });
    lines
}

/// Place lines on pages, returning each page's `(line, baseline y)` pairs.
fn paginate(lines: Vec<Line>) -> Vec<Vec<(Line, i64)>> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages: Vec<Vec<(Line, i64)>> = vec![vec![]];
    let mut y = top;

    for line in lines {
        let gap = if y == top { 0 } else { line.gap_before };
        let mut next = y - gap - line_height(line.size);

        if next < CONTENT_BOTTOM {
            pages.push(vec![]);
            next = top - line_height(line.size);
        }
        y = next;
        if let Some(page) = pages.last_mut() {
            page.push((line, y));
        }
    }

    pages
}

/// Encode for the standard Type1 fonts' WinAnsi encoding. Unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            '\u{20ac}' => 0x80,
            c if (c as u32) < 0x80 || (0xa0..=0xff).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

fn text_op(font: &str, size: i64, x: i64, y: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]),
        Operation::new("ET", vec![]),
    ]
}

fn font(doc: &mut Document, base: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    })
}

pub struct BlogPdfGenerator {
    options: PdfOptions,
}

impl BlogPdfGenerator {
    pub fn new(options: PdfOptions) -> Self {
        Self { options }
    }

    pub fn filename(article: &Article) -> String {
        format!("{}.pdf", article.slug)
    }

    /// Render `body_html` (normally the processed article body) under the article's header.
    pub fn generate(&self, article: &Article, body_html: &str) -> anyhow::Result<Vec<u8>> {
        let mut lines = header_lines(article);
        lines.extend(blocks(body_html).iter().flat_map(block_lines));
        let pages = paginate(lines);
        let page_count = pages.len();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular = font(&mut doc, "Helvetica");
        let bold = font(&mut doc, "Helvetica-Bold");
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
            },
        });

        let mut kids: Vec<Object> = vec![];
        for (number, page) in pages.iter().enumerate() {
            let mut operations = vec![];
            for (line, y) in page {
                let font = if line.bold { "F2" } else { "F1" };
                operations.extend(text_op(font, line.size, MARGIN + line.indent, *y, &line.text));
            }

            let footer = format!(
                "{} \u{b7} {} \u{b7} Page {} of {}",
                self.options.site_name,
                self.options.site_url,
                number + 1,
                page_count
            );
            operations.extend(text_op("F1", 8, MARGIN, FOOTER_Y, &footer));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(win_ansi(&article.title)),
            "Author" => Object::string_literal(win_ansi(&article.author)),
            "Producer" => Object::string_literal("medpress"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        log::info!("Exported `{}` to PDF ({} pages)", article.slug, page_count);

        Ok(out)
    }
}

/// One-shot export of `article` with its processed body.
pub fn export_article(article: &Article, body_html: &str, options: PdfOptions) -> anyhow::Result<Vec<u8>> {
    BlogPdfGenerator::new(options).generate(article, body_html)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::test::article;

    fn generator() -> BlogPdfGenerator {
        BlogPdfGenerator::new(PdfOptions {
            site_name: "MedPress".into(),
            site_url: "https://learn.example.com".into(),
        })
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert!(wrap("   ", 5).is_empty());
    }

    #[test]
    fn encodes_win_ansi() {
        assert_eq!(win_ansi("It\u{2019}s \u{2014} caf\u{e9} \u{3b1}"), b"It\x92s \x97 caf\xe9 ?".to_vec());
    }

    #[test]
    fn single_page() {
        let options = PdfOptions {
            site_name: "MedPress".into(),
            site_url: "https://learn.example.com".into(),
        };
        let bytes = export_article(&article("short", "Short", &[]), "<p>One paragraph.</p>", options).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_articles_span_pages() {
        let body = "<p>Anticoagulation decisions depend on stroke and bleeding risk.</p>".repeat(120);
        let bytes = generator().generate(&article("long", "Long", &[]), &body).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn pages_stay_inside_margins() {
        let lines: Vec<Line> = (0..200)
            .map(|i| Line {
                text: format!("line {}", i),
                size: 11,
                bold: false,
                indent: 0,
                gap_before: 6,
            })
            .collect();

        let pages = paginate(lines);
        assert!(pages.len() > 1);
        for (_, y) in pages.iter().flatten() {
            assert!(*y >= CONTENT_BOTTOM && *y < PAGE_HEIGHT - MARGIN);
        }
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 200);
    }
}
