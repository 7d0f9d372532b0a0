use pulldown_cmark::{html, Event, Options, Parser};
use unicode_segmentation::UnicodeSegmentation;

const WORDS_PER_MINUTE: usize = 200;

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_SMART_PUNCTUATION
}

/// Render a markdown body to HTML.
pub fn to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options()));
    out
}

/// Estimated reading time of the rendered text, at least one minute.
pub fn reading_minutes(markdown: &str) -> u32 {
    let words: usize = Parser::new_ext(markdown, options())
        .filter_map(|event| match event {
            Event::Text(text) | Event::Code(text) => Some(text.unicode_words().count()),
            _ => None,
        })
        .sum();

    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}
