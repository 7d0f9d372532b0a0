use fancy_regex::Regex;
use lazy_static::lazy_static;

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

fn rewrite(pattern: &str, replacement: &'static str) -> Rewrite {
    Rewrite {
        pattern: Regex::new(pattern).unwrap(),
        replacement,
    }
}

lazy_static! {
    static ref REWRITES: Vec<Rewrite> = vec![
        rewrite(r"(?i)<table(?![^>]*\bclass\s*=)", r#"<table class="content-table""#),
        rewrite(r"(?i)<blockquote(?![^>]*\bclass\s*=)", r#"<blockquote class="content-quote""#),
        rewrite(r"(?i)<img(?![^>]*\bloading\s*=)", r#"<img loading="lazy""#),
        rewrite(
            r#"(?is)(?<!<div class="callout callout-bottom-line">)<p>\s*<strong>\s*Clinical Bottom Line:?\s*</strong>:?\s*(.*?)</p>"#,
            r#"<div class="callout callout-bottom-line"><p class="callout-title">Clinical Bottom Line</p><p>$1</p></div>"#,
        ),
        rewrite(
            r#"(?is)(?<!<div class="callout callout-bottom-line">)<h([2-4])>\s*Clinical Bottom Line:?\s*</h\1>\s*(<p>.*?</p>)"#,
            r#"<div class="callout callout-bottom-line"><p class="callout-title">Clinical Bottom Line</p>$2</div>"#,
        ),
        rewrite(
            r#"(?is)(?<!<div class="callout callout-key-points">)<h([2-4])>\s*Key Points:?\s*</h\1>\s*(<(ul|ol)>.*?</\3>)"#,
            r#"<div class="callout callout-key-points"><h$1 class="callout-title">Key Points</h$1>$2</div>"#,
        ),
        rewrite(
            r#"(?is)(?<!<div class="callout callout-remember">)<p>\s*(?:<strong>)?\s*Remember:\s*(?:</strong>)?\s*(.*?)</p>"#,
            r#"<div class="callout callout-remember"><p><strong>Remember:</strong> $1</p></div>"#,
        ),
    ];
}

/// Presentational touches: CSS hooks on tables, quotes and images, and
/// callout boxes around recognised markers. Does not change the text.
pub fn enhance_blog_post_formatting(html: &str) -> String {
    REWRITES.iter().fold(html.to_owned(), |out, rewrite| {
        rewrite
            .pattern
            .replace_all(&out, rewrite.replacement)
            .into_owned()
    })
}
