use fancy_regex::Regex;
use lazy_static::lazy_static;

/// Upper bound on cleanup passes. Real posts settle in one or two.
const MAX_PASSES: usize = 8;

lazy_static! {
    /// Applied in this order; later patterns tidy what earlier ones leave behind.
    static ref REMOVALS: Vec<Regex> = [
        // Author heading and everything up to the next heading.
        r"(?is)<h([1-6])[^>]*>\s*(?:<[^>]+>\s*)*About\s+the\s+Author:?\s*(?:</[^>]+>\s*)*</h\1>.*?(?=<h[1-6][\s>]|$)",
        // Styled bio containers.
        r#"(?is)<(div|section|aside)\b[^>]*\bclass\s*=\s*["'][^"']*\bauthor-(?:bio|box|info)\b[^"']*["'][^>]*>.*?</\1>"#,
        // A bold lead-in paragraph.
        r"(?is)<p(?:\s[^>]*)?>\s*<(strong|b)>\s*About\s+the\s+Author:?\s*</\1>.*?</p>",
        r"(?is)<p(?:\s[^>]*)?>\s*About\s+the\s+Author:.*?</p>",
        // Empty paragraphs.
        r"(?i)<p(?:\s[^>]*)?>(?:\s|&nbsp;|<br\s*/?>)*</p>",
        // Trailing rules.
        r"(?i)(?:\s*<hr\s*/?>)+\s*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect();

    static ref BLANK_RUNS: Regex = Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap();
}

fn pass(html: &str) -> String {
    let mut out = html.to_owned();
    for pattern in REMOVALS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    BLANK_RUNS.replace_all(&out, "\n\n").trim().to_owned()
}

/// Strip "About the Author" boilerplate and leftover empty markup.
///
/// Runs until the output stops changing, so cleaning twice is the same as
/// cleaning once.
pub fn clean_blog_post_content(html: &str) -> String {
    let mut current = pass(html);
    for _ in 1..MAX_PASSES {
        let next = pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod test {
    use super::*;

    const POST: &str = r#"<h2>Rate control</h2>
<p>Start with a beta blocker.</p>
<p></p>


<h2>About the Author</h2>
<p>Dr. Reyes is an emergency physician.</p>
<p>Follow her on social media.</p>
<hr />
"#;

    #[test]
    fn removes_author_section() {
        assert_eq!(
            clean_blog_post_content(POST),
            "<h2>Rate control</h2>\n<p>Start with a beta blocker.</p>"
        );
    }

    #[test]
    fn author_section_stops_at_next_heading() {
        let html = "<h3><strong>About the Author</strong></h3><p>bio</p><h2>References</h2><p>1. ACC</p>";
        assert_eq!(clean_blog_post_content(html), "<h2>References</h2><p>1. ACC</p>");
    }

    #[test]
    fn removes_bio_boxes_and_lead_ins() {
        let html = concat!(
            "<p>Body.</p>",
            "<div class=\"card author-bio\"><img src=\"a.png\"><p>Bio</p></div>",
            "<p><strong>About the Author:</strong> Jane writes.</p>",
            "<p>About the author: more.</p>",
        );
        assert_eq!(clean_blog_post_content(html), "<p>Body.</p>");
    }

    #[test]
    fn leaves_ordinary_content() {
        let html = "<p>Ask about the authorisation form.</p>";
        assert_eq!(clean_blog_post_content(html), html);
    }

    #[test]
    fn idempotent() {
        let inputs = [
            POST,
            "<p>&nbsp;</p><hr><p>x</p><hr><hr/>",
            "<div class='author-box'><div>nested</div></div><p>tail</p>",
            "",
        ];
        for input in inputs {
            let once = clean_blog_post_content(input);
            assert_eq!(clean_blog_post_content(&once), once, "input: {}", input);
        }
    }
}
