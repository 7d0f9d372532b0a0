//! Rewrites applied to rendered article HTML before it is published.

pub mod clean;
pub mod format;
pub mod html;
pub mod links;

pub use clean::clean_blog_post_content;
pub use format::enhance_blog_post_formatting;
pub use links::add_medical_term_links;

use crate::content::ContentIndex;

/// Clean, format, then cross-link an article body.
pub fn process_blog_content(html: &str, index: &ContentIndex, link_prefix: &str) -> String {
    let cleaned = clean_blog_post_content(html);
    let formatted = enhance_blog_post_formatting(&cleaned);
    add_medical_term_links(&formatted, index.videos(), link_prefix)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::test::video;

    #[test]
    fn full_pipeline() {
        let index = ContentIndex::new(
            vec![],
            vec![video("afib-overview", "Atrial Fibrillation Overview", "")],
        );
        let html = concat!(
            "<p>Rate control matters in AFib.</p>\n",
            "<p>Remember: AFib needs a stroke risk score.</p>\n",
            "<h2>About the Author</h2>\n<p>Bio.</p>\n"
        );

        let out = process_blog_content(html, &index, "/watch");

        assert!(!out.contains("About the Author"));
        assert!(out.contains("callout-remember"));
        assert_eq!(out.matches("href=\"/watch/afib-overview\"").count(), 2);
    }
}
