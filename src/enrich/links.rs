use build_html::escape_html;
use fancy_regex::Regex;
use lazy_static::lazy_static;

use super::html::map_text;
use crate::metadata::Video;

/// Occurrences of one term linked per document.
pub const MAX_LINKS_PER_TERM: usize = 3;

/// Text inside these elements is never linked.
const SKIP_ELEMENTS: &[&str] = &[
    "a", "script", "style", "code", "pre", "textarea", "h1", "h2", "h3", "h4", "h5", "h6",
];

pub struct MedicalTerm {
    pub name: &'static str,
    pub synonyms: &'static [&'static str],
}

/// In priority order; earlier terms claim text first.
pub const MEDICAL_TERMS: &[MedicalTerm] = &[
    MedicalTerm { name: "atrial fibrillation", synonyms: &["atrial fibrillation", "afib", "a-fib"] },
    MedicalTerm {
        name: "myocardial infarction",
        synonyms: &["myocardial infarction", "heart attack", "stemi", "nstemi"],
    },
    MedicalTerm { name: "heart failure", synonyms: &["heart failure", "chf"] },
    MedicalTerm { name: "ecg", synonyms: &["ecg", "ekg", "electrocardiogram"] },
    MedicalTerm { name: "pulmonary embolism", synonyms: &["pulmonary embolism"] },
    MedicalTerm { name: "sepsis", synonyms: &["sepsis", "septic shock"] },
    MedicalTerm { name: "stroke", synonyms: &["stroke"] },
    MedicalTerm { name: "bundle branch block", synonyms: &["bundle branch block", "lbbb", "rbbb"] },
    MedicalTerm { name: "heart block", synonyms: &["heart block", "av block"] },
    MedicalTerm { name: "hypertension", synonyms: &["hypertension"] },
    MedicalTerm { name: "diabetic ketoacidosis", synonyms: &["diabetic ketoacidosis", "dka"] },
    MedicalTerm { name: "acute kidney injury", synonyms: &["acute kidney injury", "aki"] },
    MedicalTerm { name: "anticoagulation", synonyms: &["anticoagulation", "anticoagulant"] },
];

fn term_regex(term: &MedicalTerm) -> Regex {
    let mut synonyms: Vec<&str> = term.synonyms.to_vec();
    // Longest first so "atrial fibrillation" wins over a shorter synonym at the same spot.
    synonyms.sort_by_key(|s| std::cmp::Reverse(s.len()));
    let alternation = synonyms
        .iter()
        .map(|s| fancy_regex::escape(s).into_owned())
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).unwrap()
}

lazy_static! {
    static ref TERM_PATTERNS: Vec<(&'static MedicalTerm, Regex)> =
        MEDICAL_TERMS.iter().map(|term| (term, term_regex(term))).collect();
}

fn mentions(pattern: &Regex, text: &str) -> bool {
    pattern.is_match(text).unwrap_or(false)
}

/// The first video whose title or description mentions the term.
fn video_for<'a>(pattern: &Regex, videos: &'a [Video]) -> Option<&'a Video> {
    videos
        .iter()
        .find(|v| mentions(pattern, &v.title) || mentions(pattern, &v.description))
}

fn anchor(video: &Video, link_prefix: &str, label: &str) -> String {
    format!(
        r#"<a href="{}/{}" class="medical-term-link" title="Watch: {}">{}</a>"#,
        link_prefix.trim_end_matches('/'),
        video.slug,
        escape_html(&video.title),
        label
    )
}

/// Link one term's occurrences in text nodes, consuming from `budget`.
fn link_term(html: &str, pattern: &Regex, video: &Video, link_prefix: &str, budget: &mut usize) -> String {
    map_text(html, SKIP_ELEMENTS, |text| {
        if *budget == 0 {
            return text.to_owned();
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in pattern.find_iter(text) {
            let Ok(found) = found else { break };
            if *budget == 0 {
                break;
            }
            out.push_str(&text[last..found.start()]);
            out.push_str(&anchor(video, link_prefix, found.as_str()));
            last = found.end();
            *budget -= 1;
        }
        out.push_str(&text[last..]);
        out
    })
}

/// Turn mentions of known medical terms into links to a matching video.
///
/// At most [`MAX_LINKS_PER_TERM`] occurrences per term are linked. Text
/// already inside a link, code, or a heading is left alone.
pub fn add_medical_term_links(html: &str, videos: &[Video], link_prefix: &str) -> String {
    let mut out = html.to_owned();

    for (term, pattern) in TERM_PATTERNS.iter() {
        let Some(video) = video_for(pattern, videos) else {
            continue;
        };
        if !mentions(pattern, &out) {
            continue;
        }

        let mut budget = MAX_LINKS_PER_TERM;
        out = link_term(&out, pattern, video, link_prefix, &mut budget);
        log::debug!(
            "Linked {} mention(s) of `{}` to video `{}`",
            MAX_LINKS_PER_TERM - budget,
            term.name,
            video.slug
        );
    }

    out
}
