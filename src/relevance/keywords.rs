use std::collections::{BTreeSet, HashSet};

use lazy_static::lazy_static;
use unicode_segmentation::UnicodeSegmentation;

pub type Keywords = BTreeSet<String>;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "every",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "learn", "let",
    "like", "made", "make", "many", "me", "more", "most", "much", "must", "my", "need", "new",
    "no", "nor", "not", "now", "of", "off", "on", "once", "one", "only", "or", "other", "our",
    "out", "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "use", "used", "using", "very", "was", "way", "we", "were", "what",
    "when", "where", "which", "while", "who", "why", "will", "with", "would", "you", "your",
    "guide", "overview", "part", "video", "watch", "article", "understanding", "introduction",
];

/// Short tokens that still carry meaning in a clinical context.
const MEDICAL_TERMS: &[&str] = &[
    "acs", "afib", "aki", "ards", "bp", "cad", "chf", "ckd", "copd", "cpr", "ct", "dka", "dvt",
    "ecg", "ed", "ekg", "gi", "hf", "hr", "icu", "iv", "mi", "mri", "nstemi", "pe", "rr", "svt",
    "tia", "uti", "vf", "vt", "lbbb", "rbbb", "qt", "qtc", "abg", "bmi",
];

const MEDICAL_BIGRAMS: &[&str] = &[
    "atrial fibrillation",
    "atrial flutter",
    "heart failure",
    "heart block",
    "heart rate",
    "blood pressure",
    "chest pain",
    "myocardial infarction",
    "pulmonary embolism",
    "deep vein",
    "cardiac arrest",
    "bundle branch",
    "st elevation",
    "kidney injury",
    "kidney disease",
    "septic shock",
    "acid base",
    "diabetic ketoacidosis",
];

/// Terms that earn a bonus on top of the Jaccard score when shared.
pub const HIGH_VALUE_TERMS: &[&str] = &[
    "ecg",
    "ekg",
    "afib",
    "atrial fibrillation",
    "myocardial infarction",
    "stemi",
    "heart failure",
    "arrhythmia",
    "pulmonary embolism",
    "sepsis",
    "stroke",
    "anticoagulation",
];

lazy_static! {
    static ref STOP_SET: HashSet<&'static str> = STOP_WORDS.iter().copied().collect();
    static ref MEDICAL_SET: HashSet<&'static str> = MEDICAL_TERMS.iter().copied().collect();
    pub static ref HIGH_VALUE_SET: HashSet<&'static str> = HIGH_VALUE_TERMS.iter().copied().collect();
}

/// Lower-cased words of `text`, punctuation removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .unicode_words()
        .map(|word| word.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect()
}

/// Keyword set of a piece of text.
///
/// Keeps non-stop-words longer than three characters, any word from the
/// medical vocabulary, and every medical bigram that appears verbatim.
pub fn extract_keywords(text: &str) -> Keywords {
    let words = tokenize(text);

    let mut keywords: Keywords = words
        .iter()
        .filter(|word| !STOP_SET.contains(word.as_str()))
        .filter(|word| word.chars().count() > 3 || MEDICAL_SET.contains(word.as_str()))
        .cloned()
        .collect();

    let normalized = format!(" {} ", words.join(" "));
    for bigram in MEDICAL_BIGRAMS {
        if normalized.contains(&format!(" {} ", bigram)) {
            keywords.insert((*bigram).to_owned());
        }
    }

    keywords
}
