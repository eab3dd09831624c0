//! Feature extraction.
//!
//! [`extract`] turns raw text into a [`FeatureSet`]: counts, bounded word
//! rankings, presence flags, script ratios, and a lexicon sentiment score.
//! It is pure and total; the empty string yields zero counts, empty
//! rankings, and false flags.
//!
//! # Tokenization
//!
//! HTML tags are stripped, text is lower-cased, and tokens are maximal
//! runs of alphanumeric characters. A token also ends where the text
//! switches between CJK ideographs and other scripts, so `hello世界`
//! yields `hello` and `世界`. Single-character tokens are discarded.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Entries kept in `common_words` and `word_frequency`.
const FREQUENCY_TOP_N: usize = 20;
/// Entries kept in `semantic_keywords`.
const KEYWORD_TOP_N: usize = 10;
/// Entries kept in `topic_words`.
const TOPIC_TOP_N: usize = 15;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "perfect", "love", "like", "happy", "glad", "success",
    "satisfied", "好", "棒", "优秀", "完美", "喜欢", "爱", "开心", "高兴", "满意", "成功",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "terrible", "awful", "hate", "sad", "disappointed", "failure", "problem",
    "error", "坏", "差", "糟糕", "讨厌", "恨", "难过", "失望", "失败", "问题", "错误",
];

// Patterns are fixed literals; a pattern that fails to build matches nothing.
static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());
static URL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)https?://|\bwww\.[a-z0-9-]+\.").ok());
static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").ok());
static PHONE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"1[3-9][0-9]{9}|(?:\([0-9]{3}\)\s?|\b[0-9]{3}[-.\s])[0-9]{3}[-.\s][0-9]{4}\b").ok()
});
static TIME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}[-/][0-9]{1,2}[-/][0-9]{1,2}").ok());
static DATE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:today|yesterday|tomorrow|this year|last year|next year)\b|今天|昨天|明天|今年|去年|明年")
        .ok()
});

fn found(re: &Option<Regex>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

// ============================================================================
// Feature schema
// ============================================================================

/// Name of one extracted feature.
///
/// Declaration order is the order features are compared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    WordCount,
    CharCount,
    UniqueWords,
    AvgWordLength,
    VocabularyRichness,
    SentenceCount,
    ParagraphCount,
    CommonWords,
    WordFrequency,
    SemanticKeywords,
    TopicWords,
    HasNumbers,
    HasUrls,
    HasEmails,
    HasPhone,
    HasTime,
    HasDate,
    CjkRatio,
    LatinRatio,
    DigitRatio,
    SentimentScore,
}

impl Feature {
    /// Every feature, in comparison order.
    pub const ALL: [Feature; 21] = [
        Feature::WordCount,
        Feature::CharCount,
        Feature::UniqueWords,
        Feature::AvgWordLength,
        Feature::VocabularyRichness,
        Feature::SentenceCount,
        Feature::ParagraphCount,
        Feature::CommonWords,
        Feature::WordFrequency,
        Feature::SemanticKeywords,
        Feature::TopicWords,
        Feature::HasNumbers,
        Feature::HasUrls,
        Feature::HasEmails,
        Feature::HasPhone,
        Feature::HasTime,
        Feature::HasDate,
        Feature::CjkRatio,
        Feature::LatinRatio,
        Feature::DigitRatio,
        Feature::SentimentScore,
    ];
}

/// Value of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Presence flag.
    Flag(bool),
    /// Count, ratio, or score.
    Number(f64),
    /// Bounded term → weight mapping.
    Terms(BTreeMap<String, f64>),
}

/// Comparable summary of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet {
    values: BTreeMap<Feature, FeatureValue>,
}

impl FeatureSet {
    /// Empty set (no features present).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature, replacing any previous value.
    pub fn insert(&mut self, feature: Feature, value: FeatureValue) {
        self.values.insert(feature, value);
    }

    /// Drop a feature.
    pub fn remove(&mut self, feature: Feature) -> Option<FeatureValue> {
        self.values.remove(&feature)
    }

    pub fn get(&self, feature: Feature) -> Option<&FeatureValue> {
        self.values.get(&feature)
    }

    /// Numeric value of `feature`, if present and numeric.
    pub fn number(&self, feature: Feature) -> Option<f64> {
        match self.values.get(&feature) {
            Some(FeatureValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Flag value of `feature`, if present and boolean.
    pub fn flag(&self, feature: Feature) -> Option<bool> {
        match self.values.get(&feature) {
            Some(FeatureValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    /// Term mapping of `feature`, if present and a mapping.
    pub fn terms(&self, feature: Feature) -> Option<&BTreeMap<String, f64>> {
        match self.values.get(&feature) {
            Some(FeatureValue::Terms(t)) => Some(t),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Features in comparison order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}

// ============================================================================
// Extraction
// ============================================================================

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}')
}

/// Split lower-cased text into tokens of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_cjk = false;

    let mut flush = |current: &mut String| {
        if current.chars().count() > 1 {
            tokens.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for c in text.chars() {
        if !c.is_alphanumeric() {
            flush(&mut current);
            continue;
        }
        let cjk = is_cjk(c);
        if !current.is_empty() && cjk != current_cjk {
            flush(&mut current);
        }
        current_cjk = cjk;
        current.extend(c.to_lowercase());
    }
    flush(&mut current);

    tokens
}

fn strip_tags(text: &str) -> String {
    match &*TAG_RE {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    }
}

/// Top `n` entries by value; ties broken alphabetically.
fn top_n(scores: HashMap<&str, f64>, n: usize) -> BTreeMap<String, f64> {
    let mut ranked: Vec<(&str, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(w, s)| (w.to_string(), s))
        .collect()
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn sentiment(words: &[String]) -> f64 {
    let positive = words
        .iter()
        .filter(|w| POSITIVE_WORDS.contains(&w.as_str()))
        .count();
    let negative = words
        .iter()
        .filter(|w| NEGATIVE_WORDS.contains(&w.as_str()))
        .count();
    if positive + negative == 0 {
        return 0.0;
    }
    (positive as f64 - negative as f64) / (positive + negative) as f64
}

/// Extract the full feature set from `text`.
///
/// # Example
///
/// ```
/// use simdex_index::features::{extract, Feature};
///
/// let features = extract("The quick brown fox");
/// assert_eq!(features.number(Feature::WordCount), Some(4.0));
/// assert_eq!(features.flag(Feature::HasUrls), Some(false));
/// ```
pub fn extract(text: &str) -> FeatureSet {
    let text = strip_tags(text);
    let words = tokenize(&text);

    let total_words = words.len();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for w in &words {
        *counts.entry(w.as_str()).or_default() += 1;
    }
    let unique = counts.len();

    let total_chars = text.chars().count();
    let (mut cjk, mut latin, mut digits) = (0usize, 0usize, 0usize);
    for c in text.chars() {
        if is_cjk(c) {
            cjk += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        } else if c.is_ascii_digit() {
            digits += 1;
        }
    }

    let avg_word_length = if total_words == 0 {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / total_words as f64
    };

    let sentences = text
        .split(['.', '!', '?', '。', '！', '？'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let paragraphs = text.lines().filter(|l| !l.trim().is_empty()).count();

    let raw_counts: HashMap<&str, f64> = counts.iter().map(|(w, c)| (*w, *c as f64)).collect();
    let frequencies: HashMap<&str, f64> = counts
        .iter()
        .map(|(w, c)| (*w, ratio(*c, total_words)))
        .collect();
    let keyword_scores: HashMap<&str, f64> = counts
        .iter()
        .map(|(w, c)| {
            let length_score = w.chars().count() as f64 / 10.0;
            (*w, length_score + ratio(*c, total_words) * 100.0)
        })
        .collect();

    let mut set = FeatureSet::new();
    let mut number = |f: Feature, v: f64| set.insert(f, FeatureValue::Number(v));
    number(Feature::WordCount, total_words as f64);
    number(Feature::CharCount, total_chars as f64);
    number(Feature::UniqueWords, unique as f64);
    number(Feature::AvgWordLength, avg_word_length);
    number(Feature::VocabularyRichness, ratio(unique, total_words));
    number(Feature::SentenceCount, sentences as f64);
    number(Feature::ParagraphCount, paragraphs as f64);
    number(Feature::CjkRatio, ratio(cjk, total_chars));
    number(Feature::LatinRatio, ratio(latin, total_chars));
    number(Feature::DigitRatio, ratio(digits, total_chars));
    number(Feature::SentimentScore, sentiment(&words));

    set.insert(
        Feature::CommonWords,
        FeatureValue::Terms(top_n(raw_counts, FREQUENCY_TOP_N)),
    );
    set.insert(
        Feature::WordFrequency,
        FeatureValue::Terms(top_n(frequencies.clone(), FREQUENCY_TOP_N)),
    );
    set.insert(
        Feature::SemanticKeywords,
        FeatureValue::Terms(top_n(keyword_scores, KEYWORD_TOP_N)),
    );
    set.insert(
        Feature::TopicWords,
        FeatureValue::Terms(top_n(frequencies, TOPIC_TOP_N)),
    );

    let mut flag = |f: Feature, v: bool| set.insert(f, FeatureValue::Flag(v));
    flag(Feature::HasNumbers, digits > 0);
    flag(Feature::HasUrls, found(&URL_RE, &text));
    flag(Feature::HasEmails, found(&EMAIL_RE, &text));
    flag(Feature::HasPhone, found(&PHONE_RE, &text));
    flag(Feature::HasTime, found(&TIME_RE, &text));
    flag(Feature::HasDate, found(&DATE_RE, &text));

    set
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------------

    #[test]
    fn test_patterns_compile() {
        for re in [&TAG_RE, &URL_RE, &EMAIL_RE, &PHONE_RE, &TIME_RE, &DATE_RE] {
            assert!(re.is_some());
        }
    }

    // ------------------------------------------------------------------------
    // Tokenization
    // ------------------------------------------------------------------------

    #[test]
    fn test_tokenize_drops_short_and_lowercases() {
        assert_eq!(
            tokenize("A Quick, brown FOX!"),
            vec!["quick", "brown", "fox"]
        );
    }

    #[test]
    fn test_tokenize_splits_scripts() {
        assert_eq!(tokenize("hello世界 x 今天好"), vec!["hello", "世界", "今天好"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ,.;  ").is_empty());
    }

    // ------------------------------------------------------------------------
    // Extraction
    // ------------------------------------------------------------------------

    #[test]
    fn test_extract_empty_string() {
        let set = extract("");
        assert_eq!(set.len(), Feature::ALL.len());
        assert_eq!(set.number(Feature::WordCount), Some(0.0));
        assert_eq!(set.number(Feature::CharCount), Some(0.0));
        assert_eq!(set.number(Feature::CjkRatio), Some(0.0));
        assert_eq!(set.number(Feature::SentimentScore), Some(0.0));
        assert!(set.terms(Feature::CommonWords).unwrap().is_empty());
        for feature in [
            Feature::HasNumbers,
            Feature::HasUrls,
            Feature::HasEmails,
            Feature::HasPhone,
            Feature::HasTime,
            Feature::HasDate,
        ] {
            assert_eq!(set.flag(feature), Some(false), "{feature:?}");
        }
    }

    #[test]
    fn test_extract_counts() {
        let set = extract("the cat and the hat");
        assert_eq!(set.number(Feature::WordCount), Some(5.0));
        assert_eq!(set.number(Feature::UniqueWords), Some(4.0));
        assert_eq!(set.number(Feature::VocabularyRichness), Some(0.8));
        assert_eq!(set.number(Feature::CharCount), Some(19.0));

        let common = set.terms(Feature::CommonWords).unwrap();
        assert_eq!(common.get("the"), Some(&2.0));
        let freq = set.terms(Feature::WordFrequency).unwrap();
        assert_eq!(freq.get("the"), Some(&0.4));
    }

    #[test]
    fn test_extract_rankings_bounded() {
        let text: String = (0..100).map(|i| format!("word{i} ")).collect();
        let set = extract(&text);
        assert_eq!(set.terms(Feature::CommonWords).unwrap().len(), 20);
        assert_eq!(set.terms(Feature::WordFrequency).unwrap().len(), 20);
        assert_eq!(set.terms(Feature::SemanticKeywords).unwrap().len(), 10);
        assert_eq!(set.terms(Feature::TopicWords).unwrap().len(), 15);
    }

    #[test]
    fn test_extract_flags() {
        let set = extract(
            "Call 13812345678 or (555) 123-4567, mail bob@example.com, \
             see https://example.com on 2024-05-01. Today!",
        );
        assert_eq!(set.flag(Feature::HasNumbers), Some(true));
        assert_eq!(set.flag(Feature::HasPhone), Some(true));
        assert_eq!(set.flag(Feature::HasEmails), Some(true));
        assert_eq!(set.flag(Feature::HasUrls), Some(true));
        assert_eq!(set.flag(Feature::HasTime), Some(true));
        assert_eq!(set.flag(Feature::HasDate), Some(true));
    }

    #[test]
    fn test_extract_cjk_date_word() {
        assert_eq!(extract("我们今天见面").flag(Feature::HasDate), Some(true));
    }

    #[test]
    fn test_extract_script_ratios() {
        let set = extract("ab12世界");
        assert_eq!(set.number(Feature::LatinRatio), Some(2.0 / 6.0));
        assert_eq!(set.number(Feature::DigitRatio), Some(2.0 / 6.0));
        assert_eq!(set.number(Feature::CjkRatio), Some(2.0 / 6.0));
    }

    #[test]
    fn test_extract_strips_html() {
        let set = extract("<p>hello</p><p>world</p>");
        let common = set.terms(Feature::CommonWords).unwrap();
        assert!(common.contains_key("hello"));
        assert!(common.contains_key("world"));
        assert!(!common.contains_key("p"));
    }

    #[test]
    fn test_extract_structure() {
        let set = extract("First line. Second one!\n\nNew paragraph?");
        assert_eq!(set.number(Feature::SentenceCount), Some(3.0));
        assert_eq!(set.number(Feature::ParagraphCount), Some(2.0));
    }

    #[test]
    fn test_sentiment() {
        assert_eq!(
            extract("good great bad").number(Feature::SentimentScore),
            Some(1.0 / 3.0)
        );
        assert_eq!(extract("优秀 失败").number(Feature::SentimentScore), Some(0.0));
        assert_eq!(extract("terrible").number(Feature::SentimentScore), Some(-1.0));
    }

    #[test]
    fn test_extract_deterministic() {
        let text = "Repeatable text, repeatable output. 2024/01/02";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn test_feature_set_json_round_trip() {
        let set = extract("hello world, hello again");
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"word_count\":4.0"));
        let back: FeatureSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    mod props {
        use crate::features::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn extract_is_total(text in any::<String>()) {
                let set = extract(&text);
                prop_assert_eq!(set.len(), Feature::ALL.len());
                for feature in [Feature::CjkRatio, Feature::LatinRatio, Feature::DigitRatio] {
                    let r = set.number(feature).unwrap();
                    prop_assert!((0.0..=1.0).contains(&r));
                }
                let s = set.number(Feature::SentimentScore).unwrap();
                prop_assert!((-1.0..=1.0).contains(&s));
            }
        }
    }
}
