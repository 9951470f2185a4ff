//! Flesch reading-ease analysis of article content.
//!
//! Content may be HTML or Markdown; markup is stripped before counting. Syllables are estimated
//! with the usual vowel-group heuristic, so scores for non-English text are only indicative.

use serde::Serialize;
use utoipa::ToSchema;

pub const WORDS_PER_MINUTE: usize = 200;
pub const LONG_SENTENCE_WORDS: usize = 20;
const LONG_PARAGRAPH_WORDS: usize = 150;
const MIN_SEO_WORDS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityReport {
    /// Flesch reading ease, clamped to 0-100
    pub score: f64,
    pub level: String,
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub avg_words_per_sentence: f64,
    pub avg_syllables_per_word: f64,
    pub reading_time_minutes: usize,
    /// Sentences longer than 20 words
    pub long_sentences: usize,
    pub suggestions: Vec<String>,
}

/// Analyze `content`. Returns `None` when nothing readable is left after stripping markup.
pub fn analyze(content: &str) -> Option<ReadabilityReport> {
    let text = strip_markup(content);
    let paragraphs: Vec<&str> = text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).collect();

    let sentences: Vec<Vec<String>> = paragraphs
        .iter()
        .flat_map(|p| split_sentences(p))
        .map(|s| words(s))
        .filter(|w| !w.is_empty())
        .collect();

    let word_count: usize = sentences.iter().map(Vec::len).sum();
    if word_count == 0 {
        return None;
    }
    let sentence_count = sentences.len();
    let syllables: usize = sentences.iter().flatten().map(|w| count_syllables(w)).sum();

    let avg_words_per_sentence = word_count as f64 / sentence_count as f64;
    let avg_syllables_per_word = syllables as f64 / word_count as f64;
    let raw_score = 206.835 - 1.015 * avg_words_per_sentence - 84.6 * avg_syllables_per_word;
    let score = round1(raw_score.clamp(0.0, 100.0));

    let long_sentences = sentences.iter().filter(|s| s.len() > LONG_SENTENCE_WORDS).count();
    let long_paragraphs = paragraphs
        .iter()
        .filter(|p| p.split_whitespace().count() > LONG_PARAGRAPH_WORDS)
        .count();

    let mut suggestions = Vec::new();
    if avg_words_per_sentence > LONG_SENTENCE_WORDS as f64 {
        suggestions.push(format!(
            "Shorten sentences: the average is {:.1} words, aim for under {LONG_SENTENCE_WORDS}.",
            avg_words_per_sentence
        ));
    }
    if long_sentences > 0 {
        suggestions.push(format!(
            "{long_sentences} sentence(s) exceed {LONG_SENTENCE_WORDS} words; consider splitting them."
        ));
    }
    if score < 60.0 {
        suggestions.push("Prefer shorter, simpler words to lower the syllable count.".to_string());
    }
    if long_paragraphs > 0 {
        suggestions.push(format!(
            "{long_paragraphs} paragraph(s) exceed {LONG_PARAGRAPH_WORDS} words; break them up with subheadings."
        ));
    }
    if word_count < MIN_SEO_WORDS {
        suggestions.push(format!(
            "Content is short ({word_count} words); aim for at least {MIN_SEO_WORDS} words."
        ));
    }

    Some(ReadabilityReport {
        score,
        level: level_for(score).to_string(),
        word_count,
        sentence_count,
        paragraph_count: paragraphs.len(),
        avg_words_per_sentence: round1(avg_words_per_sentence),
        avg_syllables_per_word: round2(avg_syllables_per_word),
        reading_time_minutes: word_count.div_ceil(WORDS_PER_MINUTE).max(1),
        long_sentences,
        suggestions,
    })
}

pub fn level_for(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "Very Easy",
        s if s >= 80.0 => "Easy",
        s if s >= 70.0 => "Fairly Easy",
        s if s >= 60.0 => "Standard",
        s if s >= 50.0 => "Fairly Difficult",
        s if s >= 30.0 => "Difficult",
        _ => "Very Difficult",
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Drop HTML tags and Markdown decoration, keeping paragraph breaks as blank lines.
fn strip_markup(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    let mut tag = String::new();

    for c in content.chars() {
        match (in_tag, c) {
            (false, '<') => {
                in_tag = true;
                tag.clear();
            }
            (true, '>') => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(
                    name.as_str(),
                    "p" | "div" | "br" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "tr"
                ) {
                    text.push_str("\n\n");
                }
            }
            (true, c) => tag.push(c),
            (false, c) => text.push(c),
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    // Normalise line endings, then strip Markdown per line
    let lines: Vec<String> = text.replace("\r\n", "\n").lines().map(strip_markdown_line).collect();

    // Collapse runs of blank lines into single paragraph breaks
    let mut out = String::with_capacity(text.len());
    let mut blank_run = false;
    for line in lines {
        if line.trim().is_empty() {
            blank_run = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { " " });
        }
        blank_run = false;
        out.push_str(line.trim());
    }
    out
}

fn strip_markdown_line(line: &str) -> String {
    let trimmed = line.trim_start();
    let trimmed = trimmed.trim_start_matches('#').trim_start_matches('>');
    let trimmed = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .unwrap_or(trimmed);

    // [text](url) and ![alt](url) keep only the bracketed text
    let mut out = String::with_capacity(trimmed.len());
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '!' if chars.peek() == Some(&'[') => {}
            ']' if chars.peek() == Some(&'(') => {
                for skipped in chars.by_ref() {
                    if skipped == ')' {
                        break;
                    }
                }
            }
            '[' | '*' | '_' | '`' => {}
            c => out.push(c),
        }
    }
    out
}

/// Split on runs of `.`, `!` or `?` followed by whitespace or end of text.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')') {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let at_boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
            if at_boundary {
                sentences.push(paragraph[start..end].trim());
                start = end;
            }
        }
    }
    if start < paragraph.len() {
        sentences.push(paragraph[start..].trim());
    }
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}

fn words(sentence: &str) -> Vec<String> {
    sentence
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect()
}

/// Vowel-group count with a silent trailing `e`, at least one per word.
fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word.to_lowercase().chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return 1;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y') || (!c.is_ascii() && c.is_alphabetic());
    let mut count = 0;
    let mut prev_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }

    let n = letters.len();
    if n > 2 && letters[n - 1] == 'e' && letters[n - 2] != 'l' && !is_vowel(letters[n - 2]) && count > 1 {
        count -= 1;
    }
    count.max(1)
}
