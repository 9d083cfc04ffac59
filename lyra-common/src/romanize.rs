//! Local rule-based pinyin transliteration
//!
//! Deterministic: the same text and tone mode always produce the same output. Used by the
//! service when the primary engine is unavailable and by clients for instant placeholders.

use crate::model::ToneMode;
use pinyin::ToPinyin;

/// Romanize a line of text
///
/// Hanzi become space-separated syllables. Latin text passes through unchanged,
/// full-width punctuation is folded to its ASCII form and attached to the preceding syllable.
pub fn romanize(text: &str, mode: ToneMode) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut after_syllable = false;

    for ch in text.chars() {
        if let Some(reading) = ch.to_pinyin() {
            let syllable = match mode {
                ToneMode::Marks => reading.with_tone(),
                ToneMode::Numbers => reading.with_tone_num_end(),
            };
            if needs_space(&out) {
                out.push(' ');
            }
            out.push_str(syllable);
            after_syllable = true;
            continue;
        }

        let ch = fold_punctuation(ch);
        if ch.is_whitespace() {
            if needs_space(&out) {
                out.push(' ');
            }
        } else {
            if after_syllable && ch.is_alphanumeric() {
                out.push(' ');
            }
            out.push(ch);
        }
        after_syllable = false;
    }

    out.trim_end().to_string()
}

/// Romanize every line, mapping blank lines to empty strings
pub fn romanize_lines<S: AsRef<str>>(lines: &[S], mode: ToneMode) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            if line.trim().is_empty() {
                String::new()
            } else {
                romanize(line, mode)
            }
        })
        .collect()
}

fn needs_space(out: &str) -> bool {
    match out.chars().last() {
        None => false,
        Some(last) => !last.is_whitespace() && !matches!(last, '(' | '[' | '"' | '\''),
    }
}

fn fold_punctuation(ch: char) -> char {
    match ch {
        '，' | '、' => ',',
        '。' => '.',
        '！' => '!',
        '？' => '?',
        '：' => ':',
        '；' => ';',
        '（' => '(',
        '）' => ')',
        '“' | '”' | '「' | '」' => '"',
        '‘' | '’' => '\'',
        '　' => ' ',
        other => other,
    }
}
