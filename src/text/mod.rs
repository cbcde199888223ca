//! # Text Layout
//!
//! Greedy word wrapping and case transforms for paragraph text.

use crate::font::TextMeasure;
use crate::style::TextTransform;
use unicode_linebreak::linebreaks;

/// One wrapped line and its measured width.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub width: f64,
}

/// Break `text` into lines no wider than `max_width` where possible.
///
/// Lines are filled greedily up to the next UAX #14 break opportunity, so
/// spaces, hyphens and the gaps between ideographs can all end a line. A
/// segment wider than the line gets a line of its own. Runs of whitespace
/// collapse to one space and explicit newlines always break. Returns at least
/// one (possibly empty) line.
pub fn wrap_lines(text: &str, max_width: f64, size: f64, measure: &dyn TextMeasure) -> Vec<Line> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let collapsed = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut current = String::new();
        let mut start = 0;

        for (end, _) in linebreaks(&collapsed) {
            let segment = &collapsed[start..end];
            start = end;
            if segment.is_empty() {
                continue;
            }
            let candidate = format!("{}{}", current, segment);
            if current.is_empty() || measure.text_width(candidate.trim_end(), size) <= max_width {
                current = candidate;
            } else {
                lines.push(finish_line(&current, size, measure));
                current = segment.to_string();
            }
        }

        lines.push(finish_line(&current, size, measure));
    }

    lines
}

fn finish_line(text: &str, size: f64, measure: &dyn TextMeasure) -> Line {
    let text = text.trim_end();
    Line {
        text: text.to_string(),
        width: measure.text_width(text, size),
    }
}

pub fn apply_text_transform(text: &str, transform: TextTransform) -> String {
    match transform {
        TextTransform::None => text.to_string(),
        TextTransform::Uppercase => text.to_uppercase(),
        TextTransform::Lowercase => text.to_lowercase(),
        TextTransform::Capitalize => {
            // First letter of each word up, the rest down.
            let mut result = String::with_capacity(text.len());
            let mut at_word_start = true;
            for ch in text.chars() {
                if ch.is_alphanumeric() {
                    if at_word_start {
                        result.extend(ch.to_uppercase());
                    } else {
                        result.extend(ch.to_lowercase());
                    }
                    at_word_start = false;
                } else {
                    result.push(ch);
                    at_word_start = true;
                }
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FallbackMetrics;

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn single_line_fits() {
        let lines = wrap_lines("Hello world", 200.0, 10.0, &FallbackMetrics);
        assert_eq!(texts(&lines), vec!["Hello world"]);
        assert!((lines[0].width - 55.0).abs() < 0.01);
    }

    #[test]
    fn breaks_at_spaces() {
        // Each char is 5pt wide at size 10, so "aaa bbb" is 35pt.
        let lines = wrap_lines("aaa bbb ccc", 35.0, 10.0, &FallbackMetrics);
        assert_eq!(texts(&lines), vec!["aaa bbb", "ccc"]);
        assert!((lines[1].width - 15.0).abs() < 0.01);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        let lines = wrap_lines("a extraordinarily b", 20.0, 10.0, &FallbackMetrics);
        assert_eq!(texts(&lines), vec!["a", "extraordinarily", "b"]);
    }

    #[test]
    fn ideographs_wrap_without_spaces() {
        // 60 ideographs at 5pt each on a 100pt line: 20 per line.
        let text = "漢字".repeat(30);
        let lines = wrap_lines(&text, 100.0, 10.0, &FallbackMetrics);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.width <= 100.0 + 0.01));
        assert_eq!(lines.iter().map(|l| l.text.as_str()).collect::<String>(), text);
    }

    #[test]
    fn collapses_repeated_spaces() {
        let lines = wrap_lines("aaa   bbb", 100.0, 10.0, &FallbackMetrics);
        assert_eq!(texts(&lines), vec!["aaa bbb"]);
    }

    #[test]
    fn newline_forces_break() {
        let lines = wrap_lines("one\ntwo", 500.0, 10.0, &FallbackMetrics);
        assert_eq!(texts(&lines), vec!["one", "two"]);
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        let lines = wrap_lines("", 100.0, 10.0, &FallbackMetrics);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width, 0.0);
    }

    #[test]
    fn transforms() {
        assert_eq!(apply_text_transform("Hello", TextTransform::Uppercase), "HELLO");
        assert_eq!(apply_text_transform("HeLLo", TextTransform::Lowercase), "hello");
        assert_eq!(
            apply_text_transform("hELLO wide-world", TextTransform::Capitalize),
            "Hello Wide-World"
        );
        assert_eq!(apply_text_transform("as is", TextTransform::None), "as is");
    }
}
