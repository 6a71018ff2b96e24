//! Small string helpers: slugs, number extraction, acronyms, entropy

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

pub use crate::content::hash_utf8;

static NUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\.?\d+\.?\d*").expect("Invalid number regex"));
static INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("Invalid integer regex"));

/// Characters stripped by `remove_chars` when no set is given
pub const MARKDOWN_CHARS: &str = r"\`*_{}[]()>#+-.!$";

/// Sanitize a string for use in file names
///
/// Form-encodes the UTF-8 bytes, turns spaces into `_`, and lowercases.
pub fn get_slug(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "_")
        .to_lowercase()
}

/// `YYYYMMDDHHMMSS`
pub fn date_slug(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y%m%d%H%M%S").to_string()
}

/// Slug for the current local time
pub fn date_slug_now() -> String {
    date_slug(chrono::Local::now().naive_local())
}

/// All decimal numbers in a string
pub fn get_nums(text: &str) -> Vec<f64> {
    NUM_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// All integers in a string (values that overflow `i64` are dropped)
pub fn get_ints(text: &str) -> Vec<i64> {
    INT_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Whether the string parses as a float
pub fn is_number(text: &str) -> bool {
    text.trim().parse::<f64>().is_ok()
}

/// Whether the string parses as a float once separators are removed
pub fn is_number_like(text: &str) -> bool {
    is_number(&remove_chars(text, r",._-)(][/\", ""))
}

/// Runs of two or more non-lowercase characters
pub fn get_acronyms(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_ascii_lowercase() || c.is_whitespace())
        .filter(|word| word.chars().count() > 1)
        .map(String::from)
        .collect()
}

/// Insert a space before each word boundary in camelCase text
///
/// A boundary is an uppercase letter after a lowercase one, or an uppercase
/// letter (not the first) followed by a lowercase one.
pub fn split_camel_case(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let after_lower = chars[i - 1].is_ascii_lowercase();
            let before_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if after_lower || before_lower {
                out.push(' ');
            }
        }
        out.push(c);
    }

    out
}

/// Replace every character of `chars` in `text` with `new`
pub fn remove_chars(text: &str, chars: &str, new: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if chars.contains(c) {
            out.push_str(new);
        } else {
            out.push(c);
        }
    }
    out
}

/// Shannon entropy in bits per byte, over all byte values
pub fn entropy(data: &[u8]) -> f64 {
    entropy_over(data, 0..=255u8)
}

/// Shannon entropy counting only printable ASCII
pub fn entropy_printable(data: &[u8]) -> f64 {
    entropy_over(data, (0..=255u8).filter(|b| b.is_ascii_graphic() || b.is_ascii_whitespace()))
}

fn entropy_over(data: &[u8], alphabet: impl Iterator<Item = u8>) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0usize; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let len = data.len() as f64;
    alphabet
        .map(|b| counts[b as usize])
        .filter(|&n| n > 0)
        .map(|n| {
            let p = n as f64 / len;
            -p * p.log2()
        })
        .sum()
}
