//! Low-level text and markup helpers shared by the portal scrapers.
//!
//! Price and feature extraction work on the text portals actually display
//! (`"€ 1.250.000"`, `"120 m²"`, `"3 locali"`); the selector helpers walk an
//! ordered fallback list so portal markup churn degrades to a missing field
//! instead of a lost card. See [`crate::portals`] for how these compose into
//! full card parsing.

use scraper::{ElementRef, Selector};

/// Structured features extracted from a card's feature lines.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct CardFeatures {
    pub sqm: Option<f64>,
    pub rooms: Option<u32>,
    pub bathrooms: Option<u32>,
}

/// Parses a price displayed with dot thousands separators.
///
/// Matching rules:
/// - currency symbols, separators, and whitespace are ignored;
/// - every digit group is concatenated, so `"€ 250 000"` and `"€250.000"`
///   both yield `250000.0`;
/// - text without digits (e.g. `"Prezzo su richiesta"`) yields `None`.
#[must_use]
pub(crate) fn parse_price(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parses a price displayed with dot thousands separators and an optional
/// comma decimal part, as casa.it renders rents: `"€ 1.250,50"` → `1250.5`.
#[must_use]
pub(crate) fn parse_decimal_price(text: &str) -> Option<f64> {
    let cleaned = text.replace('.', "").replace(',', ".");
    let bytes = cleaned.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut end = start;
    let mut seen_dot = false;
    while end < bytes.len() {
        let byte = bytes[end];
        if byte.is_ascii_digit() {
            end += 1;
        } else if byte == b'.' && !seen_dot && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }
    cleaned[start..end].parse().ok()
}

/// Returns the first run of digits in `text` as an integer.
#[must_use]
pub(crate) fn first_number(text: &str) -> Option<u32> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let end = bytes[start..]
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .map_or(bytes.len(), |offset| start + offset);
    text[start..end].parse().ok()
}

/// Extracts square meters, room count, and bathroom count from the feature
/// lines of a listing card.
///
/// Each line matches at most one field (first marker set that hits wins the
/// line) and later lines overwrite earlier values:
/// - square meters: `"m²"`, `"mq"`, `"metri"`
/// - rooms: `"local"`, `"vani"`, `"stanze"`
/// - bathrooms: `"bagn"`
#[must_use]
pub(crate) fn parse_features(lines: &[String]) -> CardFeatures {
    const SQM_MARKERS: [&str; 3] = ["m²", "mq", "metri"];
    const ROOM_MARKERS: [&str; 3] = ["local", "vani", "stanze"];

    let mut features = CardFeatures::default();
    for line in lines {
        let text = line.to_lowercase();
        if SQM_MARKERS.iter().any(|marker| text.contains(marker)) {
            if let Some(value) = first_number(&text) {
                features.sqm = Some(f64::from(value));
            }
        } else if ROOM_MARKERS.iter().any(|marker| text.contains(marker)) {
            if let Some(value) = first_number(&text) {
                features.rooms = Some(value);
            }
        } else if text.contains("bagn") {
            if let Some(value) = first_number(&text) {
                features.bathrooms = Some(value);
            }
        }
    }
    features
}

/// Resolves an href against a portal base URL.
#[must_use]
pub(crate) fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}

/// First non-empty text content among `selectors`, whitespace-collapsed.
///
/// Selectors are tried in order; one that fails to parse is skipped, and a
/// match with empty text falls through to the next candidate.
#[must_use]
pub(crate) fn select_first_text(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = scope.select(&selector).next() {
            let text = collapse_whitespace(&element.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First non-empty value of `attr` among elements matching `selectors`.
#[must_use]
pub(crate) fn select_first_attr(
    scope: ElementRef<'_>,
    selectors: &[&str],
    attr: &str,
) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for element in scope.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Text content of every element matching `selector`, one line per element.
#[must_use]
pub(crate) fn select_all_texts(scope: ElementRef<'_>, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    scope
        .select(&selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
