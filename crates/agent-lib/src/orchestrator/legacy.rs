//! Numeric extraction from free-form stage text
//!
//! Used only when the anomaly stage input is a thread message rather than
//! a structured anomaly list.

use regex::Regex;
use std::sync::OnceLock;

/// Category used when the text does not name a metric
pub const DEFAULT_CATEGORY: &str = "cpu";

static NUMERIC_TOKEN: OnceLock<Regex> = OnceLock::new();

fn numeric_token() -> &'static Regex {
    NUMERIC_TOKEN.get_or_init(|| Regex::new(r"\d+\.?\d*").expect("numeric token pattern is valid"))
}

/// First decimal token in `text` and the metric named on its line
///
/// The metric is the text left of `" = "` on the line holding the token,
/// or `cpu` when that line has no such separator.
pub fn parse_representative(text: &str) -> Option<(String, f64)> {
    for line in text.lines() {
        let Some(token) = numeric_token().find(line) else {
            continue;
        };
        let value: f64 = token.as_str().parse().ok()?;

        let category = line
            .split_once(" = ")
            .map(|(left, _)| left.trim())
            .filter(|left| !left.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        return Some((category.to_string(), value));
    }
    None
}
