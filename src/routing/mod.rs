//! Call routing.
//!
//! Decides which human actor a call leg is connected to: inbound legs route
//! by the dialed number's assignment, outbound legs dial either a registered
//! client endpoint or a raw PSTN number. Caller-ID for outbound legs always
//! comes from the originating actor.

mod caller_id;
mod resolver;

pub use caller_id::CallerIdResolver;
pub use resolver::{DialTarget, RoutingResolver};

use std::sync::OnceLock;

use regex::Regex;

/// Strip common formatting from a phone number, keeping a leading `+`.
///
/// Returns `None` when nothing number-like remains.
pub fn normalize_number(raw: &str) -> Option<String> {
    static NON_DIGIT: OnceLock<Regex> = OnceLock::new();
    let non_digit = NON_DIGIT.get_or_init(|| Regex::new(r"\D").expect("valid regex"));

    let trimmed = raw.trim();
    let (prefix, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let digits = non_digit.replace_all(rest, "");
    if digits.is_empty() {
        return None;
    }

    Some(format!("{prefix}{digits}"))
}
