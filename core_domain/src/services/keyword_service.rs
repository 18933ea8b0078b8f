// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Keyword Service
//!
//! Keyword extraction: splitting and normalising the caller-supplied
//! manual keyword list, and scanning block data for automatically
//! extracted tokens (dates, numbers, emails, URLs, structured codes,
//! currency codes).

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::value_objects::Keyword;

/// Automatic keyword extraction never emits more than this many tokens
/// per block; additional matches beyond the cap are discarded in scan
/// order, keeping extraction deterministic.
pub const MAX_AUTO_KEYWORDS: usize = 256;

const CURRENCY_CODES: [&str; 5] = ["EUR", "USD", "GBP", "CHF", "JPY"];

/// Splits a comma-separated manual keyword string into normalised,
/// deduplicated [`Keyword`]s. Blank entries are dropped silently.
pub fn split_manual_keywords(raw: &str) -> Result<BTreeSet<Keyword>, crate::error::BlockchainError> {
    let mut out = BTreeSet::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.insert(Keyword::new(trimmed)?);
    }
    Ok(out)
}

/// Scans `data` for automatically extractable keywords against the
/// fixed pattern list, capped at [`MAX_AUTO_KEYWORDS`].
pub fn extract_auto_keywords(data: &str) -> BTreeSet<Keyword> {
    let mut found = Vec::new();
    for pattern in [iso_date_re(), number_re(), email_re(), url_re(), structured_code_re()] {
        for m in pattern.find_iter(data) {
            found.push(m.as_str().to_string());
            if found.len() >= MAX_AUTO_KEYWORDS {
                break;
            }
        }
        if found.len() >= MAX_AUTO_KEYWORDS {
            break;
        }
    }
    for token in data.split_whitespace() {
        let upper = token.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_uppercase();
        if CURRENCY_CODES.contains(&upper.as_str()) {
            found.push(upper);
        }
    }

    found
        .into_iter()
        .take(MAX_AUTO_KEYWORDS)
        .filter_map(|raw| Keyword::new(&raw).ok())
        .collect()
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b|\b\d{4}/\d{2}/\d{2}\b").unwrap())
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3,}\b").unwrap())
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[\w.+-]+@[\w-]+\.[\w.-]+\b").unwrap())
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+|\bwww\.[^\s]+").unwrap())
}

fn structured_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{2,}-[A-Z0-9]{2,}(?:-[A-Z0-9]+)*\b").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_manual_keywords_trims_and_dedupes() {
        let set = split_manual_keywords(" Invoice, invoice ,  , Paid").unwrap();
        let strs: Vec<_> = set.iter().map(|k| k.as_str().to_string()).collect();
        assert_eq!(strs, vec!["invoice".to_string(), "paid".to_string()]);
    }

    #[test]
    fn extracts_iso_dates_and_numbers() {
        let found = extract_auto_keywords("invoice dated 2026-07-28 for amount 15000");
        let strs: BTreeSet<String> = found.iter().map(|k| k.as_str().to_string()).collect();
        assert!(strs.contains("2026-07-28"));
        assert!(strs.contains("15000"));
    }

    #[test]
    fn extracts_slash_dates_and_bare_www_hosts() {
        let found = extract_auto_keywords("filed 2026/07/28 see www.example.com for details");
        let strs: BTreeSet<String> = found.iter().map(|k| k.as_str().to_string()).collect();
        assert!(strs.contains("2026/07/28"));
        assert!(strs.iter().any(|s| s.contains("www.example.com")));
    }

    #[test]
    fn extracts_emails_urls_and_structured_codes() {
        let found = extract_auto_keywords(
            "contact alice@example.com via https://example.com/x ref ORD-12AB-99",
        );
        let strs: BTreeSet<String> = found.iter().map(|k| k.as_str().to_string()).collect();
        assert!(strs.iter().any(|s| s.contains("alice")));
        assert!(strs.iter().any(|s| s.contains("example.com")));
        assert!(strs.iter().any(|s| s.contains("ord-12ab-99")));
    }

    #[test]
    fn extracts_known_currency_codes_case_insensitively() {
        let found = extract_auto_keywords("paid 100 eur and 200 USD");
        let strs: BTreeSet<String> = found.iter().map(|k| k.as_str().to_string()).collect();
        assert!(strs.contains("eur"));
        assert!(strs.contains("usd"));
    }

    #[test]
    fn caps_auto_keywords_at_the_limit() {
        let data: String = (0..(MAX_AUTO_KEYWORDS + 50))
            .map(|n| format!("{:04}-01-01 ", 1000 + n))
            .collect();
        let found = extract_auto_keywords(&data);
        assert!(found.len() <= MAX_AUTO_KEYWORDS);
    }
}
