//! Text extractors: raw page content in, candidate emails and phone
//! numbers out.
//!
//! Pure and total: no I/O, and no input can make these functions fail —
//! unmatched or malformed text yields empty sets. Fault isolation across
//! the two categories happens in [`extract_contact_info`], so a broken
//! phone pass can never suppress email results or vice versa.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

use crate::record::ContactInfo;

/// Generic `local-part@domain.tld` shape. Also used to validate addresses
/// coming out of the structured tier.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email regex")
});

/// Permissive phone shape: optional country code, area code, exchange,
/// line number, optional extension. Group 1 captures the extension digits
/// so they can be excluded from the length filter.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\+?\d{1,3}[-. (]*)?\(?\d{3}\)?[-. )]*\d{3}[-. ]*\d{4}(?:\s*(?:ext\.?|x|#)\s*(\d{1,5}))?")
        .expect("phone regex")
});

/// Asset paths matched by the email regex ("logo@2x.png" and friends).
const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Validity filter for extracted phone numbers.
#[derive(Debug, Clone)]
pub struct PhoneFilter {
    /// Minimum stripped digit count.
    pub min_digits: usize,
    /// 3-digit area codes to keep. Empty = allow all.
    pub allowed_area_codes: Vec<String>,
}

impl Default for PhoneFilter {
    fn default() -> Self {
        Self {
            min_digits: 10,
            allowed_area_codes: Vec::new(),
        }
    }
}

/// Run both extractors against page content, each isolated so a failure
/// in one category degrades that category alone to empty.
pub fn extract_contact_info(text: &str, filter: &PhoneFilter) -> ContactInfo {
    let emails = guarded("email", || extract_emails(text));
    let phones = guarded("phone", || extract_phones(text, filter));
    ContactInfo { emails, phones }
}

/// Run one extraction category, degrading a panic to an empty result for
/// that category alone.
fn guarded<T, F>(category: &str, f: F) -> T
where
    T: Default,
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        warn!("{} extraction panicked; returning no results for it", category);
        T::default()
    })
}

/// Two-tier email extraction.
///
/// Tier one parses address-bearing lines with the RFC 5322 address-list
/// grammar, which handles display names, groups ("Sales: a@x.test;"),
/// comments and quoted strings. Web pages frequently break the strict
/// grammar, so when it yields nothing the generic pattern match runs over
/// the whole text instead.
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    let structured = parse_address_lines(text);
    if !structured.is_empty() {
        return structured;
    }

    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|email| keep_email(email))
        .collect()
}

/// Structured tier: try the address-list parser on each line containing
/// an `@`. Lines over the RFC 5322 length limit are skipped — minified
/// markup is never a well-formed address header.
fn parse_address_lines(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for line in text.lines() {
        let line = line.trim();
        if !line.contains('@') || line.len() > 998 {
            continue;
        }
        let Ok(list) = mailparse::addrparse(line) else {
            continue;
        };
        for addr in list.iter() {
            match addr {
                mailparse::MailAddr::Single(single) => insert_email(&mut out, &single.addr),
                mailparse::MailAddr::Group(group) => {
                    for single in &group.addrs {
                        insert_email(&mut out, &single.addr);
                    }
                }
            }
        }
    }
    out
}

fn insert_email(out: &mut BTreeSet<String>, addr: &str) {
    let addr = addr.trim().to_lowercase();
    // The lenient address grammar hands back whole prose phrases as
    // "addresses"; accept only strings that are an address and nothing
    // else. Also holds both tiers to the same local@domain.tld shape.
    let whole_string_is_address = EMAIL_RE
        .find(&addr)
        .map_or(false, |m| m.start() == 0 && m.end() == addr.len());
    if whole_string_is_address && keep_email(&addr) {
        out.insert(addr);
    }
}

fn keep_email(email: &str) -> bool {
    !IMAGE_SUFFIXES.iter().any(|suffix| email.ends_with(suffix))
}

/// Single-pass phone extraction with a crude length filter: no
/// numbering-plan validation, just "enough digits to be a full number".
pub fn extract_phones(text: &str, filter: &PhoneFilter) -> BTreeSet<String> {
    let mut phones = BTreeSet::new();
    for caps in PHONE_RE.captures_iter(text) {
        let Some(full) = caps.get(0) else { continue };
        let ext_len = caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);

        let digits: String = full.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        // Extension digits do not count toward number length.
        let core = &digits[..digits.len() - ext_len];

        if keep_digits(core, filter) {
            phones.insert(full.as_str().trim().to_string());
        }
    }
    phones
}

fn keep_digits(digits: &str, filter: &PhoneFilter) -> bool {
    if digits.len() < filter.min_digits {
        return false;
    }
    let area = match digits.len() {
        10 => &digits[0..3],
        // 11 digits must be a trunk/country prefix plus a 10-digit number.
        11 if digits.starts_with('1') || digits.starts_with('0') => &digits[1..4],
        11 => return false,
        // Longer international forms: keep, no area-code position to check.
        12..=14 => return true,
        _ => return false,
    };
    filter.allowed_area_codes.is_empty()
        || filter.allowed_area_codes.iter().any(|code| code == area)
}
