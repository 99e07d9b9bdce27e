use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::domain::{
    heuristics::{
        matches_domain_list, ASSET_EXTENSIONS, EMAIL_LABELS, EXCLUDED_EMAIL_DOMAINS,
        PLACEHOLDER_LOCAL_PARTS, SUSPICIOUS_DOMAIN_SUFFIXES, SUSPICIOUS_LOCAL_SUFFIXES,
    },
    split_email,
};

const MAX_EMAIL_LEN: usize = 100;
/// `a.b.c@firm.de` passes, `a.b.c.d@firm.de` does not.
const MAX_LOCAL_DOTS: usize = 2;
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];
const CLOUDFLARE_MASK: &str = "email protected";

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static LABELED_EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    let labels = EMAIL_LABELS.iter().map(|label| regex::escape(label)).join("|");
    Regex::new(&format!(
        r"(?i:{})\s*:\s*([A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[a-z]{{2,6}})\b",
        labels
    ))
    .unwrap()
});

static BRACKETED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)([a-z0-9._%+-]+)\s*[\[({]\s*(?:at|ät|@)\s*[\])}]\s*([a-z0-9-]+(?:\s*[\[({]\s*(?:dot|punkt)\s*[\])}]\s*[a-z0-9-]+|\.[a-z0-9-]+)+)",
    )
    .unwrap()
});

static BRACKETED_DOT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[\[({]\s*(?:dot|punkt)\s*[\])}]\s*").unwrap());

static SPACED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9._%+-]+)\s+@\s+([A-Za-z0-9-]+(?:(?:\s+\.\s+|\.)[A-Za-z0-9-]+)+)")
        .unwrap()
});

static DIGIT_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{5,}").unwrap());

/// Where the HTML came from. Script-built documents also get a raw markup scan,
/// since rendered pages often keep addresses in attributes or inline data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    #[default]
    Static,
    Rendered,
}

/// Mines every address-like string from a page, drops the noise and returns the
/// survivors lowercased and deduplicated, mailto addresses first.
pub fn extract_emails(html: &str, mode: ExtractionMode) -> Vec<String> {
    let document = Html::parse_document(html);
    let text = visible_text(&document);

    let mut candidates = mailto_addresses(&document);
    candidates.extend(labeled_addresses(&text));
    candidates.extend(text_addresses(&text));
    candidates.extend(deobfuscated_addresses(&text));
    if mode == ExtractionMode::Rendered {
        candidates.extend(
            EMAIL_REGEX
                .find_iter(html)
                .map(|m| m.as_str().to_string()),
        );
    }

    let emails: Vec<String> = candidates
        .into_iter()
        .map(|email| email.trim().trim_end_matches('.').to_lowercase())
        .unique()
        .filter(|email| is_plausible_email(email))
        .collect();

    log::debug!("Extracted {} candidate emails ({:?})", emails.len(), mode);
    emails
}

/// The noise filter: phone-number artifacts, concatenated or mis-split text,
/// tracking and placeholder domains, template addresses and bogus TLDs.
pub fn is_plausible_email(email: &str) -> bool {
    if email.len() >= MAX_EMAIL_LEN || email.contains('*') || email.contains(CLOUDFLARE_MASK) {
        return false;
    }
    let Some((local, domain)) = split_email(email) else {
        return false;
    };
    let local = local.to_lowercase();
    let domain = domain.to_lowercase();

    if local.starts_with(|c: char| c.is_ascii_digit()) || DIGIT_RUN_REGEX.is_match(&local) {
        return false;
    }
    if local.matches('.').count() > MAX_LOCAL_DOTS {
        return false;
    }
    let tld = domain.rsplit('.').next().unwrap_or_default();
    if has_glued_suffix(&local, SUSPICIOUS_LOCAL_SUFFIXES)
        || has_glued_suffix(tld, SUSPICIOUS_DOMAIN_SUFFIXES)
    {
        return false;
    }
    if matches_domain_list(&domain, EXCLUDED_EMAIL_DOMAINS) {
        return false;
    }
    if is_placeholder_local_part(&local) {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((rest, tld)) => {
            !rest.is_empty()
                && tld.len() >= 2
                && tld.chars().all(|c| c.is_ascii_alphabetic())
                && !ASSET_EXTENSIONS.contains(&tld)
        }
        None => false,
    }
}

/// `hauptstrasse` ends in a fragment, `strasse` on its own does not.
fn has_glued_suffix(text: &str, suffixes: &[&str]) -> bool {
    suffixes
        .iter()
        .any(|suffix| text.len() > suffix.len() && text.ends_with(suffix))
}

fn is_placeholder_local_part(local: &str) -> bool {
    PLACEHOLDER_LOCAL_PARTS.contains(&local) || local.chars().all(|c| c == 'x')
}

fn mailto_addresses(document: &Html) -> Vec<String> {
    document
        .select(&LINK_SELECTOR)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| {
            let href = href.trim();
            href.get(..7)
                .filter(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
                .map(|_| &href[7..])
        })
        .flat_map(|target| {
            let recipients = target.split('?').next().unwrap_or_default();
            recipients
                .split([',', ';'])
                .map(|address| address.replace("%40", "@").replace("%20", ""))
                .map(|address| address.trim().to_lowercase())
                .filter(|address| address.contains('@'))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Addresses right after a contact label, held to a stricter shape.
fn labeled_addresses(text: &str) -> Vec<String> {
    LABELED_EMAIL_REGEX
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Regex matches over visible text that stand on their own, i.e. are not glued to
/// neighbouring words.
fn text_addresses(text: &str) -> Vec<String> {
    EMAIL_REGEX
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            before.map_or(true, is_separator) && after.map_or(true, is_separator)
        })
        .map(|m| m.as_str().to_string())
        .collect()
}

fn is_separator(c: char) -> bool {
    !(c.is_alphanumeric() || c == '_' || c == '@')
}

/// `info [at] firm [dot] de`, `info (at) firm.de` and `info @ firm . de`.
fn deobfuscated_addresses(text: &str) -> Vec<String> {
    let bracketed = BRACKETED_REGEX.captures_iter(text).map(|captures| {
        let domain = BRACKETED_DOT_REGEX.replace_all(&captures[2], ".");
        format!("{}@{}", &captures[1], domain)
    });

    let spaced = SPACED_REGEX.captures_iter(text).map(|captures| {
        let domain: String = captures[2].split_whitespace().collect();
        format!("{}@{}", &captures[1], domain)
    });

    bracketed.chain(spaced).collect()
}

/// Text nodes outside of script/style-like elements, joined and whitespace
/// normalized.
fn visible_text(document: &Html) -> String {
    document
        .tree
        .nodes()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
            });
            (!hidden).then(|| text.to_string())
        })
        .join(" ")
        .split_whitespace()
        .join(" ")
}
