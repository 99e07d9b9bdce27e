use std::sync::Arc;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::domain::heuristics::{CONTACT_LINK_TEXTS, CONTACT_PATHS, FALLBACK_CONTACT_PATHS};

use super::PageFetcher;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Finds the imprint/contact page of a site.
pub struct ContactLocator {
    fetcher: Arc<PageFetcher>,
}

impl ContactLocator {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        ContactLocator { fetcher }
    }

    /// Conventional paths first, then homepage anchors, then a reduced probe list
    /// once more. First hit wins.
    pub async fn locate(&self, base_url: &Url, homepage_html: &str) -> Option<Url> {
        if let Some(url) = self.probe(base_url, CONTACT_PATHS).await {
            log::info!("Found contact page by path: {}", url);
            return Some(url);
        }

        if let Some(url) = find_contact_link(base_url, homepage_html) {
            log::info!("Found contact page link: {}", url);
            return Some(url);
        }

        if let Some(url) = self.probe(base_url, FALLBACK_CONTACT_PATHS).await {
            log::info!("Found contact page on fallback probe: {}", url);
            return Some(url);
        }

        log::warn!("No contact page found for {}", base_url);
        None
    }

    async fn probe(&self, base_url: &Url, paths: &[&str]) -> Option<Url> {
        for path in paths {
            let Ok(candidate) = base_url.join(path) else {
                continue;
            };
            if self.fetcher.exists(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }
}

/// First anchor whose text names an imprint/contact page, resolved against
/// `base_url`.
pub fn find_contact_link(base_url: &Url, html: &str) -> Option<Url> {
    let document = Html::parse_document(html);

    document.select(&LINK_SELECTOR).find_map(|link| {
        let href = link.value().attr("href")?.trim();
        if href.is_empty() || is_non_page_href(href) {
            return None;
        }

        let text = link.text().collect::<String>().to_lowercase();
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let title = link.value().attr("title").unwrap_or_default().to_lowercase();

        CONTACT_LINK_TEXTS
            .iter()
            .any(|pattern| text.contains(pattern) || title.contains(pattern))
            .then(|| base_url.join(href).ok())
            .flatten()
    })
}

fn is_non_page_href(href: &str) -> bool {
    let href = href.to_lowercase();
    href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://pizzeria-roma.de/").unwrap()
    }

    #[test]
    fn anchor_text_resolves_relative_href() {
        let html = r#"
            <html><body>
                <nav><a href="/menu">Speisekarte</a></nav>
                <footer><a href="/legal-notice">Impressum</a></footer>
            </body></html>
        "#;
        let found = find_contact_link(&base(), html).unwrap();
        assert_eq!(found.as_str(), "https://pizzeria-roma.de/legal-notice");
    }

    #[test]
    fn anchor_text_is_case_and_whitespace_insensitive() {
        let html = r#"<a href="team.html">  Über
            Uns </a>"#;
        let found = find_contact_link(&base(), html).unwrap();
        assert_eq!(found.as_str(), "https://pizzeria-roma.de/team.html");
    }

    #[test]
    fn absolute_hrefs_are_kept() {
        let html = r#"<a href="https://legal.pizzeria-roma.de/imprint">Imprint</a>"#;
        let found = find_contact_link(&base(), html).unwrap();
        assert_eq!(found.as_str(), "https://legal.pizzeria-roma.de/imprint");
    }

    #[test]
    fn mailto_and_fragment_links_are_skipped() {
        let html = r##"
            <a href="mailto:info@pizzeria-roma.de">Kontakt</a>
            <a href="#contact">Contact</a>
            <a href="/kontakt-formular">Kontakt</a>
        "##;
        let found = find_contact_link(&base(), html).unwrap();
        assert_eq!(found.as_str(), "https://pizzeria-roma.de/kontakt-formular");
    }

    #[test]
    fn no_matching_anchor() {
        let html = r#"<a href="/menu">Speisekarte</a><a href="/blog">Blog</a>"#;
        assert!(find_contact_link(&base(), html).is_none());
    }
}
