use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{
    heuristics::{
        ABOUT_LABELS, MAX_ABOUT_CHARS, MAX_SERVICES, MIN_ABOUT_PARAGRAPH_CHARS, SERVICE_KEYWORDS,
    },
    BusinessMetadata,
};

const MAX_SERVICE_CHARS: usize = 80;
const MIN_ABOUT_SECTION_CHARS: usize = 40;
const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

static META_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static LIST_ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static NAV_ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("nav li, header li").unwrap());
static NAV_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("nav a, header a").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static ABOUT_SECTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"[id*="about"], [class*="about"], [id*="ueber-uns"], [class*="ueber-uns"], [id*="uber-uns"]"#,
    )
    .unwrap()
});

/// Description, keywords, a short services list and an "about" snippet.
pub fn extract_metadata(html: &str) -> BusinessMetadata {
    let document = Html::parse_document(html);

    let meta_description = meta_content(&document, "name", "description")
        .or_else(|| meta_content(&document, "property", "og:description"));
    let meta_keywords = meta_content(&document, "name", "keywords");

    let services = headed_list_services(&document)
        .into_iter()
        .chain(navigation_services(&document))
        .filter(|service| is_service_entry(service))
        .unique_by(|service| service.to_lowercase())
        .take(MAX_SERVICES)
        .collect();

    let about_text = labeled_about_section(&document)
        .or_else(|| marked_about_section(&document))
        .or_else(|| meta_description.clone())
        .or_else(|| first_long_paragraph(&document))
        .map(|text| truncate_chars(&text, MAX_ABOUT_CHARS));

    BusinessMetadata {
        meta_description,
        meta_keywords,
        services,
        about_text,
    }
}

fn meta_content(document: &Html, attribute: &str, key: &str) -> Option<String> {
    document
        .select(&META_SELECTOR)
        .filter(|meta| {
            meta.value()
                .attr(attribute)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(key))
        })
        .filter_map(|meta| meta.value().attr("content"))
        .map(normalize_whitespace)
        .find(|content| !content.is_empty())
}

/// List items between a heading that mentions services and the next heading.
fn headed_list_services(document: &Html) -> Vec<String> {
    document
        .select(&HEADING_SELECTOR)
        .filter(|heading| mentions_any(&element_text(heading), SERVICE_KEYWORDS))
        .flat_map(|heading| {
            heading
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .take_while(|sibling| !is_heading(sibling))
                .flat_map(|sibling| list_item_texts(&sibling))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Navigation links named like a service ("Catering Service"), then sub-menu
/// entries under a navigation item named like a services page.
fn navigation_services(document: &Html) -> Vec<String> {
    let links = document
        .select(&NAV_LINK_SELECTOR)
        .map(|link| element_text(&link))
        .filter(|text| mentions_any(text, SERVICE_KEYWORDS));

    let submenus = document
        .select(&NAV_ITEM_SELECTOR)
        .filter(|item| {
            item.select(&LINK_SELECTOR)
                .next()
                .is_some_and(|link| mentions_any(&element_text(&link), SERVICE_KEYWORDS))
        })
        .flat_map(|item| {
            item.select(&LIST_ITEM_SELECTOR)
                .filter(|nested| nested.id() != item.id())
                .map(|nested| element_text(&nested))
                .collect::<Vec<_>>()
        });

    links.chain(submenus).collect()
}

fn list_item_texts(element: &ElementRef) -> Vec<String> {
    match element.value().name() {
        "li" => vec![element_text(element)],
        _ => element
            .select(&LIST_ITEM_SELECTOR)
            .map(|item| element_text(&item))
            .collect(),
    }
}

/// Drops empty or sentence-long entries and bare section titles like "Leistungen".
fn is_service_entry(service: &str) -> bool {
    let lowered = service.to_lowercase();
    !service.is_empty()
        && service.chars().count() <= MAX_SERVICE_CHARS
        && !SERVICE_KEYWORDS.contains(&lowered.as_str())
}

/// Text that follows an "about us" heading, up to the next heading.
fn labeled_about_section(document: &Html) -> Option<String> {
    document
        .select(&HEADING_SELECTOR)
        .filter(|heading| mentions_any(&element_text(heading), ABOUT_LABELS))
        .map(|heading| {
            heading
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .take_while(|sibling| !is_heading(sibling))
                .map(|sibling| element_text(&sibling))
                .filter(|text| !text.is_empty())
                .join(" ")
        })
        .find(|text| !text.is_empty())
}

fn marked_about_section(document: &Html) -> Option<String> {
    document
        .select(&ABOUT_SECTION_SELECTOR)
        .map(|section| element_text(&section))
        .find(|text| text.chars().count() >= MIN_ABOUT_SECTION_CHARS)
}

fn first_long_paragraph(document: &Html) -> Option<String> {
    document
        .select(&PARAGRAPH_SELECTOR)
        .map(|paragraph| element_text(&paragraph))
        .find(|text| text.chars().count() > MIN_ABOUT_PARAGRAPH_CHARS)
}

fn is_heading(element: &ElementRef) -> bool {
    HEADINGS.contains(&element.value().name())
}

fn mentions_any(text: &str, needles: &[&str]) -> bool {
    let text = text.to_lowercase();
    needles.iter().any(|needle| text.contains(needle))
}

fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_tags_with_open_graph_fallback() {
        let html = r#"
            <html><head>
                <META NAME="Description" content="  Steuerberatung in   Köln ">
                <meta name="keywords" content="steuer, beratung">
            </head><body></body></html>
        "#;
        let metadata = extract_metadata(html);
        assert_eq!(
            metadata.meta_description.as_deref(),
            Some("Steuerberatung in Köln")
        );
        assert_eq!(metadata.meta_keywords.as_deref(), Some("steuer, beratung"));

        let html = r#"<head><meta property="og:description" content="Pizza aus dem Steinofen"></head>"#;
        assert_eq!(
            extract_metadata(html).meta_description.as_deref(),
            Some("Pizza aus dem Steinofen")
        );
    }

    #[test]
    fn services_follow_a_services_heading() {
        let html = r#"
            <section>
                <h2>Unsere Leistungen</h2>
                <ul>
                    <li>Steuerberatung</li>
                    <li>Lohnbuchhaltung</li>
                    <li>Jahresabschluss</li>
                </ul>
                <h2>Team</h2>
                <ul><li>Anna Schmidt</li></ul>
            </section>
        "#;
        assert_eq!(
            extract_metadata(html).services,
            vec!["Steuerberatung", "Lohnbuchhaltung", "Jahresabschluss"]
        );
    }

    #[test]
    fn services_are_capped() {
        let items = (1..=8).map(|i| format!("<li>Leistung Nummer {}</li>", i)).join("");
        let html = format!("<h3>Services</h3><ol>{}</ol>", items);
        let services = extract_metadata(&html).services;
        assert_eq!(services.len(), MAX_SERVICES);
        assert_eq!(services[0], "Leistung Nummer 1");
    }

    #[test]
    fn services_from_navigation_submenu() {
        let html = r#"
            <nav><ul>
                <li><a href="/leistungen">Leistungen</a>
                    <ul>
                        <li><a href="/webdesign">Webdesign</a></li>
                        <li><a href="/seo">SEO</a></li>
                    </ul>
                </li>
                <li><a href="/kontakt">Kontakt</a></li>
            </ul></nav>
        "#;
        assert_eq!(extract_metadata(html).services, vec!["Webdesign", "SEO"]);
    }

    #[test]
    fn services_from_flat_navigation_links() {
        let html = r#"
            <header><nav><ul>
                <li><a href="/catering">Catering Service</a></li>
                <li><a href="/webdesign">Webdesign Leistungen</a></li>
                <li><a href="/leistungen">Leistungen</a></li>
                <li><a href="/kontakt">Kontakt</a></li>
            </ul></nav></header>
        "#;
        assert_eq!(
            extract_metadata(html).services,
            vec!["Catering Service", "Webdesign Leistungen"]
        );
    }

    #[test]
    fn about_text_after_label() {
        let html = r#"
            <h2>Über uns</h2>
            <p>Seit 1990 backen wir Pizza nach neapolitanischer Art.</p>
            <h2>Öffnungszeiten</h2>
            <p>Mo-Fr 11-22 Uhr</p>
        "#;
        assert_eq!(
            extract_metadata(html).about_text.as_deref(),
            Some("Seit 1990 backen wir Pizza nach neapolitanischer Art.")
        );
    }

    #[test]
    fn about_text_falls_back_to_description_then_paragraph() {
        let html = r#"<head><meta name="description" content="Familienbetrieb in Berlin"></head>"#;
        assert_eq!(
            extract_metadata(html).about_text.as_deref(),
            Some("Familienbetrieb in Berlin")
        );

        let long = "Wir sind ein kleines Team ".repeat(30);
        let html = format!("<p>Kurz.</p><p>{}</p>", long);
        let about = extract_metadata(&html).about_text.unwrap();
        assert_eq!(about.chars().count(), MAX_ABOUT_CHARS);
        assert!(about.starts_with("Wir sind ein kleines Team"));
    }

    #[test]
    fn empty_page_has_no_metadata() {
        assert!(extract_metadata("<html><body><p>Hallo</p></body></html>").is_empty());
    }
}
