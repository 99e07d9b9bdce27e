//! Static pattern tables shared by the locator, extractor, verifier and metadata
//! extractor.

/// Paths probed for an imprint/contact page, most specific first.
pub const CONTACT_PATHS: &[&str] = &[
    "/impressum",
    "/imprint",
    "/kontakt",
    "/contact",
    "/about",
    "/ueber-uns",
    "/legal",
    "/datenschutz",
    "/privacy",
    "/contact-us",
];

/// Last-resort probe list, tried once more after link discovery came up empty.
pub const FALLBACK_CONTACT_PATHS: &[&str] = &[
    "/impressum",
    "/impressum.html",
    "/imprint",
    "/kontakt",
    "/contact",
];

/// Anchor text fragments that mark an imprint/contact link.
pub const CONTACT_LINK_TEXTS: &[&str] = &[
    "impressum",
    "imprint",
    "kontakt",
    "contact",
    "legal",
    "datenschutz",
    "privacy",
    "über uns",
    "about us",
];

/// Labels after which an address usually follows on imprint pages.
pub const EMAIL_LABELS: &[&str] = &[
    "email",
    "e-mail",
    "kontakt",
    "reservierungen",
    "reservierung",
];

/// Domains whose addresses are never a business contact: error trackers, site
/// builders, social networks and documentation placeholders.
pub const EXCLUDED_EMAIL_DOMAINS: &[&str] = &[
    "sentry.io",
    "sentry-next.wixpress.com",
    "sentry.wixpress.com",
    "wixpress.com",
    "wix.com",
    "ingest.sentry.io",
    "google-analytics.com",
    "googletagmanager.com",
    "doubleclick.net",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "linkedin.com",
    "tiktok.com",
    "youtube.com",
    "w3.org",
    "schema.org",
    "example.com",
    "example.org",
    "example.net",
    "example.de",
    "domain.com",
    "domain.de",
    "yourdomain.com",
    "ihre-domain.de",
    "ihredomain.de",
    "email.com",
    "mustermann.de",
    "musterfirma.de",
    "beispiel.de",
    "placeholder.com",
];

/// Trailing fragments on a local part that show the text was split in the wrong place.
/// Only counted when glued onto something longer, so `fax@kanzlei.de` stays.
pub const SUSPICIOUS_LOCAL_SUFFIXES: &[&str] = &[
    "strasse",
    "straße",
    "telefon",
    "fax",
    "ministerium",
    "www",
    "http",
    "https",
];

/// Trailing fragments on the last domain label that show text was glued onto the
/// address (`firm.detelefon`). A label that is exactly the fragment is a real TLD
/// or an [`ASSET_EXTENSIONS`] match, not glue.
pub const SUSPICIOUS_DOMAIN_SUFFIXES: &[&str] = &[
    "telefon",
    "fax",
    "mobil",
    "impressum",
    "kontakt",
    "ministerium",
    "strasse",
    "html",
    "htm",
    "php",
    "aspx",
    "www",
    "http",
    "https",
    "gmbh",
];

/// Top-level labels that are really file extensions (`logo@2x.png`).
pub const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "css", "js", "pdf", "mp4", "html",
    "htm", "php", "aspx",
];

/// Local parts used in templates instead of a real mailbox.
pub const PLACEHOLDER_LOCAL_PARTS: &[&str] = &[
    "name",
    "your",
    "yourname",
    "your.name",
    "ihre",
    "ihr.name",
    "user",
    "username",
    "vorname.nachname",
    "firstname.lastname",
    "max.mustermann",
    "maxmustermann",
];

/// Local-part prefixes of role/automation mailboxes no human reads.
pub const FAKE_EMAIL_PREFIXES: &[&str] = &[
    "noreply@",
    "no-reply@",
    "donotreply@",
    "do-not-reply@",
    "test@",
    "example@",
    "demo@",
    "backup@",
    "dev@",
];

pub const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "temp-mail.org",
    "10minutemail.com",
    "throwaway.email",
    "yopmail.com",
    "trashmail.com",
    "sharklasers.com",
];

/// Words in headings or navigation that introduce a list of services.
pub const SERVICE_KEYWORDS: &[&str] = &[
    "leistungen",
    "leistung",
    "dienstleistungen",
    "angebot",
    "angebote",
    "unser angebot",
    "services",
    "service",
    "what we do",
    "was wir tun",
    "solutions",
    "lösungen",
    "speisekarte",
    "menu",
    "behandlungen",
    "produkte",
    "products",
];

/// Labels that introduce an "about" section.
pub const ABOUT_LABELS: &[&str] = &[
    "über uns",
    "ueber uns",
    "wir über uns",
    "about us",
    "about",
    "who we are",
    "wer wir sind",
    "unsere geschichte",
    "our story",
];

pub const MAX_SERVICES: usize = 5;
pub const MAX_ABOUT_CHARS: usize = 500;
pub const MIN_ABOUT_PARAGRAPH_CHARS: usize = 100;

/// True if `domain` equals one of `list` or is a subdomain of one.
pub fn matches_domain_list(domain: &str, list: &[&str]) -> bool {
    list.iter().any(|&listed| {
        domain == listed
            || domain
                .strip_suffix(listed)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
