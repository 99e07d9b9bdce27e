use url::Url;

/// Parses a user supplied website, coercing a missing scheme to `https`.
pub fn normalize_url(website: &str) -> Result<Url, url::ParseError> {
    let trimmed = website.trim();
    let with_scheme = match trimmed.contains("://") {
        true => trimmed.to_string(),
        false => format!("https://{}", trimmed.trim_start_matches('/')),
    };

    let url = Url::parse(&with_scheme)?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(url::ParseError::EmptyHost),
    }
}

/// Host part of a website, lowercased. `www.` is kept; callers that want it gone
/// use [`website_key`].
pub fn extract_domain(website: &str) -> String {
    match normalize_url(website) {
        Ok(url) => url
            .host_str()
            .map(|host| host.to_lowercase())
            .unwrap_or_default(),
        Err(_) => website.trim().to_lowercase(),
    }
}

/// Comparison key for "same website" checks between scraped and stored URLs.
/// Ignores scheme, `www.`, letter case, query, fragment and trailing slashes.
pub fn website_key(website: &str) -> String {
    let Ok(url) = normalize_url(website) else {
        return website
            .trim()
            .trim_end_matches('/')
            .to_lowercase();
    };

    let host = url.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let path = url.path().trim_end_matches('/').to_lowercase();

    match url.port() {
        Some(port) => format!("{}:{}{}", host, port, path),
        None => format!("{}{}", host, path),
    }
}

/// Same URL with `http` instead of `https`, used after a certificate failure.
pub fn downgrade_to_http(url: &Url) -> Option<Url> {
    if url.scheme() != "https" {
        return None;
    }
    let mut downgraded = url.clone();
    downgraded.set_scheme("http").ok()?;
    Some(downgraded)
}
