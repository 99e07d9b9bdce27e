use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessMetadata {
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    /// At most five entries.
    pub services: Vec<String>,
    /// At most 500 characters.
    pub about_text: Option<String>,
}

impl BusinessMetadata {
    pub fn is_empty(&self) -> bool {
        self.meta_description.is_none()
            && self.meta_keywords.is_none()
            && self.services.is_empty()
            && self.about_text.is_none()
    }

    /// Field by field, keeps the first non-empty value across `sources` in order.
    pub fn merge<I>(sources: I) -> BusinessMetadata
    where
        I: IntoIterator<Item = BusinessMetadata>,
    {
        sources
            .into_iter()
            .fold(BusinessMetadata::default(), |merged, source| BusinessMetadata {
                meta_description: merged.meta_description.or(source.meta_description),
                meta_keywords: merged.meta_keywords.or(source.meta_keywords),
                services: match merged.services.is_empty() {
                    true => source.services,
                    false => merged.services,
                },
                about_text: merged.about_text.or(source.about_text),
            })
    }
}
