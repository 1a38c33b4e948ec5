//! Scryfall image URL construction

use crate::types::{CardEntry, Face, FetchError, Result};

const SCRYFALL_API: &str = "https://api.scryfall.com";

/// Scryfall image size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVersion {
    /// Full-resolution PNG used for printing
    Png,
    /// Medium JPEG used for previews
    Normal,
    Small,
}

impl ImageVersion {
    pub fn name(self) -> &'static str {
        match self {
            ImageVersion::Png => "png",
            ImageVersion::Normal => "normal",
            ImageVersion::Small => "small",
        }
    }
}

/// Image URL for one face of a card.
///
/// Uses the card's image identifier when known, otherwise the
/// `set/number/lang` endpoint.
pub fn image_url(card: &CardEntry, face: Face, version: ImageVersion) -> Result<String> {
    let base = if let Some(id) = card.image_id(face) {
        format!("{SCRYFALL_API}/cards/{id}")
    } else if !card.set_code.is_empty() && !card.collector_number.is_empty() {
        format!(
            "{SCRYFALL_API}/cards/{}/{}/{}",
            card.set_code.to_lowercase(),
            card.collector_number,
            card.lang
        )
    } else {
        return Err(FetchError::NotFound(format!(
            "no image identifier for {} ({} face)",
            card.name,
            face.name()
        )));
    };

    let mut url = format!("{base}?format=image&version={}", version.name());
    if face == Face::Back {
        url.push_str("&face=back");
    }
    Ok(url)
}
