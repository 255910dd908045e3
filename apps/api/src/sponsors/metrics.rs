use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::sponsor::{
    Availability, ContactMethod, GuidelinesMode, SponsorMetricsRow, SponsorTag, TagType,
};
use crate::sponsors::format::{escape_multiline, render_link};

/// A user's sponsoring preferences together with the tags they picked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorMetrics {
    pub user_id: Uuid,
    pub availability: Availability,
    pub contact: ContactMethod,
    pub types: Option<String>,
    pub guidelines: GuidelinesMode,
    pub guidelines_text: Option<String>,
    pub social_requirements: Option<String>,
    /// Attached tags in stored order.
    pub tags: Vec<SponsorTag>,
}

impl SponsorMetrics {
    pub fn from_row(row: SponsorMetricsRow, tags: Vec<SponsorTag>) -> Self {
        SponsorMetrics {
            user_id: row.user_id,
            availability: Availability::from_code(row.availability),
            contact: ContactMethod::from_code(row.contact),
            types: row.types,
            guidelines: GuidelinesMode::from_code(row.guidelines),
            guidelines_text: row.guidelines_text,
            social_requirements: row.social_requirements,
            tags,
        }
    }

    pub fn all_tags(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.tag.as_str()).collect()
    }

    pub fn technical_tags(&self) -> Vec<&str> {
        self.technical_tags_full()
            .into_iter()
            .map(|t| t.tag.as_str())
            .collect()
    }

    pub fn social_tags(&self) -> Vec<&str> {
        self.social_tags_full()
            .into_iter()
            .map(|t| t.tag.as_str())
            .collect()
    }

    pub fn technical_tags_full(&self) -> Vec<&SponsorTag> {
        self.tags_of_type(TagType::Technical)
    }

    pub fn social_tags_full(&self) -> Vec<&SponsorTag> {
        self.tags_of_type(TagType::Social)
    }

    fn tags_of_type(&self, tag_type: TagType) -> Vec<&SponsorTag> {
        self.tags.iter().filter(|t| t.tag_type == tag_type).collect()
    }

    /// Review guidelines as an HTML fragment.
    ///
    /// Inline text is escaped, a URL becomes a link, anything else renders
    /// as an empty string.
    pub fn formatted_guidelines(&self) -> String {
        let text = match self.guidelines_text.as_deref() {
            Some(text) => text,
            None => return String::new(),
        };
        match self.guidelines {
            GuidelinesMode::Text => escape_multiline(text),
            GuidelinesMode::Url => render_link(text),
            GuidelinesMode::None | GuidelinesMode::Unknown(_) => String::new(),
        }
    }

    /// Package types the sponsor is interested in, escaped for HTML.
    pub fn formatted_types(&self) -> String {
        format_optional(self.types.as_deref())
    }

    /// Social requirements, escaped for HTML.
    pub fn formatted_social_requirements(&self) -> String {
        format_optional(self.social_requirements.as_deref())
    }

    /// Whether contact details for `method` may be shown.
    ///
    /// Public sponsors allow every method. Restricted sponsors only allow the
    /// method they picked.
    pub fn allowed(&self, method: ContactMethod) -> bool {
        match self.availability {
            Availability::Public => true,
            Availability::Restricted => self.contact == method,
            Availability::Private | Availability::Unknown(_) => false,
        }
    }
}

fn format_optional(text: Option<&str>) -> String {
    match text {
        Some(text) if !text.is_empty() => escape_multiline(text),
        _ => String::new(),
    }
}

/// Values written by the owning user when saving their preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSponsorMetrics {
    pub user_id: Uuid,
    pub availability: Availability,
    pub contact: ContactMethod,
    pub types: Option<String>,
    pub guidelines: GuidelinesMode,
    pub guidelines_text: Option<String>,
    pub social_requirements: Option<String>,
}
