//! Row types for the sponsor directory tables and the integer-coded enums
//! stored in them.
//!
//! Enum columns are persisted as plain integers. Decoding never fails: a value
//! outside the known set becomes `Unknown(raw)` and is written back unchanged.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Whether a sponsor is listed and who may see their contact details.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Private,
    Restricted,
    Public,
    Unknown(i32),
}

impl Availability {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Availability::Private,
            1 => Availability::Restricted,
            2 => Availability::Public,
            other => Availability::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Availability::Private => 0,
            Availability::Restricted => 1,
            Availability::Public => 2,
            Availability::Unknown(raw) => raw,
        }
    }

    /// Listed sponsors show up in the directory.
    pub fn is_listed(self) -> bool {
        matches!(self, Availability::Restricted | Availability::Public)
    }
}

/// Preferred way of being contacted by sponsorees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    None,
    Email,
    Irc,
    Jabber,
    Unknown(i32),
}

impl ContactMethod {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ContactMethod::None,
            1 => ContactMethod::Email,
            2 => ContactMethod::Irc,
            3 => ContactMethod::Jabber,
            other => ContactMethod::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ContactMethod::None => 0,
            ContactMethod::Email => 1,
            ContactMethod::Irc => 2,
            ContactMethod::Jabber => 3,
            ContactMethod::Unknown(raw) => raw,
        }
    }
}

/// How the sponsor's review guidelines are presented.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GuidelinesMode {
    None,
    Url,
    Text,
    Unknown(i32),
}

impl GuidelinesMode {
    /// The column is nullable; NULL reads as `None`.
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            None | Some(0) => GuidelinesMode::None,
            Some(1) => GuidelinesMode::Url,
            Some(2) => GuidelinesMode::Text,
            Some(other) => GuidelinesMode::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            GuidelinesMode::None => 0,
            GuidelinesMode::Url => 1,
            GuidelinesMode::Text => 2,
            GuidelinesMode::Unknown(raw) => raw,
        }
    }
}

/// Tag category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Technical,
    Social,
    Unknown(i32),
}

impl TagType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => TagType::Technical,
            2 => TagType::Social,
            other => TagType::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            TagType::Technical => 1,
            TagType::Social => 2,
            TagType::Unknown(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SponsorMetricsRow {
    pub user_id: Uuid,
    pub availability: i32,
    pub contact: i32,
    pub types: Option<String>,
    pub guidelines: Option<i32>,
    pub guidelines_text: Option<String>,
    pub social_requirements: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SponsorTagRow {
    pub tag: String,
    pub tag_type: i32,
    pub label: String,
    pub long_description: String,
}

/// One row of the `sponsor_metrics_tags` join table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct SponsorMetricsTag {
    pub tag: String,
    pub user_id: Uuid,
    pub position: i32,
}

/// A catalog tag with its category decoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SponsorTag {
    pub tag: String,
    pub tag_type: TagType,
    pub label: String,
    pub long_description: String,
}

impl From<SponsorTagRow> for SponsorTag {
    fn from(row: SponsorTagRow) -> Self {
        SponsorTag {
            tag: row.tag,
            tag_type: TagType::from_code(row.tag_type),
            label: row.label,
            long_description: row.long_description,
        }
    }
}
