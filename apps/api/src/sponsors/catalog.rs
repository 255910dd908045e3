//! Static tag vocabulary used to seed `sponsor_tags`.
//!
//! Deployments may replace the built-in vocabulary with a JSON file of the
//! form `{"technical": [[label, tag, description], ...], "social": [...]}`.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::sponsor::TagType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct TagDefinition {
    pub label: String,
    pub tag: String,
    pub long_description: String,
}

impl From<(String, String, String)> for TagDefinition {
    fn from((label, tag, long_description): (String, String, String)) -> Self {
        TagDefinition {
            label,
            tag,
            long_description,
        }
    }
}

impl From<TagDefinition> for (String, String, String) {
    fn from(def: TagDefinition) -> Self {
        (def.label, def.tag, def.long_description)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCatalog {
    pub technical: Vec<TagDefinition>,
    pub social: Vec<TagDefinition>,
}

const TECHNICAL_TAGS: &[(&str, &str, &str)] = &[
    (
        "DFSG-free software",
        "dfsg",
        "Only packages whose contents comply with the Debian Free Software Guidelines.",
    ),
    (
        "Non-free software",
        "non-free",
        "Packages targeting the non-free or contrib archive areas are welcome.",
    ),
    (
        "Native packages",
        "native",
        "Packages without a separate upstream tarball.",
    ),
    (
        "Team maintained packages",
        "team",
        "Packages maintained within one of the Debian packaging teams.",
    ),
    (
        "Library packages",
        "library",
        "Shared libraries, including symbols files and SONAME transitions.",
    ),
    (
        "Modified upstream tarballs",
        "modified-tarballs",
        "Repacked upstream sources, with the repack documented in debian/copyright.",
    ),
    (
        "debhelper",
        "debhelper",
        "Packages built with classic debhelper command sequences.",
    ),
    (
        "Short dh style",
        "dh",
        "Packages using the dh sequencer with a minimal debian/rules.",
    ),
    (
        "CDBS",
        "cdbs",
        "Packages built with the Common Debian Build System.",
    ),
    (
        "Non-maintainer uploads",
        "nmu",
        "NMUs fixing bugs in packages the uploader does not maintain.",
    ),
    (
        "QA uploads",
        "qa",
        "Uploads of orphaned packages maintained by the QA team.",
    ),
    (
        "Backports",
        "backports",
        "Packages prepared for the backports archive.",
    ),
    (
        "Source format 3.0 (quilt)",
        "3.0-quilt",
        "Packages using the 3.0 (quilt) source format with patches in debian/patches.",
    ),
    (
        "Version control",
        "vcs",
        "Packaging kept in a public VCS repository declared in Vcs-* fields.",
    ),
    (
        "Lintian clean",
        "lintian",
        "Packages must be free of lintian errors and warnings before review.",
    ),
];

const SOCIAL_TAGS: &[(&str, &str, &str)] = &[
    (
        "Prospective DM/DD",
        "prospective-dm-dd",
        "The sponsoree intends to become a Debian Maintainer or Developer.",
    ),
    (
        "Signed GPG key",
        "signed-gpg-key",
        "The sponsoree's OpenPGP key is signed by at least one Debian Developer.",
    ),
    (
        "Already maintained in Debian",
        "already-maintained",
        "The sponsoree already maintains packages in Debian.",
    ),
    (
        "Personal introduction",
        "introduction",
        "The sponsoree should introduce themselves before asking for sponsorship.",
    ),
    (
        "Contact via IRC",
        "irc",
        "The sponsoree is reachable on IRC for quick review rounds.",
    ),
    (
        "Long-term commitment",
        "long-term",
        "The sponsoree plans to maintain the package for the foreseeable future.",
    ),
];

impl TagCatalog {
    pub fn builtin() -> Self {
        fn defs(list: &[(&str, &str, &str)]) -> Vec<TagDefinition> {
            list.iter()
                .map(|(label, tag, long_description)| TagDefinition {
                    label: label.to_string(),
                    tag: tag.to_string(),
                    long_description: long_description.to_string(),
                })
                .collect()
        }
        TagCatalog {
            technical: defs(TECHNICAL_TAGS),
            social: defs(SOCIAL_TAGS),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tag catalog {}", path.display()))?;
        let catalog: TagCatalog = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid tag catalog {}", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Tag identifiers are the table's primary key, so they must be unique
    /// across both categories.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (_, def) in self.entries() {
            if def.tag.trim().is_empty() {
                bail!("Tag catalog contains an entry with an empty tag ({:?})", def.label);
            }
            if !seen.insert(def.tag.as_str()) {
                bail!("Tag catalog defines '{}' more than once", def.tag);
            }
        }
        Ok(())
    }

    /// Every definition with its category, technical tags first.
    pub fn entries(&self) -> impl Iterator<Item = (TagType, &TagDefinition)> {
        self.technical
            .iter()
            .map(|d| (TagType::Technical, d))
            .chain(self.social.iter().map(|d| (TagType::Social, d)))
    }

    pub fn len(&self) -> usize {
        self.technical.len() + self.social.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technical.is_empty() && self.social.is_empty()
    }
}
