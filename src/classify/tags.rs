//! Closed tag vocabulary for classified pages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category a page can be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Homepage,
    Services,
    Blog,
    Announcements,
    Misc,
}

/// Order in which tag buckets appear in the full document
pub const BUCKET_ORDER: [Tag; 5] = [
    Tag::Homepage,
    Tag::Services,
    Tag::Blog,
    Tag::Misc,
    Tag::Announcements,
];

impl Tag {
    /// Returns the wire name of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Homepage => "homepage",
            Tag::Services => "services",
            Tag::Blog => "blog",
            Tag::Announcements => "announcements",
            Tag::Misc => "misc",
        }
    }

    /// Every tag, in bucket order
    pub fn all() -> &'static [Tag] {
        &BUCKET_ORDER
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not in the tag vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tag: {}", self.0)
    }
}

impl std::error::Error for UnknownTag {}

impl FromStr for Tag {
    type Err = UnknownTag;

    /// Parses a tag case-insensitively, ignoring surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "homepage" => Ok(Tag::Homepage),
            "services" => Ok(Tag::Services),
            "blog" => Ok(Tag::Blog),
            "announcements" => Ok(Tag::Announcements),
            "misc" => Ok(Tag::Misc),
            _ => Err(UnknownTag(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!("homepage".parse::<Tag>().unwrap(), Tag::Homepage);
        assert_eq!(" Blog ".parse::<Tag>().unwrap(), Tag::Blog);
        assert_eq!("MISC".parse::<Tag>().unwrap(), Tag::Misc);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert_eq!(
            "pricing".parse::<Tag>(),
            Err(UnknownTag("pricing".to_string()))
        );
    }

    #[test]
    fn test_display_matches_wire_name() {
        for tag in Tag::all() {
            assert_eq!(tag.to_string().parse::<Tag>().unwrap(), *tag);
        }
        assert_eq!(serde_json::to_string(&Tag::Announcements).unwrap(), "\"announcements\"");
    }

    #[test]
    fn test_bucket_order_puts_misc_before_announcements() {
        let position = |tag| BUCKET_ORDER.iter().position(|t| *t == tag).unwrap();
        assert!(position(Tag::Misc) < position(Tag::Announcements));
        assert_eq!(BUCKET_ORDER[0], Tag::Homepage);
    }
}
