//! Invalidation tags.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

/// Label attached to cache entries; the unit of invalidation.
///
/// A tag is a kind (`Recommendation`) optionally narrowed to one resource
/// (`Recommendation:R123`). Invalidating a bare kind hits every entry tag of
/// that kind. Invalidating `kind:id` hits entries tagged with the same id and
/// entries tagged with the bare kind, since a list of a kind may contain the
/// changed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    kind: String,
    id: Option<String>,
}

impl Tag {
    /// Tag covering every resource of a kind.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Tag for a single resource.
    pub fn id(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    pub fn kind_name(&self) -> &str {
        &self.kind
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether invalidating `invalidated` reaches an entry carrying `self`.
    pub fn is_hit_by(&self, invalidated: &Tag) -> bool {
        if self.kind != invalidated.kind {
            return false;
        }
        match (&self.id, &invalidated.id) {
            (_, None) | (None, _) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => f.write_str(&self.kind),
        }
    }
}

impl FromStr for Tag {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, id) = match s.split_once(':') {
            Some((kind, id)) => (kind.trim(), Some(id.trim())),
            None => (s, None),
        };
        if kind.is_empty() {
            return Err(CacheError::InvalidTag(format!("'{}' has no kind", s)));
        }
        match id {
            Some("") => Err(CacheError::InvalidTag(format!("'{}' has an empty id", s))),
            Some(id) => Ok(Tag::id(kind, id)),
            None => Ok(Tag::kind(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let tag: Tag = "Recommendation:R123".parse().unwrap();
        assert_eq!(tag, Tag::id("Recommendation", "R123"));
        assert_eq!(tag.to_string(), "Recommendation:R123");

        let bare: Tag = " Recommendation ".parse().unwrap();
        assert_eq!(bare, Tag::kind("Recommendation"));
        assert_eq!(bare.resource_id(), None);

        assert!("".parse::<Tag>().is_err());
        assert!(":R1".parse::<Tag>().is_err());
        assert!("Recommendation:".parse::<Tag>().is_err());
    }

    #[test]
    fn test_matching() {
        let list = Tag::kind("Recommendation");
        let r1 = Tag::id("Recommendation", "R1");
        let r2 = Tag::id("Recommendation", "R2");
        let vas = Tag::kind("VasScore");

        assert!(list.is_hit_by(&list));
        assert!(list.is_hit_by(&r1));
        assert!(r1.is_hit_by(&list));
        assert!(r1.is_hit_by(&r1));
        assert!(!r1.is_hit_by(&r2));
        assert!(!vas.is_hit_by(&list));
    }
}
