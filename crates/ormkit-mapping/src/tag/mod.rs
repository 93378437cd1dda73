//! Module: tag
//! Responsibility: the doc-comment tag grammar. One tag per line,
//! `@<prefix><name> key=value; key2=value2`.
//! Does not own: what a tag means for metadata (see `driver`).


use indexmap::IndexMap;
use ormkit_core::metadata::{AssociationKind, MappingError};
use std::fmt;

///
/// TagKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TagKind {
    Extra,
    Field,
    Id,
    LifecycleCallbacks,
    Listener,
    ManyToMany,
    ManyToOne,
    Object,
    OneToMany,
    OneToOne,
    Options,
}

impl TagKind {
    pub const ASSOCIATIONS: [Self; 4] = [
        Self::ManyToMany,
        Self::ManyToOne,
        Self::OneToMany,
        Self::OneToOne,
    ];

    /// Resolve a tag name with the prefix already stripped. Aliases map to
    /// the same kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "object" | "entity" => Self::Object,
            "field" | "property" => Self::Field,
            "identifier" | "id" => Self::Id,
            "one-to-one" => Self::OneToOne,
            "one-to-many" => Self::OneToMany,
            "many-to-one" => Self::ManyToOne,
            "many-to-many" => Self::ManyToMany,
            "lifecycle-callbacks" => Self::LifecycleCallbacks,
            "listener" | "entity-listener" => Self::Listener,
            "options" => Self::Options,
            "extra" => Self::Extra,
            _ => return None,
        };

        Some(kind)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Extra => "extra",
            Self::Field => "field",
            Self::Id => "id",
            Self::LifecycleCallbacks => "lifecycle-callbacks",
            Self::Listener => "listener",
            Self::ManyToMany => "many-to-many",
            Self::ManyToOne => "many-to-one",
            Self::Object => "object",
            Self::OneToMany => "one-to-many",
            Self::OneToOne => "one-to-one",
            Self::Options => "options",
        }
    }

    #[must_use]
    pub const fn association_kind(self) -> Option<AssociationKind> {
        match self {
            Self::ManyToMany => Some(AssociationKind::ManyToMany),
            Self::ManyToOne => Some(AssociationKind::ManyToOne),
            Self::OneToMany => Some(AssociationKind::OneToMany),
            Self::OneToOne => Some(AssociationKind::OneToOne),
            _ => None,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// Tag
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    pub kind: TagKind,

    /// Everything after the tag name, trimmed.
    pub text: String,
}

///
/// DocBlock
///
/// Doc lines split into prefixed tags and plain text. Tags without the
/// prefix are scanner markers and are dropped.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DocBlock {
    pub lines: Vec<String>,
    pub tags: Vec<Tag>,
}

impl DocBlock {
    /// `type_name` and `member` only label errors.
    pub fn parse(
        doc: &[String],
        prefix: &str,
        type_name: &str,
        member: &str,
    ) -> Result<Self, MappingError> {
        let mut block = Self::default();

        for line in doc.iter().map(|line| line.trim()) {
            let Some(tag) = line.strip_prefix('@') else {
                block.lines.push(line.to_string());
                continue;
            };

            let (name, text) = tag
                .split_once(char::is_whitespace)
                .map_or((tag, ""), |(name, text)| (name, text.trim()));
            let Some(name) = name.strip_prefix(prefix) else {
                continue;
            };
            let kind = TagKind::from_name(name).ok_or_else(|| {
                MappingError::invalid_tag(type_name, member, name, "unknown tag")
            })?;

            block.tags.push(Tag {
                kind,
                text: text.to_string(),
            });
        }

        Ok(block)
    }

    #[must_use]
    pub fn has(&self, kind: TagKind) -> bool {
        self.tags.iter().any(|tag| tag.kind == kind)
    }

    /// Text of the first tag of this kind.
    #[must_use]
    pub fn first(&self, kind: TagKind) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.kind == kind)
            .map(|tag| tag.text.as_str())
    }

    pub fn all(&self, kind: TagKind) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter(move |tag| tag.kind == kind)
            .map(|tag| tag.text.as_str())
    }

    /// First non-empty plain line, used as a field comment.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .find(|line| !line.is_empty())
    }
}

/// Split `key=value; key2="quoted; value"; flag` into ordered pairs. A bare
/// key maps to an empty value; a repeated key keeps the last value.
pub fn parse_parameters(text: &str) -> Result<IndexMap<String, String>, String> {
    let mut parameters = IndexMap::new();

    for part in split_unquoted(text)? {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (key, value) = part
            .split_once('=')
            .map_or((part, ""), |(key, value)| (key.trim(), value.trim()));
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(format!("malformed parameter key '{key}'"));
        }

        parameters.insert(key.to_string(), unquote(value));
    }

    Ok(parameters)
}

fn split_unquoted(text: &str) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;

    for c in text.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' if quoted => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                quoted = !quoted;
            }
            ';' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if quoted {
        return Err("unterminated quote".to_string());
    }
    parts.push(current);

    Ok(parts)
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }

    out
}
