use serde::{Deserialize, Serialize};

/// What the typed text is completing: an object id prefix or a symbol name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// `_` then a decimal digit.
    OidPrefix,
    /// Starts with a letter.
    Name,
}

impl QueryKind {
    /// Classify input text by its leading characters, or `None` when it can
    /// name nothing.
    pub fn classify(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        match chars.next()? {
            '_' => chars
                .next()
                .filter(char::is_ascii_digit)
                .map(|_| Self::OidPrefix),
            c if c.is_alphabetic() => Some(Self::Name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OidPrefix => "oid",
            Self::Name => "name",
        }
    }
}
