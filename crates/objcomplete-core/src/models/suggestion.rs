use serde::{Deserialize, Serialize};

use super::oid::ObjectId;

/// One matched object returned by the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub oid: String,
    #[serde(default, alias = "name", alias = "display")]
    pub label: String,
}

impl SuggestionItem {
    pub fn new(oid: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            label: label.into(),
        }
    }

    /// Text shown in the list and written back into the input on selection.
    pub fn display_text(&self) -> &str {
        if self.label.is_empty() {
            &self.oid
        } else {
            &self.label
        }
    }

    /// The item's oid, when it is a well-formed object id.
    pub fn object_id(&self) -> Option<ObjectId> {
        ObjectId::parse(&self.oid).ok()
    }

    /// Parse a lookup response body: a JSON array of `{oid, label}` objects.
    pub fn parse_list(body: &str) -> crate::error::Result<Vec<Self>> {
        Ok(serde_json::from_str(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_response_array() {
        let items = SuggestionItem::parse_list(r#"[{"oid":"42","label":"abc-thing"}]"#).unwrap();
        assert_eq!(items, vec![SuggestionItem::new("42", "abc-thing")]);
        assert_eq!(items[0].display_text(), "abc-thing");
        assert!(items[0].object_id().is_none());
    }

    #[test]
    fn accepts_label_aliases_and_missing_label() {
        let items = SuggestionItem::parse_list(
            r#"[
                {"oid":"_0abcdefghijABCDEFG","name":"int"},
                {"oid":"_1Io89yIORqn02SFOKz"}
            ]"#,
        )
        .unwrap();
        assert_eq!(items[0].display_text(), "int");
        assert!(items[0].object_id().is_some());
        assert_eq!(items[1].display_text(), "_1Io89yIORqn02SFOKz");
    }

    #[test]
    fn rejects_non_array_payloads() {
        assert!(SuggestionItem::parse_list(r#"{"oid":"42"}"#).is_err());
        assert!(SuggestionItem::parse_list("not json").is_err());
        assert!(SuggestionItem::parse_list(r#"[{"label":"x"}]"#).is_err());
    }
}
