use crate::error::{Error, ErrorKind, Result};
use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

const TITLE_ID_LENGTH: usize = 16;
const TITLE_KEY_LENGTH: usize = 12;

/// Canonical form of any identifier entering the system: surrounding
/// whitespace trimmed, ASCII lowercased.
///
/// Every boundary (catalog parse, inventory build, ignore-list read) calls
/// this, so comparisons further in are always between normalized values.
pub fn normalize_id(id: impl AsRef<str>) -> String {
    id.as_ref().trim().to_ascii_lowercase()
}

/// The kind of content a package carries, derived from its identifier.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[display("base")]
    Base,
    #[display("update")]
    Update,
    #[display("dlc")]
    Dlc,
}

/// A normalized 16 hex-digit title identifier.
///
/// Base titles end in `000`, their update in `800`, and DLC share the first
/// twelve digits with everything else differing.
///
/// ```
/// use slm_core::{ContentType, TitleId};
///
/// let id: TitleId = " 0100ABCD12340000 ".parse().unwrap();
/// assert_eq!(id.as_str(), "0100abcd12340000");
/// assert_eq!(id.content_type(), ContentType::Base);
/// assert_eq!(id.key().as_str(), "0100abcd1234");
/// ```
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TitleId(String);

impl TitleId {
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let normalized = normalize_id(value.as_ref());
        if normalized.len() != TITLE_ID_LENGTH || !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            exn::bail!(ErrorKind::InvalidTitleId(value.as_ref().to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The grouping key shared by a base title, its update and its DLC.
    pub fn key(&self) -> TitleKey {
        TitleKey(self.0[..TITLE_KEY_LENGTH].to_string())
    }

    pub fn content_type(&self) -> ContentType {
        if self.0.ends_with("000") {
            ContentType::Base
        } else if self.0.ends_with("800") {
            ContentType::Update
        } else {
            ContentType::Dlc
        }
    }

    /// Identifier of the base title this identifier belongs to.
    ///
    /// DLC identifiers have bit 12 flipped relative to their base, which only
    /// ever touches the thirteenth hex digit.
    pub fn base_id(&self) -> TitleId {
        match self.content_type() {
            ContentType::Base => self.clone(),
            ContentType::Update => TitleId(format!("{}000", &self.0[..TITLE_ID_LENGTH - 3])),
            ContentType::Dlc => {
                // Every digit is hex once constructed.
                let digit = u8::from_str_radix(&self.0[TITLE_KEY_LENGTH..=TITLE_KEY_LENGTH], 16).unwrap_or(0);
                TitleId(format!("{}{:x}000", &self.0[..TITLE_KEY_LENGTH], digit ^ 1))
            },
        }
    }

    /// Identifier under which the update for this title is published.
    pub fn update_id(&self) -> TitleId {
        TitleId(format!("{}800", &self.base_id().0[..TITLE_ID_LENGTH - 3]))
    }
}

impl FromStr for TitleId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TitleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for TitleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TitleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TitleId::parse(&raw).map_err(|e| serde::de::Error::custom(&*e))
    }
}

/// First twelve hex digits of a [`TitleId`]: the join key between datasets.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TitleKey(String);

impl TitleKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&TitleId> for TitleKey {
    fn from(id: &TitleId) -> Self {
        id.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0100ABCD12340000", "0100abcd12340000")]
    #[case("  0100abcd12340800\n", "0100abcd12340800")]
    #[case("0100AbCd12341001", "0100abcd12341001")]
    fn test_parse_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(TitleId::parse(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("0100abcd1234000")]
    #[case("0100abcd123400000")]
    #[case("0100abcd1234000g")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        let err = TitleId::parse(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidTitleId(_)));
    }

    #[rstest]
    #[case("0100abcd12340000", ContentType::Base)]
    #[case("0100abcd12340800", ContentType::Update)]
    #[case("0100abcd12341001", ContentType::Dlc)]
    #[case("0100abcd12341002", ContentType::Dlc)]
    fn test_content_type(#[case] input: &str, #[case] expected: ContentType) {
        assert_eq!(TitleId::parse(input).unwrap().content_type(), expected);
    }

    #[rstest]
    #[case("0100abcd12340000", "0100abcd12340000")]
    #[case("0100abcd12340800", "0100abcd12340000")]
    #[case("0100abcd12341001", "0100abcd12340000")]
    #[case("0100abcd1234301f", "0100abcd12342000")]
    fn test_base_id(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(TitleId::parse(input).unwrap().base_id().as_str(), expected);
    }

    #[test]
    fn test_related_ids_share_key() {
        let base = TitleId::parse("0100ABCD12340000").unwrap();
        let update = TitleId::parse("0100abcd12340800").unwrap();
        let dlc = TitleId::parse("0100abcd12341005").unwrap();
        assert_eq!(base.key(), update.key());
        assert_eq!(base.key(), dlc.key());
        assert_eq!(base.update_id(), update);
        assert_eq!(dlc.update_id(), update);
    }

    #[test]
    fn test_serde_normalizes_on_the_way_in() {
        let id: TitleId = serde_json::from_str("\"0100ABCD12340000\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0100abcd12340000\"");
        assert!(serde_json::from_str::<TitleId>("\"nope\"").is_err());
    }
}
