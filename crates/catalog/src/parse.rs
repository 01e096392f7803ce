//! Lenient parsing of the two catalog documents.
//!
//! Both documents are community-maintained and not strictly typed: numbers
//! show up as strings, booleans as `null`, and the odd entry has no id at
//! all. Anything that can't be interpreted is dropped per entry rather than
//! failing the whole document.

use crate::error::{ErrorKind, Result};
use crate::models::{Catalog, TitleRecord};
use exn::ResultExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use slm_core::TitleId;
use time::{Date, Month};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawTitle {
    id: Value,
    name: Value,
    icon_url: Value,
    banner_url: Value,
    region: Value,
    release_date: Value,
    is_demo: Value,
    version: Value,
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// A `YYYYMMDD` integer (or string) into a calendar date.
fn release_date(value: &Value) -> Option<Date> {
    let raw = number(value)?;
    let year = i32::try_from(raw / 10_000).ok()?;
    let month = Month::try_from(u8::try_from(raw / 100 % 100).ok()?).ok()?;
    let day = u8::try_from(raw % 100).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

impl RawTitle {
    fn into_record(self) -> Option<TitleRecord> {
        let id = TitleId::parse(text(&self.id)?).ok()?;
        Some(TitleRecord {
            id,
            name: text(&self.name).unwrap_or_default(),
            icon_url: text(&self.icon_url),
            banner_url: text(&self.banner_url),
            region: text(&self.region),
            release_date: release_date(&self.release_date),
            is_demo: flag(&self.is_demo),
            version: number(&self.version).and_then(|v| u32::try_from(v).ok()),
        })
    }
}

fn object(body: &[u8], document: &'static str) -> Result<Map<String, Value>> {
    serde_json::from_slice(body).or_raise(|| ErrorKind::Malformed(document))
}

/// Merge the title list into `catalog`.
///
/// Returns how many entries were dropped as unusable.
pub(crate) fn merge_titles(catalog: &mut Catalog, body: &[u8]) -> Result<usize> {
    let mut dropped = 0;
    for (_, entry) in object(body, "title list")? {
        match serde_json::from_value::<RawTitle>(entry).ok().and_then(RawTitle::into_record) {
            Some(record) => catalog.insert(record),
            None => dropped += 1,
        }
    }
    Ok(dropped)
}

/// Merge the version list (`{id: {revision: date}}`) into `catalog`.
///
/// Returns how many entries were dropped as unusable.
pub(crate) fn merge_versions(catalog: &mut Catalog, body: &[u8]) -> Result<usize> {
    let mut dropped = 0;
    for (id, revisions) in object(body, "version list")? {
        let (Ok(id), Value::Object(revisions)) = (TitleId::parse(&id), revisions) else {
            dropped += 1;
            continue;
        };
        for (revision, released) in revisions {
            match revision.trim().parse::<u32>() {
                Ok(revision) => catalog.insert_revision(&id, revision, text(&released).unwrap_or_default()),
                Err(_) => dropped += 1,
            }
        }
    }
    Ok(dropped)
}

impl Catalog {
    /// Parse the raw title list and version list documents.
    pub fn from_documents(titles: &[u8], versions: &[u8]) -> Result<Self> {
        let mut catalog = Catalog::default();
        let dropped_titles = merge_titles(&mut catalog, titles)?;
        let dropped_versions = merge_versions(&mut catalog, versions)?;
        if dropped_titles + dropped_versions > 0 {
            tracing::debug!(dropped_titles, dropped_versions, "Ignored unusable catalog entries");
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn id(value: &str) -> TitleId {
        TitleId::parse(value).unwrap()
    }

    #[rstest]
    #[case(json!(20200320), Some((2020, Month::March, 20)))]
    #[case(json!("20171027"), Some((2017, Month::October, 27)))]
    #[case(json!(20201340), None)]
    #[case(json!(null), None)]
    #[case(json!("soon"), None)]
    fn test_release_date(#[case] value: Value, #[case] expected: Option<(i32, Month, u8)>) {
        let expected = expected.map(|(y, m, d)| Date::from_calendar_date(y, m, d).unwrap());
        assert_eq!(release_date(&value), expected);
    }

    #[test]
    fn test_lenient_title_list() {
        let body = json!({
            "1": {
                "id": "0100ABCD12340000",
                "name": "Some Game",
                "bannerUrl": "https://img.invalid/banner.jpg",
                "region": "US",
                "releaseDate": 20200320,
                "isDemo": null,
                "version": "65536"
            },
            "2": {"id": "0100ABCD12341001", "name": "Some Game DLC", "isDemo": false, "version": 0},
            "3": {"name": "No identifier"},
            "4": {"id": "not-an-id", "name": "Broken"},
            "5": "not even an object"
        });
        let mut catalog = Catalog::default();
        let dropped = merge_titles(&mut catalog, body.to_string().as_bytes()).unwrap();
        assert_eq!(dropped, 3);
        let base = catalog.record(&id("0100abcd12340000")).unwrap();
        assert_eq!(base.name, "Some Game");
        assert_eq!(base.version, Some(65536));
        assert!(!base.is_demo);
        assert_eq!(base.icon_url, None);
        assert_eq!(base.region.as_deref(), Some("US"));
        assert!(catalog.record(&id("0100abcd12341001")).is_some());
    }

    #[test]
    fn test_version_list() {
        let body = json!({
            "0100abcd12340000": {"65536": "2020-04-01", "131072": "2020-06-01"},
            "0100ABCD12340800": {"196608": "2020-09-01", "garbage": "?"},
            "0100abcd12341001": {"65536": "2021-01-01"},
            "bogus": {"1": "2020-01-01"}
        });
        let mut catalog = Catalog::default();
        let dropped = merge_versions(&mut catalog, body.to_string().as_bytes()).unwrap();
        assert_eq!(dropped, 2);
        let title = catalog.get(&id("0100abcd12340000").key()).unwrap();
        assert_eq!(title.latest_revision(), 196608);
        assert_eq!(title.latest_update_date(), Some("2020-09-01"));
        assert_eq!(title.latest_dlc_revision(&id("0100abcd12341001")), 65536);
    }

    #[test]
    fn test_top_level_must_be_object() {
        let err = Catalog::from_documents(b"[]", b"{}").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed("title list")));
        let err = Catalog::from_documents(b"{}", b"not json").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed("version list")));
    }
}
