//! Set differences between the catalog and the inventory.
//!
//! Pure functions over a snapshot: no locking, no I/O. Output follows the
//! key order of both datasets, so fixed inputs always produce identical
//! output.

use serde::Serialize;
use slm_catalog::{Catalog, CatalogTitle};
use slm_core::{IgnoreSet, TitleId};
use slm_inventory::{FileNameIntrospector, GameFileGroup, Inventory};
use time::Date;
use time::macros::format_description;

/// A DLC the catalog knows about that is not on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingDlc {
    pub id: TitleId,
    pub name: String,
}

/// An owned title (base present) that is missing updates or DLC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IncompleteTitle {
    /// The base id, or the DLC id for an outdated DLC.
    pub id: TitleId,
    pub name: String,
    pub local_update: u32,
    pub latest_update: u32,
    pub latest_update_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_dlc: Vec<MissingDlc>,
}

/// A catalog title with nothing on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingTitle {
    pub id: TitleId,
    pub name: String,
    pub icon: Option<String>,
    pub region: Option<String>,
    pub release_date: Option<String>,
}

/// Name to show for an owned title: catalog name, then the name embedded in
/// the base package, then whatever the file name says.
pub(crate) fn title_name(group: &GameFileGroup, title: Option<&CatalogTitle>) -> String {
    if let Some(name) = title.map(CatalogTitle::name).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let Some(base) = &group.base else {
        return String::new();
    };
    if let Some(name) = base.info.name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    FileNameIntrospector::parse(&base.location.file_name.to_string_lossy())
        .ok()
        .and_then(|packages| packages.into_iter().find_map(|p| p.name))
        .unwrap_or_default()
}

pub(crate) fn format_date(date: Date) -> Option<String> {
    date.format(format_description!("[year]-[month]-[day]")).ok()
}

/// Owned titles whose base is present, paired with their catalog entry.
fn owned<'a>(
    catalog: &'a Catalog,
    inventory: &'a Inventory,
) -> impl Iterator<Item = (&'a TitleId, &'a GameFileGroup, &'a CatalogTitle)> {
    inventory.titles.iter().filter_map(|(key, group)| {
        let base = group.base.as_ref()?;
        let title = catalog.get(key)?;
        Some((&base.info.title_id, group, title))
    })
}

/// DLC the catalog lists for an owned title but the inventory lacks.
///
/// Titles without a base on disk are never reported; neither are titles or
/// DLC in `ignore`.
pub fn missing_dlc(catalog: &Catalog, inventory: &Inventory, ignore: &IgnoreSet) -> Vec<IncompleteTitle> {
    owned(catalog, inventory)
        .filter(|(id, ..)| !ignore.contains(id))
        .filter_map(|(id, group, title)| {
            let missing: Vec<MissingDlc> = title
                .dlc
                .values()
                .filter(|dlc| !group.dlc.contains_key(&dlc.id) && !ignore.contains(&dlc.id))
                .map(|dlc| MissingDlc {
                    id: dlc.id.clone(),
                    name: dlc.name.clone(),
                })
                .collect();
            if missing.is_empty() {
                return None;
            }
            Some(IncompleteTitle {
                id: id.clone(),
                name: title_name(group, Some(title)),
                local_update: group.latest_update_revision(),
                latest_update: title.latest_revision(),
                latest_update_date: title.latest_update_date().map(str::to_string),
                missing_dlc: missing,
            })
        })
        .collect()
}

/// Owned titles whose latest local update is behind the catalog.
///
/// Unless `ignore_dlc_updates` is set, owned DLC whose catalog revision is
/// ahead of the local copy are reported too, under the DLC's own id.
pub fn missing_updates(
    catalog: &Catalog,
    inventory: &Inventory,
    ignore: &IgnoreSet,
    ignore_dlc_updates: bool,
) -> Vec<IncompleteTitle> {
    let mut results = Vec::new();
    for (id, group, title) in owned(catalog, inventory) {
        let name = title_name(group, Some(title));
        let local = group.latest_update_revision();
        let latest = title.latest_revision();
        if latest > local && !ignore.contains(id) {
            results.push(IncompleteTitle {
                id: id.clone(),
                name: name.clone(),
                local_update: local,
                latest_update: latest,
                latest_update_date: title.latest_update_date().map(str::to_string),
                missing_dlc: Vec::new(),
            });
        }
        if ignore_dlc_updates {
            continue;
        }
        for (dlc_id, file) in &group.dlc {
            let latest = title.latest_dlc_revision(dlc_id);
            if latest <= file.info.version || ignore.contains(dlc_id) {
                continue;
            }
            let dlc_name = title
                .dlc
                .get(dlc_id)
                .map(|d| d.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| name.clone());
            results.push(IncompleteTitle {
                id: dlc_id.clone(),
                name: dlc_name,
                local_update: file.info.version,
                latest_update: latest,
                latest_update_date: None,
                missing_dlc: Vec::new(),
            });
        }
    }
    results
}

/// Catalog titles with nothing on disk.
///
/// Entries without a name are malformed and skipped, as are ignored titles
/// and (with `hide_demos`) demos.
pub fn missing_games(catalog: &Catalog, inventory: &Inventory, ignore: &IgnoreSet, hide_demos: bool) -> Vec<MissingTitle> {
    catalog
        .iter()
        .filter(|(key, _)| !inventory.contains(key))
        .filter_map(|(_, title)| title.base.as_ref())
        .filter(|base| !base.name.trim().is_empty() && !base.id.as_str().is_empty())
        .filter(|base| !ignore.contains(&base.id))
        .filter(|base| !(hide_demos && base.is_demo))
        .map(|base| MissingTitle {
            id: base.id.clone(),
            name: base.name.clone(),
            icon: base.banner_url.clone(),
            region: base.region.clone(),
            release_date: base.release_date.and_then(format_date),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use slm_catalog::TitleRecord;
    use slm_core::PackageInfo;
    use slm_inventory::{FileLocation, PackageFile};
    use time::Month;

    const A: &str = "0100000000010000";
    const A_UPDATE: &str = "0100000000010800";
    const A_DLC1: &str = "0100000000011001";
    const A_DLC2: &str = "0100000000011002";
    const B: &str = "0100000000020000";
    const C_UPDATE: &str = "0100000000030800";

    fn id(value: &str) -> TitleId {
        TitleId::parse(value).unwrap()
    }

    fn file(title: &str, version: u32) -> PackageFile {
        PackageFile {
            location: FileLocation::new("/games", format!("[{title}][v{version}].nsp")),
            info: PackageInfo::new(id(title), version),
            size: 1,
            split: false,
            multi_content: false,
        }
    }

    fn add(inventory: &mut Inventory, title: &str, version: u32) {
        let group = inventory.titles.entry(id(title).key()).or_default();
        let package = file(title, version);
        match id(title).content_type() {
            slm_core::ContentType::Base => group.base = Some(package),
            slm_core::ContentType::Update => {
                group.updates.insert(version, package);
            },
            slm_core::ContentType::Dlc => {
                group.dlc.insert(id(title), package);
            },
        }
    }

    /// Catalog {A: rev 5 with two DLC, B: rev 0}; inventory {A: base + update
    /// rev 3 + first DLC, C: update only}.
    fn fixture() -> (Catalog, Inventory) {
        let mut catalog = Catalog::default();
        catalog.insert(TitleRecord::new(id(A), "Game A"));
        catalog.insert(TitleRecord::new(id(A_DLC1), "A Pack 1").with_version(65536));
        catalog.insert(TitleRecord::new(id(A_DLC2), "A Pack 2"));
        catalog.insert_revision(&id(A_UPDATE), 5, "2021-05-05");
        catalog.insert_revision(&id(A_UPDATE), 3, "2020-03-03");
        let mut b = TitleRecord::new(id(B), "Game B");
        b.release_date = Date::from_calendar_date(2019, Month::March, 1).ok();
        b.banner_url = Some("https://img/b.jpg".to_string());
        catalog.insert(b);

        let mut inventory = Inventory::default();
        add(&mut inventory, A, 0);
        add(&mut inventory, A_UPDATE, 3);
        add(&mut inventory, A_DLC1, 0);
        add(&mut inventory, C_UPDATE, 65536);
        (catalog, inventory)
    }

    #[test]
    fn test_missing_updates_scenario() {
        let (catalog, inventory) = fixture();
        let results = missing_updates(&catalog, &inventory, &IgnoreSet::default(), true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id(A));
        assert_eq!(results[0].name, "Game A");
        assert_eq!((results[0].local_update, results[0].latest_update), (3, 5));
        assert_eq!(results[0].latest_update_date.as_deref(), Some("2021-05-05"));
    }

    #[test]
    fn test_missing_updates_reports_outdated_dlc() {
        let (catalog, inventory) = fixture();
        let results = missing_updates(&catalog, &inventory, &IgnoreSet::default(), false);
        let dlc = results.iter().find(|r| r.id == id(A_DLC1)).unwrap();
        assert_eq!(dlc.name, "A Pack 1");
        assert_eq!((dlc.local_update, dlc.latest_update), (0, 65536));
    }

    #[test]
    fn test_latest_update_of_many_revisions() {
        let (catalog, mut inventory) = fixture();
        for revision in [0, 3, 7, 2] {
            add(&mut inventory, A_UPDATE, revision);
        }
        assert!(missing_updates(&catalog, &inventory, &IgnoreSet::default(), true).is_empty());
    }

    #[test]
    fn test_missing_dlc() {
        let (catalog, inventory) = fixture();
        let results = missing_dlc(&catalog, &inventory, &IgnoreSet::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id(A));
        assert_eq!(
            results[0].missing_dlc,
            vec![MissingDlc {
                id: id(A_DLC2),
                name: "A Pack 2".to_string()
            }]
        );
    }

    #[rstest]
    #[case(A)]
    #[case("0100000000011002")]
    #[case(" 0100000000011002 ")]
    fn test_missing_dlc_ignore(#[case] ignored: &str) {
        let (catalog, inventory) = fixture();
        let ignore: IgnoreSet = [ignored].into_iter().collect();
        assert!(missing_dlc(&catalog, &inventory, &ignore).is_empty());
    }

    #[test]
    fn test_orphaned_titles_never_incomplete() {
        let (mut catalog, inventory) = fixture();
        catalog.insert(TitleRecord::new(id("0100000000030000"), "Game C"));
        catalog.insert(TitleRecord::new(id("0100000000031001"), "C Pack"));
        catalog.insert_revision(&id(C_UPDATE), 196608, "2022-01-01");
        let ignore = IgnoreSet::default();
        let keys: Vec<_> = missing_dlc(&catalog, &inventory, &ignore)
            .into_iter()
            .chain(missing_updates(&catalog, &inventory, &ignore, false))
            .map(|r| r.id.key())
            .collect();
        for key in keys {
            assert!(inventory.get(&key).unwrap().base_exists());
        }
    }

    #[test]
    fn test_missing_games() {
        let (catalog, inventory) = fixture();
        let results = missing_games(&catalog, &inventory, &IgnoreSet::default(), true);
        assert_eq!(
            results,
            vec![MissingTitle {
                id: id(B),
                name: "Game B".to_string(),
                icon: Some("https://img/b.jpg".to_string()),
                region: None,
                release_date: Some("2019-03-01".to_string()),
            }]
        );
    }

    #[test]
    fn test_missing_games_never_lists_owned_or_nameless() {
        let (mut catalog, inventory) = fixture();
        catalog.insert(TitleRecord::new(id("0100000000040000"), "  "));
        let results = missing_games(&catalog, &inventory, &IgnoreSet::default(), false);
        for title in &results {
            assert!(!inventory.contains(&title.id.key()));
            assert!(!title.name.trim().is_empty());
        }
        assert_eq!(results.len(), 1);
    }

    #[rstest]
    #[case("0100000000020000")]
    #[case("0100000000020000".to_uppercase())]
    fn test_missing_games_ignore_is_case_insensitive(#[case] ignored: String) {
        let (catalog, inventory) = fixture();
        let ignore: IgnoreSet = [ignored].into_iter().collect();
        assert!(missing_games(&catalog, &inventory, &ignore, false).is_empty());
    }

    #[rstest]
    #[case(true, 0)]
    #[case(false, 1)]
    fn test_hide_demos(#[case] hide: bool, #[case] expected: usize) {
        let mut catalog = Catalog::default();
        let mut demo = TitleRecord::new(id(B), "Game B Demo");
        demo.is_demo = true;
        catalog.insert(demo);
        let results = missing_games(&catalog, &Inventory::default(), &IgnoreSet::default(), hide);
        assert_eq!(results.len(), expected);
    }

    #[test]
    fn test_name_falls_back_to_file_name() {
        let mut group = GameFileGroup::default();
        let mut base = file(A, 0);
        base.location = FileLocation::new("/games", "Some Game [0100000000010000][v0].nsp");
        group.base = Some(base);
        assert_eq!(title_name(&group, None), "Some Game");
        group.base.as_mut().unwrap().info.name = Some("Embedded".to_string());
        assert_eq!(title_name(&group, None), "Embedded");
    }
}
