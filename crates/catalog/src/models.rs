use slm_core::{ContentType, TitleId, TitleKey};
use std::collections::BTreeMap;
use time::Date;

/// One entry of the remote title list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TitleRecord {
    pub id: TitleId,
    /// Display name. May be empty for malformed entries.
    pub name: String,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub region: Option<String>,
    pub release_date: Option<Date>,
    pub is_demo: bool,
    /// Latest revision the title list itself advertises for this id.
    pub version: Option<u32>,
}

impl TitleRecord {
    /// A record with just an identifier and a name; every other field empty.
    pub fn new(id: TitleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            icon_url: None,
            banner_url: None,
            region: None,
            release_date: None,
            is_demo: false,
            version: None,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// Everything the catalog knows about one title: the base game, its DLC and
/// the published update revisions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogTitle {
    pub base: Option<TitleRecord>,
    pub dlc: BTreeMap<TitleId, TitleRecord>,
    /// Published update revisions of the base game, with their release date.
    pub updates: BTreeMap<u32, String>,
    /// Highest published revision per DLC, from the version list.
    pub dlc_revisions: BTreeMap<TitleId, u32>,
}

impl CatalogTitle {
    /// Highest revision the catalog knows for the base game; `0` if none.
    pub fn latest_revision(&self) -> u32 {
        let listed = self.updates.keys().next_back().copied().unwrap_or(0);
        let advertised = self.base.as_ref().and_then(|b| b.version).unwrap_or(0);
        listed.max(advertised)
    }

    /// Release date of the latest listed update revision.
    pub fn latest_update_date(&self) -> Option<&str> {
        self.updates.get(&self.latest_revision()).map(String::as_str)
    }

    /// Highest revision the catalog knows for one DLC; `0` if none.
    pub fn latest_dlc_revision(&self, id: &TitleId) -> u32 {
        let listed = self.dlc_revisions.get(id).copied().unwrap_or(0);
        let advertised = self.dlc.get(id).and_then(|d| d.version).unwrap_or(0);
        listed.max(advertised)
    }

    /// The base game's display name, or an empty string when unknown.
    pub fn name(&self) -> &str {
        self.base.as_ref().map(|b| b.name.as_str()).unwrap_or_default()
    }
}

/// The parsed remote catalog, keyed by [`TitleKey`].
///
/// Immutable once built; a refresh produces a whole new catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    titles: BTreeMap<TitleKey, CatalogTitle>,
}

impl Catalog {
    pub fn get(&self, key: &TitleKey) -> Option<&CatalogTitle> {
        self.titles.get(key)
    }

    /// Catalog record for any identifier: base or DLC.
    pub fn record(&self, id: &TitleId) -> Option<&TitleRecord> {
        let title = self.titles.get(&id.key())?;
        match id.content_type() {
            ContentType::Base => title.base.as_ref().filter(|b| &b.id == id),
            ContentType::Dlc => title.dlc.get(id),
            ContentType::Update => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TitleKey, &CatalogTitle)> {
        self.titles.iter()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Add a title-list record. A later record with the same id replaces an
    /// earlier one. Update records carry nothing the catalog keeps and are
    /// ignored.
    pub fn insert(&mut self, record: TitleRecord) {
        let title = self.titles.entry(record.id.key()).or_default();
        match record.id.content_type() {
            ContentType::Base => title.base = Some(record),
            ContentType::Dlc => {
                title.dlc.insert(record.id.clone(), record);
            },
            ContentType::Update => {},
        }
    }

    /// Add a version-list revision for a base, update or DLC identifier.
    pub fn insert_revision(&mut self, id: &TitleId, revision: u32, released: impl Into<String>) {
        let title = self.titles.entry(id.key()).or_default();
        match id.content_type() {
            ContentType::Base | ContentType::Update => {
                title.updates.insert(revision, released.into());
            },
            ContentType::Dlc => {
                let latest = title.dlc_revisions.entry(id.clone()).or_default();
                *latest = (*latest).max(revision);
            },
        }
    }
}
