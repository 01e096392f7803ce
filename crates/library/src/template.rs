//! Name templating for library organization.
//!
//! Turns a title's metadata into folder and file names using user-configured
//! [upon] templates. The syntax follows upon's Mustache-like conventions
//! (`{{ variable }}`, `{{ value|formatter }}`), extended with:
//!
//! - **`slug`**: converts strings to URL-safe slugs, stripping quotation marks
//!   first to avoid leading/trailing hyphens.
//! - **`safe`**: drops everything outside printable ASCII.
//! - **`truncate`**: truncates strings to a maximum byte length at a character
//!   boundary, usable as either `truncate(value, n)` or `{{ value|truncate: n }}`.
//!
//! # Template Variables
//!
//! | Variable          | Type             | Description                                   |
//! |-------------------|------------------|-----------------------------------------------|
//! | `name`            | `String`         | Title name (catalog name preferred)           |
//! | `id`              | `String`         | Title id of the file's content, uppercase     |
//! | `version`         | `u32`            | Revision number of the file's content         |
//! | `display_version` | `Option<String>` | Human-readable version, e.g. `"1.0.2"`        |
//! | `region`          | `Option<String>` | Catalog region                                |
//! | `type`            | `String`         | `base`, `update` or `dlc`                     |
//! | `dlc_name`        | `Option<String>` | Catalog name of the DLC, for DLC files only   |
//!
//! Values never contain path separators or characters that Windows rejects in
//! file names; those are removed before rendering.
//!
//! # Example
//!
//! ```
//! use slm_library::{NameGenerator, TemplateVars};
//!
//! let generator: NameGenerator = "{{ name }} [{{ id }}][v{{ version }}]".parse().unwrap();
//! let vars = TemplateVars::new("Super Game: Deluxe", "0100abcd12340000", 0);
//! assert_eq!(generator.generate(&vars).unwrap().to_str(), Some("Super Game Deluxe [0100ABCD12340000][v0]"));
//! ```

use crate::error::{Error, ErrorKind, Result};
use exn::{Exn, ResultExt};
use serde::Serialize;
use slm_core::ContentType;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use upon::{Engine, Template};

/// Characters removed from every template value.
const RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Everything a template can refer to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TemplateVars {
    pub name: String,
    pub id: String,
    pub version: u32,
    pub display_version: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub dlc_name: Option<String>,
}

impl TemplateVars {
    pub fn new(name: impl Into<String>, id: impl AsRef<str>, version: u32) -> Self {
        let id = id.as_ref().to_ascii_uppercase();
        let kind = slm_core::TitleId::parse(&id)
            .map(|id| id.content_type())
            .unwrap_or(ContentType::Base);
        Self {
            name: name.into(),
            id,
            version,
            display_version: None,
            region: None,
            kind,
            dlc_name: None,
        }
    }

    fn sanitized(&self) -> Self {
        let clean = |s: &str| -> String {
            let kept: String = s.chars().filter(|c| !RESERVED.contains(c) && !c.is_control()).collect();
            kept.split_whitespace().collect::<Vec<_>>().join(" ")
        };
        Self {
            name: clean(&self.name),
            id: clean(&self.id),
            version: self.version,
            display_version: self.display_version.as_deref().map(clean),
            region: self.region.as_deref().map(clean),
            kind: self.kind,
            dlc_name: self.dlc_name.as_deref().map(clean),
        }
    }
}

/// Generates relative paths from [`TemplateVars`] and a template string.
///
/// Constructed via [`FromStr`], which compiles the template eagerly so that
/// syntax errors surface at creation time rather than at render time.
///
/// Generated paths are normalized (trimmed segments, no empty segments) and
/// never leave the folder they are joined onto.
#[derive(Debug)]
pub struct NameGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
    safe: bool,
}

impl FromStr for NameGenerator {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template("name"))?;
        Ok(Self {
            engine,
            template,
            safe: false,
        })
    }
}

impl NameGenerator {
    /// Strip characters outside printable ASCII from every generated path.
    pub fn with_safe_names(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    /// Renders the template, returning a normalized relative path.
    pub fn generate(&self, vars: &TemplateVars) -> Result<PathBuf> {
        let rendered = self
            .template
            .render(&self.engine, vars.sanitized())
            .to_string()
            .or_raise(|| ErrorKind::Template("name"))?;
        let rendered = match self.safe {
            true => addons::ascii_only(&rendered),
            false => rendered,
        };
        normalize(&rendered)
    }

    /// Renders the template and appends a file extension; both `"nsp"` and
    /// `".nsp"` produce the same result.
    pub fn generate_with_ext(&self, vars: &TemplateVars, ext: impl AsRef<str>) -> Result<PathBuf> {
        let path = self.generate(vars)?;
        let ext = ext.as_ref().trim().trim_matches('.');
        if ext.is_empty() {
            return Ok(path);
        }
        let mut name = path.into_os_string();
        name.push(".");
        name.push(ext);
        Ok(PathBuf::from(name))
    }
}

/// Trims each segment, drops empty and `.` segments, and resolves `..` without
/// ever leaving the root.
fn normalize(rendered: &str) -> Result<PathBuf> {
    let escapes = || Exn::from(ErrorKind::PathEscapes(PathBuf::from(rendered)));
    let trimmed = rendered.split('/').map(str::trim).collect::<Vec<_>>().join("/");
    let mut components = Vec::new();
    for component in Path::new(&trimmed).components() {
        match component {
            Component::Normal(s) => {
                if s.as_encoded_bytes().contains(&0) {
                    return Err(escapes());
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(escapes()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    return Err(escapes());
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::Template("name")),
        false => Ok(components.into_iter().collect()),
    }
}

/// Two titles differing in every variable.
fn samples() -> [TemplateVars; 2] {
    let mut first = TemplateVars::new("Sample Adventure", "0100000000010000", 0);
    first.display_version = Some("1.0.0".to_string());
    first.region = Some("US".to_string());
    let mut second = TemplateVars::new("Other Quest", "0100000000021001", 65536);
    second.display_version = Some("2.1.0".to_string());
    second.region = Some("JP".to_string());
    second.dlc_name = Some("Expansion Pass".to_string());
    [first, second]
}

/// Compile `template` and check that it actually substitutes something.
///
/// A template is rejected when it does not compile, renders to nothing, or
/// renders identically for two different titles (every title would collide
/// on one name). `label` names the template in the error.
pub fn validate_template(template: &str, label: &'static str, safe: bool) -> Result<NameGenerator> {
    let generator = template.parse::<NameGenerator>().or_raise(|| ErrorKind::Template(label))?;
    let generator = generator.with_safe_names(safe);
    let [first, second] = samples();
    let a = generator.generate(&first).or_raise(|| ErrorKind::Template(label))?;
    let b = generator.generate(&second).or_raise(|| ErrorKind::Template(label))?;
    if a == b {
        tracing::debug!(template, "Template renders the same name for every title");
        exn::bail!(ErrorKind::Template(label));
    }
    Ok(generator)
}

/// Custom [`upon`] extensions for path-safe string manipulation.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Custom formatter that converts strings to URL-safe slugs.
    ///
    /// Strips quotation marks before slugifying to avoid awkward slug output
    /// like `"hello"` becoming `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn safe_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", ascii_only(s))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Drops every character outside printable ASCII, then collapses the
    /// whitespace that leaves behind.
    pub(super) fn ascii_only(s: &str) -> String {
        let kept: String = s.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect();
        kept.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ")
    }

    /// Truncates a string to a maximum byte length at a character boundary.
    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug_formatter);
        engine.add_formatter("safe", safe_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}
