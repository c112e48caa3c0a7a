use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sgp4::{Constants, Elements};

use crate::ephemeris::EphemerisError;

pub struct TleEntry {
    pub id: String,
    pub name: String,
    /// File stem the entry was loaded from, e.g. `starlink` for `starlink.tle`.
    pub constellation: String,
    pub elements: Elements,
    pub constants: Constants,
}

/// TLE sets loaded from a directory, keyed by NORAD id.
#[derive(Default)]
pub struct TleCatalog {
    satellites: BTreeMap<String, TleEntry>,
}

impl TleCatalog {
    /// Load every `.tle`/`.txt` file in `dir`. Files that fail to parse are
    /// skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self, EphemerisError> {
        if !dir.exists() {
            return Err(EphemerisError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext == "tle" || ext == "txt")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut catalog = Self::default();
        for path in paths {
            let content = fs::read_to_string(&path)?;
            let constellation = path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_lowercase();
            let source = path.file_name().unwrap_or_default().to_string_lossy();
            match parse_entries(&content, &constellation, &source) {
                Ok(entries) => {
                    for entry in entries {
                        catalog.satellites.insert(entry.id.clone(), entry);
                    }
                }
                Err(e) => log::warn!("Failed to parse TLE file {}: {}", path.display(), e),
            }
        }

        log::info!(
            "Loaded {} satellites from {}",
            catalog.satellites.len(),
            dir.display()
        );
        Ok(catalog)
    }

    /// Parse TLE text directly, tagging every entry with `constellation`.
    pub fn from_text(content: &str, constellation: &str) -> Result<Self, EphemerisError> {
        let mut catalog = Self::default();
        for entry in parse_entries(content, constellation, "<inline>")? {
            catalog.satellites.insert(entry.id.clone(), entry);
        }
        Ok(catalog)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TleEntry> {
        self.satellites.values()
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

fn parse_entries(
    content: &str,
    constellation: &str,
    source: &str,
) -> Result<Vec<TleEntry>, EphemerisError> {
    let invalid = |message: String| EphemerisError::InvalidTle {
        file: source.to_string(),
        message,
    };

    let mut results = Vec::new();
    for (name, line1, line2) in parse_multi_tle(content) {
        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let constants =
            Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;

        let id = elements.norad_id.to_string();
        results.push(TleEntry {
            name: name.unwrap_or_else(|| format!("NORAD {}", id)),
            id,
            constellation: constellation.to_string(),
            elements,
            constants,
        });
    }

    Ok(results)
}

/// Split multi-satellite TLE text into (name, line1, line2) triples.
/// Both 2-line and 3-line (named) layouts are accepted.
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}
