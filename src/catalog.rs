//! Read-only catalogs of resources packaged with a module.
//!
//! Resource names follow the manifest convention: a dot separated namespace
//! path ending in the file name, e.g. `demo.Resources.Subfolder.embedded2.txt`.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{EmbedError, Result};

pub type ResourceStream = Box<dyn Read + Send>;

/// Enumerates the resources packaged under a module.
///
/// Names and contents never change for the lifetime of a catalog, so
/// implementations are shared freely across threads.
pub trait ResourceCatalog: Send + Sync {
    /// Module identifier, also the root of every resource name.
    fn module(&self) -> &str;

    /// Every resource name, in a stable order.
    fn resource_names(&self) -> Vec<&str>;

    /// Opens a fresh stream positioned at the start of the resource.
    fn open(&self, name: &str) -> Option<ResourceStream>;

    /// Per-resource modification time, when the catalog records one.
    fn last_modified(&self, _name: &str) -> Option<SystemTime> {
        None
    }

    /// When the catalog was loaded.
    fn loaded_at(&self) -> SystemTime;
}

/// Catalog over resources compiled into the binary with `include_bytes!`.
pub struct StaticCatalog {
    module: String,
    entries: &'static [(&'static str, &'static [u8])],
    loaded_at: SystemTime,
}

impl StaticCatalog {
    pub fn new(module: &str, entries: &'static [(&'static str, &'static [u8])]) -> Self {
        log::debug!(
            "Loaded static catalog '{}' with {} resources",
            module,
            entries.len()
        );
        Self {
            module: module.to_string(),
            entries,
            loaded_at: SystemTime::now(),
        }
    }
}

impl ResourceCatalog for StaticCatalog {
    fn module(&self) -> &str {
        &self.module
    }

    fn resource_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    fn open(&self, name: &str) -> Option<ResourceStream> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, bytes)| Box::new(Cursor::new(*bytes)) as ResourceStream)
    }

    fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }
}

struct DirectoryEntry {
    name: String,
    content: Arc<[u8]>,
    modified: Option<SystemTime>,
}

/// Snapshot of a directory tree, packaged under `module` at load time.
///
/// Folder names are mangled the way resource compilers do it (`-` and spaces
/// become `_`); file names are kept verbatim.
pub struct DirectoryCatalog {
    module: String,
    entries: Vec<DirectoryEntry>,
    loaded_at: SystemTime,
}

impl DirectoryCatalog {
    pub fn load(module: &str, dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        collect_entries(dir, module, &mut entries).map_err(|source| EmbedError::CatalogLoad {
            path: dir.to_path_buf(),
            source,
        })?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        log::info!(
            "Packaged {} resources from {} as module '{}'",
            entries.len(),
            dir.display(),
            module
        );

        Ok(Self {
            module: module.to_string(),
            entries,
            loaded_at: SystemTime::now(),
        })
    }

    fn entry(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

fn collect_entries(
    dir: &Path,
    prefix: &str,
    entries: &mut Vec<DirectoryEntry>,
) -> std::io::Result<()> {
    for item in fs::read_dir(dir)? {
        let item = item?;
        let path = item.path();
        let file_name = item.file_name().to_string_lossy().into_owned();
        let metadata = item.metadata()?;

        if metadata.is_dir() {
            let nested = format!("{}.{}", prefix, mangle_folder(&file_name));
            collect_entries(&path, &nested, entries)?;
        } else if metadata.is_file() {
            let name = format!("{}.{}", prefix, file_name);
            log::trace!("Packaging {} as {}", path.display(), name);
            entries.push(DirectoryEntry {
                name,
                content: Arc::from(fs::read(&path)?),
                modified: metadata.modified().ok(),
            });
        }
    }
    Ok(())
}

/// Folder segment as it appears inside a manifest resource name.
pub fn mangle_folder(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

impl ResourceCatalog for DirectoryCatalog {
    fn module(&self) -> &str {
        &self.module
    }

    fn resource_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn open(&self, name: &str) -> Option<ResourceStream> {
        self.entry(name)
            .map(|e| Box::new(Cursor::new(Arc::clone(&e.content))) as ResourceStream)
    }

    fn last_modified(&self, name: &str) -> Option<SystemTime> {
        self.entry(name).and_then(|e| e.modified)
    }

    fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    static ENTRIES: &[(&str, &[u8])] = &[
        ("app.Resources.a.txt", b"alpha"),
        ("app.Resources.Sub.b.css", b"beta"),
    ];

    fn read_all(mut stream: ResourceStream) -> String {
        let mut s = String::new();
        stream.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn test_static_catalog_lists_and_opens() {
        let catalog = StaticCatalog::new("app", ENTRIES);
        assert_eq!(
            catalog.resource_names(),
            vec!["app.Resources.a.txt", "app.Resources.Sub.b.css"]
        );
        assert_eq!(read_all(catalog.open("app.Resources.Sub.b.css").unwrap()), "beta");
        assert!(catalog.open("app.Resources.missing.txt").is_none());
        assert!(catalog.last_modified("app.Resources.a.txt").is_none());
    }

    #[test]
    fn test_open_is_repeatable() {
        let catalog = StaticCatalog::new("app", ENTRIES);
        assert_eq!(read_all(catalog.open("app.Resources.a.txt").unwrap()), "alpha");
        assert_eq!(read_all(catalog.open("app.Resources.a.txt").unwrap()), "alpha");
    }

    #[test]
    fn test_directory_catalog_mangles_folders() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("my-folder/inner")).unwrap();
        fs::write(dir.path().join("root.txt"), "r").unwrap();
        fs::write(dir.path().join("my-folder/inner/x-y.js"), "x").unwrap();

        let catalog = DirectoryCatalog::load("site", dir.path()).unwrap();
        assert_eq!(
            catalog.resource_names(),
            vec!["site.my_folder.inner.x-y.js", "site.root.txt"]
        );
        assert_eq!(read_all(catalog.open("site.root.txt").unwrap()), "r");
        assert!(catalog.last_modified("site.root.txt").is_some());
    }

    #[test]
    fn test_directory_catalog_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryCatalog::load("site", &dir.path().join("nope")).err().unwrap();
        assert!(matches!(err, EmbedError::CatalogLoad { .. }));
    }

    #[test]
    fn test_mangle_folder() {
        assert_eq!(mangle_folder("Subfolder-with-hyphen"), "Subfolder_with_hyphen");
        assert_eq!(mangle_folder("two words"), "two_words");
    }
}
