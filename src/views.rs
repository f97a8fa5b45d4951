//! Locates view templates packaged in resource catalogs.
//!
//! A resource such as `Some.Resource.Path.With.Sub.Folder.View.html` becomes a
//! view named `View` with extension `html`, located at `Path/With/Sub/Folder`
//! once the module's root namespace `Some.Resource` is stripped.
//!
//! When no root namespace is registered for a module, the root is inferred as
//! the longest namespace prefix shared by all of the module's views. This is
//! best-effort: with a single view, or views that happen to share leading
//! folders, the inferred root will swallow real folder names.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::catalog::{ResourceCatalog, ResourceStream};

/// Re-openable access to a view's source.
pub type ContentAccessor = Arc<dyn Fn() -> Option<ResourceStream> + Send + Sync>;

pub struct ResourceMatch {
    pub name: String,
    pub contents: ContentAccessor,
}

/// Supplies the modules whose catalogs are scanned for views.
pub trait ModuleProvider {
    fn modules_to_scan(&self) -> Vec<Arc<dyn ResourceCatalog>>;
}

impl ModuleProvider for Vec<Arc<dyn ResourceCatalog>> {
    fn modules_to_scan(&self) -> Vec<Arc<dyn ResourceCatalog>> {
        self.clone()
    }
}

/// Lists the resources of a module carrying one of the given extensions.
pub trait ResourceReader {
    fn resource_stream_matches(
        &self,
        module: &Arc<dyn ResourceCatalog>,
        extensions: &[String],
    ) -> Vec<ResourceMatch>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResourceReader;

impl ResourceReader for DefaultResourceReader {
    fn resource_stream_matches(
        &self,
        module: &Arc<dyn ResourceCatalog>,
        extensions: &[String],
    ) -> Vec<ResourceMatch> {
        module
            .resource_names()
            .into_iter()
            .filter(|name| {
                name.rsplit_once('.').is_some_and(|(_, ext)| {
                    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
                })
            })
            .map(|name| {
                let catalog = Arc::clone(module);
                let owned = name.to_string();
                ResourceMatch {
                    name: name.to_string(),
                    contents: Arc::new(move || catalog.open(&owned)),
                }
            })
            .collect()
    }
}

/// Startup-time view settings: modules to skip and known root namespaces.
#[derive(Debug, Default, Clone)]
pub struct ViewLocationConfig {
    ignored: HashSet<String>,
    root_namespaces: HashMap<String, String>,
}

impl ViewLocationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore(mut self, module: &str) -> Self {
        self.ignored.insert(module.to_string());
        self
    }

    pub fn root_namespace(mut self, module: &str, namespace: &str) -> Self {
        self.root_namespaces
            .insert(module.to_string(), namespace.to_string());
        self
    }

    pub fn is_ignored(&self, module: &str) -> bool {
        self.ignored.contains(module)
    }

    pub fn root_namespace_of(&self, module: &str) -> Option<&str> {
        self.root_namespaces.get(module).map(String::as_str)
    }
}

#[derive(Clone)]
pub struct ViewLocationResult {
    /// Forward-slash folder path, empty at the root.
    pub location: String,
    pub name: String,
    pub extension: String,
    pub contents: ContentAccessor,
}

impl fmt::Debug for ViewLocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewLocationResult")
            .field("location", &self.location)
            .field("name", &self.name)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

pub struct EmbeddedViewLocationProvider<R, M> {
    reader: R,
    modules: M,
    config: ViewLocationConfig,
}

impl<R: ResourceReader, M: ModuleProvider> EmbeddedViewLocationProvider<R, M> {
    pub fn new(reader: R, modules: M, config: ViewLocationConfig) -> Self {
        Self {
            reader,
            modules,
            config,
        }
    }

    /// Every view whose extension is in `extensions`, compared
    /// case-insensitively. No extensions means no views.
    pub fn located_views(&self, extensions: Option<&[&str]>) -> Vec<ViewLocationResult> {
        let mut wanted: Vec<String> = extensions
            .unwrap_or_default()
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        wanted.sort();
        wanted.dedup();

        if wanted.is_empty() {
            log::debug!("No view extensions requested");
            return Vec::new();
        }

        let mut views = Vec::new();
        for module in self.modules.modules_to_scan() {
            if self.config.is_ignored(module.module()) {
                log::trace!("Skipping ignored module '{}'", module.module());
                continue;
            }

            let matches = self.reader.resource_stream_matches(&module, &wanted);
            log::debug!(
                "Found {} view resources in module '{}'",
                matches.len(),
                module.module()
            );
            views.extend(self.locate_module_views(module.module(), matches));
        }
        views
    }

    fn locate_module_views(
        &self,
        module: &str,
        matches: Vec<ResourceMatch>,
    ) -> Vec<ViewLocationResult> {
        let parsed: Vec<(Vec<&str>, &str, &str, &ContentAccessor)> = matches
            .iter()
            .filter_map(|m| {
                let mut segments: Vec<&str> = m.name.split('.').collect();
                if segments.len() < 2 {
                    log::debug!("Skipping resource without extension: {}", m.name);
                    return None;
                }
                let extension = segments.pop()?;
                let name = segments.pop()?;
                Some((segments, name, extension, &m.contents))
            })
            .collect();

        let root: Vec<String> = match self.config.root_namespace_of(module) {
            Some(ns) => ns.split('.').map(str::to_string).collect(),
            None if parsed.len() == 1 => parsed[0].0.iter().map(|s| s.to_string()).collect(),
            None => common_namespace(parsed.iter().map(|p| p.0.as_slice())),
        };

        parsed
            .into_iter()
            .map(|(namespace, name, extension, contents)| ViewLocationResult {
                location: strip_root(&namespace, &root).join("/"),
                name: name.to_string(),
                extension: extension.to_string(),
                contents: Arc::clone(contents),
            })
            .collect()
    }
}

fn common_namespace<'a>(mut namespaces: impl Iterator<Item = &'a [&'a str]>) -> Vec<String> {
    let Some(first) = namespaces.next() else {
        return Vec::new();
    };
    let mut len = first.len();
    for ns in namespaces {
        len = first
            .iter()
            .zip(ns.iter())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
    }
    first[..len].iter().map(|s| s.to_string()).collect()
}

fn strip_root<'a>(namespace: &[&'a str], root: &[String]) -> Vec<&'a str> {
    let rooted = namespace.len() >= root.len()
        && namespace
            .iter()
            .zip(root.iter())
            .all(|(segment, r)| segment.to_lowercase() == r.to_lowercase());
    if rooted {
        namespace[root.len()..].to_vec()
    } else {
        namespace.to_vec()
    }
}
