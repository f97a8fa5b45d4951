//! Virtual directories bound to embedded resource catalogs.

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::ResourceCatalog;
use crate::config::ServeOptions;
use crate::log_resolution;
use crate::path_utils::{find_resource, sanitize_path};
use crate::response::{build_response, RequestDescriptor, ResponseDescriptor};

/// Maps a URL prefix onto the resources under one namespace of a catalog.
pub struct EmbeddedDirectory {
    virtual_path: String,
    catalog: Arc<dyn ResourceCatalog>,
    prefix: String,
    options: Arc<ServeOptions>,
}

impl EmbeddedDirectory {
    /// Binds `virtual_path` to `<module>.<namespace>` inside `catalog`.
    ///
    /// `namespace` may use `/` or `.` separators and may be empty to expose
    /// the whole module.
    pub fn bind(virtual_path: &str, catalog: Arc<dyn ResourceCatalog>, namespace: &str) -> Self {
        let namespace = namespace.replace('/', ".");
        let namespace = namespace.trim_matches('.');
        let prefix = if namespace.is_empty() {
            catalog.module().to_string()
        } else {
            format!("{}.{}", catalog.module(), namespace)
        };

        log::debug!(
            "Binding virtual directory '{}' to resources under '{}'",
            virtual_path,
            prefix
        );

        Self {
            virtual_path: virtual_path.trim_matches('/').to_string(),
            catalog,
            prefix,
            options: Arc::new(ServeOptions::default()),
        }
    }

    pub fn with_options(mut self, options: Arc<ServeOptions>) -> Self {
        self.options = options;
        self
    }

    pub fn virtual_path(&self) -> &str {
        &self.virtual_path
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Part of `path` below this virtual directory, if it lies under it.
    fn requested_file<'a>(&self, path: &'a str) -> Option<&'a str> {
        let trimmed = path.trim_start_matches('/');
        let dir = self.virtual_path.as_str();
        if dir.is_empty() {
            return Some(trimmed);
        }

        let head = trimmed.get(..dir.len())?;
        if !head.eq_ignore_ascii_case(dir) {
            return None;
        }

        let rest = &trimmed[dir.len()..];
        match rest.strip_prefix('/') {
            Some(file) => Some(file),
            None if rest.is_empty() => Some(""),
            None => None,
        }
    }

    /// Resolves `request` against this directory.
    ///
    /// Returns `None` when the request is not addressed to this directory
    /// (wrong prefix, or a method other than GET/HEAD). Otherwise the
    /// response is 200, 304 or 404; resolution itself never fails.
    pub fn resolve(&self, request: &RequestDescriptor) -> Option<ResponseDescriptor> {
        let start_time = Instant::now();

        if !(request.method.eq_ignore_ascii_case("GET") || request.is_head()) {
            log::trace!("Ignoring {} request for {}", request.method, request.path);
            return None;
        }

        let requested = self.requested_file(&request.path)?;
        log::debug!(
            "Virtual directory '{}' handling request for '{}'",
            self.virtual_path,
            requested
        );

        let response = match find_resource(self.catalog.as_ref(), &self.prefix, requested) {
            Some(resource_name) => {
                let file_name = sanitize_path(requested)
                    .and_then(|segments| segments.last().cloned())
                    .unwrap_or_default();
                build_response(
                    &self.catalog,
                    &resource_name,
                    &file_name,
                    request,
                    &self.options,
                )
            }
            None => ResponseDescriptor::not_found(),
        };

        log_resolution!(
            request.method,
            request.path,
            response.status,
            start_time.elapsed()
        );
        Some(response)
    }
}

/// Every embedded directory the application has registered.
#[derive(Default)]
pub struct EmbeddedConventions {
    directories: Vec<EmbeddedDirectory>,
    options: Arc<ServeOptions>,
}

impl EmbeddedConventions {
    pub fn new(options: ServeOptions) -> Self {
        Self {
            directories: Vec::new(),
            options: Arc::new(options),
        }
    }

    /// Registers a directory; shared options replace the directory's own.
    pub fn add_directory(
        &mut self,
        virtual_path: &str,
        catalog: Arc<dyn ResourceCatalog>,
        namespace: &str,
    ) -> &mut Self {
        let directory = EmbeddedDirectory::bind(virtual_path, catalog, namespace)
            .with_options(Arc::clone(&self.options));
        self.directories.push(directory);
        self
    }

    pub fn directories(&self) -> &[EmbeddedDirectory] {
        &self.directories
    }

    /// First directory that handles the request wins.
    pub fn resolve(&self, request: &RequestDescriptor) -> Option<ResponseDescriptor> {
        self.directories.iter().find_map(|d| d.resolve(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::response::Status;

    static ENTRIES: &[(&str, &[u8])] = &[
        ("demo.Content.site.css", b"css"),
        ("demo.Content.js.app.js", b"js"),
        ("demo.Views.index.html", b"<html/>"),
    ];

    fn catalog() -> Arc<dyn ResourceCatalog> {
        Arc::new(StaticCatalog::new("demo", ENTRIES))
    }

    #[test]
    fn test_bind_builds_prefix() {
        assert_eq!(EmbeddedDirectory::bind("/Content", catalog(), "Content").prefix(), "demo.Content");
        assert_eq!(EmbeddedDirectory::bind("/x/", catalog(), "/a/b/").prefix(), "demo.a.b");
        assert_eq!(EmbeddedDirectory::bind("/", catalog(), "").prefix(), "demo");
        assert_eq!(EmbeddedDirectory::bind("/x/", catalog(), "").virtual_path(), "x");
    }

    #[test]
    fn test_requested_file() {
        let dir = EmbeddedDirectory::bind("/Content", catalog(), "Content");
        assert_eq!(dir.requested_file("/Content/site.css"), Some("site.css"));
        assert_eq!(dir.requested_file("/content/js/app.js"), Some("js/app.js"));
        assert_eq!(dir.requested_file("/Content"), Some(""));
        assert_eq!(dir.requested_file("/Contents/site.css"), None);
        assert_eq!(dir.requested_file("/Other/site.css"), None);
        assert_eq!(dir.requested_file("/C"), None);
    }

    #[test]
    fn test_resolve_dispositions() {
        let dir = EmbeddedDirectory::bind("/Content", catalog(), "Content");

        let found = dir.resolve(&RequestDescriptor::get("/Content/js/app.js")).unwrap();
        assert_eq!(found.status, Status::Ok);
        assert_eq!(found.into_bytes().unwrap(), b"js");

        let missing = dir.resolve(&RequestDescriptor::get("/Content/nope.css")).unwrap();
        assert_eq!(missing.status, Status::NotFound);

        let escape = dir.resolve(&RequestDescriptor::get("/Content/../Views/index.html")).unwrap();
        assert_eq!(escape.status, Status::NotFound);

        assert!(dir.resolve(&RequestDescriptor::get("/Views/index.html")).is_none());
        assert!(dir.resolve(&RequestDescriptor::new("POST", "/Content/site.css")).is_none());
    }

    #[test]
    fn test_conventions_pick_matching_directory() {
        let mut conventions = EmbeddedConventions::new(ServeOptions::default());
        conventions
            .add_directory("/Content", catalog(), "Content")
            .add_directory("/Views", catalog(), "Views");
        assert_eq!(conventions.directories().len(), 2);

        let view = conventions.resolve(&RequestDescriptor::get("/Views/index.html")).unwrap();
        assert_eq!(view.content_type.as_deref(), Some("text/html"));
        assert_eq!(view.into_bytes().unwrap(), b"<html/>");

        assert!(conventions.resolve(&RequestDescriptor::get("/api/users")).is_none());
    }
}
