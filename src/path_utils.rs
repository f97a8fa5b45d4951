use percent_encoding::percent_decode_str;
use std::time::Instant;

use crate::catalog::{mangle_folder, ResourceCatalog};
use crate::logging::LoggingExt;

/// Decodes and normalizes a requested file name into path segments.
///
/// Returns `None` when the path cannot be decoded or climbs above its root.
pub fn sanitize_path(request_path: &str) -> Option<Vec<String>> {
    log::debug!("Sanitizing path - request: {}", request_path);

    // Strip query parameters from the request path
    let path_without_query = request_path.split('?').next().unwrap_or(request_path);

    let decoded_path = request_path
        .log_operation("decode_path", || percent_decode_str(path_without_query).decode_utf8())
        .ok()?;

    let mut segments: Vec<String> = Vec::new();
    for segment in decoded_path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    log::warn!("Path escapes virtual directory: {}", request_path);
                    return None;
                }
            }
            normal => segments.push(normal.to_string()),
        }
    }

    if segments.is_empty() {
        log::debug!("Path is empty after normalization: {}", request_path);
        return None;
    }

    log::debug!("Cleaned path: {}", segments.join("/"));
    Some(segments)
}

/// Manifest names a normalized path may be packaged under.
///
/// Folder segments are tried both verbatim and mangled so that hyphenated
/// folders match however the catalog recorded them.
pub fn candidate_names(prefix: &str, segments: &[String]) -> Vec<String> {
    let Some((file_name, folders)) = segments.split_last() else {
        return Vec::new();
    };

    let join = |folders: Vec<String>| {
        let mut parts = Vec::with_capacity(folders.len() + 2);
        if !prefix.is_empty() {
            parts.push(prefix.to_string());
        }
        parts.extend(folders);
        parts.push(file_name.clone());
        parts.join(".")
    };

    let verbatim = join(folders.to_vec());
    let mangled = join(folders.iter().map(|f| mangle_folder(f)).collect());

    if verbatim == mangled {
        vec![verbatim]
    } else {
        vec![verbatim, mangled]
    }
}

/// Finds the catalog resource a requested file name refers to.
///
/// Matching is case-insensitive over Unicode letters; when several entries
/// match, the lexicographically first one wins.
pub fn find_resource(
    catalog: &dyn ResourceCatalog,
    prefix: &str,
    requested: &str,
) -> Option<String> {
    let start_time = Instant::now();
    let segments = sanitize_path(requested)?;
    let candidates: Vec<String> = candidate_names(prefix, &segments)
        .iter()
        .map(|c| c.to_lowercase())
        .collect();
    log::trace!("Candidate resource names: {:?}", candidates);

    let mut matches: Vec<&str> = catalog
        .resource_names()
        .into_iter()
        .filter(|name| candidates.contains(&name.to_lowercase()))
        .collect();
    matches.sort_unstable();
    matches.dedup();

    if matches.len() > 1 {
        log::warn!(
            "Ambiguous resource match for '{}' in module '{}': {:?}",
            requested,
            catalog.module(),
            matches
        );
    }

    let found = matches.first().map(|name| name.to_string());
    log::debug!(
        "Resolved '{}' to {:?} in {:?}",
        requested,
        found,
        start_time.elapsed()
    );
    found
}
