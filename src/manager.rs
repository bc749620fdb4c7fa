//! Multi-archive loading and the cross-file name index.
//!
//! Work happens in two phases:
//!
//! 1. **Load** ([`AssetManager::load_archives`]): every archive is parsed on
//!    its own, in parallel with the `parallel` feature.  Each task returns a
//!    self-contained [`LoadedArchive`]; results are merged afterwards in input
//!    order, so the outcome never depends on scheduling.
//! 2. **Decode** ([`AssetManager::decode_objects`]): every serialized file's
//!    objects are decoded on the calling thread and named objects are
//!    indexed.
//!
//! Resource streams are shared across archives.  Locations are bound lazily,
//! so a texture may reference a `.resS` entry from an archive loaded later.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::bundle::BundleFile;
use crate::class_id::ClassId;
use crate::error::{Error, ObjectError, Result};
use crate::header::ArchiveHeader;
use crate::objects::texture::Texture2D;
use crate::objects::{Object, ObjectRegistry, PPtr};
use crate::pixel::TextureRequest;
use crate::resource::{ResourceLocation, ResourceStreams};
use crate::serialized::{is_serialized_file, SerializedFile};
use crate::shared::SharedBytes;

// ── Options ───────────────────────────────────────────────────────────────────

/// Manager configuration.  Deserializable so it can live in a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Classes whose names are not unique across archives; they are indexed
    /// under `prefix + separator + name`.
    pub collision_prone_classes:  Vec<ClassId>,
    pub prefix_separator:         String,
    /// Keep decoding a file after one of its objects fails.
    pub continue_on_object_error: bool,
    /// Load archives on the thread pool when built with the `parallel`
    /// feature.
    pub parallel:                 bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            collision_prone_classes:  vec![ClassId::SPRITE],
            prefix_separator:         "/".to_owned(),
            continue_on_object_error: true,
            parallel:                 true,
        }
    }
}

impl LoadOptions {
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// ── Load phase ────────────────────────────────────────────────────────────────

/// One archive to load.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    pub path:   PathBuf,
    pub data:   Vec<u8>,
    /// Disambiguates collision-prone names; usually derived from the
    /// archive's directory.
    pub prefix: Option<String>,
}

impl ArchiveSource {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>, prefix: Option<String>) -> Self {
        Self { path: path.into(), data, prefix }
    }
}

/// Everything one archive contributed, before merging.
#[derive(Debug)]
pub struct LoadedArchive {
    pub path:      PathBuf,
    pub header:    ArchiveHeader,
    pub files:     Vec<SerializedFile>,
    pub resources: Vec<(String, SharedBytes)>,
    /// Entries that looked like serialized files but failed to parse.
    pub failures:  Vec<LoadFailure>,
}

#[derive(Debug)]
pub struct LoadFailure {
    pub path:  PathBuf,
    /// Entry inside the archive, when the archive itself parsed.
    pub entry: Option<String>,
    pub error: Error,
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.entry {
            Some(entry) => write!(f, "{}:{}: {}", self.path.display(), entry, self.error),
            None        => write!(f, "{}: {}", self.path.display(), self.error),
        }
    }
}

/// Aggregate result of a load; partial success is normal.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded:   usize,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parse one archive and split its entries into serialized files and
/// resource streams.
pub fn load_archive_source(source: &ArchiveSource) -> Result<LoadedArchive> {
    let bundle = BundleFile::parse(&source.data)?;
    let mut loaded = LoadedArchive {
        path:      source.path.clone(),
        header:    bundle.header.clone(),
        files:     Vec::new(),
        resources: Vec::new(),
        failures:  Vec::new(),
    };
    for (index, entry) in bundle.directory.entries.iter().enumerate() {
        let bytes = bundle.entry_bytes(index)?;
        if !is_serialized_file(&bytes) {
            loaded.resources.push((entry.name().to_owned(), bytes));
            continue;
        }
        match SerializedFile::parse(entry.name(), bytes, source.prefix.clone()) {
            Ok(mut file) => {
                // Files inside archives often carry a stripped version string.
                file.set_engine_version(&bundle.header.engine_revision);
                loaded.files.push(file);
            }
            Err(error) => {
                warn!(archive = %source.path.display(), entry = entry.name(), %error, "serialized file rejected");
                loaded.failures.push(LoadFailure {
                    path:  source.path.clone(),
                    entry: Some(entry.name().to_owned()),
                    error,
                });
            }
        }
    }
    debug!(
        archive = %source.path.display(),
        files = loaded.files.len(),
        resources = loaded.resources.len(),
        "loaded archive"
    );
    Ok(loaded)
}

/// Prefix for an archive on disk: the parent directory name up to its first
/// `_`.
pub fn prefix_for_path(path: &Path) -> Option<String> {
    let dir = path.parent()?.file_name()?.to_str()?;
    dir.split('_').next().filter(|p| !p.is_empty()).map(str::to_owned)
}

// ── Manager ───────────────────────────────────────────────────────────────────

/// Summary of a merged archive.
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub path:   PathBuf,
    pub header: ArchiveHeader,
}

/// A decoded object together with the file that owns it.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    pub file:   &'a SerializedFile,
    pub object: &'a Object,
}

#[derive(Debug, Default)]
pub struct AssetManager {
    options:    LoadOptions,
    registry:   ObjectRegistry,
    archives:   Vec<ArchiveRecord>,
    files:      Vec<SerializedFile>,
    resources:  ResourceStreams,
    /// Name → (file index, path id).
    names:      HashMap<String, (usize, i64)>,
}

impl AssetManager {
    pub fn new(options: LoadOptions) -> Self {
        Self::with_registry(options, ObjectRegistry::default())
    }

    pub fn with_registry(options: LoadOptions, registry: ObjectRegistry) -> Self {
        Self {
            options,
            registry,
            archives:  Vec::new(),
            files:     Vec::new(),
            resources: ResourceStreams::new(),
            names:     HashMap::new(),
        }
    }

    pub fn options(&self) -> &LoadOptions { &self.options }

    pub fn registry_mut(&mut self) -> &mut ObjectRegistry { &mut self.registry }

    /// Load a single archive, failing on any archive-level error.
    pub fn load_archive(&mut self, path: impl Into<PathBuf>, data: Vec<u8>, prefix: Option<String>) -> Result<()> {
        let loaded = load_archive_source(&ArchiveSource::new(path, data, prefix))?;
        for failure in &loaded.failures {
            warn!(%failure, "entry skipped");
        }
        self.merge(loaded);
        Ok(())
    }

    /// Load many archives; one bad archive never stops the others.
    pub fn load_archives<I>(&mut self, sources: I) -> LoadReport
    where
        I: IntoIterator<Item = ArchiveSource>,
    {
        let sources: Vec<ArchiveSource> = sources.into_iter().collect();
        let results = self.load_all(&sources);

        let mut report = LoadReport::default();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(mut loaded) => {
                    report.failures.append(&mut loaded.failures);
                    self.merge(loaded);
                    report.loaded += 1;
                }
                Err(error) => {
                    warn!(archive = %source.path.display(), %error, "archive failed to load");
                    report.failures.push(LoadFailure { path: source.path.clone(), entry: None, error });
                }
            }
        }
        info!(
            loaded = report.loaded,
            failed = report.failures.len(),
            files = self.files.len(),
            resources = self.resources.len(),
            "load phase finished"
        );
        report
    }

    /// Read archives from disk and load them, prefixing each by its
    /// directory (see [`prefix_for_path`]).
    pub fn load_paths<I, P>(&mut self, paths: I) -> LoadReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut sources = Vec::new();
        let mut unreadable = Vec::new();
        for path in paths {
            let path = path.as_ref();
            match std::fs::read(path) {
                Ok(data) => sources.push(ArchiveSource::new(path, data, prefix_for_path(path))),
                Err(e) => unreadable.push(LoadFailure { path: path.to_path_buf(), entry: None, error: e.into() }),
            }
        }
        let mut report = self.load_archives(sources);
        unreadable.append(&mut report.failures);
        report.failures = unreadable;
        report
    }

    fn load_all(&self, sources: &[ArchiveSource]) -> Vec<Result<LoadedArchive>> {
        #[cfg(feature = "parallel")]
        {
            if self.options.parallel {
                use rayon::prelude::*;
                return sources.par_iter().map(load_archive_source).collect();
            }
        }
        sources.iter().map(load_archive_source).collect()
    }

    fn merge(&mut self, loaded: LoadedArchive) {
        for (name, bytes) in loaded.resources {
            if self.resources.insert(name.clone(), bytes).is_some() {
                warn!(stream = %name, archive = %loaded.path.display(), "resource stream replaced");
            }
        }
        self.files.extend(loaded.files);
        self.archives.push(ArchiveRecord { path: loaded.path, header: loaded.header });
    }

    // ── Decode phase ──────────────────────────────────────────────────────────

    /// Decode every loaded file's objects and rebuild the name index.
    ///
    /// Runs on the calling thread, file by file in load order, so the
    /// returned errors and the name index never depend on scheduling.  Safe
    /// to call again after loading more archives; earlier results are
    /// replaced, not duplicated.
    pub fn decode_objects(&mut self) -> Vec<ObjectError> {
        let stop_on_error = !self.options.continue_on_object_error;
        let mut errors = Vec::new();
        for file in &mut self.files {
            errors.append(&mut file.decode_objects(&self.registry, stop_on_error));
        }
        self.rebuild_name_index();

        info!(files = self.files.len(), named = self.names.len(), errors = errors.len(), "decode phase finished");
        errors
    }

    fn rebuild_name_index(&mut self) {
        self.names.clear();
        for (index, file) in self.files.iter().enumerate() {
            for object in file.objects() {
                let Some(name) = object.name() else { continue };
                let key = if self.options.collision_prone_classes.contains(&object.class_id()) {
                    prefixed_name(file.bundle_prefix.as_deref(), name, &self.options.prefix_separator)
                } else {
                    name.to_owned()
                };
                self.names.insert(key, (index, object.path_id()));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn archives(&self) -> &[ArchiveRecord] { &self.archives }

    pub fn serialized_files(&self) -> &[SerializedFile] { &self.files }

    pub fn resource_streams(&self) -> &ResourceStreams { &self.resources }

    /// Look up a named object.  Collision-prone classes are keyed by
    /// `prefix + separator + name`.
    pub fn by_name(&self, name: &str) -> Option<ObjectRef<'_>> {
        let &(index, path_id) = self.names.get(name)?;
        let file = self.files.get(index)?;
        Some(ObjectRef { file, object: file.object(path_id)? })
    }

    /// Every indexed name.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.keys().map(String::as_str)
    }

    /// Follow `pptr` from an object owned by `owner`.
    pub fn resolve<'a>(&'a self, owner: &'a SerializedFile, pptr: &PPtr) -> Result<Option<ObjectRef<'a>>> {
        Ok(pptr.resolve(owner)?.map(|object| ObjectRef { file: owner, object }))
    }

    pub fn resource_bytes<'a>(&self, location: &'a ResourceLocation) -> Result<&'a [u8]> {
        location.get_bytes(&self.resources)
    }

    /// Gather what a pixel codec needs to decode `texture`.
    pub fn texture_request<'a>(&self, texture: &'a Texture2D) -> Result<TextureRequest<'a>> {
        TextureRequest::new(texture, &self.resources)
    }
}

fn prefixed_name(prefix: Option<&str>, name: &str, separator: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}{separator}{name}"),
        _ => name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_first_underscore_component() {
        assert_eq!(prefix_for_path(Path::new("bundles/ui_common_hd/__data")), Some("ui".to_owned()));
        assert_eq!(prefix_for_path(Path::new("bundles/icons/__data")), Some("icons".to_owned()));
        assert_eq!(prefix_for_path(Path::new("__data")), None);
    }

    #[test]
    fn empty_prefix_is_dropped() {
        assert_eq!(prefixed_name(Some("ui"), "button", "/"), "ui/button");
        assert_eq!(prefixed_name(Some(""), "button", "/"), "button");
        assert_eq!(prefixed_name(None, "button", "::"), "button");
    }

    #[test]
    fn options_fill_missing_fields_from_defaults() {
        let options = LoadOptions::from_json(r#"{ "prefix_separator": "::", "parallel": false }"#).unwrap();
        assert_eq!(options.prefix_separator, "::");
        assert!(!options.parallel);
        assert_eq!(options.collision_prone_classes, vec![ClassId::SPRITE]);
        assert!(options.continue_on_object_error);
    }

    #[test]
    fn garbage_archive_is_reported_not_fatal() {
        let mut manager = AssetManager::new(LoadOptions::default());
        let report = manager.load_archives([ArchiveSource::new("junk", b"not an archive".to_vec(), None)]);
        assert_eq!(report.loaded, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, Error::UnsupportedFormat(_)));
    }
}
