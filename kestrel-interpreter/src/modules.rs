//! Module loading and import tracking.
//!
//! `import "path"` first consults the native library registry; any other
//! path is handed to a [`ModuleLoader`], which returns the module's key and
//! source text. Circular imports are detected through an [`ImportTracker`]
//! shared by every environment of one run.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::environment::Env;
use crate::error::{ErrorValue, Result, RuntimeError};

/// Source file extension appended when an import path has none
pub const SOURCE_EXTENSION: &str = "kes";

/// A loaded module: its canonical key and its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    pub key: String,
    pub source: String,
}

/// Resolves import paths to module sources
pub trait ModuleLoader {
    /// Load `path` as imported from the module keyed `importer`
    fn load(&self, path: &str, importer: &str) -> io::Result<ModuleSource>;

    /// Key for an entry module run under `name`, matching the key `load`
    /// gives the same module when it is imported
    fn entry_key(&self, name: &str) -> String {
        with_source_extension(name)
    }
}

/// Append the source extension unless `name` already has one
fn with_source_extension(name: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}.{}", name, SOURCE_EXTENSION)
    }
}

/// Loads modules from disk, relative to the importing module's directory
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader;

impl FileSystemLoader {
    /// Resolve an import path against the importer's directory
    pub fn resolve(path: &str, importer: &str) -> PathBuf {
        let mut resolved = match Path::new(importer).parent() {
            Some(directory) if !Path::new(path).is_absolute() => directory.join(path),
            _ => PathBuf::from(path),
        };

        if resolved.extension().is_none() {
            resolved.set_extension(SOURCE_EXTENSION);
        }

        normalize(&resolved)
    }

    /// Module key for a file run directly
    pub fn module_key(path: &Path) -> String {
        normalize(path).to_string_lossy().into_owned()
    }
}

impl ModuleLoader for FileSystemLoader {
    fn entry_key(&self, name: &str) -> String {
        Self::module_key(Path::new(&with_source_extension(name)))
    }

    fn load(&self, path: &str, importer: &str) -> io::Result<ModuleSource> {
        let resolved = Self::resolve(path, importer);
        let source = fs::read_to_string(&resolved).map_err(|error| {
            io::Error::new(
                error.kind(),
                format!("{}: {}", resolved.display(), error),
            )
        })?;

        Ok(ModuleSource {
            key: resolved.to_string_lossy().into_owned(),
            source,
        })
    }
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Serves modules from memory, keyed by path with the source extension
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    modules: HashMap<String, String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; `name` may omit the extension
    pub fn with_module(mut self, name: &str, source: &str) -> Self {
        self.modules.insert(Self::key(name), source.to_string());
        self
    }

    fn key(name: &str) -> String {
        with_source_extension(name)
    }
}

impl ModuleLoader for InMemoryLoader {
    fn load(&self, path: &str, _importer: &str) -> io::Result<ModuleSource> {
        let key = Self::key(path);
        match self.modules.get(&key) {
            Some(source) => Ok(ModuleSource {
                key,
                source: source.clone(),
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no module named '{}'", path),
            )),
        }
    }
}

/// Installs a native library into the importing scope under the given alias
pub type NativeLibraryLoader = fn(&Env, &str) -> std::result::Result<(), ErrorValue>;

/// Registry of native libraries, consulted before the module loader
#[derive(Clone, Default)]
pub struct NativeRegistry {
    libraries: HashMap<String, NativeLibraryLoader>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry every interpreter starts with
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("math", crate::libraries::load_math);
        registry
    }

    pub fn register(&mut self, name: &str, loader: NativeLibraryLoader) {
        self.libraries.insert(name.to_string(), loader);
    }

    pub fn get(&self, name: &str) -> Option<NativeLibraryLoader> {
        self.libraries.get(name).copied()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.libraries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Who imported whom, for circular import detection
#[derive(Debug, Default)]
pub struct ImportTracker {
    /// Module key to the keys of the modules that imported it
    importers: RefCell<HashMap<String, HashSet<String>>>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `importer` imports `target`, failing on a cycle
    pub fn record(&self, target: &str, importer: &str) -> Result<()> {
        if target == importer || self.is_transitive_importer(target, importer) {
            return Err(RuntimeError::circular_import(target, importer));
        }

        self.importers
            .borrow_mut()
            .entry(target.to_string())
            .or_default()
            .insert(importer.to_string());
        Ok(())
    }

    /// Whether `candidate` imports `module`, directly or through other modules
    pub fn is_transitive_importer(&self, candidate: &str, module: &str) -> bool {
        let importers = self.importers.borrow();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([module.to_string()]);

        while let Some(current) = queue.pop_front() {
            let Some(direct) = importers.get(&current) else {
                continue;
            };
            for importer in direct {
                if importer == candidate {
                    return true;
                }
                if visited.insert(importer.clone()) {
                    queue.push_back(importer.clone());
                }
            }
        }

        false
    }

    /// Modules that directly imported `module`
    pub fn importers_of(&self, module: &str) -> Vec<String> {
        let mut importers: Vec<String> = self
            .importers
            .borrow()
            .get(module)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        importers.sort();
        importers
    }
}
