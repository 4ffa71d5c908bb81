use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use ndarray::ArrayD;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::consts::ITEM_EXTENSIONS;
use crate::error::{Result, RoiscopeError};
use crate::frame::{Frame, FrameMetadata};
use crate::io::{ArrayLoader, FileLoader};
use crate::progress::{NoOpReporter, ProgressReporter, Stage};

static ITEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"item_(\d+)").expect("valid item pattern"));
static DIGITS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digits pattern"));

/// Directory-backed cache of numbered array files.
///
/// Items are addressed by the integer parsed from their file name
/// (`item_007.npy` and `7.h5` are both item 7). Loaded arrays stay cached
/// until [`ItemCatalog::clear_cache`].
pub struct ItemCatalog<L: ArrayLoader = FileLoader> {
    loader: L,
    root_directory: Option<PathBuf>,
    available: BTreeSet<u32>,
    /// Files seen for each item during the last scan, in extension priority order.
    discovered: BTreeMap<u32, Vec<PathBuf>>,
    cache: HashMap<u32, Arc<Frame>>,
    metadata: HashMap<u32, FrameMetadata>,
}

impl Default for ItemCatalog<FileLoader> {
    fn default() -> Self {
        Self::with_loader(FileLoader)
    }
}

impl ItemCatalog<FileLoader> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: ArrayLoader> ItemCatalog<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            root_directory: None,
            available: BTreeSet::new(),
            discovered: BTreeMap::new(),
            cache: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn root_directory(&self) -> Option<&Path> {
        self.root_directory.as_deref()
    }

    /// Scan `path` for array files and replace the set of available items.
    ///
    /// Returns the number of distinct items found. The cache is left alone,
    /// even when the scan fails.
    pub fn set_directory(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        self.available.clear();
        self.discovered.clear();

        if !path.is_dir() {
            warn!("Not a directory: {}", path.display());
            return Err(RoiscopeError::InvalidDirectory(path.to_path_buf()));
        }
        self.root_directory = Some(path.to_path_buf());

        let entries = fs::read_dir(path).map_err(|e| {
            warn!("Cannot read directory {}: {}", path.display(), e);
            RoiscopeError::Io(e)
        })?;

        for entry in entries.flatten() {
            let file = entry.path();
            if !file.is_file() || extension_rank(&file).is_none() {
                continue;
            }
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(item) = item_number_from_name(name) {
                self.discovered.entry(item).or_default().push(file);
            }
        }

        for files in self.discovered.values_mut() {
            files.sort_by(|a, b| extension_rank(a).cmp(&extension_rank(b)).then(a.cmp(b)));
        }
        self.available = self.discovered.keys().copied().collect();

        if self.available.is_empty() {
            warn!("No array files found in {}", path.display());
            return Err(RoiscopeError::NoItems(path.to_path_buf()));
        }

        info!(
            "Found {} items in {}",
            self.available.len(),
            path.display()
        );
        Ok(self.available.len())
    }

    /// Sorted copy of the item numbers found by the last scan.
    pub fn available_items(&self) -> Vec<u32> {
        self.available.iter().copied().collect()
    }

    pub fn is_cached(&self, item: u32) -> bool {
        self.cache.contains_key(&item)
    }

    pub fn cached_items(&self) -> Vec<u32> {
        let mut items: Vec<u32> = self.cache.keys().copied().collect();
        items.sort_unstable();
        items
    }

    pub fn metadata(&self, item: u32) -> Option<&FrameMetadata> {
        self.metadata.get(&item)
    }

    /// Load one item, returning the cached array unless `force_reload` is set.
    pub fn load_item(&mut self, item: u32, force_reload: bool) -> Result<Arc<Frame>> {
        if !force_reload {
            if let Some(frame) = self.cache.get(&item) {
                debug!("Item {} served from cache", item);
                return Ok(Arc::clone(frame));
            }
        }

        if !self.available.contains(&item) {
            warn!("Item {} not in catalog", item);
            return Err(RoiscopeError::ItemNotFound(item));
        }

        let path = self.resolve_path(item).ok_or_else(|| {
            let directory = self.root_directory.clone().unwrap_or_default();
            warn!("No file for item {} in {}", item, directory.display());
            RoiscopeError::FileNotFound { item, directory }
        })?;

        let frame = self.loader.load(&path).map_err(|e| {
            warn!("Failed to load item {} from {}: {}", item, path.display(), e);
            e
        })?;

        debug!(
            "Loaded item {} from {} (shape {:?}, dtype {})",
            item,
            path.display(),
            frame.shape(),
            frame.dtype
        );
        self.metadata.insert(
            item,
            FrameMetadata {
                path,
                shape: frame.shape().to_vec(),
                dtype: frame.dtype.clone(),
                byte_size: frame.byte_size(),
            },
        );
        let frame = Arc::new(frame);
        self.cache.insert(item, Arc::clone(&frame));
        Ok(frame)
    }

    /// Load several items; items that fail are left out of the result.
    pub fn load_multiple(&mut self, items: &[u32]) -> BTreeMap<u32, Arc<Frame>> {
        self.load_multiple_with_progress(items, &NoOpReporter)
    }

    pub fn load_multiple_with_progress(
        &mut self,
        items: &[u32],
        reporter: &dyn ProgressReporter,
    ) -> BTreeMap<u32, Arc<Frame>> {
        reporter.begin_stage(Stage::Loading, items.len());
        let mut loaded = BTreeMap::new();
        for (done, &item) in items.iter().enumerate() {
            if let Ok(frame) = self.load_item(item, false) {
                loaded.insert(item, frame);
            }
            reporter.advance(done + 1);
        }
        reporter.finish_stage();
        loaded
    }

    /// Elementwise mean of the given items.
    ///
    /// Items that fail to load are skipped; the whole operation fails if none
    /// load or if the loaded shapes differ.
    pub fn average_items(&mut self, items: &[u32]) -> Result<ArrayD<f64>> {
        self.average_items_with_progress(items, &NoOpReporter)
    }

    pub fn average_items_with_progress(
        &mut self,
        items: &[u32],
        reporter: &dyn ProgressReporter,
    ) -> Result<ArrayD<f64>> {
        reporter.begin_stage(Stage::Averaging, items.len());
        let mut sum: Option<ArrayD<f64>> = None;
        let mut count = 0usize;

        for (done, &item) in items.iter().enumerate() {
            if let Ok(frame) = self.load_item(item, false) {
                match sum.as_mut() {
                    None => sum = Some(frame.data.clone()),
                    Some(acc) if acc.shape() == frame.shape() => *acc += &frame.data,
                    Some(acc) => {
                        warn!(
                            "Cannot average item {}: shape {:?} differs from {:?}",
                            item,
                            frame.shape(),
                            acc.shape()
                        );
                        reporter.finish_stage();
                        return Err(RoiscopeError::ShapeMismatch {
                            expected: acc.shape().to_vec(),
                            found: frame.shape().to_vec(),
                        });
                    }
                }
                count += 1;
            }
            reporter.advance(done + 1);
        }
        reporter.finish_stage();

        let Some(mut sum) = sum else {
            warn!("None of the {} requested items could be loaded", items.len());
            return Err(RoiscopeError::EmptySequence);
        };
        sum /= count as f64;
        Ok(sum)
    }

    /// Drop all cached arrays and their metadata.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.metadata.clear();
    }

    fn resolve_path(&self, item: u32) -> Option<PathBuf> {
        let root = self.root_directory.as_ref()?;
        for ext in ITEM_EXTENSIONS {
            let candidates = [
                format!("item_{item:03}.{ext}"),
                format!("item_{item}.{ext}"),
                format!("{item:03}.{ext}"),
                format!("{item}.{ext}"),
            ];
            for name in candidates {
                let path = root.join(name);
                if path.is_file() {
                    return Some(path);
                }
            }
        }
        self.discovered
            .get(&item)
            .and_then(|files| files.iter().find(|f| f.is_file()).cloned())
    }
}

/// Parse the item number from a file name.
///
/// `item_<digits>` anywhere in the name wins; otherwise the first run of
/// digits in the stem is used.
pub fn item_number_from_name(file_name: &str) -> Option<u32> {
    if let Some(caps) = ITEM_PATTERN.captures(file_name) {
        return caps[1].parse().ok();
    }
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    DIGITS_PATTERN.find(stem)?.as_str().parse().ok()
}

fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?;
    ITEM_EXTENSIONS.iter().position(|&e| e == ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_prefix_wins() {
        assert_eq!(item_number_from_name("item_007.npy"), Some(7));
        assert_eq!(item_number_from_name("run2_item_12.h5"), Some(12));
    }

    #[test]
    fn test_item_prefix_without_digits_is_skipped() {
        assert_eq!(item_number_from_name("item_x5_item_7.npy"), Some(7));
        assert_eq!(item_number_from_name("item_.npy"), None);
        assert_eq!(item_number_from_name("item_99999999999.npy"), None);
    }

    #[test]
    fn test_first_digit_run_fallback() {
        assert_eq!(item_number_from_name("3.npz"), Some(3));
        assert_eq!(item_number_from_name("frame_0042_v2.npy"), Some(42));
        assert_eq!(item_number_from_name("item_x5.npy"), Some(5));
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(item_number_from_name("background.npy"), None);
    }

    #[test]
    fn test_extension_rank() {
        assert_eq!(extension_rank(Path::new("a.npy")), Some(0));
        assert_eq!(extension_rank(Path::new("a.hdf5")), Some(3));
        assert_eq!(extension_rank(Path::new("a.tif")), None);
    }
}
