use std::borrow::Cow;
use std::cell::RefCell;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};

pub const WIDTH_KEY: &str = "width";
pub const HEIGHT_KEY: &str = "height";
pub const INTERVAL_KEY: &str = "speed_view";
pub const COUNT_KEY: &str = "nums_count";

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_INTERVAL_MS: u32 = 1000;
pub const DEFAULT_COUNT: u32 = 100;

/// Content written into a missing or empty settings file
pub const DEFAULT_CONTENT: &str = "
width: 800
height: 600
speed_view: 1000
nums_count: 100
";

const PX_PER_COLUMN: u32 = 10;
const PX_PER_ROW: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub speed_view_ms: u32,
    pub nums_count: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            speed_view_ms: DEFAULT_INTERVAL_MS,
            nums_count: DEFAULT_COUNT,
        }
    }
}

impl Settings {
    pub fn from_document(doc: &SettingsDocument) -> Self {
        let size = doc.screen_size();
        Self {
            width: size.width,
            height: size.height,
            speed_view_ms: doc.interval(),
            nums_count: doc.count(),
        }
    }

    pub fn screen_size(&self) -> ScreenSize {
        ScreenSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Window size in pixels, as written in the settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    /// Terminal cells covering this size (columns, rows)
    pub fn cells(&self) -> (u16, u16) {
        let cols = (self.width / PX_PER_COLUMN).min(u16::MAX as u32) as u16;
        let rows = (self.height / PX_PER_ROW).min(u16::MAX as u32) as u16;
        (cols, rows)
    }
}

impl std::fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The settings file as a list of lines.
///
/// Every line keeps its exact bytes, line ending included, so rewriting one
/// value leaves the rest of the file untouched. Lines shaped like
/// `key: value` are entries; anything else is carried along as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsDocument {
    lines: Vec<String>,
}

impl SettingsDocument {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.split_inclusive('\n').map(String::from).collect(),
        }
    }

    pub fn render(&self) -> String {
        self.lines.concat()
    }

    /// Raw value of the first entry named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            let (k, value) = split_entry(line)?;
            (k == key).then(|| &line[value])
        })
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Replace the value of the first entry named `key`, or append a new entry.
    pub fn set(&mut self, key: &str, value: &str) {
        for line in self.lines.iter_mut() {
            if let Some((k, range)) = split_entry(line) {
                if k == key {
                    line.replace_range(range, value);
                    return;
                }
            }
        }

        if let Some(last) = self.lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
        self.lines.push(format!("{key}: {value}\n"));
    }

    pub fn interval(&self) -> u32 {
        field_or_default(self, INTERVAL_KEY, DEFAULT_INTERVAL_MS, "time interval for showing numbers")
    }

    pub fn count(&self) -> u32 {
        field_or_default(self, COUNT_KEY, DEFAULT_COUNT, "counter for quantity of numbers")
    }

    pub fn screen_size(&self) -> ScreenSize {
        match (self.get_u32(WIDTH_KEY), self.get_u32(HEIGHT_KEY)) {
            (Some(width), Some(height)) => ScreenSize { width, height },
            _ => {
                warn!("cannot match width or height in the settings, using default value");
                ScreenSize {
                    width: DEFAULT_WIDTH,
                    height: DEFAULT_HEIGHT,
                }
            }
        }
    }
}

fn field_or_default(doc: &SettingsDocument, key: &str, default: u32, what: &str) -> u32 {
    doc.get_u32(key).unwrap_or_else(|| {
        warn!("cannot match {what} in the settings, using default value {default}");
        default
    })
}

/// Split an entry line into its key and the byte range of its value
fn split_entry(line: &str) -> Option<(&str, Range<usize>)> {
    let body = line.trim_end_matches(['\n', '\r']);
    let (raw_key, rest) = body.split_once(':')?;
    let key = raw_key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }

    let start = raw_key.len() + 1 + (rest.len() - rest.trim_start().len());
    let end = body.trim_end().len().max(start);
    Some((key, start..end))
}

/// Where settings come from and where interval changes get saved
pub trait SettingsStore {
    /// Read the settings, repairing a missing or empty backing store
    fn load(&self) -> Result<Settings>;
    fn interval(&self) -> Result<u32>;
    /// Persist a new display interval, leaving every other setting as is
    fn set_interval(&self, ms: u32) -> Result<()>;
    fn count(&self) -> Result<u32>;
    fn screen_size(&self) -> Result<ScreenSize>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub const DEFAULT_PATH: &'static str = "settings.ini";

    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_path(Self::DEFAULT_PATH)
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn settings_err(&self, source: io::Error) -> Error {
        Error::Settings {
            path: self.path.clone(),
            source,
        }
    }

    fn read_document(&self) -> Result<SettingsDocument> {
        Ok(self.read_lossy()?.0)
    }

    /// Read the file, replacing bytes that are not UTF-8. The flag is set
    /// when anything had to be replaced.
    fn read_lossy(&self) -> Result<(SettingsDocument, bool)> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                let lossy = matches!(content, Cow::Owned(_));
                Ok((SettingsDocument::parse(&content), lossy))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok((SettingsDocument::default(), false)),
            Err(e) => Err(self.settings_err(e)),
        }
    }

    fn write_document(&self, doc: &SettingsDocument) -> Result<()> {
        fs::write(&self.path, doc.render()).map_err(|e| self.settings_err(e))
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            warn!(
                "cannot find the settings file {}, it will be created",
                self.path.display()
            );
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| self.settings_err(e))?;
            }
        }

        let (mut doc, lossy) = self.read_lossy()?;
        if lossy {
            warn!(
                "settings file {} is not valid UTF-8, unreadable bytes are ignored",
                self.path.display()
            );
        }
        if doc.lines.is_empty() {
            doc = SettingsDocument::parse(DEFAULT_CONTENT);
            let shown = fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
            warn!(
                "writing default content to {}:{}",
                shown.display(),
                DEFAULT_CONTENT
            );
            self.write_document(&doc)?;
        }

        let settings = Settings::from_document(&doc);
        debug!("loaded {:?} from {}", settings, self.path.display());
        Ok(settings)
    }

    fn interval(&self) -> Result<u32> {
        Ok(self.read_document()?.interval())
    }

    fn set_interval(&self, ms: u32) -> Result<()> {
        let mut doc = self.read_document()?;
        doc.set(INTERVAL_KEY, &ms.to_string());
        self.write_document(&doc)
    }

    fn count(&self) -> Result<u32> {
        Ok(self.read_document()?.count())
    }

    fn screen_size(&self) -> Result<ScreenSize> {
        Ok(self.read_document()?.screen_size())
    }
}

/// Settings kept in memory, for headless runs and tests
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    doc: RefCell<SettingsDocument>,
}

impl MemorySettingsStore {
    pub fn new(content: &str) -> Self {
        Self {
            doc: RefCell::new(SettingsDocument::parse(content)),
        }
    }

    pub fn content(&self) -> String {
        self.doc.borrow().render()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings> {
        let mut doc = self.doc.borrow_mut();
        if doc.lines.is_empty() {
            *doc = SettingsDocument::parse(DEFAULT_CONTENT);
        }
        Ok(Settings::from_document(&doc))
    }

    fn interval(&self) -> Result<u32> {
        Ok(self.doc.borrow().interval())
    }

    fn set_interval(&self, ms: u32) -> Result<()> {
        self.doc.borrow_mut().set(INTERVAL_KEY, &ms.to_string());
        Ok(())
    }

    fn count(&self) -> Result<u32> {
        Ok(self.doc.borrow().count())
    }

    fn screen_size(&self) -> Result<ScreenSize> {
        Ok(self.doc.borrow().screen_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        let store = FileSettingsStore::with_path(&path);

        let settings = store.load().unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONTENT);
    }

    #[test]
    fn empty_file_is_filled_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        fs::write(&path, "").unwrap();

        let settings = FileSettingsStore::with_path(&path).load().unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONTENT);
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.ini");

        FileSettingsStore::with_path(&path).load().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn loads_custom_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        fs::write(&path, "width: 1024\nheight: 768\nspeed_view: 640\nnums_count: 20\n").unwrap();

        let settings = FileSettingsStore::with_path(&path).load().unwrap();

        assert_eq!(
            settings,
            Settings {
                width: 1024,
                height: 768,
                speed_view_ms: 640,
                nums_count: 20,
            }
        );
    }

    #[test]
    fn interval_round_trip_keeps_other_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        let original = "# my trainer\nwidth: 800\r\nheight:600\nspeed_view: 1000   \ntheme: dark\nnums_count: 100";
        fs::write(&path, original).unwrap();
        let store = FileSettingsStore::with_path(&path);

        for ms in [0, 50, 1234, 1000] {
            store.set_interval(ms).unwrap();
            assert_eq!(store.interval().unwrap(), ms);

            let after = fs::read_to_string(&path).unwrap();
            let before_lines: Vec<&str> = original.split_inclusive('\n').collect();
            let after_lines: Vec<&str> = after.split_inclusive('\n').collect();
            assert_eq!(before_lines.len(), after_lines.len());
            for (b, a) in before_lines.iter().zip(&after_lines) {
                if !b.starts_with("speed_view") {
                    assert_eq!(b, a);
                }
            }
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn set_interval_keeps_the_key_spacing() {
        let mut doc = SettingsDocument::parse("speed_view:   900\n");
        doc.set(INTERVAL_KEY, "850");
        assert_eq!(doc.render(), "speed_view:   850\n");

        let mut doc = SettingsDocument::parse("speed_view:\n");
        doc.set(INTERVAL_KEY, "700");
        assert_eq!(doc.render(), "speed_view:700\n");
    }

    #[test]
    fn set_interval_appends_missing_entry() {
        let mut doc = SettingsDocument::parse("width: 800\nheight: 600");
        doc.set(INTERVAL_KEY, "750");

        assert_eq!(doc.render(), "width: 800\nheight: 600\nspeed_view: 750\n");
        assert_eq!(doc.interval(), 750);
    }

    #[test]
    fn missing_count_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        fs::write(&path, "width: 800\nheight: 600\nspeed_view: 1000\n").unwrap();

        let store = FileSettingsStore::with_path(&path);

        assert_eq!(store.count().unwrap(), 100);
    }

    #[test]
    fn malformed_fields_fall_back_to_defaults() {
        let doc = SettingsDocument::parse("width: wide\nheight: 600\nspeed_view: -3\nnums_count: lots\n");

        assert_eq!(
            doc.screen_size(),
            ScreenSize {
                width: 800,
                height: 600
            }
        );
        assert_eq!(doc.interval(), DEFAULT_INTERVAL_MS);
        assert_eq!(doc.count(), DEFAULT_COUNT);
    }

    #[test]
    fn invalid_utf8_does_not_stop_the_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        fs::write(&path, b"width: 800\nheight: 600\nspeed_view: 700\n\xff\xfe junk\n").unwrap();
        let store = FileSettingsStore::with_path(&path);

        let settings = store.load().unwrap();

        assert_eq!(settings.speed_view_ms, 700);
        assert_eq!(settings.nums_count, DEFAULT_COUNT);
        assert_eq!(settings.screen_size().to_string(), "800x600");

        store.set_interval(650).unwrap();
        assert_eq!(store.interval().unwrap(), 650);
    }

    #[test]
    fn screen_size_needs_both_dimensions() {
        let doc = SettingsDocument::parse("width: 1920\n");
        assert_eq!(doc.screen_size().to_string(), "800x600");

        let doc = SettingsDocument::parse("width: 1920\nheight: 1080\n");
        assert_eq!(doc.screen_size().to_string(), "1920x1080");
    }

    #[test]
    fn out_of_range_values_are_not_rejected() {
        let doc = SettingsDocument::parse("speed_view: 0\nnums_count: 4000000000\n");
        assert_eq!(doc.interval(), 0);
        assert_eq!(doc.count(), 4_000_000_000);
    }

    #[test]
    fn first_entry_wins() {
        let doc = SettingsDocument::parse("speed_view: 300\nspeed_view: 900\n");
        assert_eq!(doc.interval(), 300);
    }

    #[test]
    fn screen_size_maps_to_cells() {
        assert_eq!(Settings::default().screen_size().cells(), (80, 30));
        assert_eq!(ScreenSize { width: 5, height: 5 }.cells(), (0, 0));
    }

    #[test]
    fn memory_store_starts_with_defaults() {
        let store = MemorySettingsStore::default();
        assert_eq!(store.load().unwrap(), Settings::default());

        store.set_interval(420).unwrap();
        assert_eq!(store.interval().unwrap(), 420);
        assert!(store.content().contains("speed_view: 420\n"));
        assert!(store.content().contains("nums_count: 100\n"));
    }
}
