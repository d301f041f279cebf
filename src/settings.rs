//! Brand settings (shop name, tagline, logo, stamp), stored apart from the draft.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::model::BrandSettings;
use crate::storage::{BlobStore, Loaded, SETTINGS_KEY, StoreError};

pub const DEFAULT_NAME: &str = "NAMA TOKO";
pub const DEFAULT_TAGLINE: &str = "Alamat / No. HP / Email";

pub struct SettingsStore {
    store: Rc<dyn BlobStore>,
}

impl SettingsStore {
    pub fn new(store: Rc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn read(&self) -> Loaded<BrandSettings> {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Loaded::Absent,
            Err(e) => {
                warn!("Reading brand settings failed: {}", e);
                return Loaded::Absent;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Loaded::Found(settings),
            Err(e) => {
                debug!("brand settings corrupt: {}", e);
                Loaded::Corrupt
            }
        }
    }

    /// Absent or corrupt settings load as the all-empty default.
    pub fn load(&self) -> BrandSettings {
        self.read().found().unwrap_or_default()
    }

    pub fn save(&self, settings: &BrandSettings) -> Result<(), StoreError> {
        let raw = serde_json::to_string(settings).map_err(|source| StoreError::Encode {
            key: SETTINGS_KEY.to_string(),
            source,
        })?;
        self.store.set(SETTINGS_KEY, &raw)
    }

    /// Blank text falls back to the placeholders. Images that are not supplied,
    /// or cannot be read, keep whatever was stored before.
    pub fn apply(
        &self,
        name: &str,
        tagline: &str,
        logo: Option<&Path>,
        stamp: Option<&Path>,
    ) -> Result<BrandSettings, StoreError> {
        let mut settings = self.load();
        settings.name = Some(non_blank_or(name, DEFAULT_NAME));
        settings.tagline = Some(non_blank_or(tagline, DEFAULT_TAGLINE));

        if let Some(data) = logo.and_then(read_data_url) {
            settings.logo_data_url = Some(data);
        }
        if let Some(data) = stamp.and_then(read_data_url) {
            settings.stamp_data_url = Some(data);
        }

        self.save(&settings)?;
        Ok(settings)
    }
}

fn non_blank_or(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Encodes a file as a `data:` URL. A failed read means "no new value".
pub fn read_data_url(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(format!(
            "data:{};base64,{}",
            mime_for(path),
            STANDARD.encode(bytes)
        )),
        Err(e) => {
            debug!(path = %path.display(), "image read failed: {}", e);
            None
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tempfile::TempDir;

    fn store() -> (Rc<dyn BlobStore>, SettingsStore) {
        let blobs: Rc<dyn BlobStore> = Rc::new(MemoryStore::new());
        (blobs.clone(), SettingsStore::new(blobs))
    }

    #[test]
    fn missing_or_corrupt_settings_load_empty() {
        let (blobs, settings) = store();
        assert_eq!(settings.read(), Loaded::Absent);
        assert_eq!(settings.load(), BrandSettings::default());

        blobs.set(SETTINGS_KEY, "{oops").unwrap();
        assert_eq!(settings.read(), Loaded::Corrupt);
        assert_eq!(settings.load(), BrandSettings::default());
    }

    #[test]
    fn apply_defaults_blank_text() {
        let (_, settings) = store();
        let applied = settings.apply("   ", "", None, None).unwrap();
        assert_eq!(applied.name.as_deref(), Some(DEFAULT_NAME));
        assert_eq!(applied.tagline.as_deref(), Some(DEFAULT_TAGLINE));
        assert_eq!(settings.load(), applied);
    }

    #[test]
    fn apply_encodes_files_and_keeps_previous_images() {
        let dir = TempDir::new().unwrap();
        let logo = dir.path().join("logo.png");
        fs::write(&logo, b"png").unwrap();

        let (_, settings) = store();
        let first = settings
            .apply(" Toko Maju ", "Jl. Merdeka 1", Some(&logo), None)
            .unwrap();
        assert_eq!(first.name.as_deref(), Some("Toko Maju"));
        assert_eq!(first.logo_data_url.as_deref(), Some("data:image/png;base64,cG5n"));

        let missing = dir.path().join("nope.png");
        let second = settings
            .apply("Toko Maju", "", Some(&missing), Some(&missing))
            .unwrap();
        assert_eq!(second.logo_data_url, first.logo_data_url);
        assert_eq!(second.stamp_data_url, None);
        assert_eq!(second.stamp_or_logo(), first.logo_data_url.as_deref());
    }

    #[test]
    fn legacy_display_name_key_is_accepted() {
        let (blobs, settings) = store();
        blobs
            .set(SETTINGS_KEY, r#"{"displayName":"Lama","tagline":null}"#)
            .unwrap();
        assert_eq!(settings.load().name.as_deref(), Some("Lama"));
    }
}
