use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use directories::{BaseDirs, ProjectDirs};
use inquire::{Confirm, Select, Text};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::numbering::{INVOICE_START, NumberingKind};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data_root: String,
    pub numbering: NumberingKind,
    pub invoice_start: u64,
    /// Whether the tax field counts toward the total.
    pub tax_in_total: bool,
    pub pdf_command: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: "~/Documents/Invoices".to_string(),
            numbering: NumberingKind::Counter,
            invoice_start: INVOICE_START,
            tax_in_total: false,
            pdf_command: "wkhtmltopdf".to_string(),
        }
    }
}

impl AppConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.data_root))
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir().join("store")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir().join("output")
    }
}

pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "invoice-builder", "app") {
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).ok();
        }
        return config_dir.join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

pub fn load_config() -> Option<AppConfig> {
    let path = config_path();
    let content = fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            debug!(path = %path.display(), "config unreadable: {}", e);
            None
        }
    }
}

pub fn save_config(config: &AppConfig) -> anyhow::Result<()> {
    let path = config_path();
    let toml_str = toml::to_string_pretty(config)?;
    fs::write(&path, toml_str).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn setup_config_wizard() -> anyhow::Result<AppConfig> {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = load_config().unwrap_or_default();

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Data Directory")
        .pick_folder();

    let data_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        Text::new("Data Directory:")
            .with_default(&current.data_root)
            .prompt()?
    };

    let numbering = match Select::new(
        "Invoice numbering:",
        vec!["counter (303, 304, ...)", "random (INV-YYYYMMDD-NNNN)"],
    )
    .prompt()?
    {
        s if s.starts_with("random") => NumberingKind::Random,
        _ => NumberingKind::Counter,
    };

    let tax_in_total = Confirm::new("Add the tax field to the total?")
        .with_default(current.tax_in_total)
        .prompt()?;

    let pdf_command = Text::new("PDF tool:")
        .with_default(&current.pdf_command)
        .prompt()?;

    let config = AppConfig {
        data_root,
        numbering,
        tax_in_total,
        pdf_command,
        ..current
    };
    save_config(&config)?;
    println!("✅ Settings saved.");
    Ok(config)
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
