use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;

use crate::{CaseSettings, ConfigError};

const SETTINGS_FILE: &str = "case_settings.json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";
const TMP_SUFFIX: &str = "tmp";

/// Handles persistence and backups for [`CaseSettings`]. Saves are atomic:
/// write to a temp file, then rename over the target.
#[derive(Debug, Clone)]
pub struct CaseSettingsManager {
    settings_path: PathBuf,
    backups_dir: PathBuf,
}

impl CaseSettingsManager {
    pub fn new(settings_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            settings_path,
            backups_dir,
        }
    }

    /// Lays out `<base>/case_settings.json` plus a `backups/` directory.
    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        let backups_dir = base.join("backups");
        fs::create_dir_all(&backups_dir)?;
        Ok(Self::new(base.join(SETTINGS_FILE), backups_dir))
    }

    /// Default per-user location.
    pub fn with_default_dir() -> Result<Self, ConfigError> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("insoledger");
        Self::with_base_dir(base)
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn load(&self) -> Result<CaseSettings, ConfigError> {
        let data = fs::read_to_string(&self.settings_path)?;
        let settings: CaseSettings =
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, settings: &CaseSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        let json = serde_json::to_string_pretty(settings)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        let tmp = tmp_path(&self.settings_path);
        write_file(&tmp, &json)?;
        fs::rename(&tmp, &self.settings_path)?;
        Ok(())
    }

    /// Writes a timestamped backup copy and returns its file name.
    pub fn backup(&self, settings: &CaseSettings) -> Result<String, ConfigError> {
        settings.validate()?;
        fs::create_dir_all(&self.backups_dir)?;
        let stamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut name = format!("case_{stamp}.json");
        let mut counter = 1;
        while self.backups_dir.join(&name).exists() {
            name = format!("case_{stamp}_{counter}.json");
            counter += 1;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        write_file(&self.backups_dir.join(&name), &json)?;
        Ok(name)
    }

    pub fn restore(&self, backup_name: &str) -> Result<CaseSettings, ConfigError> {
        let path = self.backups_dir.join(backup_name);
        let data = fs::read_to_string(&path)?;
        let settings: CaseSettings =
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }
        // The timestamp format sorts lexicographically.
        names.sort_by_key(|name| Reverse(name.clone()));
        Ok(names)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
