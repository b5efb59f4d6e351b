use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::errors::{LedgerError, Result};
use crate::ledger::LedgerState;

use super::StorageBackend;

const LEDGER_FILE: &str = "ledger.json";
const TMP_SUFFIX: &str = "tmp";
const APP_DIR: &str = "daybudget";

/// File-backed storage. Writes go to a temp file first and are renamed into
/// place, so a crash or I/O failure mid-write never corrupts the last
/// committed state.
pub struct JsonStorage {
    path: PathBuf,
    io_guard: Mutex<()>,
}

impl JsonStorage {
    /// Opens storage rooted at `root`, or under the platform data directory
    /// when none is given.
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let base = match root {
            Some(dir) => dir,
            None => default_base_dir()?,
        };
        ensure_dir(&base)?;
        Ok(Self {
            path: base.join(LEDGER_FILE),
            io_guard: Mutex::new(()),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None)
    }

    pub fn ledger_path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for JsonStorage {
    fn load(&self) -> Result<Option<LedgerState>> {
        let _guard = self.io_guard.lock().expect("storage lock poisoned");
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        let state: LedgerState = serde_json::from_str(&data)?;
        Ok(Some(state))
    }

    fn commit(&self, state: &LedgerState) -> Result<()> {
        let _guard = self.io_guard.lock().expect("storage lock poisoned");
        let json = serde_json::to_string_pretty(state)?;
        let tmp = tmp_path(&self.path);
        write_file(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn default_base_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| LedgerError::Storage("no platform data directory available".into()))
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    use crate::ledger::TransactionKind;

    fn storage_with_temp_dir() -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf())).expect("json storage");
        (storage, temp)
    }

    fn sample_state() -> LedgerState {
        let start = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        let mut state = LedgerState {
            budget: dec!(1000),
            spent: dec!(123.45),
            daily_budget: dec!(200),
            start_date: Some(start),
            finish_date: Some(start + chrono::Duration::days(5)),
            last_change_daily_budget_date: Some(start),
            ..LedgerState::default()
        };
        state
            .log
            .insert(TransactionKind::Spent, dec!(123.45), start, Some("groceries".into()));
        state
    }

    #[test]
    fn first_launch_loads_nothing() {
        let (storage, _guard) = storage_with_temp_dir();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn commit_then_load_round_trips() {
        let (storage, _guard) = storage_with_temp_dir();
        let state = sample_state();
        storage.commit(&state).expect("commit state");
        let loaded = storage.load().expect("load state").expect("state present");
        assert_eq!(loaded, state);
    }

    #[test]
    fn decimals_persist_as_exact_strings() {
        let (storage, _guard) = storage_with_temp_dir();
        storage.commit(&sample_state()).unwrap();
        let raw = fs::read_to_string(storage.ledger_path()).unwrap();
        assert!(raw.contains("\"123.45\""));
    }

    #[test]
    fn dates_persist_as_epoch_millis() {
        let (storage, _guard) = storage_with_temp_dir();
        storage.commit(&sample_state()).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(storage.ledger_path()).unwrap()).unwrap();
        assert!(raw["start_date"].is_i64());
    }

    #[test]
    fn recommit_replaces_previous_state() {
        let (storage, _guard) = storage_with_temp_dir();
        storage.commit(&sample_state()).unwrap();
        let mut updated = sample_state();
        updated.spent = dec!(500);
        storage.commit(&updated).unwrap();
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.spent, dec!(500));
    }

    #[test]
    fn leftover_temp_file_does_not_shadow_state() {
        let (storage, _guard) = storage_with_temp_dir();
        storage.commit(&sample_state()).unwrap();
        // Simulate a crash that left a torn temp file behind.
        fs::write(tmp_path(storage.ledger_path()), "{ torn").unwrap();
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.budget, dec!(1000));
    }
}
