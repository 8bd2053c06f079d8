/// Persistence layer — durable save and settings records.
///
/// Serializes and deserializes on request; never mutates records in place.
/// Read failures degrade to "no save" and write failures are logged and
/// swallowed — nothing here ever surfaces an error to the player.

use log::{error, warn};
use rustc_hash::FxHashMap;
use std::path::PathBuf;

use crate::schema::save::{SaveRecord, Settings};

/// Storage key for the save record.
pub const SAVE_KEY: &str = "vn_save";
/// Storage key for the settings record.
pub const SETTINGS_KEY: &str = "vn_settings";

/// A keyed blob store. Writes must complete before returning, so a crash
/// immediately after a write still observes the new value on the next read.
pub trait Storage {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory storage, for tests and for hosts that mirror blobs themselves
/// (the wasm player hands blobs back to the page, which owns localStorage).
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: FxHashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key, e.g. with a blob the host read back from localStorage.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// One file per key under a directory. Used by the terminal preview player.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            error!("cannot create save directory {:?}: {e}", self.dir);
            return;
        }
        if let Err(e) = std::fs::write(self.path_for(key), value) {
            error!("failed to write '{key}': {e}");
        }
    }

    fn remove(&mut self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}

/// The save/settings gateway used by the progression controller.
pub struct Persistence {
    storage: Box<dyn Storage>,
}

impl Persistence {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Persistence { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Returns `None` when no record exists or it fails to parse — corrupt
    /// data is treated as absent, never thrown to the caller.
    pub fn load_save(&self) -> Option<SaveRecord> {
        let raw = self.storage.read(SAVE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("corrupt save record treated as absent: {e}");
                None
            }
        }
    }

    /// Fully overwrites the stored record. Callers merge in memory first.
    pub fn write_save(&mut self, record: &SaveRecord) {
        match serde_json::to_string(record) {
            Ok(raw) => self.storage.write(SAVE_KEY, &raw),
            Err(e) => error!("failed to serialize save record: {e}"),
        }
    }

    /// Centralized read-modify-write: load the stored record (or start a
    /// fresh one), apply `merge`, write the result back, and return it.
    /// Every save-touching site goes through here so no caller can blindly
    /// overwrite fields it doesn't own.
    pub fn update_save<F>(&mut self, merge: F) -> SaveRecord
    where
        F: FnOnce(&mut SaveRecord),
    {
        let mut record = self.load_save().unwrap_or_default();
        merge(&mut record);
        self.write_save(&record);
        record
    }

    /// Deletes the save record; used on explicit reset.
    pub fn clear_save(&mut self) {
        self.storage.remove(SAVE_KEY);
    }

    pub fn load_settings(&self) -> Option<Settings> {
        let raw = self.storage.read(SETTINGS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("corrupt settings record treated as absent: {e}");
                None
            }
        }
    }

    pub fn write_settings(&mut self, settings: &Settings) {
        match serde_json::to_string(settings) {
            Ok(raw) => self.storage.write(SETTINGS_KEY, &raw),
            Err(e) => error!("failed to serialize settings: {e}"),
        }
    }

    /// Raw blob read-through, for hosts that mirror storage elsewhere.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.storage.read(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_save_absent_is_none() {
        let persistence = Persistence::in_memory();
        assert!(persistence.load_save().is_none());
    }

    #[test]
    fn load_save_corrupt_is_none() {
        let storage = MemoryStorage::new().with_entry(SAVE_KEY, "{broken");
        let persistence = Persistence::new(Box::new(storage));
        assert!(persistence.load_save().is_none());
    }

    #[test]
    fn write_then_load_round_trips() {
        let mut persistence = Persistence::in_memory();
        let mut record = SaveRecord::default();
        record.mark_visited("start");
        record.last_node = Some("start".to_string());
        persistence.write_save(&record);
        assert_eq!(persistence.load_save().unwrap(), record);
    }

    #[test]
    fn update_save_merges_into_existing() {
        let mut persistence = Persistence::in_memory();
        persistence.update_save(|save| {
            save.mark_visited("start");
            save.game_state.flags.insert("met_alex".to_string(), true);
        });
        // A later update must not clobber fields it doesn't touch.
        let merged = persistence.update_save(|save| save.mark_visited("fork"));
        assert_eq!(merged.visited, vec!["start".to_string(), "fork".to_string()]);
        assert!(merged.game_state.flag("met_alex"));
    }

    #[test]
    fn clear_save_removes_record() {
        let mut persistence = Persistence::in_memory();
        persistence.update_save(|save| save.mark_visited("start"));
        persistence.clear_save();
        assert!(persistence.load_save().is_none());
    }

    #[test]
    fn settings_key_is_independent() {
        let mut persistence = Persistence::in_memory();
        let mut settings = Settings::default();
        settings.music_volume = 0.25;
        persistence.write_settings(&settings);
        persistence.clear_save();
        assert_eq!(persistence.load_settings().unwrap().music_volume, 0.25);
        assert!(persistence.load_save().is_none());
    }

    #[test]
    fn serialized_save_is_stable_across_round_trips() {
        let mut persistence = Persistence::in_memory();
        persistence.update_save(|save| {
            save.mark_visited("start");
            save.record_choice("fork", 1);
            save.game_state.vars.insert("friendship_score".to_string(), 2.0);
            save.game_state.flags.insert("met_alex".to_string(), true);
        });

        let first = persistence.raw(SAVE_KEY).unwrap();
        let reloaded = persistence.load_save().unwrap();
        persistence.write_save(&reloaded);
        let second = persistence.raw(SAVE_KEY).unwrap();
        assert_eq!(first, second);
    }
}
