//! File-backed storage for access tokens and item aliases.

pub mod error;

pub use error::StoreError;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tempfile::NamedTempFile;

use crate::provider::TokenPair;

const DATA_SUBDIR: &str = "data";
const TOKENS_FILE: &str = "tokens.json";
const ALIASES_FILE: &str = "aliases.json";

static ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_]+$").expect("alias validation regex must compile"));

/// Check that an alias only uses word characters.
pub fn validate_alias(alias: &str) -> Result<(), StoreError> {
    if ALIAS_RE.is_match(alias) {
        Ok(())
    } else {
        Err(StoreError::InvalidAlias(alias.to_string()))
    }
}

/// Access tokens keyed by item ID, plus user-chosen aliases for items.
///
/// Lives under `<data_dir>/data/` as two JSON objects:
/// `tokens.json` (item ID → access token) and `aliases.json` (alias → item ID).
/// The reverse alias map is derived on load and kept in sync by
/// [`set_alias`](CredentialStore::set_alias).
///
/// # Example
/// ```no_run
/// use plaid_cli::store::CredentialStore;
///
/// let mut store = CredentialStore::load("/tmp/plaid-cli")?;
/// if let Some(item_id) = store.resolve("chase") {
///     println!("{item_id}");
/// }
/// # Ok::<(), plaid_cli::store::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CredentialStore {
    data_dir: PathBuf,
    tokens: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
    back_aliases: BTreeMap<String, String>,
}

impl CredentialStore {
    /// Load the store, creating the data directory if needed.
    ///
    /// Missing or empty files load as empty maps.
    pub fn load(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join(DATA_SUBDIR))?;

        let mut store = Self {
            tokens: BTreeMap::new(),
            aliases: BTreeMap::new(),
            back_aliases: BTreeMap::new(),
            data_dir,
        };
        store.tokens = read_map(&store.tokens_path())?;
        store.aliases = read_map(&store.aliases_path())?;
        store.back_aliases = store
            .aliases
            .iter()
            .map(|(alias, item_id)| (item_id.clone(), alias.clone()))
            .collect();

        tracing::debug!(
            tokens = store.tokens.len(),
            aliases = store.aliases.len(),
            dir = %store.data_dir.display(),
            "Loaded credential store"
        );
        Ok(store)
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.data_dir.join(DATA_SUBDIR).join(TOKENS_FILE)
    }

    pub fn aliases_path(&self) -> PathBuf {
        self.data_dir.join(DATA_SUBDIR).join(ALIASES_FILE)
    }

    /// Persist both maps.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_tokens()?;
        self.save_aliases()
    }

    pub fn save_tokens(&self) -> Result<(), StoreError> {
        atomic_write(&self.tokens_path(), &serde_json::to_vec_pretty(&self.tokens)?)
    }

    pub fn save_aliases(&self) -> Result<(), StoreError> {
        atomic_write(&self.aliases_path(), &serde_json::to_vec_pretty(&self.aliases)?)
    }

    /// Record (or replace) the access token for an item.
    pub fn insert_token(&mut self, pair: TokenPair) {
        self.tokens.insert(pair.item_id, pair.access_token);
    }

    pub fn access_token(&self, item_id: &str) -> Option<&str> {
        self.tokens.get(item_id).map(String::as_str)
    }

    /// Map an alias to its item ID. Anything that is not a known alias is
    /// returned unchanged and treated as an item ID.
    pub fn resolve<'a>(&'a self, item_or_alias: &'a str) -> Option<&'a str> {
        if item_or_alias.is_empty() {
            return None;
        }
        Some(
            self.aliases
                .get(item_or_alias)
                .map(String::as_str)
                .unwrap_or(item_or_alias),
        )
    }

    pub fn alias_for(&self, item_id: &str) -> Option<&str> {
        self.back_aliases.get(item_id).map(String::as_str)
    }

    /// Give an item a friendly name. Does not persist; call [`save`](Self::save).
    ///
    /// An item keeps at most one alias. Reusing an alias that points at
    /// another item moves it to this one.
    pub fn set_alias(&mut self, item_id: &str, alias: &str) -> Result<(), StoreError> {
        if !self.tokens.contains_key(item_id) {
            return Err(StoreError::UnknownItem(item_id.to_string()));
        }
        validate_alias(alias)?;

        if let Some(previous_item) = self.aliases.get(alias).cloned() {
            if previous_item != item_id {
                self.back_aliases.remove(&previous_item);
            }
        }
        if let Some(previous_alias) = self.back_aliases.get(item_id).cloned() {
            if previous_alias != alias {
                self.aliases.remove(&previous_alias);
            }
        }

        self.aliases.insert(alias.to_string(), item_id.to_string());
        self.back_aliases
            .insert(item_id.to_string(), alias.to_string());
        Ok(())
    }

    /// Alias → item ID.
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Item ID → access token.
    pub fn tokens(&self) -> &BTreeMap<String, String> {
        &self.tokens
    }

    /// Access tokens keyed by alias where one exists, item ID otherwise.
    pub fn tokens_by_name(&self) -> BTreeMap<String, String> {
        self.tokens
            .iter()
            .map(|(item_id, token)| {
                let name = self.alias_for(item_id).unwrap_or(item_id);
                (name.to_string(), token.clone())
            })
            .collect()
    }
}

fn read_map(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(StoreError::Io(err)),
    };
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw).map_err(|err| StoreError::Corrupt {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Replace `path` with `data` by renaming a synced sibling temp file over it.
/// The temp file is created owner-only (0600 on unix).
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let write_failed = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(write_failed)?;

    let mut staged = NamedTempFile::new_in(dir).map_err(write_failed)?;
    staged.write_all(data).map_err(write_failed)?;
    staged.as_file().sync_all().map_err(write_failed)?;
    staged
        .persist(path)
        .map_err(|err| write_failed(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn pair(item_id: &str, access_token: &str) -> TokenPair {
        TokenPair {
            item_id: item_id.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn temp_store() -> (TempDir, CredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::load(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn load_creates_data_dir_and_starts_empty() {
        let (dir, store) = temp_store();
        assert!(dir.path().join("data").is_dir());
        assert!(store.tokens().is_empty());
        assert!(store.aliases().is_empty());
    }

    #[test]
    fn empty_files_load_as_empty_maps() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/tokens.json"), "").unwrap();
        fs::write(dir.path().join("data/aliases.json"), "  \n").unwrap();

        let store = CredentialStore::load(dir.path()).unwrap();
        assert!(store.tokens().is_empty());
        assert!(store.aliases().is_empty());
    }

    #[test]
    fn malformed_file_is_reported_not_discarded() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/tokens.json"), "{not json").unwrap();

        let err = CredentialStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        let raw = fs::read_to_string(dir.path().join("data/tokens.json")).unwrap();
        assert_eq!(raw, "{not json");
    }

    #[test]
    fn alias_and_item_id_resolve_to_same_token() {
        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_123", "tok_abc"));
        store.set_alias("item_123", "chase").unwrap();

        let via_alias = store.resolve("chase").and_then(|id| store.access_token(id));
        let via_item = store.resolve("item_123").and_then(|id| store.access_token(id));
        assert_eq!(via_alias, Some("tok_abc"));
        assert_eq!(via_alias, via_item);
        assert_eq!(store.alias_for("item_123"), Some("chase"));
    }

    #[test]
    fn save_and_reload_round_trips() {
        let (dir, mut store) = temp_store();
        store.insert_token(pair("item_123", "tok_abc"));
        store.insert_token(pair("item_456", "tok_def"));
        store.set_alias("item_123", "chase").unwrap();
        store.save().unwrap();

        let reloaded = CredentialStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.tokens(), store.tokens());
        assert_eq!(reloaded.aliases(), store.aliases());
        assert_eq!(reloaded.alias_for("item_123"), Some("chase"));
        assert_eq!(reloaded.alias_for("item_456"), None);
    }

    #[cfg(unix)]
    #[test]
    fn saved_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_123", "tok_abc"));
        store.save().unwrap();

        let mode = fs::metadata(store.tokens_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_leaves_no_staging_files_behind() {
        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_123", "tok_abc"));
        store.save().unwrap();
        store.insert_token(pair("item_456", "tok_def"));
        store.save().unwrap();

        let mut names: Vec<_> = fs::read_dir(store.tokens_path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["aliases.json", "tokens.json"]);
    }

    #[test]
    fn failed_write_names_the_target_file() {
        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_123", "tok_abc"));
        fs::create_dir_all(store.tokens_path().join("occupied")).unwrap();

        let err = store.save_tokens().unwrap_err();

        assert!(
            matches!(err, StoreError::Write { ref path, .. } if *path == store.tokens_path()),
            "got {err:?}"
        );
    }

    #[test]
    fn set_alias_requires_known_item() {
        let (_dir, mut store) = temp_store();
        let err = store.set_alias("item_missing", "chase").unwrap_err();
        assert!(matches!(err, StoreError::UnknownItem(id) if id == "item_missing"));
        assert!(store.aliases().is_empty());
    }

    #[test]
    fn set_alias_rejects_non_word_characters() {
        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_123", "tok_abc"));
        assert!(matches!(
            store.set_alias("item_123", "my bank"),
            Err(StoreError::InvalidAlias(_))
        ));
        assert!(store.set_alias("item_123", "my_bank_2").is_ok());
    }

    #[test]
    fn reused_alias_moves_to_latest_item() {
        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_1", "tok_1"));
        store.insert_token(pair("item_2", "tok_2"));
        store.set_alias("item_1", "bank").unwrap();
        store.set_alias("item_2", "bank").unwrap();

        assert_eq!(store.resolve("bank"), Some("item_2"));
        assert_eq!(store.alias_for("item_1"), None);
        assert_eq!(store.alias_for("item_2"), Some("bank"));
    }

    #[test]
    fn renaming_an_item_drops_its_old_alias() {
        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_1", "tok_1"));
        store.set_alias("item_1", "old").unwrap();
        store.set_alias("item_1", "new").unwrap();

        assert_eq!(store.aliases().len(), 1);
        assert_eq!(store.resolve("new"), Some("item_1"));
        // No longer an alias, so it resolves as an (unknown) item ID.
        assert_eq!(store.resolve("old"), Some("old"));
        assert_eq!(store.access_token("old"), None);
    }

    #[test]
    fn tokens_by_name_prefers_alias() {
        let (_dir, mut store) = temp_store();
        store.insert_token(pair("item_1", "tok_1"));
        store.insert_token(pair("item_2", "tok_2"));
        store.set_alias("item_1", "chase").unwrap();

        let named = store.tokens_by_name();
        assert_eq!(named.get("chase").map(String::as_str), Some("tok_1"));
        assert_eq!(named.get("item_2").map(String::as_str), Some("tok_2"));
        assert_eq!(named.len(), 2);
    }
}
