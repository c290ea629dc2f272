use log::warn;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Cache key the wallet-connection library stores its session under.
pub const WALLETCONNECT_SESSION_KEY: &str = "walletconnect";
/// Cache key for the wallet deeplink preference.
pub const WALLETCONNECT_DEEPLINK_KEY: &str = "WALLETCONNECT_DEEPLINK_CHOICE";

/// Local persistent key-value store for cached wallet-connection session
/// data. Disconnecting purges the known keys from it.
pub trait SessionCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

pub struct MemorySessionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// Session cache persisted on disk, one file per key. Failures are logged
/// and swallowed; losing cached session data only costs a reconnect.
pub struct FsSessionCache {
    dir: PathBuf,
}

impl FsSessionCache {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SessionCache for FsSessionCache {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = fs::write(self.path_for(key), value) {
            warn!("Failed to persist session key {key}: {e}");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = fs::remove_file(self.path_for(key)) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove session key {key}: {e}");
            }
        }
    }
}
