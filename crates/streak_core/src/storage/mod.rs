pub mod json_store;

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

pub use json_store::JsonDirStore;

/// Logical collections persisted under their own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    RecurringTasks,
    OneOffTasks,
    Completions,
    Exclusions,
    StreakState,
}

impl Collection {
    pub const TASK_COLLECTIONS: [Collection; 4] = [
        Collection::RecurringTasks,
        Collection::OneOffTasks,
        Collection::Completions,
        Collection::Exclusions,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Collection::RecurringTasks => "recurringTasks",
            Collection::OneOffTasks => "oneOffTasks",
            Collection::Completions => "completions",
            Collection::Exclusions => "exclusions",
            Collection::StreakState => "streakState",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// External key-value persistence. Values are opaque JSON to the store.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<Value>, AppError>;

    fn save(&self, key: &str, value: &Value) -> Result<(), AppError>;
}

#[derive(Debug)]
pub struct PersistFailure {
    pub collection: Collection,
    pub error: AppError,
}

/// One collection as read at startup. `intact` is false when a stored
/// value existed but could not be read or decoded and `value` is the
/// empty fallback.
#[derive(Debug)]
pub(crate) struct Loaded<T> {
    pub value: T,
    pub intact: bool,
}

/// Reads one collection, treating an absent, unreadable or malformed value
/// as empty so a bad record never blocks startup.
pub(crate) fn load_or_default<T: DeserializeOwned + Default>(
    kv: &dyn KeyValueStore,
    collection: Collection,
) -> Loaded<T> {
    let fallback = || Loaded {
        value: T::default(),
        intact: false,
    };
    match kv.load(collection.key()) {
        Ok(None) => Loaded {
            value: T::default(),
            intact: true,
        },
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => Loaded {
                value: decoded,
                intact: true,
            },
            Err(error) => {
                warn!(%collection, %error, "malformed collection, starting empty");
                fallback()
            }
        },
        Err(error) => {
            warn!(%collection, %error, "failed to load collection, starting empty");
            fallback()
        }
    }
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>, AppError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), AppError> {
        self.insert(key, value.clone());
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<T> {
    fn load(&self, key: &str) -> Result<Option<Value>, AppError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), AppError> {
        (**self).save(key, value)
    }
}
