use crate::error::{NoteError, NoteResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Durable string key-value medium scoped to the browser profile.
///
/// Writes are synchronous: once `set_item` returns `Ok`, the value survives a reload.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> NoteResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> NoteResult<()>;
    fn remove_item(&self, key: &str) -> NoteResult<()>;
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> NoteResult<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| NoteError::Unavailable("localStorage".to_string()))
    }
}

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> NoteResult<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| NoteError::Unavailable(NoteError::js_message(&e)))
    }

    fn set_item(&self, key: &str, value: &str) -> NoteResult<()> {
        // Quota errors surface here; callers must not assume the write landed.
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| NoteError::Storage(NoteError::js_message(&e)))
    }

    fn remove_item(&self, key: &str) -> NoteResult<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| NoteError::Storage(NoteError::js_message(&e)))
    }
}

/// In-process store. Clones share the same map, which lets tests "reload" a
/// store by opening a second one over a clone.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
    fail_writes: Rc<RefCell<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, like a full quota.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> NoteResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> NoteResult<()> {
        if *self.fail_writes.borrow() {
            return Err(NoteError::Storage("quota exceeded".to_string()));
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> NoteResult<()> {
        if *self.fail_writes.borrow() {
            return Err(NoteError::Storage("quota exceeded".to_string()));
        }
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get_item(&self, key: &str) -> NoteResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> NoteResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> NoteResult<()> {
        (**self).remove_item(key)
    }
}
