//! Property Store
//!
//! Thread-safe storage for session properties: explicit values layered over
//! construction-time defaults, read-only enforcement for system-owned keys,
//! change notification, and point-in-time snapshots.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use serde::ser::SerializeMap;
use serde::Serialize;
use serde_json::Value;

use super::error::PropertyError;
use super::id::{PropertyId, PropertyKey};
use super::validation;

/// Callback invoked with the new effective value after a key changes.
type ChangeCallback = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// How `set_named` treats names outside the closed id set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeyPolicy {
    /// Store the value as a vendor extension and log a warning. Keeps older
    /// clients working against newer services.
    Permissive,
    /// Reject with [`PropertyError::Unknown`].
    Strict,
}

impl Default for UnknownKeyPolicy {
    fn default() -> Self {
        Self::Permissive
    }
}

#[derive(Debug, Clone)]
struct Record {
    value: String,
    seq: u64,
    /// Set by the first privileged write to a read-only key; no further
    /// write may touch the record afterwards.
    latched: bool,
}

#[derive(Debug)]
struct Inner {
    records: BTreeMap<PropertyKey, Record>,
    seq: u64,
}

/// Typed-by-convention, thread-safe property storage.
///
/// Exactly one configuration, session, or result object owns each store;
/// [`PropertyStore::derive_for_session`] copies values into a new store
/// rather than sharing this one.
pub struct PropertyStore {
    inner: RwLock<Inner>,
    defaults: BTreeMap<PropertyKey, String>,
    read_only: BTreeSet<PropertyKey>,
    policy: UnknownKeyPolicy,
    watchers: Mutex<HashMap<PropertyKey, Vec<ChangeCallback>>>,
    /// Threads currently running change callbacks for this store. A mutation
    /// from one of these threads would deadlock on the write path, so it is
    /// rejected instead.
    dispatching: Mutex<Vec<ThreadId>>,
}

impl std::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyStore")
            .field("inner", &*self.inner.read())
            .field("defaults", &self.defaults)
            .field("read_only", &self.read_only)
            .field("policy", &self.policy)
            .field("watchers", &self.watchers.lock().keys().collect::<Vec<_>>())
            .field("dispatching", &*self.dispatching.lock())
            .finish()
    }
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyStore {
    /// Empty store: no defaults, no read-only keys, permissive policy.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: BTreeMap::new(),
                seq: 0,
            }),
            defaults: BTreeMap::new(),
            read_only: BTreeSet::new(),
            policy: UnknownKeyPolicy::Permissive,
            watchers: Mutex::new(HashMap::new()),
            dispatching: Mutex::new(Vec::new()),
        }
    }

    /// Store with layered defaults and a read-only key set.
    ///
    /// Default values are validated up front; one bad value fails the whole
    /// construction.
    pub fn with_defaults(
        defaults: BTreeMap<PropertyKey, String>,
        read_only: BTreeSet<PropertyKey>,
    ) -> Result<Self, PropertyError> {
        Self::with_options(defaults, read_only, UnknownKeyPolicy::Permissive)
    }

    /// [`PropertyStore::with_defaults`] with an explicit unknown-key policy.
    pub fn with_options(
        defaults: BTreeMap<PropertyKey, String>,
        read_only: BTreeSet<PropertyKey>,
        policy: UnknownKeyPolicy,
    ) -> Result<Self, PropertyError> {
        for (key, value) in &defaults {
            if let PropertyKey::Id(id) = key {
                validation::check(*id, value)?;
            }
        }
        let mut store = Self::new();
        store.defaults = defaults;
        store.read_only = read_only;
        store.policy = policy;
        Ok(store)
    }

    /// The stored value for `id`, falling back to the configured default.
    /// Absence is a valid, observable state, not an error.
    pub fn get(&self, id: PropertyId) -> Option<String> {
        self.get_key(&PropertyKey::Id(id))
    }

    /// String-named lookup; canonical names resolve to their known id.
    pub fn get_named(&self, name: &str) -> Option<String> {
        self.get_key(&PropertyKey::parse(name))
    }

    /// The stored or default value, else `fallback`. Never fails.
    pub fn get_or(&self, id: PropertyId, fallback: impl Into<String>) -> String {
        self.get(id).unwrap_or_else(|| fallback.into())
    }

    /// True iff a value is present, set explicitly or via a default.
    pub fn has(&self, id: PropertyId) -> bool {
        self.get(id).is_some()
    }

    /// String-named [`PropertyStore::has`].
    pub fn has_named(&self, name: &str) -> bool {
        self.get_named(name).is_some()
    }

    /// Store `value` for `id`, overwriting any prior value.
    ///
    /// Validation is all-or-nothing: on [`PropertyError::InvalidValue`] the
    /// store is unchanged. Read-only keys are rejected unconditionally on
    /// this path. Writing the current effective value is a complete no-op
    /// (no sequence bump, no callbacks).
    pub fn set(&self, id: PropertyId, value: impl Into<String>) -> Result<(), PropertyError> {
        let value = value.into();
        validation::check(id, &value)?;
        self.write(PropertyKey::Id(id), value, false)
    }

    /// String-named [`PropertyStore::set`]. Unknown names follow the store's
    /// [`UnknownKeyPolicy`].
    pub fn set_named(&self, name: &str, value: impl Into<String>) -> Result<(), PropertyError> {
        let key = PropertyKey::parse(name);
        match &key {
            PropertyKey::Id(id) => {
                let value = value.into();
                validation::check(*id, &value)?;
                self.write(key, value, false)
            }
            PropertyKey::Custom(name) => {
                match self.policy {
                    UnknownKeyPolicy::Strict => {
                        return Err(PropertyError::Unknown {
                            name: name.clone(),
                        })
                    }
                    UnknownKeyPolicy::Permissive => {
                        tracing::warn!(property = %name, "unknown property stored as vendor extension");
                    }
                }
                self.write(key, value.into(), false)
            }
        }
    }

    /// Privileged write used by the session machinery for system-owned keys.
    ///
    /// The first write to a read-only key latches it; a second one fails
    /// with [`PropertyError::ReadOnly`] just like the public path.
    pub(crate) fn system_set(
        &self,
        id: PropertyId,
        value: impl Into<String>,
    ) -> Result<(), PropertyError> {
        let value = value.into();
        validation::check(id, &value)?;
        self.write(PropertyKey::Id(id), value, true)
    }

    /// Clear an explicitly set value, reverting to the default if one
    /// exists. A no-op on keys with no explicit value.
    pub fn remove(&self, id: PropertyId) -> Result<(), PropertyError> {
        self.remove_key(PropertyKey::Id(id))
    }

    /// String-named [`PropertyStore::remove`].
    pub fn remove_named(&self, name: &str) -> Result<(), PropertyError> {
        self.remove_key(PropertyKey::parse(name))
    }

    /// Register a callback for changes to `id`.
    ///
    /// Callbacks run synchronously on the mutating thread, after the write
    /// lock is released, once per effective-value change, and receive the
    /// new effective value. A callback must not mutate this store; such
    /// calls fail with [`PropertyError::ReentrantMutation`]. Registered
    /// callbacks live as long as the store and are not copied by
    /// [`PropertyStore::derive_for_session`].
    pub fn on_change(&self, id: PropertyId, callback: impl Fn(Option<&str>) + Send + Sync + 'static) {
        self.watchers
            .lock()
            .entry(PropertyKey::Id(id))
            .or_default()
            .push(Arc::new(callback));
    }

    /// The last-modified sequence of the explicit record for `id`, if any.
    pub fn modification_seq(&self, id: PropertyId) -> Option<u64> {
        self.inner
            .read()
            .records
            .get(&PropertyKey::Id(id))
            .map(|r| r.seq)
    }

    /// Point-in-time consistent view of every non-absent property, ordered
    /// by key. Cheap to clone and re-iterate.
    pub fn snapshot(&self) -> PropertySnapshot {
        let inner = self.inner.read();
        let mut entries: BTreeMap<PropertyKey, String> = self.defaults.clone();
        for (key, record) in &inner.records {
            entries.insert(key.clone(), record.value.clone());
        }
        PropertySnapshot {
            seq: inner.seq,
            entries: Arc::new(entries.into_iter().collect()),
        }
    }

    /// Copy all current values, defaults, and policy into a new,
    /// independently owned store for a session binding.
    ///
    /// The derived store additionally marks the system-owned ids read-only
    /// so only the session machinery can publish into them. Watchers are not
    /// copied; mutations on either store never affect the other.
    pub fn derive_for_session(&self) -> PropertyStore {
        let inner = self.inner.read();
        let mut read_only = self.read_only.clone();
        read_only.extend(PropertyId::system_owned().map(PropertyKey::Id));
        PropertyStore {
            inner: RwLock::new(Inner {
                records: inner.records.clone(),
                seq: inner.seq,
            }),
            defaults: self.defaults.clone(),
            read_only,
            policy: self.policy,
            watchers: Mutex::new(HashMap::new()),
            dispatching: Mutex::new(Vec::new()),
        }
    }

    fn get_key(&self, key: &PropertyKey) -> Option<String> {
        let inner = self.inner.read();
        self.effective(&inner, key).map(str::to_string)
    }

    fn effective<'a>(&'a self, inner: &'a Inner, key: &PropertyKey) -> Option<&'a str> {
        inner
            .records
            .get(key)
            .map(|r| r.value.as_str())
            .or_else(|| self.defaults.get(key).map(String::as_str))
    }

    fn write(&self, key: PropertyKey, value: String, privileged: bool) -> Result<(), PropertyError> {
        self.guard_reentrancy()?;
        let notify = {
            let mut inner = self.inner.write();
            let guarded = self.read_only.contains(&key);
            if guarded {
                let latched = inner
                    .records
                    .get(&key)
                    .map(|r| r.latched)
                    .unwrap_or(false);
                if !privileged || latched {
                    return Err(PropertyError::ReadOnly {
                        key: key.name().to_string(),
                    });
                }
            }
            let unchanged = self.effective(&inner, &key) == Some(value.as_str());
            if unchanged && !(privileged && guarded) {
                return Ok(());
            }
            inner.seq += 1;
            let seq = inner.seq;
            inner.records.insert(
                key.clone(),
                Record {
                    value: value.clone(),
                    seq,
                    latched: privileged && guarded,
                },
            );
            tracing::debug!(property = %key, seq, "property set");
            !unchanged
        };
        if notify {
            self.notify(&key, Some(&value));
        }
        Ok(())
    }

    fn remove_key(&self, key: PropertyKey) -> Result<(), PropertyError> {
        self.guard_reentrancy()?;
        let reverted = {
            let mut inner = self.inner.write();
            if self.read_only.contains(&key) {
                return Err(PropertyError::ReadOnly {
                    key: key.name().to_string(),
                });
            }
            match inner.records.remove(&key) {
                // Idempotent: nothing explicit to clear.
                None => None,
                Some(old) => {
                    inner.seq += 1;
                    tracing::debug!(property = %key, "property cleared");
                    let now = self.defaults.get(&key).cloned();
                    if now.as_deref() == Some(old.value.as_str()) {
                        None
                    } else {
                        Some(now)
                    }
                }
            }
        };
        if let Some(new_value) = reverted {
            self.notify(&key, new_value.as_deref());
        }
        Ok(())
    }

    fn guard_reentrancy(&self) -> Result<(), PropertyError> {
        if self.dispatching.lock().contains(&thread::current().id()) {
            return Err(PropertyError::ReentrantMutation);
        }
        Ok(())
    }

    fn notify(&self, key: &PropertyKey, value: Option<&str>) {
        let callbacks: Vec<ChangeCallback> = {
            let watchers = self.watchers.lock();
            match watchers.get(key) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => return,
            }
        };
        let _guard = DispatchGuard::enter(&self.dispatching);
        for callback in callbacks {
            callback(value);
        }
    }
}

/// Marks the current thread as dispatching for the store; removed on drop
/// so a panicking callback cannot wedge the guard.
struct DispatchGuard<'a> {
    dispatching: &'a Mutex<Vec<ThreadId>>,
    id: ThreadId,
}

impl<'a> DispatchGuard<'a> {
    fn enter(dispatching: &'a Mutex<Vec<ThreadId>>) -> Self {
        let id = thread::current().id();
        dispatching.lock().push(id);
        Self { dispatching, id }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut threads = self.dispatching.lock();
        if let Some(pos) = threads.iter().rposition(|t| *t == self.id) {
            threads.remove(pos);
        }
    }
}

/// Ordered, restartable view of a store at a single coherent instant.
#[derive(Debug, Clone)]
pub struct PropertySnapshot {
    seq: u64,
    entries: Arc<Vec<(PropertyKey, String)>>,
}

impl PropertySnapshot {
    /// The store's mutation sequence when the snapshot was taken.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the entries in key order; may be called repeatedly.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Value captured for `id`, if it was non-absent.
    pub fn get(&self, id: PropertyId) -> Option<&str> {
        let key = PropertyKey::Id(id);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Diagnostic JSON object keyed by canonical names.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl PartialEq for PropertySnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Serialize for PropertySnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in self.entries.iter() {
            map.serialize_entry(key.name(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn store_with_default_language() -> PropertyStore {
        let mut defaults = BTreeMap::new();
        defaults.insert(
            PropertyKey::Id(PropertyId::RecognitionLanguage),
            "en-US".to_string(),
        );
        PropertyStore::with_defaults(defaults, BTreeSet::new()).unwrap()
    }

    #[test]
    fn absent_key_is_observable() {
        let store = PropertyStore::new();
        assert!(!store.has(PropertyId::ConnectionKey));
        assert_eq!(store.get(PropertyId::ConnectionKey), None);
        assert_eq!(store.get_or(PropertyId::ConnectionKey, "fallback"), "fallback");
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = PropertyStore::new();
        store.set(PropertyId::RecognitionLanguage, "de-DE").unwrap();
        assert_eq!(
            store.get(PropertyId::RecognitionLanguage).as_deref(),
            Some("de-DE")
        );
        assert!(store.has(PropertyId::RecognitionLanguage));
    }

    #[test]
    fn defaults_layer_under_explicit_values() {
        let store = store_with_default_language();
        assert_eq!(
            store.get(PropertyId::RecognitionLanguage).as_deref(),
            Some("en-US")
        );
        assert!(store.has(PropertyId::RecognitionLanguage));

        store.set(PropertyId::RecognitionLanguage, "fr-FR").unwrap();
        assert_eq!(
            store.get(PropertyId::RecognitionLanguage).as_deref(),
            Some("fr-FR")
        );

        store.remove(PropertyId::RecognitionLanguage).unwrap();
        assert_eq!(
            store.get(PropertyId::RecognitionLanguage).as_deref(),
            Some("en-US")
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let store = PropertyStore::new();
        store.set(PropertyId::ProxyHost, "proxy.internal").unwrap();
        store.remove(PropertyId::ProxyHost).unwrap();
        assert!(!store.has(PropertyId::ProxyHost));
        store.remove(PropertyId::ProxyHost).unwrap();
        assert!(!store.has(PropertyId::ProxyHost));
    }

    #[test]
    fn invalid_value_leaves_store_unchanged() {
        let store = PropertyStore::new();
        store.set(PropertyId::ProxyPort, "8080").unwrap();
        let err = store.set(PropertyId::ProxyPort, "eighty").unwrap_err();
        assert!(matches!(err, PropertyError::InvalidValue { .. }));
        assert_eq!(store.get(PropertyId::ProxyPort).as_deref(), Some("8080"));
    }

    #[test]
    fn public_set_never_writes_read_only_keys() {
        let read_only: BTreeSet<_> = [PropertyKey::Id(PropertyId::SessionId)].into();
        let store = PropertyStore::with_defaults(BTreeMap::new(), read_only).unwrap();

        store.set(PropertyId::RecognitionLanguage, "en-US").unwrap();
        assert_eq!(
            store.get(PropertyId::RecognitionLanguage).as_deref(),
            Some("en-US")
        );

        let first = store.set(PropertyId::SessionId, "abc").unwrap_err();
        assert!(matches!(first, PropertyError::ReadOnly { .. }));
        let second = store.set(PropertyId::SessionId, "def").unwrap_err();
        assert!(matches!(second, PropertyError::ReadOnly { .. }));
        assert_eq!(store.get(PropertyId::SessionId), None);
    }

    #[test]
    fn system_set_latches_exactly_once() {
        let read_only: BTreeSet<_> = [PropertyKey::Id(PropertyId::SessionId)].into();
        let store = PropertyStore::with_defaults(BTreeMap::new(), read_only).unwrap();

        store.system_set(PropertyId::SessionId, "abc").unwrap();
        assert_eq!(store.get(PropertyId::SessionId).as_deref(), Some("abc"));

        let err = store.system_set(PropertyId::SessionId, "def").unwrap_err();
        assert!(matches!(err, PropertyError::ReadOnly { .. }));
        assert_eq!(store.get(PropertyId::SessionId).as_deref(), Some("abc"));

        // Public path stays rejected after the latch too.
        assert!(store.set(PropertyId::SessionId, "ghi").is_err());
    }

    #[test]
    fn remove_rejects_read_only_keys() {
        let read_only: BTreeSet<_> = [PropertyKey::Id(PropertyId::JsonResult)].into();
        let store = PropertyStore::with_defaults(BTreeMap::new(), read_only).unwrap();
        store.system_set(PropertyId::JsonResult, "{}").unwrap();
        let err = store.remove(PropertyId::JsonResult).unwrap_err();
        assert!(matches!(err, PropertyError::ReadOnly { .. }));
        assert_eq!(store.get(PropertyId::JsonResult).as_deref(), Some("{}"));
    }

    #[test]
    fn on_change_fires_once_per_distinct_value() {
        let store = PropertyStore::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        store.on_change(PropertyId::ProxyPassword, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set(PropertyId::ProxyPassword, "hunter2").unwrap();
        store.set(PropertyId::ProxyPassword, "hunter2").unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        store.set(PropertyId::ProxyPassword, "hunter3").unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn on_change_hands_over_the_new_value() {
        let store = store_with_default_language();
        let observed = Arc::new(Mutex::new(Vec::<Option<String>>::new()));
        let sink = observed.clone();
        store.on_change(PropertyId::RecognitionLanguage, move |value| {
            sink.lock().push(value.map(str::to_string));
        });

        store.set(PropertyId::RecognitionLanguage, "ja-JP").unwrap();
        // Reverting to the default is a change and reports the default.
        store.remove(PropertyId::RecognitionLanguage).unwrap();

        let observed = observed.lock();
        assert_eq!(
            *observed,
            vec![Some("ja-JP".to_string()), Some("en-US".to_string())]
        );
    }

    #[test]
    fn setting_the_default_value_is_a_no_op() {
        let store = store_with_default_language();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        store.on_change(PropertyId::RecognitionLanguage, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set(PropertyId::RecognitionLanguage, "en-US").unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(store.modification_seq(PropertyId::RecognitionLanguage), None);
    }

    #[test]
    fn reentrant_mutation_from_callback_is_rejected() {
        let store = Arc::new(PropertyStore::new());
        let inner = store.clone();
        let result = Arc::new(Mutex::new(None));
        let sink = result.clone();
        store.on_change(PropertyId::ProxyHost, move |_| {
            *sink.lock() = Some(inner.set(PropertyId::ProxyUser, "me"));
        });

        store.set(PropertyId::ProxyHost, "proxy.internal").unwrap();
        let result = result.lock().take().expect("callback ran");
        assert_eq!(result, Err(PropertyError::ReentrantMutation));
        assert!(!store.has(PropertyId::ProxyUser));
    }

    #[test]
    fn other_threads_may_mutate_while_a_callback_runs() {
        let store = Arc::new(PropertyStore::new());
        let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded::<()>();
        store.on_change(PropertyId::ProxyHost, move |_| {
            entered_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });

        let setter = {
            let store = store.clone();
            thread::spawn(move || store.set(PropertyId::ProxyHost, "proxy.internal"))
        };
        entered_rx.recv().unwrap();

        // The write lock is released before callbacks run.
        store.set(PropertyId::ProxyUser, "me").unwrap();
        assert_eq!(store.get(PropertyId::ProxyUser).as_deref(), Some("me"));

        release_tx.send(()).unwrap();
        setter.join().unwrap().unwrap();
    }

    #[test]
    fn modification_seq_tracks_writes() {
        let store = PropertyStore::new();
        assert_eq!(store.modification_seq(PropertyId::ProxyHost), None);
        store.set(PropertyId::ProxyHost, "a").unwrap();
        let first = store.modification_seq(PropertyId::ProxyHost).unwrap();
        store.set(PropertyId::ProxyUser, "b").unwrap();
        store.set(PropertyId::ProxyHost, "c").unwrap();
        let third = store.modification_seq(PropertyId::ProxyHost).unwrap();
        assert!(third > first);
    }

    #[test]
    fn snapshot_merges_defaults_and_orders_keys() {
        let store = store_with_default_language();
        store.set(PropertyId::ConnectionRegion, "westeurope").unwrap();
        store.set_named("vendor.trace_id", "t-1").unwrap();

        let snapshot = store.snapshot();
        let keys: Vec<String> = snapshot.iter().map(|(k, _)| k.name().to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "connection.region".to_string(),
                "recognition.language".to_string(),
                "vendor.trace_id".to_string(),
            ]
        );
        assert_eq!(snapshot.get(PropertyId::RecognitionLanguage), Some("en-US"));

        // Restartable: a second pass sees the same entries.
        assert_eq!(snapshot.iter().count(), snapshot.iter().count());

        let json = snapshot.to_json();
        assert_eq!(json["connection.region"], "westeurope");
        assert_eq!(json["vendor.trace_id"], "t-1");
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let store = PropertyStore::new();
        store.set(PropertyId::ConnectionRegion, "westeurope").unwrap();
        let snapshot = store.snapshot();
        store.set(PropertyId::ConnectionRegion, "eastus").unwrap();
        assert_eq!(snapshot.get(PropertyId::ConnectionRegion), Some("westeurope"));
        assert_eq!(store.snapshot().get(PropertyId::ConnectionRegion), Some("eastus"));
    }

    #[test]
    fn derive_copies_values_then_diverges() {
        let store = store_with_default_language();
        store.set(PropertyId::ConnectionKey, "secret").unwrap();
        let derived = store.derive_for_session();
        assert_eq!(derived.snapshot(), store.snapshot());

        derived.set(PropertyId::ConnectionKey, "rotated").unwrap();
        assert_eq!(store.get(PropertyId::ConnectionKey).as_deref(), Some("secret"));
        assert_eq!(derived.get(PropertyId::ConnectionKey).as_deref(), Some("rotated"));

        store.set(PropertyId::ProxyHost, "proxy.internal").unwrap();
        assert!(!derived.has(PropertyId::ProxyHost));
    }

    #[test]
    fn derived_store_guards_system_owned_keys() {
        let store = PropertyStore::new();
        let derived = store.derive_for_session();
        let err = derived.set(PropertyId::SessionId, "abc").unwrap_err();
        assert!(matches!(err, PropertyError::ReadOnly { .. }));
        derived.system_set(PropertyId::SessionId, "abc").unwrap();
        assert_eq!(derived.get(PropertyId::SessionId).as_deref(), Some("abc"));
        // The parent store never marked the key read-only.
        store.set(PropertyId::SessionId, "parent").unwrap();
    }

    #[test]
    fn derive_does_not_copy_watchers() {
        let store = PropertyStore::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        store.on_change(PropertyId::ProxyHost, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let derived = store.derive_for_session();
        derived.set(PropertyId::ProxyHost, "proxy.internal").unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn strict_policy_rejects_unknown_names() {
        let store = PropertyStore::with_options(
            BTreeMap::new(),
            BTreeSet::new(),
            UnknownKeyPolicy::Strict,
        )
        .unwrap();
        let err = store.set_named("vendor.trace_id", "t-1").unwrap_err();
        assert_eq!(
            err,
            PropertyError::Unknown {
                name: "vendor.trace_id".to_string()
            }
        );
        assert!(!store.has_named("vendor.trace_id"));
    }

    #[test]
    fn permissive_policy_keeps_vendor_extensions() {
        let store = PropertyStore::new();
        store.set_named("vendor.trace_id", "t-1").unwrap();
        assert_eq!(store.get_named("vendor.trace_id").as_deref(), Some("t-1"));
        // Canonical names keep resolving to the typed id.
        store.set_named("proxy.port", "8080").unwrap();
        assert_eq!(store.get(PropertyId::ProxyPort).as_deref(), Some("8080"));
        assert!(store.set_named("proxy.port", "eighty").is_err());
    }

    #[test]
    fn bad_default_fails_construction() {
        let mut defaults = BTreeMap::new();
        defaults.insert(PropertyKey::Id(PropertyId::ProxyPort), "eighty".to_string());
        let err = PropertyStore::with_defaults(defaults, BTreeSet::new()).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidValue { .. }));
    }
}
