use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

/// Prime initial bucket count.
pub const DEFAULT_BUCKETS: usize = 17;

/// `len / buckets` at which the next insertion doubles the bucket count.
pub const LOAD_FACTOR: f64 = 0.75;

/// Separate-chaining hash map.
///
/// Each bucket is an insertion-ordered list of `(key, value)` pairs; the
/// bucket for a key is `hash(key) % bucket_count`. Collisions are always
/// resolved by chaining, so there is no failure state. Keys cannot be null:
/// the type system already rules that out.
///
/// Iteration order is unspecified and changes across resizes.
#[derive(Debug, Clone)]
pub struct ChainingHashTable<K, V, S = RandomState> {
    buckets: Vec<Vec<(K, V)>>,
    len: usize,
    hasher: S,
}

impl<K: Hash + Eq, V> ChainingHashTable<K, V, RandomState> {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(buckets: usize) -> Self {
        Self::with_buckets_and_hasher(buckets, RandomState::new())
    }
}

impl<K: Hash + Eq, V> Default for ChainingHashTable<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainingHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn with_buckets_and_hasher(buckets: usize, hasher: S) -> Self {
        let buckets = buckets.max(1);
        Self {
            buckets: (0..buckets).map(|_| Vec::new()).collect(),
            len: 0,
            hasher,
        }
    }

    fn bucket_of<Q>(&self, key: &Q, bucket_count: usize) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        (self.hasher.hash_one(key) % bucket_count as u64) as usize
    }

    fn grow_if_loaded(&mut self) {
        if self.len as f64 / self.buckets.len() as f64 >= LOAD_FACTOR {
            self.resize(self.buckets.len() * 2);
        }
    }

    /// Rehash every entry into a fresh table, then swap it in.
    fn resize(&mut self, bucket_count: usize) {
        let mut fresh: Vec<Vec<(K, V)>> = (0..bucket_count).map(|_| Vec::new()).collect();
        for (key, value) in std::mem::take(&mut self.buckets).into_iter().flatten() {
            let idx = self.bucket_of(&key, bucket_count);
            fresh[idx].push((key, value));
        }
        self.buckets = fresh;
    }

    /// Insert or overwrite. Returns the previous value for `key`, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.grow_if_loaded();
        let idx = self.bucket_of(&key, self.buckets.len());
        let bucket = &mut self.buckets[idx];
        if let Some((_, slot)) = bucket.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(slot, value));
        }
        bucket.push((key, value));
        self.len += 1;
        None
    }

    /// Value for `key`, inserting `default()` first if absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        self.grow_if_loaded();
        let idx = self.bucket_of(&key, self.buckets.len());
        let bucket = &mut self.buckets[idx];
        let pos = match bucket.iter().position(|(k, _)| *k == key) {
            Some(pos) => pos,
            None => {
                bucket.push((key, default()));
                self.len += 1;
                bucket.len() - 1
            }
        };
        &mut bucket[pos].1
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.bucket_of(key, self.buckets.len());
        self.buckets[idx]
            .iter()
            .find(|(k, _)| <K as Borrow<Q>>::borrow(k) == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.bucket_of(key, self.buckets.len());
        self.buckets[idx]
            .iter_mut()
            .find(|(k, _)| <K as Borrow<Q>>::borrow(k) == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Removing an absent key is a no-op.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.bucket_of(key, self.buckets.len());
        let bucket = &mut self.buckets[idx];
        let pos = bucket.iter().position(|(k, _)| <K as Borrow<Q>>::borrow(k) == key)?;
        self.len -= 1;
        Some(bucket.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Drops every entry but keeps the current bucket count.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets.iter().flatten().map(|(k, v)| (k, v))
    }
}
