//! Name directories consulted by domain converters.
//!
//! Commands frequently take a free-text name (a place, an entity) that has
//! to be resolved against a catalog. [`Directory`] is the lookup contract;
//! [`StaticDirectory`] is a small in-memory implementation, and [`lookup`]
//! turns any directory into a [`Converter`].

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::convert::{self, Converter};
use crate::outcome::Failure;

/// A fuzzy lookup hit; `score` is in `[0, 1]`, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scored<T> {
    /// The matched item.
    pub item: T,
    /// Match quality.
    pub score: f64,
}

/// Lookup contract for named items.
pub trait Directory<T>: Send + Sync {
    /// Returns the item registered under exactly `name`, if any.
    fn lookup_exact(&self, name: &str) -> Option<T>;

    /// Returns scored candidates for `name`, best first.
    fn lookup_fuzzy(&self, name: &str) -> Vec<Scored<T>>;
}

/// In-memory directory keyed by normalized name.
///
/// Keys are compared lower-cased with runs of whitespace collapsed. Fuzzy
/// scores combine whole-key prefix similarity with the share of query
/// words that start a word of the key.
#[derive(Debug, Clone)]
pub struct StaticDirectory<T> {
    entries: IndexMap<String, T>,
}

impl<T: Clone + Send + Sync> StaticDirectory<T> {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Builds a directory from `(name, item)` pairs; later duplicates replace earlier ones.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, T)>) -> Self {
        let mut directory = Self::new();
        for (name, item) in entries {
            directory.insert(name, item);
        }
        directory
    }

    /// Registers `item` under `name`.
    pub fn insert(&mut self, name: &str, item: T) {
        self.entries.insert(normalize_key(name), item);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone + Send + Sync> Default for StaticDirectory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> Directory<T> for StaticDirectory<T> {
    fn lookup_exact(&self, name: &str) -> Option<T> {
        self.entries.get(&normalize_key(name)).cloned()
    }

    fn lookup_fuzzy(&self, name: &str) -> Vec<Scored<T>> {
        let query = normalize_key(name);
        if query.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<Scored<T>> = self
            .entries
            .iter()
            .filter_map(|(key, item)| {
                let score = similarity(&query, key);
                (score > 0.0).then(|| Scored {
                    item: item.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits
    }
}

fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn similarity(query: &str, key: &str) -> f64 {
    if query == key {
        return 1.0;
    }

    let prefix = if key.starts_with(query) {
        0.5 + 0.5 * (query.len() as f64 / key.len() as f64)
    } else {
        0.0
    };

    let query_words: Vec<&str> = query.split(' ').collect();
    let key_words: Vec<&str> = key.split(' ').collect();
    let matched = query_words
        .iter()
        .filter(|word| key_words.iter().any(|candidate| candidate.starts_with(*word)))
        .count();
    let words = matched as f64 / query_words.len().max(key_words.len()) as f64;

    prefix.max(words).min(0.99)
}

/// Converts a string into the item a directory resolves it to.
///
/// An exact hit wins; otherwise the best fuzzy hit scoring at least
/// `min_score` is used.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use command_grammar_core::convert;
/// use command_grammar_core::directory::StaticDirectory;
/// use serde_json::json;
///
/// let gyms = Arc::new(StaticDirectory::from_entries([
///     ("Fountain Square", 1u32),
///     ("Old Mill", 2u32),
/// ]));
/// let gym = convert::lookup(gyms, 0.5);
///
/// assert_eq!(gym.convert(&json!("fountain square")).unwrap(), 1);
/// assert_eq!(gym.convert(&json!("old")).unwrap(), 2);
/// assert!(gym.convert(&json!("library")).is_err());
/// ```
pub fn lookup<T, D>(directory: Arc<D>, min_score: f64) -> Converter<T>
where
    T: 'static,
    D: Directory<T> + ?Sized + 'static,
{
    convert::string().map(move |name| {
        if let Some(item) = directory.lookup_exact(&name) {
            return Ok(item);
        }
        directory
            .lookup_fuzzy(&name)
            .into_iter()
            .find(|hit| hit.score >= min_score)
            .map(|hit| hit.item)
            .ok_or_else(|| Failure::message(format!("no entry matches \"{name}\"")))
    })
}
