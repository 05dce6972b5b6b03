//! Compilation cache
//!
//! An LRU cache keyed by a hash of the source text and filename. The
//! cache is owned by its [`Compiler`](crate::api::Compiler), so there is
//! no process-wide shared state to synchronise.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use crate::diagnostics::Diagnostic;

/// Cached outputs of one compilation.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub html: String,
    pub css: String,
    pub js: String,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

pub struct CompilationCache {
    capacity: usize,
    entries: HashMap<u64, CachedResult>,
    recency: VecDeque<u64>,
}

impl CompilationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn key(source: &str, filename: Option<&str>) -> u64 {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        filename.hash(&mut hasher);
        hasher.finish()
    }

    pub fn get(&mut self, key: u64) -> Option<CachedResult> {
        let result = self.entries.get(&key).cloned();
        if result.is_some() {
            self.touch(key);
        }
        result
    }

    pub fn insert(&mut self, key: u64, result: CachedResult) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key, result).is_none() {
            self.recency.push_back(key);
        } else {
            self.touch(key);
        }
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    fn touch(&mut self, key: u64) {
        if let Some(position) = self.recency.iter().position(|&k| k == key) {
            self.recency.remove(position);
            self.recency.push_back(key);
        }
    }
}
