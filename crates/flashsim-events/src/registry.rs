use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use thiserror::Error;

/// A second handler was registered for an event kind that already has one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("handler already registered for event kind {kind}")]
pub struct HandlerCollision {
    pub kind: String,
}

/// Maps event kinds to the component that handles them.
///
/// Built once at simulator construction; each kind is claimed by exactly
/// one handler, and a duplicate claim fails with [`HandlerCollision`].
pub struct HandlerRegistry<K, H> {
    map: HashMap<K, H>,
}

impl<K, H> HandlerRegistry<K, H>
where
    K: Copy + Eq + Hash + fmt::Debug,
    H: Copy,
{
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: K, handler: H) -> Result<(), HandlerCollision> {
        if self.map.contains_key(&kind) {
            return Err(HandlerCollision {
                kind: format!("{kind:?}"),
            });
        }
        self.map.insert(kind, handler);
        Ok(())
    }

    pub fn lookup(&self, kind: K) -> Option<H> {
        self.map.get(&kind).copied()
    }
}

impl<K, H> Default for HandlerRegistry<K, H>
where
    K: Copy + Eq + Hash + fmt::Debug,
    H: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}
