//! Injectable entropy for dispatch indexes and oracle index assignment.
//!
//! The hosting platform originally supplied unpredictable entropy; here it
//! is a trait so deployments draw from the OS and tests supply scripted
//! sequences.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

/// Source of unpredictability for the consensus components.
pub trait EntropySource: Send + Sync {
    /// Seed material mixed into oracle index derivation.
    fn seed(&self) -> [u8; 32];

    /// Draw a dispatch index in `0..range`.
    fn dispatch_index(&self, range: u8) -> u8;
}

/// OS-backed entropy for real deployments.
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn seed(&self) -> [u8; 32] {
        rand::rng().random()
    }

    fn dispatch_index(&self, range: u8) -> u8 {
        rand::rng().random_range(0..range)
    }
}

/// Deterministic entropy for tests.
///
/// Dispatch indexes are served from a scripted queue (falling back to a
/// round-robin counter when empty); seeds are derived from a counter so
/// every registration is reproducible.
pub struct ScriptedEntropy {
    indexes: Mutex<VecDeque<u8>>,
    counter: Mutex<u64>,
}

impl ScriptedEntropy {
    /// Create an empty scripted source.
    pub fn new() -> Self {
        Self {
            indexes: Mutex::new(VecDeque::new()),
            counter: Mutex::new(0),
        }
    }

    /// Queue the next dispatch index to hand out.
    pub fn push_index(&self, index: u8) {
        self.indexes.lock().unwrap().push_back(index);
    }
}

impl Default for ScriptedEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for ScriptedEntropy {
    fn seed(&self) -> [u8; 32] {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;

        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&counter.to_be_bytes());
        seed
    }

    fn dispatch_index(&self, range: u8) -> u8 {
        if let Some(index) = self.indexes.lock().unwrap().pop_front() {
            return index % range;
        }

        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        (*counter % u64::from(range)) as u8
    }
}
