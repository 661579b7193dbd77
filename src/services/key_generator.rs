// Key Generator
//
// Auto-increment key generation for INSERT statements whose logic table
// declares a generated key column.

use chrono::Utc;
use std::sync::Mutex;

use crate::error::{Result, ShardingError};

/// Produces unique keys for generated key columns
pub trait KeyGenerator: Send + Sync {
    fn generate_key(&self) -> Result<i64>;
}

/// 2016-11-01T00:00:00Z in epoch milliseconds
const EPOCH_MILLIS: i64 = 1_477_958_400_000;
const SEQUENCE_BITS: u32 = 12;
const WORKER_ID_BITS: u32 = 10;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const WORKER_ID_LEFT_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_LEFT_SHIFT: u32 = WORKER_ID_BITS + SEQUENCE_BITS;
pub const MAX_WORKER_ID: i64 = 1 << WORKER_ID_BITS;

#[derive(Debug, Default)]
struct GeneratorState {
    last_time: i64,
    sequence: i64,
}

/// Snowflake style generator.
///
/// Layout: 41 bits of milliseconds since 2016-11-01, 10 bits of worker id and
/// a 12 bit per-millisecond sequence.
#[derive(Debug)]
pub struct DefaultKeyGenerator {
    worker_id: i64,
    state: Mutex<GeneratorState>,
}

impl DefaultKeyGenerator {
    pub fn new(worker_id: i64) -> Result<Self> {
        if !(0..MAX_WORKER_ID).contains(&worker_id) {
            return Err(ShardingError::Configuration(format!(
                "Key generator worker id must be in [0, {}), got {}",
                MAX_WORKER_ID, worker_id
            )));
        }
        Ok(Self {
            worker_id,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    fn wait_until_after(last_time: i64) -> i64 {
        let mut time = Utc::now().timestamp_millis();
        while time <= last_time {
            std::thread::yield_now();
            time = Utc::now().timestamp_millis();
        }
        time
    }
}

impl Default for DefaultKeyGenerator {
    fn default() -> Self {
        Self {
            worker_id: 0,
            state: Mutex::new(GeneratorState::default()),
        }
    }
}

impl KeyGenerator for DefaultKeyGenerator {
    fn generate_key(&self) -> Result<i64> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| ShardingError::Internal(format!("Key generator lock poisoned: {}", e)))?;

        let mut current = Utc::now().timestamp_millis();
        if current < state.last_time {
            return Err(ShardingError::Internal(format!(
                "Clock moved backwards, last time is {} milliseconds, current time is {} milliseconds",
                state.last_time, current
            )));
        }
        if current == state.last_time {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                current = Self::wait_until_after(state.last_time);
            }
        } else {
            state.sequence = 0;
        }
        state.last_time = current;

        tracing::debug!(
            "Generated key at {} ms, worker {}, sequence {}",
            current,
            self.worker_id,
            state.sequence
        );

        Ok(((current - EPOCH_MILLIS) << TIMESTAMP_LEFT_SHIFT)
            | (self.worker_id << WORKER_ID_LEFT_SHIFT)
            | state.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_keys_are_unique_and_increasing() {
        let generator = DefaultKeyGenerator::new(1).unwrap();
        let mut previous = 0;
        let mut seen = HashSet::new();
        for _ in 0..5000 {
            let key = generator.generate_key().unwrap();
            assert!(key > previous);
            assert!(seen.insert(key));
            previous = key;
        }
    }

    #[test]
    fn test_worker_id_is_encoded() {
        let generator = DefaultKeyGenerator::new(3).unwrap();
        let key = generator.generate_key().unwrap();
        assert_eq!((key >> WORKER_ID_LEFT_SHIFT) & (MAX_WORKER_ID - 1), 3);
    }

    #[test]
    fn test_invalid_worker_id() {
        assert!(DefaultKeyGenerator::new(-1).is_err());
        assert!(DefaultKeyGenerator::new(MAX_WORKER_ID).is_err());
    }

    #[test]
    fn test_concurrent_generation() {
        let generator = Arc::new(DefaultKeyGenerator::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..500)
                        .map(|_| generator.generate_key().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(all.insert(key));
            }
        }
        assert_eq!(all.len(), 2000);
    }
}
