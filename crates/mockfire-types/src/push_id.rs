use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Alphabet in ascending ASCII order, so generated ids sort like their
/// timestamps.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIMESTAMP_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Internal mutable state of the generator.
struct PushState {
    /// Millisecond timestamp of the last generated id.
    last_ms: u64,
    /// Random suffix of the last generated id, as alphabet indices.
    last_random: [u8; RANDOM_CHARS],
}

/// Generator of 20-character child keys for `push`.
///
/// Each id is 8 characters of millisecond timestamp followed by 12 random
/// characters. Ids produced by one generator are strictly increasing: when
/// two ids share a millisecond, the random suffix of the second is the first
/// one's suffix plus one.
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PushState {
                last_ms: 0,
                last_random: [0; RANDOM_CHARS],
            }),
        }
    }

    /// Generate an id stamped with the current wall clock.
    pub fn next_id(&self) -> String {
        self.next_id_at(Self::wall_clock_ms())
    }

    /// Generate an id stamped with `now_ms`.
    ///
    /// A timestamp earlier than the last one used is clamped forward, so ids
    /// stay monotonic even if the wall clock steps back.
    pub fn next_id_at(&self, now_ms: u64) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now_ms > state.last_ms {
            state.last_ms = now_ms;
            let mut rng = rand::thread_rng();
            for slot in state.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        } else {
            Self::increment(&mut state.last_random);
        }

        let mut id = String::with_capacity(TIMESTAMP_CHARS + RANDOM_CHARS);
        let mut stamp = [0u8; TIMESTAMP_CHARS];
        let mut remaining = state.last_ms;
        for slot in stamp.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        id.extend(stamp.iter().map(|&b| b as char));
        id.extend(
            state
                .last_random
                .iter()
                .map(|&i| PUSH_CHARS[i as usize] as char),
        );
        id
    }

    fn increment(random: &mut [u8; RANDOM_CHARS]) {
        for slot in random.iter_mut().rev() {
            if *slot == 63 {
                *slot = 0;
            } else {
                *slot += 1;
                return;
            }
        }
    }

    /// Current wall-clock time in milliseconds since the UNIX epoch.
    fn wall_clock_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::validate_key;

    #[test]
    fn ids_are_twenty_valid_chars() {
        let generator = PushIdGenerator::new();
        let id = generator.next_id();
        assert_eq!(id.len(), 20);
        assert!(validate_key(&id).is_ok());
    }

    #[test]
    fn same_millisecond_ids_increase() {
        let generator = PushIdGenerator::new();
        let ids: Vec<String> = (0..50).map(|_| generator.next_id_at(1_000)).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn later_timestamps_sort_later() {
        let generator = PushIdGenerator::new();
        let a = generator.next_id_at(1_000);
        let b = generator.next_id_at(2_000);
        assert!(a < b);
        assert_ne!(a[..8], b[..8]);
    }

    #[test]
    fn clock_step_back_stays_monotonic() {
        let generator = PushIdGenerator::new();
        let a = generator.next_id_at(5_000);
        let b = generator.next_id_at(4_000);
        assert!(a < b);
        assert_eq!(a[..8], b[..8]);
    }

    #[test]
    fn increment_carries() {
        let mut random = [63u8; RANDOM_CHARS];
        random[0] = 1;
        PushIdGenerator::increment(&mut random);
        assert_eq!(random[0], 2);
        assert!(random[1..].iter().all(|&b| b == 0));
    }
}
