//! Chronologically sortable push ids
//!
//! 20 characters: 8 encode the millisecond timestamp, 12 are random. Ids
//! generated within the same millisecond reuse the previous random part
//! incremented by one, so ids from one generator always sort in creation
//! order.

use rand::Rng;

/// Alphabet in ascending ASCII order
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_timestamp: i64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }

    /// Generate an id for an explicit timestamp (milliseconds since epoch)
    pub fn next_id_at(&mut self, now_ms: i64) -> String {
        let duplicate_time = now_ms == self.last_timestamp;
        self.last_timestamp = now_ms;

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);

        let mut time_chars = [0u8; TIME_CHARS];
        let mut remaining = now_ms.max(0);
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        id.extend(time_chars.iter().map(|&c| c as char));

        if duplicate_time {
            // increment with carry; 63 rolls over to 0
            for digit in self.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            let mut rng = rand::thread_rng();
            for digit in self.last_random.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
        }
        id.extend(
            self.last_random
                .iter()
                .map(|&d| PUSH_CHARS[d as usize] as char),
        );

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_shape() {
        let id = PushIdGenerator::new().next_id();
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn test_ids_sort_by_time() {
        let mut generator = PushIdGenerator::new();
        let earlier = generator.next_id_at(1_000);
        let later = generator.next_id_at(2_000);
        assert!(earlier < later);
    }

    #[test]
    fn test_same_millisecond_ids_are_increasing() {
        let mut generator = PushIdGenerator::new();
        let ids: Vec<String> = (0..50).map(|_| generator.next_id_at(5_000)).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }
}
