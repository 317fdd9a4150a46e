// src/utils/index_id.rs

//! Short, sortable tokens used as materialized-path segments.
//!
//! A token is 11 base-36 digits of a per-process sequence followed by two
//! random base-36 digits. The sequence is the millisecond clock shifted left
//! by 12 bits and never repeats or goes backwards within a process, so tokens
//! issued later sort later. Fixed width keeps lexicographic order equal to
//! numeric order, and the alphabet never contains the path separator.

use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SEQUENCE_WIDTH: usize = 11;
const SUFFIX_WIDTH: usize = 2;
const COUNTER_BITS: u32 = 12;

/// Total length of a generated token.
pub const INDEX_ID_LEN: usize = SEQUENCE_WIDTH + SUFFIX_WIDTH;

static LAST_SEQUENCE: Mutex<u64> = Mutex::new(0);

/// Generates the next index token.
pub fn next_index_id() -> String {
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let sequence = {
        let mut last = LAST_SEQUENCE.lock().unwrap_or_else(|e| e.into_inner());
        advance(&mut last, now_millis)
    };

    let mut token = encode_base36(sequence, SEQUENCE_WIDTH);
    let mut rng = rand::thread_rng();
    for _ in 0..SUFFIX_WIDTH {
        token.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }
    token
}

/// Moves the sequence forward, tolerating a stalled or rewound clock.
fn advance(last: &mut u64, now_millis: u64) -> u64 {
    let candidate = now_millis << COUNTER_BITS;
    let next = candidate.max(*last + 1);
    *last = next;
    next
}

fn encode_base36(mut value: u64, width: usize) -> String {
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    digits.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_fixed_width_and_safe_alphabet() {
        let token = next_index_id();
        assert_eq!(token.len(), INDEX_ID_LEN);
        assert!(token.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }

    #[test]
    fn tokens_sort_in_issue_order() {
        let tokens: Vec<String> = (0..500).map(|_| next_index_id()).collect();
        for pair in tokens.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn sequence_survives_clock_going_backwards() {
        let mut last = 0;
        let a = advance(&mut last, 2_000);
        let b = advance(&mut last, 1_000);
        let c = advance(&mut last, 1_000);
        assert!(a < b && b < c);
    }

    #[test]
    fn base36_is_zero_padded() {
        assert_eq!(encode_base36(0, 4), "0000");
        assert_eq!(encode_base36(35, 4), "000z");
        assert_eq!(encode_base36(36, 4), "0010");
    }
}
