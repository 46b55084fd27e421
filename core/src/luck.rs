//! Deterministic luck function shared by every procedural decision.
//!
//! The transform is the ARC4-based keyed generator popularised by the
//! `seedrandom` library: the key string is mixed into a byte key, an RC4
//! state is scheduled from it, the first 256 keystream bytes are dropped,
//! and a single float in `[0, 1)` is assembled from the following bytes with
//! 52 bits of significance. The mapping is part of the save format: every
//! spawn decision and cache size derives from it, so any change here alters
//! existing worlds.

const WIDTH: u64 = 256;
const MASK: usize = 0xff;
const CHUNKS: usize = 6;
const START_DENOMINATOR: f64 = 281_474_976_710_656.0; // 256^6
const SIGNIFICANCE: u64 = 1 << 52;
const OVERFLOW: u64 = 1 << 53;
const SMEAR_FACTOR: u32 = 19;

/// Maps an arbitrary key to a stable pseudo-random value in `[0, 1)`.
///
/// The same key always yields the same value, within a process and across
/// processes and platforms.
#[must_use]
pub fn luck(key: &str) -> f64 {
    let mut stream = KeyStream::new(&mix_key(key));

    let mut numerator = stream.take(CHUNKS);
    let mut denominator = START_DENOMINATOR;
    let mut extra = 0_u64;

    while numerator < SIGNIFICANCE {
        numerator = (numerator + extra) * WIDTH;
        denominator *= WIDTH as f64;
        extra = u64::from(stream.next_byte());
    }

    while numerator >= OVERFLOW {
        numerator /= 2;
        denominator /= 2.0;
        extra >>= 1;
    }

    (numerator + extra) as f64 / denominator
}

/// Folds the UTF-16 code units of `seed` into a key of at most 256 bytes.
fn mix_key(seed: &str) -> Vec<u8> {
    let mut key: Vec<u8> = Vec::new();
    let mut smear = 0_u32;

    for (index, unit) in seed.encode_utf16().enumerate() {
        let slot = index & MASK;
        let previous = key.get(slot).copied().map_or(0, u32::from);
        smear ^= previous * SMEAR_FACTOR;
        let mixed = ((smear + u32::from(unit)) & 0xff) as u8;
        match key.get_mut(slot) {
            Some(existing) => *existing = mixed,
            None => key.push(mixed),
        }
    }

    key
}

struct KeyStream {
    state: [u8; 256],
    i: usize,
    j: usize,
}

impl KeyStream {
    fn new(key: &[u8]) -> Self {
        let key: &[u8] = if key.is_empty() { &[0] } else { key };

        let mut state = [0_u8; 256];
        for (slot, value) in state.iter_mut().zip(0_u8..=u8::MAX) {
            *slot = value;
        }

        let mut j = 0_usize;
        for i in 0..state.len() {
            let current = state[i];
            j = (j + usize::from(key[i % key.len()]) + usize::from(current)) & MASK;
            state[i] = state[j];
            state[j] = current;
        }

        let mut stream = Self { state, i: 0, j: 0 };
        for _ in 0..WIDTH {
            let _ = stream.next_byte();
        }
        stream
    }

    fn next_byte(&mut self) -> u8 {
        self.i = (self.i + 1) & MASK;
        let current = self.state[self.i];
        self.j = (self.j + usize::from(current)) & MASK;
        self.state[self.i] = self.state[self.j];
        self.state[self.j] = current;
        let index = (usize::from(self.state[self.i]) + usize::from(self.state[self.j])) & MASK;
        self.state[index]
    }

    fn take(&mut self, count: usize) -> u64 {
        (0..count).fold(0, |acc, _| acc * WIDTH + u64::from(self.next_byte()))
    }
}

#[cfg(test)]
mod tests {
    use super::luck;

    #[test]
    fn matches_reference_values() {
        assert_eq!(luck("0:0"), 0.580_563_811_212_234_1);
        assert_eq!(luck("3:3"), 0.386_725_084_453_029_17);
        assert_eq!(luck("-6:-5"), 0.099_296_522_134_456_17);
        assert_eq!(luck("-1:-1"), 0.005_650_069_214_344_879);
        assert_eq!(luck("hello"), 0.546_366_376_814_073_4);
    }

    #[test]
    fn empty_key_is_supported() {
        assert_eq!(luck(""), 0.231_440_082_151_798_81);
    }

    #[test]
    fn long_and_non_ascii_keys_use_utf16_units() {
        assert_eq!(luck(&"x".repeat(300)), 0.952_495_823_023_581);
        assert_eq!(luck("\u{fc}:\u{e9}"), 0.861_126_596_498_832_4);
    }

    #[test]
    fn values_stay_inside_unit_interval() {
        for i in -20..20 {
            for j in -20..20 {
                let value = luck(&format!("{i}:{j}"));
                assert!((0.0..1.0).contains(&value), "{i}:{j} -> {value}");
            }
        }
    }

    #[test]
    fn repeated_calls_agree() {
        let key = "369894:-1220628";
        assert_eq!(luck(key), luck(key));
    }
}
