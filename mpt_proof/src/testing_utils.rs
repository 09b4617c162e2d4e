use std::collections::HashSet;

use rand::{rngs::StdRng, Rng, SeedableRng};

/// A key/value pair as inserted into a trie.
pub(crate) type TestEntry = (Vec<u8>, Vec<u8>);

const MIN_BYTES_FOR_VAR_KEY: usize = 1;
const MAX_BYTES_FOR_VAR_KEY: usize = 10;
const MAX_VALUE_LEN: usize = 48;

pub(crate) fn common_setup() {
    // Try init since multiple tests calling `init` will cause an error.
    let _ = pretty_env_logger::try_init();
}

/// Generates `n` entries with unique keys of varying length, so some keys are
/// prefixes of others.
pub(crate) fn generate_n_random_variable_entries(
    n: usize,
    seed: u64,
) -> impl Iterator<Item = TestEntry> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(n);

    while entries.len() < n {
        let key_len = rng.gen_range(MIN_BYTES_FOR_VAR_KEY..=MAX_BYTES_FOR_VAR_KEY);
        let key: Vec<u8> = (0..key_len).map(|_| rng.gen()).collect();

        if !seen.insert(key.clone()) {
            continue;
        }

        let value_len = rng.gen_range(1..=MAX_VALUE_LEN);
        let value: Vec<u8> = (0..value_len).map(|_| rng.gen()).collect();
        entries.push((key, value));
    }

    entries.into_iter()
}

/// A value whose leaf can never be embedded in its parent.
pub(crate) fn large_value(seed: u8) -> Vec<u8> {
    (0..40).map(|i: u8| i.wrapping_mul(7).wrapping_add(seed)).collect()
}
