#![no_main]

use hll_experiment::aggregate::{mean_exact, theory_bands};
use hll_experiment::records::read_trials;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(groups) = read_trials(data) {
        for records in groups.values() {
            assert!(records.windows(2).all(|w| w[0].step_index < w[1].step_index));
        }
        if let Ok(Some(mean)) = mean_exact(&groups) {
            let _ = theory_bands(&mean, 10);
        }
    }
});
