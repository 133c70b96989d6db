#![no_main]

use hll_experiment::hash::mix64;
use hll_experiment::HyperLogLog;
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let precision = 4 + data[0] % 15;
    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut sketch1 = HyperLogLog::new(precision).unwrap();
    for chunk in first_half.chunks(4) {
        sketch1.insert_hash(mix64(chunk, 0));
        assert!(sketch1.estimate() > 0.0);
        assert!(sketch1.size_of() > 0);
    }

    let mut sketch2 = HyperLogLog::new(precision).unwrap();
    for chunk in second_half.chunks(4) {
        sketch2.insert_hash(mix64(chunk, 0));
        assert!(sketch2.estimate() > 0.0);
    }

    sketch1.merge(&sketch2).unwrap();
    assert!(sketch1.estimate().is_finite());
});
