#![no_main]
use libfuzzer_sys::fuzz_target;

// The raw interpreter: any byte buffer is a valid program, and the only
// failure signal is a panic or abort from inside the vector.
fuzz_target!(|data: &[u8]| {
    im_vector_ops::run_ops(data);
});
