#![no_main]
use libfuzzer_sys::fuzz_target;

use im_vector_ops::model::{run_reference_equivalence, ModelOp};

fuzz_target!(|ops: Vec<ModelOp>| { run_reference_equivalence(ops) });
