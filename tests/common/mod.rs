//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod clips;
pub mod processors;

use clipflow::dataflow::{DataMap, Processor, OUTPUT};

/// Drive a connected, started processor until it finishes, collecting the
/// items of its `Output` port. Returns the items and the number of calls.
pub fn run_to_completion<P: Processor<i64> + ?Sized>(processor: &mut P, max_calls: usize) -> (Vec<i64>, usize) {
    let mut items = Vec::new();
    let mut calls = 0;
    while !processor.is_finished() {
        assert!(calls < max_calls, "processor did not finish within {} calls", max_calls);
        let mut output = processor.process(DataMap::new()).unwrap();
        if let Some(data) = output.remove(OUTPUT) {
            items.extend(data.items);
        }
        calls += 1;
    }
    (items, calls)
}
