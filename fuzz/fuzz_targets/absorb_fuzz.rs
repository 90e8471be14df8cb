//! Absorption fuzz target: feed arbitrary bytes to the JPEG grammar in both modes.
//! Absorption must not panic and must never report more bytes than it was given.
//! Build with: cargo fuzz run absorb_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let schema = match absorbdsl::formats::jpg::schema() {
        Ok(s) => s,
        Err(_) => return,
    };
    for mode in [absorbdsl::Mode::ABSORB, absorbdsl::Mode::MAIN] {
        let result = absorbdsl::absorb(&schema, data, &mode);
        assert!(result.consumed_size <= data.len());
        if let Some(tree) = &result.instance_tree {
            let _ = absorbdsl::generate(tree, &mode);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run absorb_fuzz");
}
