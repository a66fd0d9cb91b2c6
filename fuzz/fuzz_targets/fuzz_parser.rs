#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(tree) = builderize_core::parse(source) {
            let _ = builderize_core::print(&tree);
        }
    }
});
