#![no_main]

use builderize_core::{parse, print, transform, TransformConfig};
use libfuzzer_sys::fuzz_target;

// A transformed file must print, and its output must parse again.
fuzz_target!(|data: &[u8]| {
    let Some((&bound, rest)) = data.split_first() else {
        return;
    };
    let Ok(source) = std::str::from_utf8(rest) else {
        return;
    };
    let Ok(mut tree) = parse(source) else {
        return;
    };
    let config = TransformConfig {
        chunk_size: usize::from(bound).max(1),
    };
    transform(&mut tree, &config);
    if let Ok(output) = print(&tree) {
        assert!(parse(&output).is_ok(), "output does not parse:\n{output}");
    }
});
