#![no_main]

use libfuzzer_sys::fuzz_target;

// Arbitrary bytes → JSON → transpile() and, for trees, archive loading.
// Goal: no panics, even on malformed input.
fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = qarchive_core::transpile(&value, &Default::default());

        if let (Ok(container), Ok(schema)) = (
            qarchive_core::MemoryContainer::from_json(&value),
            qarchive_core::ArchiveSchema::qchem(),
        ) {
            let _ = qarchive_core::Archive::open(
                std::sync::Arc::new(container),
                &schema,
                &Default::default(),
            );
        }
    }
});
