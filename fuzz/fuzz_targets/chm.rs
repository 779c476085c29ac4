#![no_main]
use chmkit::Archive;
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes should never panic, no matter how malformed: every
// failure mode is expected to surface as a typed `Error`, not a crash.
fuzz_target!(|data: &[u8]| {
    if let Ok(archive) = Archive::open_bytes(data.to_vec()) {
        if let Ok(files) = archive.content_files() {
            for unit in files.iter().take(16) {
                let _ = archive.retrieve(unit);
            }
        }
    }
});
