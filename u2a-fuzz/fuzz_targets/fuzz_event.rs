#![no_main]

use libfuzzer_sys::fuzz_target;
use u2a_core::event::Event;

fuzz_target!(|data: &[u8]| {
    // Arbitrary datagrams must never panic the decoder
    if let Ok(event) = Event::decode(data) {
        let encoded = event.encode().unwrap();
        assert!(encoded.is_ascii());
    }
});
