#![no_main]

use libfuzzer_sys::fuzz_target;
use u2a_core::endpoint::Endpoint;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that parses must survive a display/parse round trip
    if let Ok(endpoint) = Endpoint::parse(input) {
        assert_ne!(endpoint.port(), 0);
        let reparsed = Endpoint::parse(&endpoint.to_string()).unwrap();
        assert_eq!(reparsed, endpoint);
    }
});
