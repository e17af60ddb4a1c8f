#![no_main]

use carefront_errors::{ErrorKind, classify, classify_http_status};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<Value>(data) {
        let once = classify(value);
        assert_eq!(once.kind(), ErrorKind::Unknown);
        assert_eq!(classify(once.clone()), once);
    }

    if data.len() >= 2 {
        let status = u16::from_le_bytes([data[0], data[1]]);
        let message = std::str::from_utf8(&data[2..]).ok();
        let err = classify_http_status(status, message);
        assert_eq!(err.kind(), ErrorKind::from_status(status));
    }
});
