#![no_main]

use carefront_errors::{ClassifiedError, LogRecord, RingBufferLogger};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let err = ClassifiedError::unknown(&*text).with_detail("note", &*text);

    let mut line = String::new();
    let _ = LogRecord::new(&err, None).write_to(&mut line);
    assert!(line.len() < 3 * 1024 + 256);

    let history = RingBufferLogger::new(4, 256);
    history.log(&err, &text);
    assert!(history.payload_bytes() <= 256);
});
