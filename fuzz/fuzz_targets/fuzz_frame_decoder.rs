//! Fuzz target for the frame decoder on arbitrary bytes.
//!
//! Pushes the input as one chunk and again one byte at a time. Neither may
//! panic, and the buffered text must stay within the configured frame limit.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rxhttp_client::{DecoderConfig, FrameDecoder};

const LIMIT: usize = 4096;

fuzz_target!(|data: &[u8]| {
    let config = DecoderConfig::new().with_max_frame_size(LIMIT);

    let mut whole = FrameDecoder::with_config(config);
    let _ = whole.push(data);
    assert!(whole.buffered().len() <= LIMIT);
    let _ = whole.finish();

    let mut bytewise = FrameDecoder::with_config(config);
    for byte in data.chunks(1) {
        let _ = bytewise.push(byte);
        assert!(bytewise.buffered().len() <= LIMIT);
    }
    let _ = bytewise.finish();
});
