//! Decode

#![allow(
  // Does not matter
  clippy::unwrap_used
)]
#![no_main]

use wsr::web_socket::{decode, encode_masked, frame_len};

libfuzzer_sys::fuzz_target!(|data: &[u8]| {
    let _rslt = decode(data);
    let _rslt = frame_len(data, usize::MAX);
    let frame = decode(&encode_masked(data, [1, 2, 3, 4])).unwrap();
    assert_eq!(frame.payload(), data);
});
