use crate::web_socket::{
  FIN_MASK, FrameDecodeError, FrameHeader, MASK_MASK, MAX_HEADER_LEN, OP_CODE_MASK, OpCode,
  RSV_MASK, unmask,
};

/// Unmasked payload of a text frame sent by a client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedFrame {
  payload: Vec<u8>,
}

impl DecodedFrame {
  /// Frame's content.
  #[inline]
  pub fn payload(&self) -> &[u8] {
    &self.payload
  }

  /// Unwraps the payload.
  #[inline]
  pub fn into_payload(self) -> Vec<u8> {
    self.payload
  }

  /// Payload interpreted as a string. [`decode`] does not verify UTF-8, this method does.
  #[inline]
  pub fn text_payload(&self) -> Result<&str, core::str::Utf8Error> {
    core::str::from_utf8(&self.payload)
  }
}

/// Decodes exactly one masked, final, text frame that spans the whole `bytes`.
///
/// Non-text op codes and non-final frames are ignorable failures (see
/// [`FrameDecodeError::is_fatal`]).
#[inline]
pub fn decode(bytes: &[u8]) -> Result<DecodedFrame, FrameDecodeError> {
  let [first, second, ..] = bytes else {
    return Err(FrameDecodeError::Truncated);
  };
  let op_code = OpCode::try_from(first & OP_CODE_MASK)?;
  if !op_code.is_text() {
    return Err(FrameDecodeError::UnsupportedOpcode { provided: op_code.into() });
  }
  if first & RSV_MASK != 0 {
    return Err(FrameDecodeError::ReservedBitsAreNotZero);
  }
  if first & FIN_MASK == 0 {
    return Err(FrameDecodeError::Fragmented);
  }
  if second & MASK_MASK == 0 {
    return Err(FrameDecodeError::MissingMask);
  }
  let header = FrameHeader::parse(bytes).ok_or(FrameDecodeError::Truncated)?;
  let Some(mask) = header.mask() else {
    return Err(FrameDecodeError::MissingMask);
  };
  let payload = bytes.get(header.header_len()..).unwrap_or_default();
  if u64::try_from(payload.len()).ok() != Some(header.payload_len()) {
    return Err(FrameDecodeError::LengthMismatch {
      declared: header.payload_len(),
      received: payload.len(),
    });
  }
  let mut payload = payload.to_vec();
  unmask(&mut payload, mask);
  Ok(DecodedFrame { payload })
}

/// Server frame: final, text and unmasked.
#[inline]
pub fn encode(payload: &[u8]) -> Vec<u8> {
  encode_with_mask(payload, None)
}

/// Client frame: final, text and masked with `mask`.
#[inline]
pub fn encode_masked(payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
  encode_with_mask(payload, Some(mask))
}

/// Total length of the frame that starts at `bytes`, header included.
///
/// Returns `None` while the header is incomplete and an error if the declared payload exceeds
/// `max_payload_len`.
#[inline]
pub fn frame_len(bytes: &[u8], max_payload_len: usize) -> Result<Option<usize>, FrameDecodeError> {
  let Some(header) = FrameHeader::parse(bytes) else {
    return Ok(None);
  };
  let declared = header.payload_len();
  let err = FrameDecodeError::PayloadTooLarge { declared, max: max_payload_len };
  let payload_len = usize::try_from(declared).ok().filter(|el| *el <= max_payload_len).ok_or(err)?;
  Ok(Some(header.header_len().checked_add(payload_len).ok_or(err)?))
}

fn encode_with_mask(payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
  let mut header = [0; MAX_HEADER_LEN];
  let header_len = fill_header(&mut header, mask, payload.len());
  let mut rslt = Vec::with_capacity(header_len.wrapping_add(payload.len()));
  rslt.extend_from_slice(header.get(..header_len).unwrap_or_default());
  rslt.extend_from_slice(payload);
  if let Some(elem) = mask {
    unmask(rslt.get_mut(header_len..).unwrap_or_default(), elem);
  }
  rslt
}

fn fill_header(
  header: &mut [u8; MAX_HEADER_LEN],
  mask: Option<[u8; 4]>,
  payload_len: usize,
) -> usize {
  let first = FIN_MASK | u8::from(OpCode::Text);
  let mask_bit = if mask.is_some() { MASK_MASK } else { 0 };
  let len = match payload_len {
    0..=125 => {
      let [a, b, ..] = header;
      *a = first;
      *b = mask_bit | u8::try_from(payload_len).unwrap_or_default();
      2
    }
    126..=65535 => {
      let [len_c, len_d] = u16::try_from(payload_len).map(u16::to_be_bytes).unwrap_or_default();
      let [a, b, c, d, ..] = header;
      *a = first;
      *b = mask_bit | 126;
      *c = len_c;
      *d = len_d;
      4
    }
    _ => {
      let len = u64::try_from(payload_len).map(u64::to_be_bytes).unwrap_or_default();
      let [len_c, len_d, len_e, len_f, len_g, len_h, len_i, len_j] = len;
      let [a, b, c, d, e, f, g, h, i, j, ..] = header;
      *a = first;
      *b = mask_bit | 127;
      *c = len_c;
      *d = len_d;
      *e = len_e;
      *f = len_f;
      *g = len_g;
      *h = len_h;
      *i = len_i;
      *j = len_j;
      10
    }
  };
  let Some([m0, m1, m2, m3]) = mask else {
    return len;
  };
  if let Some([a, b, c, d]) = header.get_mut(len..len.wrapping_add(4)) {
    *a = m0;
    *b = m1;
    *c = m2;
    *d = m3;
  }
  len.wrapping_add(4)
}

#[cfg(all(feature = "_proptest", test))]
mod proptest {
  #[test_strategy::proptest]
  fn client_frames_are_decoded(data: Vec<u8>, mask: [u8; 4]) {
    let frame = crate::web_socket::decode(&crate::web_socket::encode_masked(&data, mask)).unwrap();
    proptest::prop_assert_eq!(frame.payload(), &data[..]);
  }

  #[test_strategy::proptest]
  fn decode_never_panics(data: Vec<u8>) {
    let _rslt = crate::web_socket::decode(&data);
  }
}

#[cfg(test)]
mod tests {
  use crate::web_socket::{FrameDecodeError, decode, encode, encode_masked, frame_len};

  const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

  fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|idx| b'a' + (idx % 26) as u8).collect()
  }

  #[test]
  fn client_frames_survive_every_length_form() {
    for len in [0, 1, 125, 126, 65535, 65536, 200000] {
      let data = payload(len);
      let frame = decode(&encode_masked(&data, MASK)).unwrap();
      assert_eq!(frame.payload(), &data[..], "length {len}");
    }
  }

  #[test]
  fn encode_writes_length_markers_at_boundaries() {
    let cases: [(usize, &[u8]); 6] = [
      (0, &[0x81, 0]),
      (125, &[0x81, 125]),
      (126, &[0x81, 126, 0, 126]),
      (65535, &[0x81, 126, 255, 255]),
      (65536, &[0x81, 127, 0, 0, 0, 0, 0, 1, 0, 0]),
      (200000, &[0x81, 127, 0, 0, 0, 0, 0, 3, 13, 64]),
    ];
    for (len, header) in cases {
      let data = payload(len);
      let bytes = encode(&data);
      assert_eq!(bytes.get(..header.len()), Some(header), "length {len}");
      assert_eq!(bytes.get(header.len()..), Some(&data[..]));
    }
  }

  #[test]
  fn encode_does_not_mask() {
    assert_eq!(encode(b"hi"), [0x81, 2, b'h', b'i']);
  }

  #[test]
  fn encode_masked_matches_rfc_example() {
    assert_eq!(encode_masked(b"Hello", MASK), [
      0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58
    ]);
  }

  #[test]
  fn short_inputs_are_truncated() {
    assert_eq!(decode(&[]), Err(FrameDecodeError::Truncated));
    assert_eq!(decode(&[0x81]), Err(FrameDecodeError::Truncated));
    assert_eq!(decode(&[0x81, 0xfe, 0, 200, 1, 2, 3]), Err(FrameDecodeError::Truncated));
    assert_eq!(
      decode(&[0x81, 0xff, 0, 0, 0, 0, 0, 1, 0, 0, 1, 2, 3]),
      Err(FrameDecodeError::Truncated)
    );
    assert_eq!(decode(&[0x81, 0x85, 1, 2]), Err(FrameDecodeError::Truncated));
  }

  #[test]
  fn mismatched_lengths_are_rejected() {
    let mut bytes = encode_masked(b"hello", MASK);
    bytes.push(0);
    assert_eq!(decode(&bytes), Err(FrameDecodeError::LengthMismatch { declared: 5, received: 6 }));
    let _ = bytes.pop();
    let _ = bytes.pop();
    assert_eq!(decode(&bytes), Err(FrameDecodeError::LengthMismatch { declared: 5, received: 4 }));
  }

  #[test]
  fn non_text_frames_are_ignorable() {
    let mut bytes = encode_masked(b"data", MASK);
    bytes[0] = 0x82;
    let err = decode(&bytes).unwrap_err();
    assert_eq!(err, FrameDecodeError::UnsupportedOpcode { provided: 2 });
    assert!(!err.is_fatal());
    bytes[0] = 0x01;
    assert_eq!(decode(&bytes), Err(FrameDecodeError::Fragmented));
    bytes[0] = 0x88;
    assert_eq!(decode(&bytes), Err(FrameDecodeError::UnsupportedOpcode { provided: 8 }));
  }

  #[test]
  fn protocol_violations_are_fatal() {
    let unmasked = decode(&encode(b"data")).unwrap_err();
    assert_eq!(unmasked, FrameDecodeError::MissingMask);
    assert!(unmasked.is_fatal());
    let mut bytes = encode_masked(b"data", MASK);
    bytes[0] = 0xc1;
    assert_eq!(decode(&bytes), Err(FrameDecodeError::ReservedBitsAreNotZero));
  }

  #[test]
  fn invalid_utf8_is_left_to_the_caller() {
    let frame = decode(&encode_masked(&[0x80], MASK)).unwrap();
    assert_eq!(frame.payload(), &[0x80]);
    assert!(frame.text_payload().is_err());
  }

  #[test]
  fn frame_len_waits_for_the_whole_header() {
    let bytes = encode_masked(&payload(300), MASK);
    assert_eq!(frame_len(&bytes[..1], 1024), Ok(None));
    assert_eq!(frame_len(&bytes[..7], 1024), Ok(None));
    assert_eq!(frame_len(&bytes[..8], 1024), Ok(Some(308)));
    assert_eq!(frame_len(&bytes, 1024), Ok(Some(308)));
  }

  #[test]
  fn frame_len_only_looks_at_the_first_frame() {
    let mut bytes = encode_masked(b"first", MASK);
    bytes.extend_from_slice(&encode_masked(b"second", MASK));
    let len = frame_len(&bytes, 1024).unwrap().unwrap();
    assert_eq!(decode(&bytes[..len]).unwrap().payload(), b"first");
    assert_eq!(decode(&bytes[len..]).unwrap().payload(), b"second");
  }

  #[test]
  fn frame_len_enforces_the_threshold() {
    let bytes = encode_masked(&payload(300), MASK);
    assert_eq!(
      frame_len(&bytes, 299),
      Err(FrameDecodeError::PayloadTooLarge { declared: 300, max: 299 })
    );
    let huge = [0x81, 0x7f, 255, 255, 255, 255, 255, 255, 255, 255];
    assert!(frame_len(&huge, usize::MAX).is_err());
  }
}
