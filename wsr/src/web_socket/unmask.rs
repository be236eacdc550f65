/// XORs `bytes` with `mask`, repeating the mask every four bytes. Applying it twice restores the
/// input so it both masks and unmasks.
#[inline]
pub fn unmask(bytes: &mut [u8], mask: [u8; 4]) {
  let word = u32::from_ne_bytes(mask);
  let (words, rest) = bytes.as_chunks_mut::<4>();
  for elem in words {
    *elem = (u32::from_ne_bytes(*elem) ^ word).to_ne_bytes();
  }
  for (elem, mask_byte) in rest.iter_mut().zip(mask) {
    *elem ^= mask_byte;
  }
}

#[cfg(all(feature = "_proptest", test))]
mod proptest {
  #[test_strategy::proptest]
  fn applying_twice_is_identity(data: Vec<u8>, mask: [u8; 4]) {
    let mut local = data.clone();
    crate::web_socket::unmask(&mut local, mask);
    crate::web_socket::unmask(&mut local, mask);
    proptest::prop_assert_eq!(local, data);
  }
}
