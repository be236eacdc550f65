use crate::{
  ConnId, Event, Registry, Reporter, RoomId, stream::StreamWriter, web_socket::encode,
};

/// Recipients of a broadcast.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BroadcastScope {
  /// Every registered connection.
  All,
  /// Members of a room.
  Room(RoomId),
}

/// Sends `payload` as a single text frame to every connection in `scope`, returning the number of
/// connections that received it.
///
/// Whitespace-only payloads are not sent. The frame is encoded once. A recipient whose write fails
/// is removed from `registry` and reported without affecting the others.
#[inline]
pub async fn broadcast<W>(
  registry: &Registry<W>,
  reporter: &dyn Reporter,
  sender: ConnId,
  payload: &str,
  scope: &BroadcastScope,
  include_sender: bool,
) -> usize
where
  W: StreamWriter,
{
  if payload.trim().is_empty() {
    return 0;
  }
  let frame = encode(payload.as_bytes());
  let recipients = match scope {
    BroadcastScope::All => registry.snapshot_all(),
    BroadcastScope::Room(room) => registry.snapshot_room(room),
  };
  let mut sent: usize = 0;
  for peer in recipients {
    if !include_sender && peer.id() == sender {
      continue;
    }
    match peer.write_all(&frame).await {
      Ok(()) => sent = sent.wrapping_add(1),
      Err(error) => {
        reporter.report(&Event::WriteFailed { conn_id: peer.id(), error: &error });
        let _peer = registry.remove(peer.id());
      }
    }
  }
  sent
}

#[cfg(test)]
mod tests {
  use crate::{
    BroadcastScope, ConnId, ConnMeta, Peer, Registry, RoomId, broadcast,
    reporter::tests::RecordingReporter, web_socket::encode,
  };
  use alloc::sync::Arc;
  use tokio::io::{AsyncReadExt, DuplexStream, duplex};

  fn registry_with(len: usize) -> (Registry<DuplexStream>, Vec<(ConnId, DuplexStream)>) {
    let registry = Registry::new();
    let mut clients = Vec::new();
    for _ in 0..len {
      let (client, server) = duplex(1024);
      let peer = Arc::new(Peer::new(registry.next_id(), ConnMeta::default(), server));
      registry.add(Arc::clone(&peer)).unwrap();
      clients.push((peer.id(), client));
    }
    (registry, clients)
  }

  async fn received(
    registry: Registry<DuplexStream>,
    clients: Vec<(ConnId, DuplexStream)>,
  ) -> Vec<Vec<u8>> {
    drop(registry.clear());
    drop(registry);
    let mut rslt = Vec::new();
    for (_, mut client) in clients {
      let mut bytes = Vec::new();
      let _ = client.read_to_end(&mut bytes).await.unwrap();
      rslt.push(bytes);
    }
    rslt
  }

  #[tokio::test]
  async fn blank_payloads_are_not_sent() {
    let (registry, clients) = registry_with(2);
    let sender = clients[0].0;
    for payload in ["", " ", "\t\r\n "] {
      assert_eq!(broadcast(&registry, &(), sender, payload, &BroadcastScope::All, true).await, 0);
    }
    assert!(received(registry, clients).await.iter().all(Vec::is_empty));
  }

  #[tokio::test]
  async fn every_client_receives_one_frame() {
    let (registry, clients) = registry_with(3);
    let sender = clients[0].0;
    assert_eq!(broadcast(&registry, &(), sender, "hello", &BroadcastScope::All, true).await, 3);
    for bytes in received(registry, clients).await {
      assert_eq!(bytes, encode(b"hello"));
    }
  }

  #[tokio::test]
  async fn sender_can_be_skipped() {
    let (registry, clients) = registry_with(3);
    let sender = clients[0].0;
    assert_eq!(broadcast(&registry, &(), sender, "hi", &BroadcastScope::All, false).await, 2);
    let bytes = received(registry, clients).await;
    assert!(bytes[0].is_empty());
    assert_eq!(bytes[1], encode(b"hi"));
    assert_eq!(bytes[2], encode(b"hi"));
  }

  #[tokio::test]
  async fn room_scope_only_reaches_members() {
    let (registry, clients) = registry_with(3);
    let room = RoomId::from("blue");
    registry.join_room(clients[0].0, room.clone()).unwrap();
    registry.join_room(clients[2].0, room.clone()).unwrap();
    let scope = BroadcastScope::Room(room);
    assert_eq!(broadcast(&registry, &(), clients[0].0, "x", &scope, true).await, 2);
    let bytes = received(registry, clients).await;
    assert_eq!(bytes[0], encode(b"x"));
    assert!(bytes[1].is_empty());
    assert_eq!(bytes[2], encode(b"x"));
  }

  #[tokio::test]
  async fn failed_writes_only_remove_the_recipient() {
    let (registry, mut clients) = registry_with(3);
    let peers = registry.snapshot_all();
    let (broken, _) = clients.remove(1);
    let reporter = RecordingReporter::default();
    let sender = clients[0].0;
    assert_eq!(broadcast(&registry, &reporter, sender, "msg", &BroadcastScope::All, true).await, 2);
    assert!(registry.get(broken).is_none());
    for peer in &peers {
      assert_eq!(peer.has_failed_write(), peer.id() == broken);
    }
    drop(peers);
    assert_eq!(registry.len(), 2);
    assert!(reporter.contains("WriteFailed"));
    for bytes in received(registry, clients).await {
      assert_eq!(bytes, encode(b"msg"));
    }
  }
}
