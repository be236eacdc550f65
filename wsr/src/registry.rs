mod peer;

pub use peer::{ConnMeta, Peer};

use alloc::{
  collections::{BTreeMap, BTreeSet},
  sync::Arc,
};
use core::{
  fmt::{Display, Formatter},
  sync::atomic::{AtomicU64, Ordering},
};
use std::sync::{Mutex, MutexGuard};

/// Opaque connection identity. Produced by [`Registry::next_id`] and never reused.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConnId(u64);

impl Display for ConnId {
  #[inline]
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "conn-{}", self.0)
  }
}

impl From<u64> for ConnId {
  #[inline]
  fn from(from: u64) -> Self {
    Self(from)
  }
}

impl From<ConnId> for u64 {
  #[inline]
  fn from(from: ConnId) -> Self {
    from.0
  }
}

/// Caller-supplied room key.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RoomId(String);

impl RoomId {
  /// String representation
  #[inline]
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for RoomId {
  #[inline]
  fn from(from: &str) -> Self {
    Self(from.into())
  }
}

impl From<String> for RoomId {
  #[inline]
  fn from(from: String) -> Self {
    Self(from)
  }
}

/// Registry errors
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegistryError {
  /// The identity is already registered. Existing entries are never overwritten.
  DuplicateIdentity(ConnId),
  /// The identity is not registered.
  UnknownConnection(ConnId),
}

#[derive(Debug)]
struct Entry<W> {
  peer: Arc<Peer<W>>,
  room: Option<RoomId>,
}

#[derive(Debug)]
struct Inner<W> {
  entries: BTreeMap<ConnId, Entry<W>>,
  rooms: BTreeMap<RoomId, BTreeSet<ConnId>>,
}

/// Live connections and their room memberships.
///
/// A connection is present iff its state is `Open`. Every mutation happens under a single lock
/// and every query returns an owned snapshot.
#[derive(Debug)]
pub struct Registry<W> {
  inner: Mutex<Inner<W>>,
  next_id: AtomicU64,
}

impl<W> Registry<W> {
  /// Empty instance
  #[inline]
  pub const fn new() -> Self {
    Self {
      inner: Mutex::new(Inner { entries: BTreeMap::new(), rooms: BTreeMap::new() }),
      next_id: AtomicU64::new(1),
    }
  }

  /// Registers `peer` and marks it as open.
  #[inline]
  pub fn add(&self, peer: Arc<Peer<W>>) -> Result<(), RegistryError> {
    let id = peer.id();
    let mut inner = self.lock();
    if inner.entries.contains_key(&id) || peer.state().is_closed() {
      return Err(RegistryError::DuplicateIdentity(id));
    }
    peer.mark_open();
    let _prev = inner.entries.insert(id, Entry { peer, room: None });
    Ok(())
  }

  /// Removes every connection, returning them. Each one is marked as closed.
  #[inline]
  pub fn clear(&self) -> Vec<Arc<Peer<W>>> {
    let mut inner = self.lock();
    inner.rooms.clear();
    let entries = core::mem::take(&mut inner.entries);
    drop(inner);
    entries
      .into_values()
      .map(|entry| {
        entry.peer.mark_closed();
        entry.peer
      })
      .collect()
  }

  /// Registered connection.
  #[inline]
  pub fn get(&self, id: ConnId) -> Option<Arc<Peer<W>>> {
    self.lock().entries.get(&id).map(|entry| Arc::clone(&entry.peer))
  }

  /// Whether there are no registered connections.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.lock().entries.is_empty()
  }

  /// Places `id` into `room`, creating it if needed. A connection belongs to at most one room so
  /// a previous membership is dropped.
  #[inline]
  pub fn join_room(&self, id: ConnId, room: RoomId) -> Result<(), RegistryError> {
    let mut inner = self.lock();
    let Inner { entries, rooms } = &mut *inner;
    let entry = entries.get_mut(&id).ok_or(RegistryError::UnknownConnection(id))?;
    if entry.room.as_ref() == Some(&room) {
      return Ok(());
    }
    if let Some(prev) = entry.room.take() {
      leave(rooms, &prev, id);
    }
    let _is_new = rooms.entry(room.clone()).or_default().insert(id);
    entry.room = Some(room);
    Ok(())
  }

  /// Number of registered connections.
  #[inline]
  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  /// Issues a fresh identity.
  #[inline]
  pub fn next_id(&self) -> ConnId {
    ConnId(self.next_id.fetch_add(1, Ordering::Relaxed))
  }

  /// Removes `id`, marking it as closed. Returns `None` if `id` was not registered, which makes
  /// repeated removals harmless.
  #[inline]
  pub fn remove(&self, id: ConnId) -> Option<Arc<Peer<W>>> {
    let mut inner = self.lock();
    let Inner { entries, rooms } = &mut *inner;
    let entry = entries.remove(&id)?;
    if let Some(room) = &entry.room {
      leave(rooms, room, id);
    }
    drop(inner);
    entry.peer.mark_closed();
    Some(entry.peer)
  }

  /// Number of members of `room`.
  #[inline]
  pub fn room_len(&self, room: &RoomId) -> usize {
    self.lock().rooms.get(room).map_or(0, BTreeSet::len)
  }

  /// Room of `id`, if any.
  #[inline]
  pub fn room_of(&self, id: ConnId) -> Option<RoomId> {
    self.lock().entries.get(&id)?.room.clone()
  }

  /// Number of non-empty rooms.
  #[inline]
  pub fn rooms_len(&self) -> usize {
    self.lock().rooms.len()
  }

  /// Every registered connection at the time of the call.
  #[inline]
  pub fn snapshot_all(&self) -> Vec<Arc<Peer<W>>> {
    self.lock().entries.values().map(|entry| Arc::clone(&entry.peer)).collect()
  }

  /// Members of `room` at the time of the call.
  #[inline]
  pub fn snapshot_room(&self, room: &RoomId) -> Vec<Arc<Peer<W>>> {
    let inner = self.lock();
    let Some(members) = inner.rooms.get(room) else {
      return Vec::new();
    };
    members.iter().filter_map(|id| inner.entries.get(id)).map(|el| Arc::clone(&el.peer)).collect()
  }

  fn lock(&self) -> MutexGuard<'_, Inner<W>> {
    crate::misc::lock(&self.inner)
  }
}

impl<W> Default for Registry<W> {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

fn leave(rooms: &mut BTreeMap<RoomId, BTreeSet<ConnId>>, room: &RoomId, id: ConnId) {
  let Some(members) = rooms.get_mut(room) else {
    return;
  };
  let _was_present = members.remove(&id);
  if members.is_empty() {
    let _members = rooms.remove(room);
  }
}

#[cfg(test)]
mod tests {
  use crate::{ConnMeta, Peer, Registry, RegistryError, RoomId, misc::ConnectionState};
  use alloc::sync::Arc;
  use core::time::Duration;

  fn peer(registry: &Registry<()>) -> Arc<Peer<()>> {
    Arc::new(Peer::new(registry.next_id(), ConnMeta::default(), ()))
  }

  #[test]
  fn identities_are_never_reused() {
    let registry = Registry::<()>::new();
    let first = registry.next_id();
    let _ = registry.remove(first);
    let second = registry.next_id();
    assert!(second > first);
  }

  #[test]
  fn add_opens_and_rejects_duplicates() {
    let registry = Registry::new();
    let elem = peer(&registry);
    assert_eq!(elem.state(), ConnectionState::Connecting);
    registry.add(Arc::clone(&elem)).unwrap();
    assert_eq!(elem.state(), ConnectionState::Open);
    let duplicate = Arc::new(Peer::new(elem.id(), ConnMeta::default(), ()));
    assert_eq!(registry.add(duplicate), Err(RegistryError::DuplicateIdentity(elem.id())));
    assert!(Arc::ptr_eq(&registry.get(elem.id()).unwrap(), &elem));
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn double_removal_is_a_no_op() {
    let registry = Registry::new();
    let elem = peer(&registry);
    registry.add(Arc::clone(&elem)).unwrap();
    assert!(registry.remove(elem.id()).is_some());
    assert_eq!(elem.state(), ConnectionState::Closed);
    assert!(registry.remove(elem.id()).is_none());
    assert!(registry.is_empty());
  }

  #[test]
  fn closed_peers_can_not_be_added_again() {
    let registry = Registry::new();
    let elem = peer(&registry);
    registry.add(Arc::clone(&elem)).unwrap();
    let _ = registry.remove(elem.id());
    assert!(registry.add(Arc::clone(&elem)).is_err());
    assert_eq!(elem.state(), ConnectionState::Closed);
  }

  #[test]
  fn join_requires_an_open_connection() {
    let registry = Registry::new();
    let elem = peer(&registry);
    let room = RoomId::from("lobby");
    assert_eq!(
      registry.join_room(elem.id(), room.clone()),
      Err(RegistryError::UnknownConnection(elem.id()))
    );
    registry.add(Arc::clone(&elem)).unwrap();
    registry.join_room(elem.id(), room.clone()).unwrap();
    assert_eq!(registry.room_of(elem.id()), Some(room.clone()));
    let _ = registry.remove(elem.id());
    assert!(registry.join_room(elem.id(), room).is_err());
  }

  #[test]
  fn joining_another_room_moves_the_connection() {
    let registry = Registry::new();
    let elem = peer(&registry);
    registry.add(Arc::clone(&elem)).unwrap();
    let (blue, red) = (RoomId::from("blue"), RoomId::from("red"));
    registry.join_room(elem.id(), blue.clone()).unwrap();
    registry.join_room(elem.id(), red.clone()).unwrap();
    assert_eq!(registry.room_len(&blue), 0);
    assert_eq!(registry.room_len(&red), 1);
    assert_eq!(registry.rooms_len(), 1);
  }

  #[test]
  fn rooms_vanish_with_their_last_member() {
    let registry = Registry::new();
    let (a, b) = (peer(&registry), peer(&registry));
    let room = RoomId::from("1");
    for elem in [&a, &b] {
      registry.add(Arc::clone(elem)).unwrap();
      registry.join_room(elem.id(), room.clone()).unwrap();
    }
    let _ = registry.remove(a.id());
    assert_eq!(registry.room_len(&room), 1);
    let _ = registry.remove(b.id());
    assert_eq!(registry.rooms_len(), 0);
  }

  #[test]
  fn snapshots_are_not_live_views() {
    let registry = Registry::new();
    let (a, b, c) = (peer(&registry), peer(&registry), peer(&registry));
    let room = RoomId::from("1");
    for elem in [&a, &b, &c] {
      registry.add(Arc::clone(elem)).unwrap();
    }
    registry.join_room(a.id(), room.clone()).unwrap();
    registry.join_room(b.id(), room.clone()).unwrap();
    let all = registry.snapshot_all();
    let members = registry.snapshot_room(&room);
    let _ = registry.remove(a.id());
    assert_eq!(all.len(), 3);
    assert_eq!(members.len(), 2);
    assert_eq!(registry.snapshot_all().len(), 2);
    assert_eq!(registry.snapshot_room(&room).len(), 1);
    assert!(registry.snapshot_room(&RoomId::from("unknown")).is_empty());
  }

  #[test]
  fn clear_closes_everything() {
    let registry = Registry::new();
    let (a, b) = (peer(&registry), peer(&registry));
    registry.add(Arc::clone(&a)).unwrap();
    registry.add(Arc::clone(&b)).unwrap();
    registry.join_room(a.id(), RoomId::from("1")).unwrap();
    assert_eq!(registry.clear().len(), 2);
    assert!(registry.is_empty());
    assert_eq!(registry.rooms_len(), 0);
    assert!(a.state().is_closed() && b.state().is_closed());
  }

  #[tokio::test]
  async fn removal_wakes_the_owner() {
    let registry = Arc::new(Registry::new());
    let elem = peer(&registry);
    registry.add(Arc::clone(&elem)).unwrap();
    let waiter = tokio::spawn({
      let local_elem = Arc::clone(&elem);
      async move { local_elem.closed().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let _ = registry.remove(elem.id());
    tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    tokio::time::timeout(Duration::from_secs(1), elem.closed()).await.unwrap();
  }
}
