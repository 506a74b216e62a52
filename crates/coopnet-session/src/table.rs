//! The peer table: every open peer session, keyed by user id.
//!
//! The table owns its peers outright. Lookups return `Option`, so "no
//! such peer" is always distinguishable from a present peer and there is
//! no placeholder entry for a missing id.
//!
//! # Concurrency note
//!
//! `PeerTable` is a plain `BTreeMap` with no locking. It is owned by one
//! client and driven from one tick loop. The `BTreeMap` also gives a
//! stable iteration order (ascending user id), which keeps every run of
//! a test deterministic.

use std::collections::BTreeMap;

use coopnet_protocol::{MAX_FRAME_SIZE, UserId};
use coopnet_transport::Transport;

use crate::{Peer, SessionError};

/// Owns all peer sessions.
#[derive(Debug)]
pub struct PeerTable<T: Transport> {
    peers: BTreeMap<UserId, Peer<T>>,
    read_chunk: usize,
}

impl<T: Transport> PeerTable<T> {
    pub fn new() -> Self {
        Self {
            peers: BTreeMap::new(),
            read_chunk: MAX_FRAME_SIZE,
        }
    }

    /// Sets the per-poll read size for connections begun from now on.
    pub fn with_read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = size;
        self
    }

    /// Starts a session with `user_id` over an established transport.
    ///
    /// # Errors
    /// Returns [`SessionError::PeerExists`] if the user already has a
    /// session. The existing session is left alone and `transport` is
    /// closed, so nothing leaks.
    pub fn begin(
        &mut self,
        user_id: UserId,
        priority: u32,
        mut transport: T,
    ) -> Result<&mut Peer<T>, SessionError> {
        if self.peers.contains_key(&user_id) {
            let _ = transport.close();
            tracing::warn!(%user_id, "peer begin rejected, session exists");
            return Err(SessionError::PeerExists(user_id));
        }

        let peer = Peer::new(user_id, priority, transport, self.read_chunk);
        tracing::info!(%user_id, priority, count = self.peers.len() + 1, "peer begin");
        Ok(self.peers.entry(user_id).or_insert(peer))
    }

    /// Disconnects and removes the peer. Absent ids are a no-op.
    ///
    /// Returns `true` if a peer was removed.
    pub fn end(&mut self, user_id: UserId) -> bool {
        let Some(mut peer) = self.peers.remove(&user_id) else {
            return false;
        };
        peer.disconnect();
        tracing::info!(%user_id, count = self.peers.len(), "peer end");
        true
    }

    /// Disconnects and removes every peer.
    pub fn end_all(&mut self) {
        if self.peers.is_empty() {
            return;
        }
        for peer in self.peers.values_mut() {
            peer.disconnect();
        }
        self.peers.clear();
        tracing::info!(count = 0, "peer end all");
    }

    pub fn get(&self, user_id: UserId) -> Option<&Peer<T>> {
        self.peers.get(&user_id)
    }

    pub fn get_mut(&mut self, user_id: UserId) -> Option<&mut Peer<T>> {
        self.peers.get_mut(&user_id)
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.peers.contains_key(&user_id)
    }

    /// Sends `data` to every peer.
    ///
    /// Every peer is attempted even after a failure; successful sends are
    /// not rolled back.
    ///
    /// # Errors
    /// - [`SessionError::NoPeers`] if the table is empty.
    /// - [`SessionError::BroadcastFailed`] if any single send failed.
    pub fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        if self.peers.is_empty() {
            return Err(SessionError::NoPeers);
        }

        let mut failed = Vec::new();
        for (user_id, peer) in &mut self.peers {
            if let Err(e) = peer.send(data) {
                tracing::debug!(%user_id, error = %e, "peer send failed");
                failed.push(*user_id);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(SessionError::BroadcastFailed {
                failed,
                total: self.peers.len(),
            })
        }
    }

    /// Sends `data` to one peer.
    ///
    /// # Errors
    /// [`SessionError::PeerNotFound`] if the id is absent, or the send error.
    pub fn send_to(
        &mut self,
        user_id: UserId,
        data: &[u8],
    ) -> Result<(), SessionError> {
        self.peers
            .get_mut(&user_id)
            .ok_or(SessionError::PeerNotFound(user_id))?
            .send(data)
    }

    /// Snapshot of the current ids, in iteration order.
    ///
    /// Iterate over this (rather than the table) when the loop body may
    /// begin or end peers.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.peers.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer<T>> {
        self.peers.values()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl<T: Transport> Default for PeerTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
