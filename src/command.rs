use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A key in the replicated key/value map.
pub type Key = Bytes;
/// A value in the replicated key/value map. An empty value marks a read.
pub type Value = Bytes;
/// Identifies the client that issued a [`Command`], used only to route the
/// eventual [`Reply`] — never dereferenced by the core itself.
pub type ClientId = u64;
/// A dense, non-negative position in the replicated log.
pub type Slot = i64;

/// A single client operation: a write (non-empty `value`) or a read (empty
/// `value`). Two commands are equal iff all four fields match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub key: Key,
    pub value: Value,
    pub client_id: ClientId,
    pub command_id: u64,
}

impl Command {
    pub fn write(key: impl Into<Key>, value: impl Into<Value>, client_id: ClientId, command_id: u64) -> Self {
        Command { key: key.into(), value: value.into(), client_id, command_id }
    }

    pub fn read(key: impl Into<Key>, client_id: ClientId, command_id: u64) -> Self {
        Command { key: key.into(), value: Value::new(), client_id, command_id }
    }

    pub fn is_read(&self) -> bool {
        self.value.is_empty()
    }
}

/// A command plus a weak, serializable reference to the client that issued
/// it. The reference is a [`ClientId`], not an owned reply channel: replying
/// is delegated to the `Transport` collaborator, which knows how to route a
/// `(client_id, Reply)` pair back over the network (§9 Design Notes — "a
/// relation, not ownership").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
}

impl Request {
    pub fn new(command: Command) -> Self {
        Request { command }
    }

    pub fn client_id(&self) -> ClientId {
        self.command.client_id
    }
}

/// Header names carried in [`Reply::properties`], consumed by the client-side
/// read modes (spec §6).
pub mod headers {
    pub const NODE_ID: &str = "ID";
    pub const SLOT: &str = "Slot";
    pub const KEY_SLOT: &str = "KeySlot";
    pub const KEY_STATUS: &str = "KeyStatus";
    pub const BALLOT: &str = "Ballot";
    pub const EXECUTE: &str = "Execute";
    pub const IN_PROGRESS: &str = "Inprogress";
    pub const HOLE: &str = "Hole";
}

/// The reply to a [`Command`], carrying protocol metadata as string
/// properties so it can ride over an HTTP-like reply surface (spec §6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub command: Command,
    pub value: Value,
    pub properties: BTreeMap<String, String>,
    pub timestamp: i64,
}

impl Reply {
    pub fn new(command: Command, value: Value) -> Self {
        Reply { command, value, properties: BTreeMap::new(), timestamp: 0 }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
