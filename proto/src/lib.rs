//! Message types shared between a raft replica and its storage.
//!
//! The messages are prost structs, so every type can be encoded with
//! `prost::Message::encode_to_vec` and read back with `prost::Message::decode`.

pub use prost;

pub mod eraftpb {
    use bytes::Bytes;

    /// The kind of payload carried by an `Entry`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum EntryType {
        EntryNormal = 0,
        EntryConfChange = 1,
        EntryConfChangeV2 = 2,
    }

    /// A single raft log record.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Entry {
        #[prost(enumeration = "EntryType", tag = "1")]
        pub entry_type: i32,
        #[prost(uint64, tag = "2")]
        pub term: u64,
        #[prost(uint64, tag = "3")]
        pub index: u64,
        #[prost(bytes = "bytes", tag = "4")]
        pub data: Bytes,
        #[prost(bytes = "bytes", tag = "6")]
        pub context: Bytes,
        /// Deprecated, kept for wire compatibility.
        #[prost(bool, tag = "5")]
        pub sync_log: bool,
    }

    /// Voters and learners at the point a snapshot was taken.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ConfState {
        #[prost(uint64, repeated, tag = "1")]
        pub voters: Vec<u64>,
        #[prost(uint64, repeated, tag = "2")]
        pub learners: Vec<u64>,
        #[prost(uint64, repeated, tag = "3")]
        pub voters_outgoing: Vec<u64>,
        #[prost(uint64, repeated, tag = "4")]
        pub learners_next: Vec<u64>,
        #[prost(bool, tag = "5")]
        pub auto_leave: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SnapshotMetadata {
        /// The current `ConfState`.
        #[prost(message, optional, tag = "1")]
        pub conf_state: Option<ConfState>,
        /// The applied index.
        #[prost(uint64, tag = "2")]
        pub index: u64,
        /// The term of the applied index.
        #[prost(uint64, tag = "3")]
        pub term: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Snapshot {
        #[prost(bytes = "bytes", tag = "1")]
        pub data: Bytes,
        #[prost(message, optional, tag = "2")]
        pub metadata: Option<SnapshotMetadata>,
    }

    lazy_static::lazy_static! {
        static ref DEFAULT_SNAPSHOT_METADATA: SnapshotMetadata = SnapshotMetadata::default();
    }

    impl Entry {
        /// Creates a normal entry with an empty payload.
        pub fn new(index: u64, term: u64) -> Entry {
            Entry {
                index,
                term,
                ..Default::default()
            }
        }

        #[inline]
        pub fn get_index(&self) -> u64 {
            self.index
        }

        #[inline]
        pub fn get_term(&self) -> u64 {
            self.term
        }
    }

    impl Snapshot {
        /// Creates an empty-payload snapshot covering the log up to `index`.
        pub fn new(index: u64, term: u64) -> Snapshot {
            Snapshot {
                data: Bytes::new(),
                metadata: Some(SnapshotMetadata {
                    index,
                    term,
                    ..Default::default()
                }),
            }
        }

        /// Returns the metadata, or the default metadata if none was set.
        pub fn get_metadata(&self) -> &SnapshotMetadata {
            self.metadata
                .as_ref()
                .unwrap_or(&*DEFAULT_SNAPSHOT_METADATA)
        }

        pub fn mut_metadata(&mut self) -> &mut SnapshotMetadata {
            self.metadata.get_or_insert_with(SnapshotMetadata::default)
        }

        /// An empty snapshot is one that covers no log index at all.
        #[inline]
        pub fn is_empty(&self) -> bool {
            self.get_metadata().index == 0
        }
    }

    impl SnapshotMetadata {
        #[inline]
        pub fn get_index(&self) -> u64 {
            self.index
        }

        #[inline]
        pub fn get_term(&self) -> u64 {
            self.term
        }
    }
}

pub mod prelude {
    pub use crate::eraftpb::{ConfState, Entry, EntryType, Snapshot, SnapshotMetadata};
}

#[cfg(test)]
mod tests {
    use crate::eraftpb::{Entry, EntryType, Snapshot};
    use prost::Message;

    #[test]
    fn test_snapshot_metadata_defaults() {
        let snap = Snapshot::default();
        assert!(snap.is_empty());
        assert_eq!(snap.get_metadata().index, 0);

        let mut snap = Snapshot::new(6, 2);
        assert!(!snap.is_empty());
        snap.mut_metadata().term = 3;
        assert_eq!(snap.get_metadata().get_term(), 3);
    }

    #[test]
    fn test_entry_wire_format() {
        let mut e = Entry::new(5, 1);
        e.set_entry_type(EntryType::EntryConfChange);
        e.data = bytes::Bytes::from_static(b"payload");
        let buf = e.encode_to_vec();
        let decoded = Entry::decode(buf.as_slice()).unwrap();
        assert_eq!(decoded, e);
        assert_eq!(decoded.entry_type(), EntryType::EntryConfChange);
    }
}
