//! The unstable log of a raft replica.
//!
//! Entries and snapshots accepted by a replica live in [`Unstable`] until
//! storage confirms they are durable. The replica loop drives it like this:
//!
//! ```
//! use raft_unstable::{default_logger, EntryId, Unstable};
//! use raft_unstable::eraftpb::Entry;
//!
//! let mut unstable = Unstable::new(5, default_logger());
//! unstable.truncate_and_append(&[Entry::new(5, 1), Entry::new(6, 1)]);
//!
//! // Hand the pending batch to storage, then mark it as in flight.
//! let batch = unstable.next_entries().map(|ents| ents.to_vec());
//! assert_eq!(batch.map(|ents| ents.len()), Some(2));
//! unstable.accept_in_progress();
//! assert!(unstable.next_entries().is_none());
//!
//! // Storage reports the write as durable.
//! unstable.stable_to(EntryId::new(1, 6));
//! assert_eq!(unstable.offset(), 7);
//! assert!(unstable.entries().is_empty());
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate slog;

#[macro_use]
mod macros;

mod config;
mod errors;
mod log_unstable;
mod util;

pub use self::config::Config;
pub use self::errors::{Error, Result};
pub use self::log_unstable::{EntryId, Unstable};
pub use self::util::entry_approximate_size;
pub use raft_proto::eraftpb;

use slog::{Key, OwnedKVList, Serializer, KV};

/// A "prelude" for crates using the `raft-unstable` crate.
///
/// ```
/// use raft_unstable::prelude::*;
/// ```
pub mod prelude {
    pub use raft_proto::prelude::*;

    pub use crate::{Config, EntryId, Unstable};
}

/// A terminal logger filtered by `RUST_LOG`.
///
/// The root drain is built once per process. Each call returns a child logger tagged with
/// the current thread name, which is the test case name under `cargo test`.
#[cfg(any(test, feature = "default-logger"))]
pub fn default_logger() -> slog::Logger {
    use slog::Drain;
    use std::sync::{Mutex, OnceLock};

    static LOGGER: OnceLock<slog::Logger> = OnceLock::new();

    let logger = LOGGER.get_or_init(|| {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::CompactFormat::new(decorator).build();
        let drain = slog_envlogger::new(drain);
        slog::Logger::root(Mutex::new(drain).fuse(), o!())
    });
    if let Some(case) = std::thread::current()
        .name()
        .and_then(|v| v.split(':').last())
    {
        logger.new(o!("case" => case.to_string()))
    } else {
        logger.new(o!())
    }
}

#[doc(hidden)]
pub fn format_kv_list(kv_list: &OwnedKVList) -> String {
    struct StringSerializer {
        result: String,
    }

    impl Serializer for StringSerializer {
        fn emit_arguments(&mut self, key: Key, val: &std::fmt::Arguments) -> slog::Result {
            if !self.result.is_empty() {
                self.result += ", ";
            }
            self.result += &format!("{}: {}", key, val);
            Ok(())
        }
    }

    let args = format_args!("");
    let record = record!(slog::Level::Trace, "", &args, b!());
    let mut s = StringSerializer {
        result: String::new(),
    };
    // A `StringSerializer` never fails, an error here means an empty list.
    let _ = kv_list.serialize(&record, &mut s);
    s.result
}

#[cfg(test)]
mod test {
    use super::format_kv_list;

    #[test]
    fn test_format_kv_list() {
        let logger = slog::Logger::root(slog::Discard, o!());
        assert_eq!(format_kv_list(logger.list()), "");

        let logger = logger.new(o!("raft_id" => 1u64, "tag" => "unstable"));
        let s = format_kv_list(logger.list());
        assert!(s.contains("raft_id: 1"), "{}", s);
        assert!(s.contains("tag: unstable"), "{}", s);
        assert_eq!(s.matches(", ").count(), 1, "{}", s);
    }
}
