//! Fuzz target: `codec::decode`
//!
//! Feeds arbitrary flash contents to the schedule decoder for both kinds.
//! Anything accepted must re-encode to an image that decodes to the same
//! buffer.
//!
//! cargo fuzz run fuzz_schedule_codec

#![no_main]

use libfuzzer_sys::fuzz_target;
use schedule_engine::schedule::{ScheduleKind, codec};

fuzz_target!(|data: &[u8]| {
    let Some((&cap, image)) = data.split_first() else {
        return;
    };
    let max_entries = usize::from(cap % 32) + 1;

    for kind in [ScheduleKind::Interval, ScheduleKind::Instant] {
        if let Ok(buf) = codec::decode(kind, max_entries, image) {
            assert!(buf.len() <= max_entries);
            let encoded = codec::encode(&buf).expect("decoded buffer must encode");
            assert_eq!(encoded.len(), codec::capacity_bytes(kind, max_entries));
            assert_eq!(codec::decode(kind, max_entries, &encoded).ok(), Some(buf));
        }
    }
});
