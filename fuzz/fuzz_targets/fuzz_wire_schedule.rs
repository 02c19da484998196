//! Fuzz target: hub payload parsing and candidate validation
//!
//! Arbitrary text goes through `CandidateSchedule::from_json` and, when it
//! parses, through `validate_candidate` against a one-channel config.
//! Neither step may panic.
//!
//! cargo fuzz run fuzz_wire_schedule

#![no_main]

use libfuzzer_sys::fuzz_target;
use schedule_engine::channel::ValueKind;
use schedule_engine::config::{ChannelConfig, EngineConfig};
use schedule_engine::sync::{CandidateSchedule, validate_candidate};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let config = EngineConfig {
        max_entries: 8,
        channels: vec![ChannelConfig::new("level", ValueKind::U16)],
        ..Default::default()
    };
    if let Ok(candidate) = CandidateSchedule::from_json(config.kind, text) {
        if let Ok(validated) = validate_candidate(&config, &candidate) {
            assert!(validated.buffer.len() <= config.max_entries);
            assert_eq!(validated.channel_images.len(), 1);
        }
    }
});
