//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `log_sink`     | EventSink          | Serial log output            |
//! | `nvs`          | StoragePort        | NVS / in-memory store        |
//! | `source`       | ScheduleSource     | Offline / scripted transport |
//! | `time`         | TimeSource         | ESP32 wall clock / sim clock |

pub mod log_sink;
pub mod nvs;
pub mod source;
pub mod time;
