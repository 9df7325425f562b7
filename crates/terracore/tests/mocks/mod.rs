//! Mock implementations of the messaging transport
//!
//! Lets workflow tests run without a Telegram connection and inspect every
//! outbound call afterwards.

pub mod mock_messenger;

#[allow(unused_imports)]
pub use mock_messenger::{Call, RecordingMessenger};
