//! Integration test harness.

mod helpers;
mod message_test;
mod ws_test;
