//! Presence change propagation.

pub mod notifier;

pub use notifier::PresenceNotifier;
