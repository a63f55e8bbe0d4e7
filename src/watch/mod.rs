//! When passes run: debounced mutation handling, scroll and navigation

mod debounce;
mod navigation;
mod watcher;

#[cfg(test)]
mod tests;

pub use debounce::Debouncer;
pub use navigation::{Location, NavigationDetector, PageActivation, PageChange, SharedLocation};
pub use watcher::{MutationRecord, MutationWatcher, WatchState, WatchStats};
