//! Small helpers shared by engine tests.

use std::thread;
use std::time::{Duration, Instant};

use claimset_core::ItemId;

/// `ItemId`s from raw numbers.
pub fn items(ids: &[u32]) -> Vec<ItemId> {
    ids.iter().copied().map(ItemId).collect()
}

/// Poll `cond` every millisecond until it holds or `deadline` passes.
/// Returns whether it held.
pub fn wait_until(deadline: Instant, mut cond: impl FnMut() -> bool) -> bool {
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}
