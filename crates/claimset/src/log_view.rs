//! A [`GameView`] that renders notifications as `tracing` events.

use claimset_core::{GameView, ViewEvent};
use claimset_rules::FeatureRules;

/// Logs every view notification.
///
/// Score, winner, and placement events go out at `info`; marker and
/// freeze traffic at `debug`; countdown ticks at `trace`.
#[derive(Clone, Debug, Default)]
pub struct LogView {
    rules: Option<FeatureRules>,
}

impl LogView {
    /// A view that logs raw item IDs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A view that also logs each placed item's feature values.
    pub fn with_features(rules: FeatureRules) -> Self {
        Self { rules: Some(rules) }
    }
}

impl GameView for LogView {
    fn notify(&self, event: ViewEvent) {
        match event {
            ViewEvent::ItemPlaced { item, slot } => {
                match self.rules.as_ref().and_then(|r| r.item_features(item)) {
                    Some(features) => {
                        tracing::info!(%slot, %item, features = ?features.as_slice(), "placed")
                    }
                    None => tracing::info!(%slot, %item, "placed"),
                }
            }
            ViewEvent::ItemRemoved { slot } => tracing::info!(%slot, "removed"),
            ViewEvent::MarkerPlaced { agent, slot } => tracing::debug!(%agent, %slot, "marked"),
            ViewEvent::MarkerRemoved { agent, slot } => {
                tracing::debug!(%agent, %slot, "unmarked")
            }
            ViewEvent::MarkersCleared => tracing::debug!("all markers cleared"),
            ViewEvent::ScoreUpdated { agent, score } => tracing::info!(%agent, score, "score"),
            ViewEvent::FreezeUpdated { agent, remaining } => {
                tracing::debug!(%agent, remaining_ms = remaining.as_millis() as u64, "freeze")
            }
            ViewEvent::CountdownUpdated { millis, warning } => {
                tracing::trace!(millis, warning, "timer")
            }
            ViewEvent::WinnersAnnounced { winners } => {
                let winners: Vec<String> = winners.iter().map(ToString::to_string).collect();
                tracing::info!(winners = %winners.join(", "), "winners")
            }
        }
    }
}
