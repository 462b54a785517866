//! Claim resolution driven step by step on the calling thread.
//!
//! No agent threads run here: markers are toggled directly on the
//! shared grid and the arbiter is stepped by hand, so every interleaving
//! is fixed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use claimset_core::{AgentId, GameView, ItemId, Outcome, SlotId, ToggleError, ViewEvent};
use claimset_engine::{
    AgentKind, Arbiter, GameConfig, RoundState, SharedGrid, TimerMode, Toggle,
};
use claimset_test_utils::{items, ListedRules, RecordingView};

const A: AgentId = AgentId(0);
const B: AgentId = AgentId(1);
const C: AgentId = AgentId(2);

struct Harness {
    table: Arc<SharedGrid>,
    arbiter: Arbiter,
    view: Arc<RecordingView>,
}

fn config(pool_size: u32, grid_slots: u32, timer: TimerMode) -> GameConfig {
    GameConfig {
        agents: vec![AgentKind::Human; 3],
        claim_size: 3,
        pool_size,
        grid_slots,
        timer,
        point_freeze: Duration::from_secs(1),
        penalty_freeze: Duration::from_secs(3),
        placement_delay: Duration::ZERO,
        ..GameConfig::default()
    }
}

fn harness(config: &GameConfig, rules: ListedRules) -> Harness {
    let view = Arc::new(RecordingView::new());
    let table = Arc::new(SharedGrid::new(
        config.grid_slots,
        config.pool_size,
        config.agent_count(),
        config.claim_size,
        config.placement_delay,
        Arc::clone(&view) as Arc<dyn GameView>,
    ));
    let arbiter = Arbiter::new(Arc::clone(&table), Arc::new(rules), config);
    Harness {
        table,
        arbiter,
        view,
    }
}

/// Twelve items 0..12 placed in slots 0..12, valid triples {0,1,2} and {3,4,5}.
fn dealt_twelve() -> Harness {
    let config = config(12, 12, TimerMode::Disabled);
    let h = harness(&config, ListedRules::new(3, &[&[0, 1, 2], &[3, 4, 5]]));
    for s in 0..12 {
        h.table.place_item(ItemId(s), SlotId(s)).unwrap();
    }
    h
}

fn mark(table: &SharedGrid, agent: AgentId, slots: &[u32]) -> Toggle {
    let mut last = Toggle::Full;
    for &s in slots {
        last = table.toggle_marker(agent, SlotId(s)).unwrap();
    }
    last
}

// ── Scenario tests ───────────────────────────────────────────────

#[test]
fn valid_claim_scores_and_retires_items() {
    let mut h = dealt_twelve();
    assert_eq!(mark(&h.table, A, &[0, 1, 2]), Toggle::Claimed);

    assert_eq!(h.arbiter.resolve_pending(), 1);
    assert_eq!(h.table.pending_outcome(A), Some(Outcome::Point));
    assert_eq!(h.table.take_outcome(A), Some(Outcome::Point));
    assert_eq!(h.table.score(A), 1);

    h.table.with_grid(|g| {
        assert_eq!(g.retired(), items(&[0, 1, 2]).as_slice());
        for s in 0..3 {
            assert_eq!(g.item_at(SlotId(s)), None);
        }
        for i in 0..3 {
            assert!(!g.is_pooled(ItemId(i)));
        }
        assert!(g.is_consistent());
    });
    assert!(h.table.markers(A).is_empty());
    assert!(h.table.is_frozen(A));
    assert_eq!(
        h.view.count(|e| matches!(e, ViewEvent::ScoreUpdated { agent, score: 1 } if *agent == A)),
        1
    );
}

#[test]
fn invalid_claim_penalizes_without_touching_grid() {
    let mut h = dealt_twelve();
    let before = h.table.with_grid(|g| g.items_on_grid());
    mark(&h.table, A, &[0, 1, 3]);

    let resolved_at = Instant::now();
    h.arbiter.resolve_pending();
    assert_eq!(h.table.take_outcome(A), Some(Outcome::Penalty));
    assert_eq!(h.table.score(A), 0);

    let until = h.table.freeze_until(A).unwrap();
    assert!(until >= resolved_at + Duration::from_secs(3));
    assert!(until <= Instant::now() + Duration::from_secs(3));
    assert_eq!(h.table.with_grid(|g| g.items_on_grid()), before);
    assert_eq!(
        h.table.markers(A).as_slice(),
        &[SlotId(0), SlotId(1), SlotId(3)]
    );

    // Frozen: every marker mutation is refused.
    assert_eq!(
        h.table.toggle_marker(A, SlotId(0)),
        Err(ToggleError::Frozen { agent: A })
    );
    assert_eq!(
        h.table.toggle_marker(A, SlotId(7)),
        Err(ToggleError::Frozen { agent: A })
    );
    assert_eq!(h.table.markers(A).len(), 3);
}

#[test]
fn overlapping_later_claim_is_ruined() {
    let mut h = dealt_twelve();
    mark(&h.table, A, &[0, 1, 2]);
    mark(&h.table, B, &[0, 3, 4]);

    assert_eq!(h.arbiter.resolve_pending(), 2);
    assert_eq!(h.table.take_outcome(A), Some(Outcome::Point));
    assert_eq!(h.table.take_outcome(B), Some(Outcome::None));
    assert!(h.table.markers(B).is_empty());
    assert_eq!(h.table.score(B), 0);
    assert!(!h.table.is_frozen(B));
    assert_eq!(h.table.with_grid(|g| g.item_at(SlotId(0))), None);
}

#[test]
fn countdown_expiry_reshuffles_everything() {
    let config = config(
        12,
        12,
        TimerMode::Countdown {
            period: Duration::from_secs(1),
            warning: Duration::from_millis(200),
        },
    );
    let mut h = harness(&config, ListedRules::new(3, &[&[0, 1, 2]]));
    assert_eq!(h.arbiter.deal(), 12);
    mark(&h.table, A, &[0, 1]);
    mark(&h.table, C, &[5]);
    let deadline = h.arbiter.timer().deadline().unwrap();

    assert_eq!(h.arbiter.step(deadline), RoundState::Running);
    assert_eq!(h.arbiter.rounds(), 2);
    assert!(h.table.markers(A).is_empty());
    assert!(h.table.markers(C).is_empty());
    h.table.with_grid(|g| {
        assert!(g.retired().is_empty());
        assert_eq!(g.item_count(), 12);
        assert!(g.is_consistent());
    });
    assert_eq!(h.view.count(|e| *e == ViewEvent::MarkersCleared), 1);
    assert_eq!(
        h.view
            .count(|e| matches!(e, ViewEvent::ItemRemoved { .. })),
        12
    );
    assert!(h.arbiter.timer().deadline().unwrap() > deadline);
}

// ── Ordering tests ───────────────────────────────────────────────

#[test]
fn claims_resolve_in_enqueue_order() {
    let mut h = dealt_twelve();
    // B completes first, so B wins the contested triple.
    mark(&h.table, B, &[0, 1, 2]);
    mark(&h.table, A, &[2, 1, 0]);
    mark(&h.table, C, &[3, 4, 5]);

    assert_eq!(h.arbiter.resolve_pending(), 3);
    assert_eq!(h.table.take_outcome(B), Some(Outcome::Point));
    assert_eq!(h.table.take_outcome(A), Some(Outcome::None));
    assert_eq!(h.table.take_outcome(C), Some(Outcome::Point));
    assert_eq!(h.arbiter.claims_resolved(), 3);
}

#[test]
fn recompleting_while_queued_resolves_once() {
    let mut h = dealt_twelve();
    mark(&h.table, A, &[0, 1, 6]);
    assert_eq!(h.table.toggle_marker(A, SlotId(6)), Ok(Toggle::Removed));
    assert_eq!(h.table.toggle_marker(A, SlotId(2)), Ok(Toggle::Completed));

    assert_eq!(h.arbiter.resolve_pending(), 1);
    assert_eq!(h.table.take_outcome(A), Some(Outcome::Point));
    assert_eq!(h.arbiter.resolve_pending(), 0);
}

// ── Ruin tests ───────────────────────────────────────────────────

#[test]
fn removed_item_ruins_queued_claim() {
    let mut h = dealt_twelve();
    mark(&h.table, A, &[0, 1, 2]);
    h.table.remove_item(SlotId(1), false).unwrap();

    h.arbiter.resolve_pending();
    assert_eq!(h.table.take_outcome(A), Some(Outcome::None));
    assert!(h.table.markers(A).is_empty());
    assert_eq!(h.table.freeze_until(A), None);
    assert_eq!(h.table.with_grid(|g| g.item_count()), 11);
}

#[test]
fn refilled_slot_still_ruins_claim() {
    let mut h = dealt_twelve();
    mark(&h.table, A, &[3, 4, 5]);
    h.table.remove_item(SlotId(4), true).unwrap();
    h.table.remove_item(SlotId(11), false).unwrap();
    h.table.place_item(ItemId(11), SlotId(4)).unwrap();

    h.arbiter.resolve_pending();
    assert_eq!(h.table.take_outcome(A), Some(Outcome::None));
    assert_eq!(h.table.score(A), 0);
}

#[test]
fn unmarking_after_enqueue_ruins_claim() {
    let mut h = dealt_twelve();
    mark(&h.table, A, &[0, 1, 2]);
    assert_eq!(h.table.toggle_marker(A, SlotId(2)), Ok(Toggle::Removed));

    h.arbiter.resolve_pending();
    assert_eq!(h.table.take_outcome(A), Some(Outcome::None));
    assert!(h.table.markers(A).is_empty());
    assert_eq!(h.table.with_grid(|g| g.item_count()), 12);
}

#[test]
fn winning_claim_prunes_other_agents_stale_markers() {
    let mut h = dealt_twelve();
    mark(&h.table, B, &[2, 9]);
    mark(&h.table, A, &[0, 1, 2]);

    h.arbiter.resolve_pending();
    assert_eq!(h.table.markers(B).as_slice(), &[SlotId(9)]);
}

// ── Idempotence tests ────────────────────────────────────────────

#[test]
fn clearing_twice_changes_nothing() {
    let h = dealt_twelve();
    mark(&h.table, A, &[4, 5]);
    h.table.clear_markers(A);
    let events = h.view.events().len();
    h.table.clear_markers(A);
    assert!(h.table.markers(A).is_empty());
    assert_eq!(h.view.events().len(), events);
}

// ── Round and game end tests ─────────────────────────────────────

#[test]
fn last_claim_ends_the_game() {
    let mut h = dealt_twelve();
    mark(&h.table, A, &[0, 1, 2]);
    h.arbiter.resolve_pending();
    assert_eq!(h.arbiter.step(Instant::now()), RoundState::Running);
    mark(&h.table, B, &[3, 4, 5]);
    h.arbiter.resolve_pending();
    assert_eq!(h.arbiter.step(Instant::now()), RoundState::GameOver);
}

#[test]
fn deadline_free_mode_reshuffles_a_claimless_grid() {
    // Three slots; only {9, 10, 11} is valid, and it is not on the grid.
    let config = config(12, 3, TimerMode::Elapsed);
    let mut h = harness(&config, ListedRules::new(3, &[&[9, 10, 11]]));
    for s in 0..3 {
        h.table.place_item(ItemId(s), SlotId(s)).unwrap();
    }
    assert_eq!(h.arbiter.step(Instant::now()), RoundState::Running);
    assert_eq!(h.arbiter.rounds(), 2);
    assert!(h.view.count(|e| *e == ViewEvent::MarkersCleared) >= 1);
}

#[test]
fn required_claim_deal_places_the_only_claim() {
    let config = GameConfig {
        require_claim_on_deal: true,
        ..config(12, 3, TimerMode::Disabled)
    };
    let mut h = harness(&config, ListedRules::new(3, &[&[5, 7, 9]]));
    assert_eq!(h.arbiter.deal(), 3);
    let mut dealt = h.table.with_grid(|g| g.items_on_grid());
    dealt.sort();
    assert_eq!(dealt, items(&[5, 7, 9]));
}

#[test]
fn required_claim_deal_gives_up_when_pool_is_too_small() {
    let config = GameConfig {
        require_claim_on_deal: true,
        ..config(2, 3, TimerMode::Disabled)
    };
    let mut h = harness(&config, ListedRules::new(3, &[&[0, 1, 2]]));
    assert_eq!(h.arbiter.deal(), 2);
    assert_eq!(h.arbiter.step(Instant::now()), RoundState::GameOver);
}
