//! Offline degradation
//!
//! Decides which cycle actually plays when the scheduled one is not
//! available, falling back through four levels of decreasing fidelity:
//!
//! 1. `normal` - the scheduled cycle, when it is cached
//! 2. `belt-only` - a random cached cycle, avoiding recent history
//! 3. `use-phrases` - a random cached cycle from the mastered pool, if one is wired in
//! 4. `repeat` - the last cycle that played successfully
//!
//! Once anything has been cached or played, a cycle is always produced.
//! Nothing is produced only on a first-ever session with no cached content.

use crate::content::{CycleCache, MasteredPool};
use cycle_common::events::{DegradationLevel, EventBus, PlayerEvent};
use cycle_common::{time, Cycle, PlayerConfig};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Degradation bookkeeping
///
/// Scoped to the controlling session; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct DegradationState {
    pub level: DegradationLevel,
    /// Most recent cycle that completed all phases
    pub last_played: Option<Cycle>,
    /// Last N played identifiers, oldest first
    pub recent_ids: VecDeque<String>,
    /// Cycles confirmed cached at the last refresh
    pub cached_pool: Vec<Cycle>,
}

/// Offline degradation controller
pub struct DegradationController {
    cache: Arc<dyn CycleCache>,
    mastered: Option<Arc<dyn MasteredPool>>,
    events: EventBus,
    recent_avoid_count: usize,
    stream_uncached_when_online: bool,
    online: bool,
    state: DegradationState,
    rng: StdRng,
}

impl DegradationController {
    pub fn new(cache: Arc<dyn CycleCache>, events: EventBus, config: &PlayerConfig) -> Self {
        Self {
            cache,
            mastered: None,
            events,
            recent_avoid_count: config.recent_avoid_count,
            stream_uncached_when_online: config.stream_uncached_when_online,
            online: true,
            state: DegradationState::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Wire in the mastered-content pool for the `use-phrases` level
    pub fn with_mastered_pool(mut self, pool: Arc<dyn MasteredPool>) -> Self {
        self.mastered = Some(pool);
        self
    }

    /// Deterministic random picks
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Mirror the platform connectivity signal
    pub fn set_online(&mut self, online: bool) {
        if self.online == online {
            return;
        }
        self.online = online;
        info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        self.events.emit_lossy(PlayerEvent::ConnectivityChanged {
            online,
            timestamp: time::now(),
        });
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Recompute the cached pool from the catalog
    ///
    /// Explicit and caller-triggered; the pool may go stale between refreshes.
    /// Returns the new pool size.
    pub fn refresh_cached_pool(&mut self) -> usize {
        let cache = Arc::clone(&self.cache);
        self.state.cached_pool = cache
            .cached_cycles()
            .into_iter()
            .filter(|cycle| cache.is_cycle_cached(cycle))
            .collect();
        debug!("Cached pool refreshed: {} cycles", self.state.cached_pool.len());
        self.state.cached_pool.len()
    }

    /// Pick the cycle that should actually play
    ///
    /// Returns None only when nothing has ever been cached or played.
    pub fn next_playable_cycle(&mut self, scheduled: Option<&Cycle>) -> Option<Cycle> {
        // Level 1: scheduled cycle, admitted by cache presence
        if let Some(cycle) = scheduled {
            if self.cache.is_cycle_cached(cycle) {
                self.set_level(DegradationLevel::Normal);
                return Some(cycle.clone());
            }
            if self.online && self.stream_uncached_when_online {
                debug!("Streaming uncached cycle {}", cycle.id);
                self.set_level(DegradationLevel::Normal);
                return Some(cycle.clone());
            }
            debug!("Scheduled cycle {} is not cached", cycle.id);
        }

        // Level 2: cached pool
        if let Some(cycle) = pick(&self.state.cached_pool, &self.state.recent_ids, &mut self.rng) {
            self.set_level(DegradationLevel::BeltOnly);
            return Some(cycle);
        }

        // Level 3: mastered content, when wired in
        if let Some(pool) = &self.mastered {
            let mastered: Vec<Cycle> = pool
                .mastered_cycles()
                .into_iter()
                .filter(|cycle| self.cache.is_cycle_cached(cycle))
                .collect();
            if let Some(cycle) = pick(&mastered, &self.state.recent_ids, &mut self.rng) {
                self.set_level(DegradationLevel::UsePhrases);
                return Some(cycle);
            }
        }

        // Level 4: repeat the last successful cycle
        if let Some(cycle) = self.state.last_played.clone() {
            self.set_level(DegradationLevel::Repeat);
            return Some(cycle);
        }

        warn!(
            "No playable cycle: nothing cached and nothing played yet ({})",
            if self.online { "online" } else { "offline" }
        );
        // Nothing plays: clear any earlier notice
        self.set_level(DegradationLevel::Normal);
        None
    }

    /// Record a cycle that completed all phases
    ///
    /// Call only after the player reports success. Always clears degradation.
    pub fn mark_cycle_as_played(&mut self, cycle: &Cycle) {
        self.state.last_played = Some(cycle.clone());
        self.state.recent_ids.push_back(cycle.id.clone());
        while self.state.recent_ids.len() > self.recent_avoid_count {
            self.state.recent_ids.pop_front();
        }
        self.set_level(DegradationLevel::Normal);
    }

    pub fn degradation_level(&self) -> DegradationLevel {
        self.state.level
    }

    /// Learner-facing status, None while playing scheduled content
    pub fn degradation_message(&self) -> Option<&'static str> {
        self.state.level.user_message()
    }

    pub fn last_played_cycle(&self) -> Option<&Cycle> {
        self.state.last_played.as_ref()
    }

    pub fn recent_item_ids(&self) -> &VecDeque<String> {
        &self.state.recent_ids
    }

    pub fn cached_pool(&self) -> &[Cycle] {
        &self.state.cached_pool
    }

    pub fn state(&self) -> &DegradationState {
        &self.state
    }

    fn set_level(&mut self, level: DegradationLevel) {
        let old_level = self.state.level;
        if old_level == level {
            return;
        }
        self.state.level = level;

        if level == DegradationLevel::Normal {
            info!("Degradation cleared ({} -> normal)", old_level);
        } else {
            warn!("Degraded playback: {} -> {}", old_level, level);
        }
        self.events.emit_lossy(PlayerEvent::DegradationChanged {
            old_level,
            new_level: level,
            message: level.user_message().map(str::to_string),
            timestamp: time::now(),
        });
    }
}

/// Uniform pick, excluding recent ids whenever a non-recent option exists
fn pick(pool: &[Cycle], recent: &VecDeque<String>, rng: &mut StdRng) -> Option<Cycle> {
    let fresh: Vec<&Cycle> = pool.iter().filter(|c| !recent.contains(&c.id)).collect();
    if fresh.is_empty() {
        pool.choose(rng).cloned()
    } else {
        fresh.choose(rng).map(|c| (*c).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StaticCatalog;
    use std::collections::HashSet;

    fn cycles(count: usize) -> Vec<Cycle> {
        (0..count)
            .map(|i| Cycle::new(format!("c{}", i), format!("k{}", i), format!("a{}", i), format!("b{}", i), 0))
            .collect()
    }

    fn controller(catalog: Arc<StaticCatalog>, recent_avoid_count: usize) -> DegradationController {
        let config = PlayerConfig {
            recent_avoid_count,
            ..PlayerConfig::default()
        };
        DegradationController::new(catalog, EventBus::new(100), &config).with_seed(7)
    }

    #[test]
    fn test_cached_scheduled_cycle_plays_normally() {
        let all = cycles(3);
        let catalog = Arc::new(StaticCatalog::fully_cached(all.clone()));
        let mut controller = controller(catalog, 10);
        controller.set_online(false);

        let picked = controller.next_playable_cycle(Some(&all[1])).unwrap();
        assert_eq!(picked.id, "c1");
        assert_eq!(controller.degradation_level(), DegradationLevel::Normal);
        assert!(controller.degradation_message().is_none());
    }

    #[test]
    fn test_uncached_while_online_is_still_a_miss() {
        let all = cycles(3);
        let catalog = Arc::new(StaticCatalog::new(all.clone()));
        catalog.set_cached("c2", true);
        let mut controller = controller(catalog, 10);
        controller.refresh_cached_pool();
        assert!(controller.is_online());

        let picked = controller.next_playable_cycle(Some(&all[0])).unwrap();
        assert_eq!(picked.id, "c2");
        assert_eq!(controller.degradation_level(), DegradationLevel::BeltOnly);
        assert_eq!(
            controller.degradation_message(),
            Some("Playing from your offline library")
        );
    }

    #[test]
    fn test_streaming_admits_uncached_when_enabled() {
        let all = cycles(2);
        let catalog = Arc::new(StaticCatalog::new(all.clone()));
        let config = PlayerConfig {
            stream_uncached_when_online: true,
            ..PlayerConfig::default()
        };
        let mut controller = DegradationController::new(catalog, EventBus::new(10), &config);

        assert_eq!(controller.next_playable_cycle(Some(&all[0])).unwrap().id, "c0");
        assert_eq!(controller.degradation_level(), DegradationLevel::Normal);

        controller.set_online(false);
        assert!(controller.next_playable_cycle(Some(&all[0])).is_none());
    }

    #[test]
    fn test_offline_empty_pool_no_history_returns_none() {
        let catalog = Arc::new(StaticCatalog::new(cycles(3)));
        let mut controller = controller(catalog, 10);
        controller.set_online(false);
        controller.refresh_cached_pool();

        let scheduled = cycles(1).remove(0);
        assert!(controller.next_playable_cycle(Some(&scheduled)).is_none());
        assert!(controller.next_playable_cycle(None).is_none());
        assert_eq!(controller.degradation_level(), DegradationLevel::Normal);
    }

    #[test]
    fn test_no_fallback_clears_stale_level() {
        let all = cycles(2);
        let catalog = Arc::new(StaticCatalog::new(all.clone()));
        catalog.set_cached("c1", true);
        let mut controller = controller(catalog.clone(), 10);
        controller.set_online(false);
        controller.refresh_cached_pool();

        let picked = controller.next_playable_cycle(Some(&all[0])).unwrap();
        assert_eq!(picked.id, "c1");
        assert_eq!(controller.degradation_level(), DegradationLevel::BeltOnly);

        // Substitute never completed, then the cache empties
        catalog.set_cached("c1", false);
        controller.refresh_cached_pool();

        assert!(controller.next_playable_cycle(Some(&all[0])).is_none());
        assert_eq!(controller.degradation_level(), DegradationLevel::Normal);
        assert!(controller.degradation_message().is_none());
    }

    #[test]
    fn test_pick_avoids_recent_history() {
        // 5 cached, 3 of them recently played: pick is one of the other 2
        let all = cycles(5);
        let catalog = Arc::new(StaticCatalog::fully_cached(all.clone()));
        let mut seen = HashSet::new();

        for seed in 0..64 {
            let mut controller = controller(catalog.clone(), 10).with_seed(seed);
            controller.refresh_cached_pool();
            for cycle in &all[..3] {
                controller.mark_cycle_as_played(cycle);
            }

            let picked = controller.next_playable_cycle(None).unwrap();
            assert!(picked.id == "c3" || picked.id == "c4", "picked {}", picked.id);
            seen.insert(picked.id);
        }

        // Both remaining candidates are reachable
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_recent_history_fallback_when_everything_recent() {
        let all = cycles(2);
        let catalog = Arc::new(StaticCatalog::fully_cached(all.clone()));
        let mut controller = controller(catalog, 10);
        controller.refresh_cached_pool();
        controller.mark_cycle_as_played(&all[0]);
        controller.mark_cycle_as_played(&all[1]);

        // All cached cycles are recent: still pick one rather than fail
        assert!(controller.next_playable_cycle(None).is_some());
        assert_eq!(controller.degradation_level(), DegradationLevel::BeltOnly);
    }

    #[test]
    fn test_ten_degraded_picks_do_not_repeat() {
        let all = cycles(15);
        let catalog = Arc::new(StaticCatalog::fully_cached(all));
        let mut controller = controller(catalog, 10);
        controller.refresh_cached_pool();

        let mut picked = Vec::new();
        for _ in 0..10 {
            let cycle = controller.next_playable_cycle(None).unwrap();
            assert!(!picked.contains(&cycle.id), "{} repeated", cycle.id);
            picked.push(cycle.id.clone());
            controller.mark_cycle_as_played(&cycle);
        }
    }

    #[test]
    fn test_recent_history_is_bounded_fifo() {
        let all = cycles(6);
        let catalog = Arc::new(StaticCatalog::new(all.clone()));
        let mut controller = controller(catalog, 3);

        for cycle in &all {
            controller.mark_cycle_as_played(cycle);
        }

        let recent: Vec<&str> = controller.recent_item_ids().iter().map(String::as_str).collect();
        assert_eq!(recent, vec!["c3", "c4", "c5"]);
        assert_eq!(controller.last_played_cycle().unwrap().id, "c5");
    }

    #[test]
    fn test_repeat_is_last_resort() {
        let all = cycles(2);
        let catalog = Arc::new(StaticCatalog::new(all.clone()));
        let mut controller = controller(catalog, 10);
        controller.set_online(false);
        controller.mark_cycle_as_played(&all[0]);

        let picked = controller.next_playable_cycle(Some(&all[1])).unwrap();
        assert_eq!(picked.id, "c0");
        assert_eq!(controller.degradation_level(), DegradationLevel::Repeat);
        assert!(controller.degradation_message().unwrap().contains("Repeating"));

        // A successful play clears degradation
        controller.mark_cycle_as_played(&picked);
        assert_eq!(controller.degradation_level(), DegradationLevel::Normal);
    }

    #[test]
    fn test_mastered_pool_used_before_repeat() {
        let all = cycles(3);
        let catalog = Arc::new(StaticCatalog::new(all.clone()));
        catalog.set_cached("c2", true);
        catalog.set_mastered("c1", true);
        catalog.set_mastered("c2", true);

        // Pool never refreshed, so level 2 has nothing to offer
        let mut controller = controller(catalog.clone(), 10).with_mastered_pool(catalog);
        controller.mark_cycle_as_played(&all[0]);

        let picked = controller.next_playable_cycle(Some(&all[0])).unwrap();
        assert_eq!(picked.id, "c2");
        assert_eq!(controller.degradation_level(), DegradationLevel::UsePhrases);
    }

    #[test]
    fn test_level_changes_are_broadcast() {
        let all = cycles(2);
        let catalog = Arc::new(StaticCatalog::new(all.clone()));
        let events = EventBus::new(10);
        let mut rx = events.subscribe();
        let mut controller =
            DegradationController::new(catalog, events, &PlayerConfig::default()).with_seed(1);

        controller.set_online(false);
        controller.mark_cycle_as_played(&all[0]);
        controller.next_playable_cycle(Some(&all[1]));

        assert!(matches!(
            rx.try_recv(),
            Ok(PlayerEvent::ConnectivityChanged { online: false, .. })
        ));
        match rx.try_recv() {
            Ok(PlayerEvent::DegradationChanged {
                old_level,
                new_level,
                message,
                ..
            }) => {
                assert_eq!(old_level, DegradationLevel::Normal);
                assert_eq!(new_level, DegradationLevel::Repeat);
                assert!(message.is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
