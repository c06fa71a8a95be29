//! Engine configuration
//!
//! Env-var driven with working defaults, loaded once at startup. Timing
//! values are milliseconds; monetary defaults are BB*100.

use std::time::Duration;

use crate::domain::value_objects::game_state::Street;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// All tunables for one engine process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Consecutive identical card signatures required before a decision.
    pub stability_required: u32,
    /// Minimum detected cards before the gate may fire; buttons alone never
    /// trigger a decision (partially animated cards misread too often).
    pub min_cards_for_action: usize,
    pub perception_timeout: Duration,
    pub cooldown_floor: Duration,
    pub cooldown_ceiling: Duration,
    /// Ceiling for one equity+decision computation.
    pub decision_timeout: Duration,

    /// Monte-Carlo sample counts per variant.
    pub plo5_sims: u64,
    pub plo6_sims: u64,
    /// River rewards extra accuracy: no runouts left, every sim is cheap.
    pub plo5_river_sims: u64,
    /// Worker threads for equity sampling; 0 means auto
    /// (`min(4, physical_cores / 2)`).
    pub equity_workers: usize,

    /// Requested vision rates per loop state, frames per second.
    pub waiting_fps: u32,
    pub perception_fps: u32,
    pub cooldown_fps: u32,

    /// Pixel height of the capture; detections below
    /// `frame_height * hero_region_ratio` are hero cards.
    pub frame_height: f32,
    pub hero_region_ratio: f32,

    /// Fixed seed for strategy noise and equity sampling; None = entropy.
    pub rng_seed: Option<u64>,

    pub database_url: String,
    pub port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stability_required: 3,
            min_cards_for_action: 2,
            perception_timeout: Duration::from_millis(2000),
            cooldown_floor: Duration::from_millis(1500),
            cooldown_ceiling: Duration::from_millis(5000),
            decision_timeout: Duration::from_millis(250),
            plo5_sims: 5000,
            plo6_sims: 3000,
            plo5_river_sims: 8000,
            equity_workers: 0,
            waiting_fps: 5,
            perception_fps: 30,
            cooldown_fps: 10,
            frame_height: 1080.0,
            hero_region_ratio: 0.62,
            rng_seed: None,
            database_url: "sqlite:./data/plopilot.db".to_string(),
            port: 9999,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stability_required: env_u32("STABILITY_REQUIRED", defaults.stability_required),
            min_cards_for_action: env_u64("MIN_CARDS_FOR_ACTION", 2) as usize,
            perception_timeout: Duration::from_millis(env_u64("PERCEPTION_TIMEOUT_MS", 2000)),
            cooldown_floor: Duration::from_millis(env_u64("COOLDOWN_FLOOR_MS", 1500)),
            cooldown_ceiling: Duration::from_millis(env_u64("COOLDOWN_CEILING_MS", 5000)),
            decision_timeout: Duration::from_millis(env_u64("DECISION_TIMEOUT_MS", 250)),
            plo5_sims: env_u64("PLO5_SIMS", defaults.plo5_sims),
            plo6_sims: env_u64("PLO6_SIMS", defaults.plo6_sims),
            plo5_river_sims: env_u64("PLO5_RIVER_SIMS", defaults.plo5_river_sims),
            equity_workers: env_u64("EQUITY_WORKERS", 0) as usize,
            waiting_fps: env_u32("WAITING_FPS", defaults.waiting_fps),
            perception_fps: env_u32("PERCEPTION_FPS", defaults.perception_fps),
            cooldown_fps: env_u32("COOLDOWN_FPS", defaults.cooldown_fps),
            frame_height: env_f32("FRAME_HEIGHT", defaults.frame_height),
            hero_region_ratio: env_f32("HERO_REGION_RATIO", defaults.hero_region_ratio),
            rng_seed: std::env::var("RNG_SEED").ok().and_then(|v| v.parse().ok()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| defaults.database_url.clone()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    /// Worker count for the equity pool.
    pub fn resolved_equity_workers(&self) -> usize {
        if self.equity_workers > 0 {
            return self.equity_workers;
        }
        (num_cpus::get_physical() / 2).clamp(1, 4)
    }

    /// Default sims for a hand size and street. PLO6 stays low because
    /// each sim costs 1.5x; a PLO5 river query gets the accuracy bump.
    pub fn sims_for_hand(&self, hand_size: usize, street: Street) -> u64 {
        if hand_size == 6 {
            return self.plo6_sims;
        }
        if street == Street::River {
            self.plo5_river_sims
        } else {
            self.plo5_sims
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.stability_required, 3);
        assert!(cfg.cooldown_floor < cfg.cooldown_ceiling);
        assert!(cfg.resolved_equity_workers() >= 1);
        assert!(cfg.resolved_equity_workers() <= 4);
        assert_eq!(cfg.sims_for_hand(5, Street::Flop), 5000);
        assert_eq!(cfg.sims_for_hand(5, Street::River), 8000);
        assert_eq!(cfg.sims_for_hand(6, Street::River), 3000);
    }
}
