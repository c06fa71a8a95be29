//! Opponent profile - per (player, variant) statistics
//!
//! Counters are monotonic and live in one row per `(player_id, variant)`;
//! the same player under PLO5 and PLO6 is two rows that are never merged.
//! Percentages are always derived on read so they reflect the current
//! sample size.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::game_state::Variant;

/// Hands required before a profile's statistics are believed.
pub const MIN_TRUST_HANDS: i64 = 50;

/// Categorical opponent style, assigned only to trusted profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Unknown,
    Whale,
    Fish,
    Nit,
    Lag,
    Tag,
    Reg,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Unknown => "unknown",
            Archetype::Whale => "whale",
            Archetype::Fish => "fish",
            Archetype::Nit => "nit",
            Archetype::Lag => "lag",
            Archetype::Tag => "tag",
            Archetype::Reg => "reg",
        }
    }
}

// Classification cutoffs per variant. PLO6 hands connect with far more
// boards, so its loose/whale lines sit higher.
struct ClassifyCutoffs {
    vpip_loose: f64,
    vpip_whale: f64,
    vpip_tight: f64,
}

impl ClassifyCutoffs {
    fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Plo5 => ClassifyCutoffs {
                vpip_loose: 30.0,
                vpip_whale: 55.0,
                vpip_tight: 18.0,
            },
            Variant::Plo6 => ClassifyCutoffs {
                vpip_loose: 40.0,
                vpip_whale: 70.0,
                vpip_tight: 25.0,
            },
        }
    }
}

/// One store row. All counters are lifetime totals for this variant only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentProfile {
    pub player_id: String,
    pub screen_name: String,
    pub variant: Variant,

    pub hands_played: i64,
    pub vpip_count: i64,
    pub pfr_count: i64,
    pub three_bet_count: i64,
    pub three_bet_opp: i64,
    pub cbet_count: i64,
    pub cbet_opp: i64,
    pub fold_to_cbet_count: i64,
    pub fold_to_cbet_opp: i64,
    pub wtsd_count: i64,
    pub wtsd_opp: i64,
    pub wsd_count: i64,
    pub total_bets: i64,
    pub total_raises: i64,
    pub total_calls: i64,
    pub bet_size_sum: f64,
    pub bet_size_count: i64,

    /// Unix timestamp of the last applied hand.
    pub last_seen: i64,
}

impl OpponentProfile {
    pub fn empty(player_id: &str, screen_name: &str, variant: Variant) -> Self {
        Self {
            player_id: player_id.to_string(),
            screen_name: screen_name.to_string(),
            variant,
            hands_played: 0,
            vpip_count: 0,
            pfr_count: 0,
            three_bet_count: 0,
            three_bet_opp: 0,
            cbet_count: 0,
            cbet_opp: 0,
            fold_to_cbet_count: 0,
            fold_to_cbet_opp: 0,
            wtsd_count: 0,
            wtsd_opp: 0,
            wsd_count: 0,
            total_bets: 0,
            total_raises: 0,
            total_calls: 0,
            bet_size_sum: 0.0,
            bet_size_count: 0,
            last_seen: 0,
        }
    }

    fn pct(count: i64, opportunities: i64) -> f64 {
        if opportunities <= 0 {
            return 0.0;
        }
        count as f64 / opportunities as f64 * 100.0
    }

    /// Voluntarily put money in pot, percent of hands.
    pub fn vpip_pct(&self) -> f64 {
        Self::pct(self.vpip_count, self.hands_played)
    }

    pub fn pfr_pct(&self) -> f64 {
        Self::pct(self.pfr_count, self.hands_played)
    }

    pub fn three_bet_pct(&self) -> f64 {
        Self::pct(self.three_bet_count, self.three_bet_opp)
    }

    pub fn cbet_pct(&self) -> f64 {
        Self::pct(self.cbet_count, self.cbet_opp)
    }

    pub fn fold_to_cbet_pct(&self) -> f64 {
        Self::pct(self.fold_to_cbet_count, self.fold_to_cbet_opp)
    }

    pub fn wtsd_pct(&self) -> f64 {
        Self::pct(self.wtsd_count, self.wtsd_opp)
    }

    pub fn wsd_pct(&self) -> f64 {
        Self::pct(self.wsd_count, self.wtsd_count)
    }

    /// (bets + raises) / calls. Capped when the player never calls.
    pub fn aggression_factor(&self) -> f64 {
        if self.total_calls == 0 {
            if self.total_bets + self.total_raises > 0 {
                return 99.0;
            }
            return 0.0;
        }
        (self.total_bets + self.total_raises) as f64 / self.total_calls as f64
    }

    /// Mean bet size as a fraction of pot.
    pub fn avg_bet_ratio(&self) -> f64 {
        if self.bet_size_count == 0 {
            return 0.0;
        }
        self.bet_size_sum / self.bet_size_count as f64
    }

    /// The trust gate: small samples produce wild percentages, so the
    /// strategy engine must treat untrusted profiles as absent.
    pub fn trusted(&self) -> bool {
        self.hands_played >= MIN_TRUST_HANDS
    }

    /// Classify this profile. Untrusted rows are always `Unknown`
    /// regardless of how extreme the small-sample stats look.
    pub fn archetype(&self) -> Archetype {
        if !self.trusted() {
            return Archetype::Unknown;
        }

        let cut = ClassifyCutoffs::for_variant(self.variant);
        let vpip = self.vpip_pct();
        let pfr = self.pfr_pct();
        let af = self.aggression_factor();

        if vpip >= cut.vpip_whale && af < 1.0 {
            return Archetype::Whale;
        }
        if vpip >= cut.vpip_loose {
            return if af >= 1.5 {
                Archetype::Lag
            } else {
                Archetype::Fish
            };
        }
        if vpip < cut.vpip_tight {
            return Archetype::Nit;
        }
        if pfr >= vpip * 0.6 && af >= 1.5 {
            return Archetype::Tag;
        }
        Archetype::Reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(variant: Variant, hands: i64, vpip: i64, pfr: i64) -> OpponentProfile {
        let mut p = OpponentProfile::empty("p1", "villain", variant);
        p.hands_played = hands;
        p.vpip_count = vpip;
        p.pfr_count = pfr;
        p
    }

    #[test]
    fn test_trust_gate_forces_unknown() {
        let mut p = profile(Variant::Plo5, MIN_TRUST_HANDS - 1, 48, 40);
        p.total_bets = 100;
        p.total_raises = 50;
        p.total_calls = 10;
        assert!(!p.trusted());
        assert_eq!(p.archetype(), Archetype::Unknown);

        p.hands_played = MIN_TRUST_HANDS;
        assert!(p.trusted());
        assert_ne!(p.archetype(), Archetype::Unknown);
    }

    #[test]
    fn test_variant_specific_cutoffs() {
        // 35% VPIP is loose in PLO5 but unremarkable in PLO6.
        let mut plo5 = profile(Variant::Plo5, 100, 35, 10);
        plo5.total_bets = 10;
        plo5.total_calls = 40;
        assert_eq!(plo5.archetype(), Archetype::Fish);

        let mut plo6 = profile(Variant::Plo6, 100, 35, 10);
        plo6.total_bets = 10;
        plo6.total_calls = 40;
        assert_ne!(plo6.archetype(), Archetype::Fish);
    }

    #[test]
    fn test_whale_requires_passivity() {
        let mut p = profile(Variant::Plo5, 200, 130, 20);
        p.total_bets = 5;
        p.total_calls = 100;
        assert_eq!(p.archetype(), Archetype::Whale);

        // Same VPIP but hyper-aggressive reads as a LAG instead.
        p.total_bets = 180;
        p.total_raises = 60;
        p.total_calls = 40;
        assert_eq!(p.archetype(), Archetype::Lag);
    }

    #[test]
    fn test_nit_detection() {
        let p = profile(Variant::Plo5, 300, 40, 30);
        assert!(p.vpip_pct() < 18.0);
        assert_eq!(p.archetype(), Archetype::Nit);
    }

    #[test]
    fn test_derived_percentages_track_counts() {
        let mut p = profile(Variant::Plo5, 200, 50, 25);
        p.three_bet_opp = 40;
        p.three_bet_count = 6;
        p.wtsd_opp = 60;
        p.wtsd_count = 30;
        p.wsd_count = 18;
        assert!((p.vpip_pct() - 25.0).abs() < 1e-9);
        assert!((p.three_bet_pct() - 15.0).abs() < 1e-9);
        assert!((p.wtsd_pct() - 50.0).abs() < 1e-9);
        assert!((p.wsd_pct() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggression_factor_edge_cases() {
        let mut p = profile(Variant::Plo6, 100, 0, 0);
        assert_eq!(p.aggression_factor(), 0.0);
        p.total_bets = 10;
        assert_eq!(p.aggression_factor(), 99.0);
        p.total_calls = 5;
        assert!((p.aggression_factor() - 2.0).abs() < 1e-9);
    }
}
