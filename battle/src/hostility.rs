//! The hostile-targeting predicate.
//!
//! Combat only starts where at least two houses are mutually targetable.
//! House A targets house B when their stance or B's conduct justifies it;
//! engagement itself is also grounds, so a defender may always return
//! fire.

use std::collections::BTreeSet;

use ec4x_common::{DiplomaticStance, HouseId};

use crate::snapshot::{HouseForce, SystemCombat};

/// Facts about the system the predicate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Territory {
    /// Who controls the system (owns its colony), if anyone.
    pub controller: Option<HouseId>,
}

/// Whether `a` holds `b` as a valid combat target in this system.
pub fn targets(a: &HouseForce, b: &HouseForce, territory: Territory, engaged: bool) -> bool {
    if a.house == b.house {
        return false;
    }
    let stance = a
        .stances
        .get(&b.house)
        .copied()
        .unwrap_or(DiplomaticStance::Neutral);

    match stance {
        DiplomaticStance::Enemy => true,
        DiplomaticStance::Hostile => {
            // Hostile: provocative conduct in A's territory is enough.
            let in_a_territory = territory.controller == Some(a.house);
            engaged || (in_a_territory && b.fleets.iter().any(|f| f.provocative))
        }
        DiplomaticStance::Neutral => {
            // Neutral: only threatening conduct in A's controlled system.
            let in_a_territory = territory.controller == Some(a.house);
            engaged || (in_a_territory && b.fleets.iter().any(|f| f.threatening))
        }
    }
}

/// All pairs of hostile houses present, after closing over "B engaged A".
/// Targeting is made symmetric: being shot at is grounds to shoot back.
pub fn hostile_pairs(snapshot: &SystemCombat) -> BTreeSet<(HouseId, HouseId)> {
    let territory = Territory {
        controller: snapshot.colony.as_ref().map(|c| c.owner),
    };
    let mut pairs: BTreeSet<(HouseId, HouseId)> = BTreeSet::new();
    for a in &snapshot.houses {
        for b in &snapshot.houses {
            if targets(a, b, territory, false) {
                pairs.insert((a.house, b.house));
                // Engagement makes the defender hostile in return.
                pairs.insert((b.house, a.house));
            }
        }
    }
    pairs
}

/// Whether any combat happens here at all.
pub fn any_hostility(snapshot: &SystemCombat) -> bool {
    !hostile_pairs(snapshot).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CombatFleet, FleetPosture};
    use ec4x_common::{FleetId, SystemId};
    use std::collections::BTreeMap;

    fn force(house: u32, stance_toward: &[(u32, DiplomaticStance)]) -> HouseForce {
        let mut stances = BTreeMap::new();
        for &(h, s) in stance_toward {
            stances.insert(HouseId(h), s);
        }
        HouseForce {
            house: HouseId(house),
            prestige: 0,
            tech: Default::default(),
            stances,
            fleets: vec![CombatFleet {
                id: FleetId(house),
                house: HouseId(house),
                posture: FleetPosture::Mobile,
                provocative: false,
                threatening: false,
                mission: None,
                roe: 4,
                squadrons: Vec::new(),
                spacelift: Vec::new(),
                loaded_marines: 0,
                has_scout: false,
            }],
            defends_homeworld: false,
        }
    }

    #[test]
    fn enemies_always_target() {
        let a = force(1, &[(2, DiplomaticStance::Enemy)]);
        let b = force(2, &[]);
        let t = Territory { controller: None };
        assert!(targets(&a, &b, t, false));
    }

    #[test]
    fn neutral_requires_threat_in_own_territory() {
        let a = force(1, &[]);
        let mut b = force(2, &[]);
        let own = Territory {
            controller: Some(HouseId(1)),
        };
        assert!(!targets(&a, &b, own, false));
        b.fleets[0].threatening = true;
        assert!(targets(&a, &b, own, false));
        // Same threat outside A's territory: no grounds.
        let foreign = Territory { controller: None };
        assert!(!targets(&a, &b, foreign, false));
    }

    #[test]
    fn engagement_is_symmetric() {
        let a = force(1, &[(2, DiplomaticStance::Enemy)]);
        let b = force(2, &[]);
        let snapshot = SystemCombat {
            system: SystemId(5),
            turn: 1,
            colony: None,
            houses: vec![a, b],
        };
        let pairs = hostile_pairs(&snapshot);
        assert!(pairs.contains(&(HouseId(1), HouseId(2))));
        assert!(pairs.contains(&(HouseId(2), HouseId(1))));
    }
}
