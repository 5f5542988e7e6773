//! Espionage resolution.
//!
//! All houses' missions resolve simultaneously at the opening of the
//! Conflict Phase: intents are collected, detection rolls run in
//! deterministic order (attacker house id, then fleet id), and effects
//! apply only after every roll is done, so no house gains a first-mover
//! advantage.

use std::collections::BTreeMap;

use ec4x_common::{
    constants, EspionageAction, EspionageOrder, EventKind, FleetId, GameRng, HouseId,
    IntelReport, PrestigeEvent, PrestigeReason, ShipId, SystemId,
};

use crate::effects::{EspionageEffect, EspionageOutcome};

/// What a scout was sent to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoutObjective {
    SpyColony,
    SpySystem,
    HackStarbase,
}

/// A single-scout fleet on station over its target.
#[derive(Debug, Clone)]
pub struct ScoutMission {
    pub house: HouseId,
    pub fleet: FleetId,
    pub scout: ShipId,
    pub objective: ScoutObjective,
    pub target_system: SystemId,
    /// The scout's ELI tier, doubling as its stealth rating.
    pub scout_eli: u8,
}

/// The defender's posture over one targeted system.
#[derive(Debug, Clone, Default)]
pub struct SystemWatch {
    pub owner: Option<HouseId>,
    /// ELI tiers of every watching asset (scout fleets at house ELI,
    /// starbases at ELI + 2).
    pub eli_assets: Vec<u8>,
    pub cip: u32,
    /// Reports the engine pre-built for a successful mission, keyed by
    /// objective.
    pub colony_report: Option<IntelReport>,
    pub system_report: Option<IntelReport>,
    pub starbase_report: Option<IntelReport>,
}

/// A budget-funded covert action.
#[derive(Debug, Clone)]
pub struct CovertIntent {
    pub attacker: HouseId,
    pub order: EspionageOrder,
    /// Sabotage target, chosen by the engine (the victim's biggest
    /// industrial base). A victim with no colonies makes sabotage fizzle
    /// harmlessly.
    pub target_colony: Option<ec4x_common::ColonyId>,
}

/// The target house's counter-intelligence posture.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterIntel {
    pub cic: u8,
    pub cip: u32,
}

/// Blended ELI of the watching assets: weighted average with a penalty
/// for assets more than 50% below the intruder's tier, plus a mesh
/// bonus for overlapping coverage.
pub fn effective_eli(assets: &[u8], intruder_tier: u8) -> u8 {
    if assets.is_empty() {
        return 0;
    }
    let sum: u32 = assets
        .iter()
        .map(|&eli| {
            if u32::from(eli) * 2 < u32::from(intruder_tier) {
                u32::from(eli) / 2
            } else {
                u32::from(eli)
            }
        })
        .sum();
    let average = sum / assets.len() as u32;
    let mesh = match assets.len() {
        0 | 1 => 0,
        2..=3 => 1,
        4..=5 => 2,
        _ => 3,
    };
    (average + mesh).min(u32::from(u8::MAX)) as u8
}

/// Whether a covert action was caught, given the defender's CIC level
/// and banked CIP.
fn covert_detected(roll: u8, action: EspionageAction, defense: CounterIntel) -> bool {
    let score = i32::from(roll)
        + action.detection_modifier()
        + 2 * i32::from(defense.cic)
        + (defense.cip / 10) as i32;
    score >= 18
}

/// Resolve every espionage intent for the turn.
pub fn resolve_espionage(
    turn: u32,
    mut scout_missions: Vec<ScoutMission>,
    watches: &BTreeMap<SystemId, SystemWatch>,
    mut covert: Vec<CovertIntent>,
    counter_intel: &BTreeMap<HouseId, CounterIntel>,
    rng: &GameRng,
) -> EspionageOutcome {
    let mut outcome = EspionageOutcome::default();

    // Deterministic resolution order regardless of submission order.
    scout_missions.sort_by_key(|m| (m.house, m.fleet));
    covert.sort_by_key(|c| (c.attacker, c.order.target));

    for mission in &scout_missions {
        resolve_scout(turn, mission, watches, rng, &mut outcome);
    }

    for intent in &covert {
        resolve_covert(turn, intent, counter_intel, rng, &mut outcome);
    }
    outcome
}

fn resolve_scout(
    turn: u32,
    mission: &ScoutMission,
    watches: &BTreeMap<SystemId, SystemWatch>,
    rng: &GameRng,
    outcome: &mut EspionageOutcome,
) {
    // The scout is spent whether or not it gets home with the goods.
    outcome.effects.push(EspionageEffect::ScoutConsumed {
        ship: mission.scout,
        fleet: mission.fleet,
    });

    let watch = watches.get(&mission.target_system).cloned().unwrap_or_default();
    let eli = effective_eli(&watch.eli_assets, mission.scout_eli);
    let threshold = constants::detection_threshold(eli, mission.scout_eli);
    let tag = format!(
        "espionage:{}:{}:{}",
        mission.house.0, mission.target_system.0, mission.fleet.0
    );
    let detected = !watch.eli_assets.is_empty() && rng.stream(turn, &tag).d20() >= threshold;

    if detected {
        log::debug!(
            "scout of house {} detected over system {}",
            mission.house.0,
            mission.target_system.0
        );
        outcome.events.push(EventKind::ScoutLost {
            house: mission.house,
            system: mission.target_system,
        });
        if watch.owner.is_some() {
            outcome.events.push(EventKind::UnusualActivity {
                system: mission.target_system,
            });
        }
        return;
    }

    let report = match mission.objective {
        ScoutObjective::SpyColony => watch.colony_report,
        ScoutObjective::SpySystem => watch.system_report,
        ScoutObjective::HackStarbase => watch.starbase_report,
    };
    if let Some(report) = report {
        outcome.intel.push((mission.house, report));
    }
    // A defender with a serious counter-intel budget still notices that
    // something was in the area, without learning what or whose.
    if watch.owner.is_some() && watch.cip >= constants::CIP_SWEEP_THRESHOLD {
        outcome.events.push(EventKind::UnusualActivity {
            system: mission.target_system,
        });
    }
}

fn resolve_covert(
    turn: u32,
    intent: &CovertIntent,
    counter_intel: &BTreeMap<HouseId, CounterIntel>,
    rng: &GameRng,
    outcome: &mut EspionageOutcome,
) {
    let attacker = intent.attacker;
    let target = intent.order.target;
    let action = intent.order.action;
    let defense = counter_intel.get(&target).copied().unwrap_or_default();

    let tag = format!("espionage:{}:{}", attacker.0, target.0);
    let roll = rng.stream(turn, &tag).d20();
    if covert_detected(roll, action, defense) {
        outcome.events.push(EventKind::EspionageDetected {
            attacker,
            target,
            action,
        });
        outcome.prestige.push(PrestigeEvent {
            house: attacker,
            amount: constants::ESPIONAGE_DETECTED_PENALTY,
            reason: PrestigeReason::EspionageCompromised,
            source: None,
        });
        return;
    }

    let effect = match action {
        EspionageAction::SabotageLow | EspionageAction::SabotageHigh => {
            let Some(colony) = intent.target_colony else {
                // Nothing left to blow up; the budget is spent anyway.
                return;
            };
            let amount = if action == EspionageAction::SabotageLow {
                constants::SABOTAGE_LOW_IU
            } else {
                constants::SABOTAGE_HIGH_IU
            };
            EspionageEffect::IndustrialSabotage { colony, amount }
        }
        EspionageAction::TechTheft => EspionageEffect::SrpStolen {
            from: target,
            to: attacker,
            amount: constants::TECH_THEFT_SRP,
        },
        EspionageAction::Assassination => EspionageEffect::PoolsDisrupted {
            house: target,
            percent: 25,
        },
        EspionageAction::EconomicManipulation => EspionageEffect::TreasurySkimmed {
            from: target,
            to: attacker,
            amount: constants::ECONOMIC_MANIPULATION_PP,
        },
        EspionageAction::CyberAttack => EspionageEffect::CipHalved { house: target },
        EspionageAction::PsyopsCampaign => {
            outcome.prestige.push(PrestigeEvent {
                house: target,
                amount: constants::PSYOPS_PRESTIGE,
                reason: PrestigeReason::EspionageSuccess,
                source: None,
            });
            EspionageEffect::DisinformationPlanted {
                against: target,
                by: attacker,
                turns: 1,
            }
        }
        EspionageAction::IntelTheft => EspionageEffect::IntelStolen {
            from: target,
            to: attacker,
            reports: 3,
        },
        EspionageAction::PlantDisinformation => EspionageEffect::DisinformationPlanted {
            against: target,
            by: attacker,
            turns: 3,
        },
        EspionageAction::CounterIntelSweep => EspionageEffect::CipHardened {
            house: attacker,
            bonus: 10,
        },
    };
    outcome.effects.push(effect);
    outcome.prestige.push(PrestigeEvent {
        house: attacker,
        amount: constants::ESPIONAGE_SUCCESS_PRESTIGE,
        reason: PrestigeReason::EspionageSuccess,
        source: None,
    });
    outcome.events.push(EventKind::EspionageSucceeded {
        attacker,
        action,
        target,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_eli_blends_and_meshes() {
        assert_eq!(effective_eli(&[], 3), 0);
        assert_eq!(effective_eli(&[4], 3), 4);
        // Two assets: mesh +1.
        assert_eq!(effective_eli(&[4, 4], 3), 5);
        // A badly outclassed asset counts at half value.
        assert_eq!(effective_eli(&[1], 6), 0);
    }

    #[test]
    fn covert_detection_scales_with_cic() {
        let soft = CounterIntel { cic: 0, cip: 0 };
        let hard = CounterIntel { cic: 5, cip: 40 };
        // The same mediocre roll slips past a soft target and is caught
        // by a hardened one.
        assert!(!covert_detected(10, EspionageAction::SabotageLow, soft));
        assert!(covert_detected(10, EspionageAction::SabotageLow, hard));
    }

    #[test]
    fn scout_is_always_consumed() {
        let mission = ScoutMission {
            house: HouseId(1),
            fleet: FleetId(5),
            scout: ShipId(9),
            objective: ScoutObjective::SpySystem,
            target_system: SystemId(3),
            scout_eli: 2,
        };
        let outcome = resolve_espionage(
            4,
            vec![mission],
            &BTreeMap::new(),
            Vec::new(),
            &BTreeMap::new(),
            &GameRng::new(11),
        );
        assert!(outcome
            .effects
            .iter()
            .any(|e| matches!(e, EspionageEffect::ScoutConsumed { ship, .. } if *ship == ShipId(9))));
    }
}
