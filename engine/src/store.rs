//! The entity store: typed tables plus secondary indexes.
//!
//! All tables are `BTreeMap`s so iteration order is deterministic.
//! Writes go through this API, which keeps the indexes consistent;
//! `verify_indexes` rebuilds them from the primary data and compares,
//! turning any drift into a fatal invariant breach.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use ec4x_common::{
    Colony, ColonyId, ConstructionProject, ConstructionProjectId, Drydock, DrydockId, EngineError,
    Fleet, FleetId, GroundUnit, GroundUnitId, House, HouseId, IdMint, RepairProject,
    RepairProjectId, Ship, ShipId, Shipyard, ShipyardId, Spaceport, SpaceportId, Starbase,
    StarbaseId, SystemId, TurnPhase,
};

/// Secondary indexes, maintained on every write.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Indexes {
    pub colonies_by_owner: BTreeMap<HouseId, BTreeSet<ColonyId>>,
    pub colony_by_system: BTreeMap<SystemId, ColonyId>,
    pub fleets_by_owner: BTreeMap<HouseId, BTreeSet<FleetId>>,
    pub fleets_by_system: BTreeMap<SystemId, BTreeSet<FleetId>>,
}

/// Keyed tables for every entity kind.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EntityStore {
    pub mint: IdMint,
    houses: BTreeMap<HouseId, House>,
    colonies: BTreeMap<ColonyId, Colony>,
    fleets: BTreeMap<FleetId, Fleet>,
    ships: BTreeMap<ShipId, Ship>,
    ground_units: BTreeMap<GroundUnitId, GroundUnit>,
    starbases: BTreeMap<StarbaseId, Starbase>,
    spaceports: BTreeMap<SpaceportId, Spaceport>,
    shipyards: BTreeMap<ShipyardId, Shipyard>,
    drydocks: BTreeMap<DrydockId, Drydock>,
    construction_projects: BTreeMap<ConstructionProjectId, ConstructionProject>,
    repair_projects: BTreeMap<RepairProjectId, RepairProject>,
    idx: Indexes,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            mint: IdMint::new(),
            ..Default::default()
        }
    }

    // ========== Houses ==========

    pub fn add_house(&mut self, house: House) {
        self.houses.insert(house.id, house);
    }

    pub fn house(&self, id: HouseId) -> Option<&House> {
        self.houses.get(&id)
    }

    pub fn house_mut(&mut self, id: HouseId) -> Option<&mut House> {
        self.houses.get_mut(&id)
    }

    pub fn houses(&self) -> impl Iterator<Item = &House> {
        self.houses.values()
    }

    pub fn house_ids(&self) -> Vec<HouseId> {
        self.houses.keys().copied().collect()
    }

    // ========== Colonies ==========

    pub fn create_colony(&mut self, colony: Colony) -> ColonyId {
        let id = colony.id;
        self.idx
            .colonies_by_owner
            .entry(colony.owner)
            .or_default()
            .insert(id);
        self.idx.colony_by_system.insert(colony.system, id);
        self.colonies.insert(id, colony);
        id
    }

    pub fn colony(&self, id: ColonyId) -> Option<&Colony> {
        self.colonies.get(&id)
    }

    pub fn colony_mut(&mut self, id: ColonyId) -> Option<&mut Colony> {
        self.colonies.get_mut(&id)
    }

    pub fn colonies(&self) -> impl Iterator<Item = &Colony> {
        self.colonies.values()
    }

    pub fn colony_by_system(&self, system: SystemId) -> Option<ColonyId> {
        self.idx.colony_by_system.get(&system).copied()
    }

    pub fn colonies_by_owner(&self, owner: HouseId) -> Vec<ColonyId> {
        self.idx
            .colonies_by_owner
            .get(&owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Re-home a colony to a new owner, keeping both owner indexes
    /// consistent.
    pub fn transfer_colony(&mut self, id: ColonyId, to: HouseId) -> bool {
        let Some(colony) = self.colonies.get_mut(&id) else {
            return false;
        };
        let from = colony.owner;
        colony.owner = to;
        if let Some(set) = self.idx.colonies_by_owner.get_mut(&from) {
            set.remove(&id);
        }
        self.idx.colonies_by_owner.entry(to).or_default().insert(id);
        true
    }

    pub fn destroy_colony(&mut self, id: ColonyId) {
        if let Some(colony) = self.colonies.remove(&id) {
            if let Some(set) = self.idx.colonies_by_owner.get_mut(&colony.owner) {
                set.remove(&id);
            }
            self.idx.colony_by_system.remove(&colony.system);
        }
    }

    // ========== Fleets ==========

    pub fn create_fleet(&mut self, fleet: Fleet) -> FleetId {
        let id = fleet.id;
        self.idx
            .fleets_by_owner
            .entry(fleet.owner)
            .or_default()
            .insert(id);
        self.idx
            .fleets_by_system
            .entry(fleet.system)
            .or_default()
            .insert(id);
        self.fleets.insert(id, fleet);
        id
    }

    pub fn fleet(&self, id: FleetId) -> Option<&Fleet> {
        self.fleets.get(&id)
    }

    pub fn fleet_mut(&mut self, id: FleetId) -> Option<&mut Fleet> {
        self.fleets.get_mut(&id)
    }

    pub fn fleets(&self) -> impl Iterator<Item = &Fleet> {
        self.fleets.values()
    }

    pub fn fleet_ids(&self) -> Vec<FleetId> {
        self.fleets.keys().copied().collect()
    }

    pub fn fleets_in_system(&self, system: SystemId) -> Vec<FleetId> {
        self.idx
            .fleets_by_system
            .get(&system)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn fleets_by_owner(&self, owner: HouseId) -> Vec<FleetId> {
        self.idx
            .fleets_by_owner
            .get(&owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Move a fleet between systems, updating the system index and the
    /// fleet's own trail.
    pub fn move_fleet(&mut self, id: FleetId, to: SystemId) -> bool {
        let Some(fleet) = self.fleets.get_mut(&id) else {
            return false;
        };
        let from = fleet.system;
        if from == to {
            return true;
        }
        fleet.system = to;
        fleet.trail.push(to);
        if let Some(set) = self.idx.fleets_by_system.get_mut(&from) {
            set.remove(&id);
        }
        self.idx.fleets_by_system.entry(to).or_default().insert(id);
        // Ships travel with their fleet; membership is tracked on the
        // ship, position on the fleet.
        true
    }

    pub fn destroy_fleet(&mut self, id: FleetId) {
        if let Some(fleet) = self.fleets.remove(&id) {
            if let Some(set) = self.idx.fleets_by_owner.get_mut(&fleet.owner) {
                set.remove(&id);
            }
            if let Some(set) = self.idx.fleets_by_system.get_mut(&fleet.system) {
                set.remove(&id);
            }
        }
    }

    // ========== Ships ==========

    pub fn add_ship(&mut self, ship: Ship) -> ShipId {
        let id = ship.id;
        self.ships.insert(id, ship);
        id
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(&id)
    }

    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values()
    }

    /// Remove a ship from the table and from any fleet squadron that
    /// references it. Squadrons whose flagship dies promote nothing —
    /// the squadron dissolves and surviving escorts go home as singles.
    pub fn destroy_ship(&mut self, id: ShipId) {
        let Some(ship) = self.ships.remove(&id) else {
            return;
        };
        if let Some(fleet_id) = ship.fleet {
            if let Some(fleet) = self.fleets.get_mut(&fleet_id) {
                let mut orphans: Vec<ShipId> = Vec::new();
                fleet.squadrons.retain_mut(|sq| {
                    if sq.flagship == id {
                        orphans.extend(sq.escorts.iter().copied());
                        false
                    } else {
                        sq.escorts.retain(|&e| e != id);
                        true
                    }
                });
                for orphan in orphans {
                    fleet.squadrons.push(ec4x_common::Squadron::solo(orphan));
                }
            }
        }
    }

    // ========== Ground units ==========

    pub fn add_ground_unit(&mut self, unit: GroundUnit) -> GroundUnitId {
        let id = unit.id;
        self.ground_units.insert(id, unit);
        id
    }

    pub fn ground_unit(&self, id: GroundUnitId) -> Option<&GroundUnit> {
        self.ground_units.get(&id)
    }

    pub fn ground_unit_mut(&mut self, id: GroundUnitId) -> Option<&mut GroundUnit> {
        self.ground_units.get_mut(&id)
    }

    pub fn destroy_ground_unit(&mut self, id: GroundUnitId) {
        if let Some(unit) = self.ground_units.remove(&id) {
            if let Some(colony) = self.colonies.get_mut(&unit.colony) {
                colony.ground_units.retain(|&g| g != id);
            }
        }
    }

    // ========== Facilities ==========

    pub fn add_starbase(&mut self, sb: Starbase) -> StarbaseId {
        let id = sb.id;
        self.starbases.insert(id, sb);
        id
    }

    pub fn starbase(&self, id: StarbaseId) -> Option<&Starbase> {
        self.starbases.get(&id)
    }

    pub fn starbase_mut(&mut self, id: StarbaseId) -> Option<&mut Starbase> {
        self.starbases.get_mut(&id)
    }

    pub fn destroy_starbase(&mut self, id: StarbaseId) {
        if let Some(sb) = self.starbases.remove(&id) {
            if let Some(colony) = self.colonies.get_mut(&sb.colony) {
                colony.starbases.retain(|&s| s != id);
            }
        }
    }

    pub fn add_spaceport(&mut self, sp: Spaceport) -> SpaceportId {
        let id = sp.id;
        self.spaceports.insert(id, sp);
        id
    }

    pub fn spaceport(&self, id: SpaceportId) -> Option<&Spaceport> {
        self.spaceports.get(&id)
    }

    pub fn add_shipyard(&mut self, sy: Shipyard) -> ShipyardId {
        let id = sy.id;
        self.shipyards.insert(id, sy);
        id
    }

    pub fn shipyard(&self, id: ShipyardId) -> Option<&Shipyard> {
        self.shipyards.get(&id)
    }

    pub fn add_drydock(&mut self, dd: Drydock) -> DrydockId {
        let id = dd.id;
        self.drydocks.insert(id, dd);
        id
    }

    pub fn drydock(&self, id: DrydockId) -> Option<&Drydock> {
        self.drydocks.get(&id)
    }

    // ========== Projects ==========

    pub fn add_construction(&mut self, project: ConstructionProject) -> ConstructionProjectId {
        let id = project.id;
        if let Some(colony) = self.colonies.get_mut(&project.colony) {
            colony.construction_queue.push(id);
        }
        self.construction_projects.insert(id, project);
        id
    }

    pub fn construction(&self, id: ConstructionProjectId) -> Option<&ConstructionProject> {
        self.construction_projects.get(&id)
    }

    pub fn construction_mut(
        &mut self,
        id: ConstructionProjectId,
    ) -> Option<&mut ConstructionProject> {
        self.construction_projects.get_mut(&id)
    }

    pub fn construction_ids(&self) -> Vec<ConstructionProjectId> {
        self.construction_projects.keys().copied().collect()
    }

    pub fn remove_construction(&mut self, id: ConstructionProjectId) {
        if let Some(project) = self.construction_projects.remove(&id) {
            if let Some(colony) = self.colonies.get_mut(&project.colony) {
                colony.construction_queue.retain(|&p| p != id);
            }
        }
    }

    pub fn add_repair(&mut self, project: RepairProject) -> RepairProjectId {
        let id = project.id;
        if let Some(colony) = self.colonies.get_mut(&project.colony) {
            colony.repair_queue.push(id);
        }
        self.repair_projects.insert(id, project);
        id
    }

    pub fn repair(&self, id: RepairProjectId) -> Option<&RepairProject> {
        self.repair_projects.get(&id)
    }

    pub fn repair_ids(&self) -> Vec<RepairProjectId> {
        self.repair_projects.keys().copied().collect()
    }

    pub fn remove_repair(&mut self, id: RepairProjectId) {
        if let Some(project) = self.repair_projects.remove(&id) {
            if let Some(colony) = self.colonies.get_mut(&project.colony) {
                colony.repair_queue.retain(|&p| p != id);
            }
        }
    }

    // ========== Invariants ==========

    /// Rebuild every index from the primary tables.
    pub fn rebuilt_indexes(&self) -> Indexes {
        let mut idx = Indexes::default();
        for colony in self.colonies.values() {
            idx.colonies_by_owner
                .entry(colony.owner)
                .or_default()
                .insert(colony.id);
            idx.colony_by_system.insert(colony.system, colony.id);
        }
        for fleet in self.fleets.values() {
            idx.fleets_by_owner
                .entry(fleet.owner)
                .or_default()
                .insert(fleet.id);
            idx.fleets_by_system
                .entry(fleet.system)
                .or_default()
                .insert(fleet.id);
        }
        idx
    }

    /// Compare the live indexes against a fresh rebuild. Any mismatch is
    /// a programmer error and aborts the turn.
    pub fn verify_indexes(&self, phase: TurnPhase) -> Result<(), EngineError> {
        let fresh = self.rebuilt_indexes();
        let mut live = self.idx.clone();
        // Empty sets are equivalent to missing entries.
        live.colonies_by_owner.retain(|_, s| !s.is_empty());
        live.fleets_by_owner.retain(|_, s| !s.is_empty());
        live.fleets_by_system.retain(|_, s| !s.is_empty());
        if live.colonies_by_owner != fresh.colonies_by_owner
            || live.colony_by_system != fresh.colony_by_system
        {
            return Err(EngineError::IndexDesynchronized {
                index: "colonies".into(),
                phase,
            });
        }
        if live.fleets_by_owner != fresh.fleets_by_owner
            || live.fleets_by_system != fresh.fleets_by_system
        {
            return Err(EngineError::IndexDesynchronized {
                index: "fleets".into(),
                phase,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec4x_common::{PlanetClass, ResourceRating};

    fn store_with_colony() -> (EntityStore, ColonyId, HouseId) {
        let mut store = EntityStore::new();
        let house = HouseId(store.mint.next());
        let system = SystemId(store.mint.next());
        store.add_house(House::new(house, "Harkonnen".into(), system));
        let colony_id = ColonyId(store.mint.next());
        store.create_colony(Colony::new(
            colony_id,
            system,
            house,
            PlanetClass::Terran,
            ResourceRating::Normal,
            1_000_000,
        ));
        (store, colony_id, house)
    }

    #[test]
    fn colony_indexes_track_creation_and_transfer() {
        let (mut store, colony, house) = store_with_colony();
        assert_eq!(store.colonies_by_owner(house), vec![colony]);

        let other = HouseId(store.mint.next());
        store.add_house(House::new(other, "Ordos".into(), SystemId(99)));
        assert!(store.transfer_colony(colony, other));
        assert!(store.colonies_by_owner(house).is_empty());
        assert_eq!(store.colonies_by_owner(other), vec![colony]);
        store.verify_indexes(TurnPhase::Production).unwrap();
    }

    #[test]
    fn fleet_moves_update_system_index() {
        let (mut store, _, house) = store_with_colony();
        let a = SystemId(store.mint.next());
        let b = SystemId(store.mint.next());
        let fleet = FleetId(store.mint.next());
        store.create_fleet(Fleet::new(fleet, house, a));
        assert_eq!(store.fleets_in_system(a), vec![fleet]);
        assert!(store.move_fleet(fleet, b));
        assert!(store.fleets_in_system(a).is_empty());
        assert_eq!(store.fleets_in_system(b), vec![fleet]);
        store.verify_indexes(TurnPhase::Production).unwrap();
    }

    #[test]
    fn destroying_a_flagship_dissolves_the_squadron() {
        let (mut store, _, house) = store_with_colony();
        let system = SystemId(store.mint.next());
        let fleet_id = FleetId(store.mint.next());
        let mut fleet = Fleet::new(fleet_id, house, system);

        let flag = ShipId(store.mint.next());
        let escort = ShipId(store.mint.next());
        for (id, class) in [
            (flag, ec4x_common::ShipClass::Destroyer),
            (escort, ec4x_common::ShipClass::Corvette),
        ] {
            let mut ship = Ship::new(id, class, house);
            ship.fleet = Some(fleet_id);
            store.add_ship(ship);
        }
        fleet.squadrons.push(ec4x_common::Squadron {
            flagship: flag,
            escorts: vec![escort],
        });
        store.create_fleet(fleet);

        store.destroy_ship(flag);
        let fleet = store.fleet(fleet_id).unwrap();
        assert_eq!(fleet.squadrons.len(), 1);
        assert_eq!(fleet.squadrons[0].flagship, escort);
        assert!(store.ship(flag).is_none());
    }
}
