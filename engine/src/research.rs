//! Research: pool funding, science-level advancement, tech purchase.

use ec4x_common::{
    sl_threshold, EventKind, HouseId, PrestigeEvent, PrestigeReason, ResearchAllocation,
    TechField, ValidationCode, ValidationError,
};

use crate::state::GameState;
use crate::turn::TurnContext;

/// Move PP from the treasury into the research pools. Rejected when the
/// treasury cannot cover the allocation.
pub fn fund_pools(
    state: &mut GameState,
    house_id: HouseId,
    allocation: ResearchAllocation,
) -> Result<(), ValidationError> {
    let total = allocation.total();
    if total == 0 {
        return Ok(());
    }
    let house = state
        .store
        .house_mut(house_id)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such house"))?;
    if house.treasury < total {
        return Err(ValidationError::new(
            ValidationCode::InsufficientTreasury,
            format!("research allocation {total} exceeds treasury {}", house.treasury),
        ));
    }
    house.treasury -= total;
    house.tech.pools.erp += allocation.erp;
    house.tech.pools.srp += allocation.srp;
    house.tech.pools.trp += allocation.trp;
    Ok(())
}

/// Advance the science level while both pool thresholds are banked.
pub fn advance_science_level(state: &mut GameState, house_id: HouseId, ctx: &mut TurnContext) {
    let Some(house) = state.store.house_mut(house_id) else {
        return;
    };
    loop {
        let next = house.tech.sl + 1;
        let needed = sl_threshold(next);
        if house.tech.pools.erp < needed || house.tech.pools.srp < needed {
            break;
        }
        house.tech.pools.erp -= needed;
        house.tech.pools.srp -= needed;
        house.tech.sl = next;
        ctx.push_house_event(
            house_id,
            EventKind::ScienceLevelAdvanced {
                house: house_id,
                sl: next,
            },
        );
        log::info!("house {} reached SL {}", house_id.0, next);
    }
}

/// Purchase the next tier of a field from its matching pool.
///
/// Fails `SlGated` when the next tier would exceed the science level and
/// `InsufficientPool` when the pool cannot cover the cost.
pub fn purchase_tech(
    state: &mut GameState,
    house_id: HouseId,
    field: TechField,
    ctx: &mut TurnContext,
) -> Result<(), ValidationError> {
    let house = state
        .store
        .house_mut(house_id)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such house"))?;
    let next = house.tech.level(field) + 1;
    if next > house.tech.sl {
        return Err(ValidationError::new(
            ValidationCode::SlGated,
            format!("{field:?} tier {next} requires SL {next}"),
        ));
    }
    let pool = field.pool();
    let cost = field.cost_at(next);
    if house.tech.pools.balance(pool) < cost {
        return Err(ValidationError::new(
            ValidationCode::InsufficientPool,
            format!("{field:?} tier {next} costs {cost}"),
        ));
    }
    house.tech.pools.debit(pool, cost);
    house.tech.set_level(field, next);
    ctx.push_house_event(
        house_id,
        EventKind::TechAdvanced {
            house: house_id,
            field,
            tier: next,
        },
    );
    ctx.prestige.push(PrestigeEvent {
        house: house_id,
        amount: ec4x_common::constants::TECH_PRESTIGE,
        reason: PrestigeReason::TechAdvance,
        source: None,
    });
    Ok(())
}
