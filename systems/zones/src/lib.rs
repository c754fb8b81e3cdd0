#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Queries and round bookkeeping for persistent zones.
//!
//! Zones live in a caller-owned list. Every function here reads a snapshot of
//! that list; [`advance_zone_rounds`] returns new lists instead of mutating
//! the input. Inactive zones never match a cell query.

use std::collections::HashSet;

use serde::Serialize;
use tactical_grid_core::{
    AffectedCell, AreaOfEffect, CellCoord, CellState, CellStateMap, DamageSpec, EffectKind,
    GridConfig, PersistentZone, SaveSpec, Trigger, ZoneColor, ZoneEffect, ZoneId,
};
use tactical_grid_system_area_of_effect::affected_cells;

/// Overlay colour of difficult terrain zones.
pub const DIFFICULT_TERRAIN_COLOR: ZoneColor = ZoneColor::from_rgb(139, 69, 19);
/// Overlay colour of damage zones.
pub const DAMAGE_COLOR: ZoneColor = ZoneColor::from_rgb(220, 38, 38);
/// Overlay colour of saving throw zones.
pub const SAVE_COLOR: ZoneColor = ZoneColor::from_rgb(147, 51, 234);
/// Overlay opacity shared by the presets.
pub const PRESET_OPACITY: f32 = 0.3;

/// Cells covered by a zone, whether or not it is active.
#[must_use]
pub fn zone_affected_cells(zone: &PersistentZone, config: &GridConfig) -> Vec<AffectedCell> {
    affected_cells(&zone.area(), config)
}

/// First active zone covering `cell` that carries an effect of `kind`.
#[must_use]
pub fn zone_with_effect_at<'a>(
    cell: CellCoord,
    kind: EffectKind,
    zones: &'a [PersistentZone],
    config: &GridConfig,
) -> Option<&'a PersistentZone> {
    zones
        .iter()
        .filter(|zone| zone.is_active && zone.has_effect(kind))
        .find(|zone| covers(zone, cell, config))
}

/// Every active zone covering `cell`, in list order.
#[must_use]
pub fn zones_at_cell<'a>(
    cell: CellCoord,
    zones: &'a [PersistentZone],
    config: &GridConfig,
) -> Vec<&'a PersistentZone> {
    zones
        .iter()
        .filter(|zone| zone.is_active && covers(zone, cell, config))
        .collect()
}

/// Zone effect that fires for a creature in a cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TriggeredEffect<'a> {
    /// Zone carrying the effect.
    pub zone: &'a PersistentZone,
    /// Effect that fires.
    pub effect: &'a ZoneEffect,
}

/// Effects of active zones covering `cell` that fire on `trigger`.
///
/// Damage without an explicit trigger fires on [`Trigger::OnEnter`].
#[must_use]
pub fn triggered_effects<'a>(
    cell: CellCoord,
    trigger: Trigger,
    zones: &'a [PersistentZone],
    config: &GridConfig,
) -> Vec<TriggeredEffect<'a>> {
    zones_at_cell(cell, zones, config)
        .into_iter()
        .flat_map(|zone| {
            zone.effects
                .iter()
                .filter(move |effect| effect.effective_trigger() == Some(trigger))
                .map(move |effect| TriggeredEffect { zone, effect })
        })
        .collect()
}

/// Whether an active zone turns `cell` into difficult terrain.
///
/// Static difficult terrain is not consulted; see [`ZoneTerrain`] for the
/// combined view.
#[must_use]
pub fn is_cell_difficult_from_zone(
    cell: CellCoord,
    zones: &[PersistentZone],
    config: &GridConfig,
) -> bool {
    zone_with_effect_at(cell, EffectKind::DifficultTerrain, zones, config).is_some()
}

/// Zones split by whether they survived a round.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundAdvance {
    /// Zones still in play, permanent zones included.
    pub active_zones: Vec<PersistentZone>,
    /// Zones whose duration ran out this round.
    pub expired_zones: Vec<PersistentZone>,
}

/// Advances every timed zone by one round.
///
/// Each zone with a duration has its round counter incremented and expires
/// once the counter reaches the duration. Permanent zones pass through
/// untouched. Call this only when the turn order completes a round.
#[must_use]
pub fn advance_zone_rounds(zones: &[PersistentZone]) -> RoundAdvance {
    let mut advance = RoundAdvance::default();

    for zone in zones {
        let Some(duration) = zone.duration_rounds else {
            advance.active_zones.push(zone.clone());
            continue;
        };

        let mut zone = zone.clone();
        let current = zone.current_round.unwrap_or(0).saturating_add(1);
        zone.current_round = Some(current);

        if current >= duration {
            tracing::debug!(zone = zone.id.get(), name = %zone.name, "zone expired");
            advance.expired_zones.push(zone);
        } else {
            advance.active_zones.push(zone);
        }
    }

    advance
}

/// Zone that makes its area difficult terrain.
#[must_use]
pub fn difficult_terrain_zone(
    id: ZoneId,
    name: impl Into<String>,
    area: &AreaOfEffect,
    duration_rounds: Option<u32>,
) -> PersistentZone {
    preset(id, name, area, duration_rounds, DIFFICULT_TERRAIN_COLOR)
        .with_effect(ZoneEffect::DifficultTerrain)
}

/// Zone that deals damage on `trigger`, or on entry when `trigger` is `None`.
#[must_use]
pub fn damage_zone(
    id: ZoneId,
    name: impl Into<String>,
    area: &AreaOfEffect,
    damage: DamageSpec,
    trigger: Option<Trigger>,
    duration_rounds: Option<u32>,
) -> PersistentZone {
    preset(id, name, area, duration_rounds, DAMAGE_COLOR)
        .with_effect(ZoneEffect::Damage { trigger, damage })
}

/// Zone that demands a saving throw on `trigger`.
#[must_use]
pub fn save_zone(
    id: ZoneId,
    name: impl Into<String>,
    area: &AreaOfEffect,
    save: SaveSpec,
    trigger: Trigger,
    duration_rounds: Option<u32>,
) -> PersistentZone {
    preset(id, name, area, duration_rounds, SAVE_COLOR)
        .with_effect(ZoneEffect::SavingThrow { trigger, save })
}

fn preset(
    id: ZoneId,
    name: impl Into<String>,
    area: &AreaOfEffect,
    duration_rounds: Option<u32>,
    color: ZoneColor,
) -> PersistentZone {
    let mut zone = PersistentZone::new(id, name, area).with_color(color, PRESET_OPACITY);
    zone.duration_rounds = duration_rounds;
    zone
}

fn covers(zone: &PersistentZone, cell: CellCoord, config: &GridConfig) -> bool {
    if !config.contains(cell) {
        return false;
    }
    zone_affected_cells(zone, config)
        .iter()
        .any(|affected| affected.cell() == cell)
}

/// Static cell states overlaid with difficult terrain from active zones.
///
/// Zone areas are rasterised once on construction, so a single instance can
/// answer the many lookups a movement search makes.
#[derive(Clone, Debug)]
pub struct ZoneTerrain<'a> {
    cell_states: &'a CellStateMap,
    zone_difficult: HashSet<CellCoord>,
}

impl<'a> ZoneTerrain<'a> {
    /// Builds the overlay for the active difficult terrain zones in `zones`.
    #[must_use]
    pub fn new(
        cell_states: &'a CellStateMap,
        zones: &[PersistentZone],
        config: &GridConfig,
    ) -> Self {
        let zone_difficult = zones
            .iter()
            .filter(|zone| zone.is_active && zone.has_effect(EffectKind::DifficultTerrain))
            .flat_map(|zone| zone_affected_cells(zone, config))
            .map(|affected| affected.cell())
            .collect();
        Self {
            cell_states,
            zone_difficult,
        }
    }

    /// Effective state of `cell`.
    ///
    /// Blocked cells stay blocked; a free cell becomes difficult when any
    /// active zone makes it so.
    #[must_use]
    pub fn state(&self, cell: CellCoord) -> CellState {
        match self.cell_states.state(cell) {
            CellState::Free if self.zone_difficult.contains(&cell) => CellState::Difficult,
            state => state,
        }
    }
}
