use tactical_grid_core::{
    Ability, AoeShape, AreaOfEffect, CancelFlag, CellCoord, CellState, CellStateMap, DamageSpec,
    EffectKind, GridConfig, GridTokenData, PersistentZone, SaveSpec, TokenId, Trigger, ZoneEffect,
    ZoneId,
};
use tactical_grid_system_movement::reachable_cells_with;
use tactical_grid_system_zones::{
    advance_zone_rounds, damage_zone, difficult_terrain_zone, is_cell_difficult_from_zone,
    save_zone, triggered_effects, zone_affected_cells, zone_with_effect_at, zones_at_cell,
    ZoneTerrain,
};

fn config() -> GridConfig {
    GridConfig::square(12, 12, 50.0)
}

fn sphere(x: i32, y: i32, feet: u32) -> AreaOfEffect {
    AreaOfEffect::new(AoeShape::Sphere, CellCoord::new(x, y), feet)
}

fn fire() -> DamageSpec {
    DamageSpec {
        dice_expression: "2d4".to_owned(),
        damage_type: "fire".to_owned(),
    }
}

fn dex_save() -> SaveSpec {
    SaveSpec {
        ability: Ability::Dexterity,
        dc: 14,
        on_success: "half damage".to_owned(),
        on_failure: "knocked prone".to_owned(),
    }
}

fn battlefield() -> Vec<PersistentZone> {
    vec![
        difficult_terrain_zone(ZoneId::new(1), "Entangle", &sphere(3, 3, 10), Some(10)),
        damage_zone(ZoneId::new(2), "Burning Ground", &sphere(4, 3, 5), fire(), None, None),
        save_zone(
            ZoneId::new(3),
            "Grease",
            &sphere(8, 8, 5),
            dex_save(),
            Trigger::OnStartTurn,
            Some(2),
        ),
    ]
}

#[test]
fn zone_with_three_round_duration_expires_on_third_advance() {
    let zone = difficult_terrain_zone(ZoneId::new(7), "Web", &sphere(2, 2, 10), Some(3));
    assert_eq!(zone.current_round, None);

    let first = advance_zone_rounds(&[zone]);
    assert_eq!(first.active_zones.len(), 1);
    assert!(first.expired_zones.is_empty());
    assert_eq!(first.active_zones[0].current_round, Some(1));

    let second = advance_zone_rounds(&first.active_zones);
    assert_eq!(second.active_zones.len(), 1);
    assert!(second.expired_zones.is_empty());

    let third = advance_zone_rounds(&second.active_zones);
    assert!(third.active_zones.is_empty());
    assert_eq!(third.expired_zones.len(), 1);
    assert_eq!(third.expired_zones[0].current_round, Some(3));
    assert_eq!(third.expired_zones[0].id, ZoneId::new(7));
}

#[test]
fn advancing_does_not_mutate_the_input_list() {
    let zones = battlefield();
    let snapshot = zones.clone();
    let advance = advance_zone_rounds(&zones);

    assert_eq!(zones, snapshot);
    assert_eq!(advance.active_zones.len() + advance.expired_zones.len(), zones.len());
    let permanent = advance
        .active_zones
        .iter()
        .find(|zone| zone.id == ZoneId::new(2))
        .expect("permanent zone stays active");
    assert_eq!(permanent, &zones[1]);
}

#[test]
fn cell_queries_find_covering_zones_in_order() {
    let zones = battlefield();
    let config = config();

    let at_overlap = zones_at_cell(CellCoord::new(4, 3), &zones, &config);
    let ids: Vec<_> = at_overlap.iter().map(|zone| zone.id).collect();
    assert_eq!(ids, vec![ZoneId::new(1), ZoneId::new(2)]);

    assert!(zones_at_cell(CellCoord::new(0, 11), &zones, &config).is_empty());

    let damage = zone_with_effect_at(CellCoord::new(4, 3), EffectKind::Damage, &zones, &config);
    assert_eq!(damage.map(|zone| zone.id), Some(ZoneId::new(2)));
    let outside_fire = CellCoord::new(1, 3);
    assert!(zone_with_effect_at(outside_fire, EffectKind::Damage, &zones, &config).is_none());
    assert!(is_cell_difficult_from_zone(outside_fire, &zones, &config));
}

#[test]
fn inactive_zones_are_ignored() {
    let mut zones = battlefield();
    zones[0].is_active = false;
    let config = config();

    assert!(!is_cell_difficult_from_zone(CellCoord::new(3, 3), &zones, &config));
    assert!(!zone_affected_cells(&zones[0], &config).is_empty());
    let ids: Vec<_> = zones_at_cell(CellCoord::new(4, 3), &zones, &config)
        .iter()
        .map(|zone| zone.id)
        .collect();
    assert_eq!(ids, vec![ZoneId::new(2)]);
}

#[test]
fn damage_without_trigger_fires_on_enter_only() {
    let zones = battlefield();
    let config = config();
    let cell = CellCoord::new(4, 3);

    let on_enter = triggered_effects(cell, Trigger::OnEnter, &zones, &config);
    assert_eq!(on_enter.len(), 1);
    assert_eq!(on_enter[0].zone.id, ZoneId::new(2));
    assert_eq!(on_enter[0].effect.kind(), EffectKind::Damage);

    assert!(triggered_effects(cell, Trigger::OnStartTurn, &zones, &config).is_empty());
    assert!(triggered_effects(cell, Trigger::OnEndTurn, &zones, &config).is_empty());
}

#[test]
fn explicit_triggers_match_exactly() {
    let zones = battlefield();
    let config = config();
    let cell = CellCoord::new(8, 8);

    let start = triggered_effects(cell, Trigger::OnStartTurn, &zones, &config);
    assert_eq!(start.len(), 1);
    assert!(matches!(start[0].effect, ZoneEffect::SavingThrow { save, .. } if save.dc == 14));
    assert!(triggered_effects(cell, Trigger::OnEnter, &zones, &config).is_empty());
}

#[test]
fn zone_terrain_overlays_static_map() {
    let zones = battlefield();
    let config = config();
    let cell_states: CellStateMap = [
        (CellCoord::new(3, 4), CellState::Blocked),
        (CellCoord::new(10, 10), CellState::Difficult),
    ]
    .into_iter()
    .collect();
    let terrain = ZoneTerrain::new(&cell_states, &zones, &config);

    assert_eq!(terrain.state(CellCoord::new(3, 3)), CellState::Difficult);
    assert_eq!(terrain.state(CellCoord::new(3, 4)), CellState::Blocked);
    assert_eq!(terrain.state(CellCoord::new(10, 10)), CellState::Difficult);
    assert_eq!(terrain.state(CellCoord::new(0, 0)), CellState::Free);
    assert!(is_cell_difficult_from_zone(CellCoord::new(3, 3), &zones, &config));
    assert!(!cell_states.is_difficult(CellCoord::new(3, 3)));
}

#[test]
fn movement_pays_double_inside_difficult_zone() {
    let config = config();
    let zones = vec![difficult_terrain_zone(
        ZoneId::new(1),
        "Mud",
        &AreaOfEffect::new(AoeShape::Cube, CellCoord::new(1, 0), 5),
        None,
    )];
    let cell_states = CellStateMap::new();
    let terrain = ZoneTerrain::new(&cell_states, &zones, &config);
    let token = GridTokenData::new(TokenId::new(1), CellCoord::new(0, 0), 10);

    let reachable =
        reachable_cells_with(&token, &config, |cell| terrain.state(cell), &CancelFlag::new());
    let cost_of = |x: i32, y: i32| {
        reachable
            .iter()
            .find(|cell| cell.x == x && cell.y == y)
            .map(|cell| cell.cost_feet)
    };
    assert_eq!(cost_of(1, 0), Some(10));
    assert_eq!(cost_of(0, 1), Some(5));
    assert_eq!(cost_of(2, 0), None);
}

#[test]
fn zones_round_trip_through_json() {
    let zones = battlefield();
    let json = serde_json::to_string(&zones).expect("serialize");
    let decoded: Vec<PersistentZone> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, zones);
}
