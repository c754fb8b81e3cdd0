use tactical_grid_core::{
    CellCoord, CellState, CellStateMap, GridConfig, GridTokenData, GridType, TokenId,
};
use tactical_grid_system_cover::{
    calculate_cover, calculate_token_cover, CoverBonus, CoverLevel, CoverResult, LINES_PER_CHECK,
};

fn config() -> GridConfig {
    GridConfig::square(10, 10, 50.0)
}

fn wall(cells: &[(i32, i32)]) -> CellStateMap {
    cells
        .iter()
        .map(|&(x, y)| (CellCoord::new(x, y), CellState::Blocked))
        .collect()
}

/// Attacker and target on row 2, three columns apart.
fn cover_across(cell_states: &CellStateMap, config: &GridConfig) -> CoverResult {
    calculate_cover(CellCoord::new(0, 2), CellCoord::new(4, 2), cell_states, config)
}

#[test]
fn sharing_a_cell_gives_no_cover() {
    let cell_states = wall(&[(4, 4)]);
    let cell = CellCoord::new(4, 4);
    let result = calculate_cover(cell, cell, &cell_states, &config());

    assert_eq!(result.level, CoverLevel::None);
    assert!(result.can_be_targeted);
    assert_eq!(result.blocked_lines, 0);
}

#[test]
fn open_ground_gives_no_cover() {
    let result = calculate_cover(
        CellCoord::new(0, 2),
        CellCoord::new(6, 5),
        &CellStateMap::new(),
        &config(),
    );
    assert_eq!(result.level, CoverLevel::None);
    assert_eq!(result.ac_bonus, CoverBonus::Flat(0));
    assert_eq!(result.total_lines, LINES_PER_CHECK);
}

#[test]
fn full_wall_gives_total_cover() {
    let cell_states = wall(&[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);
    let result = cover_across(&cell_states, &config());

    assert_eq!(result.level, CoverLevel::Total);
    assert_eq!(result.blocked_lines, result.total_lines);
    assert_eq!(result.ac_bonus, CoverBonus::Unlimited);
    assert_eq!(result.dex_save_bonus, CoverBonus::Unlimited);
    assert!(!result.can_be_targeted);
}

#[test]
fn single_pillar_in_line_gives_three_quarters_cover() {
    let cell_states = wall(&[(2, 2)]);
    let result = cover_across(&cell_states, &config());

    // Only the four sightlines skimming the bottom edge of the row clear the pillar.
    assert_eq!(result.blocked_lines, 12);
    assert_eq!(result.level, CoverLevel::ThreeQuarters);
    assert_eq!(result.ac_bonus, CoverBonus::Flat(5));
    assert!(result.can_be_targeted);
}

#[test]
fn difficult_terrain_gives_no_cover() {
    let cell_states: CellStateMap = (0..5)
        .map(|y| (CellCoord::new(2, y), CellState::Difficult))
        .collect();
    let result = cover_across(&cell_states, &config());
    assert_eq!(result.level, CoverLevel::None);
}

#[test]
fn occupants_do_not_cover_themselves() {
    let cell_states = wall(&[(0, 2), (4, 2)]);
    let result = cover_across(&cell_states, &config());
    assert_eq!(result.blocked_lines, 0);
}

#[test]
fn adding_walls_never_reduces_cover() {
    let attacker = CellCoord::new(1, 1);
    let target = CellCoord::new(7, 6);
    let additions = [(4, 3), (3, 3), (5, 4), (4, 4), (2, 2), (6, 5), (3, 2), (5, 5), (4, 2)];

    let mut cell_states = CellStateMap::new();
    let mut previous = calculate_cover(attacker, target, &cell_states, &config());
    for (x, y) in additions {
        cell_states.set(CellCoord::new(x, y), CellState::Blocked);
        let current = calculate_cover(attacker, target, &cell_states, &config());
        assert!(
            current.blocked_lines >= previous.blocked_lines,
            "blocking ({x}, {y}) reduced obstructed lines"
        );
        assert!(current.level >= previous.level);
        previous = current;
    }
}

#[test]
fn large_tokens_sight_past_a_single_pillar() {
    let cell_states = wall(&[(3, 3)]);
    let attacker = GridTokenData::new(TokenId::new(1), CellCoord::new(0, 2), 30).with_size(2);
    let target = GridTokenData::new(TokenId::new(2), CellCoord::new(5, 2), 30).with_size(2);

    let token_cover = calculate_token_cover(&attacker, &target, &cell_states, &config());
    let cell_cover = calculate_cover(attacker.cell(), target.cell(), &cell_states, &config());

    assert!(token_cover.blocked_lines < token_cover.total_lines);
    assert!(token_cover.level <= CoverLevel::ThreeQuarters);
    assert_eq!(cell_cover.total_lines, token_cover.total_lines);
}

#[test]
fn overlapping_tokens_have_no_cover() {
    let cell_states = wall(&[(3, 3)]);
    let attacker = GridTokenData::new(TokenId::new(1), CellCoord::new(2, 2), 30).with_size(2);
    let target = GridTokenData::new(TokenId::new(2), CellCoord::new(3, 3), 30);
    let result = calculate_token_cover(&attacker, &target, &cell_states, &config());
    assert_eq!(result.level, CoverLevel::None);
    assert!(result.can_be_targeted);
}

#[test]
fn disabled_grid_reports_no_cover() {
    let cell_states = wall(&[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);
    let disabled = config().with_grid_type(GridType::None);
    let result = cover_across(&cell_states, &disabled);
    assert_eq!(result.level, CoverLevel::None);
}

#[test]
fn cover_result_serializes_with_kebab_case_level() {
    let cell_states = wall(&[(2, 2)]);
    let result = cover_across(&cell_states, &config());
    let json = serde_json::to_value(result).expect("serialize");
    assert_eq!(json["level"], "three-quarters");
    assert_eq!(json["acBonus"]["flat"], 5);
    assert_eq!(json["canBeTargeted"], true);
}
