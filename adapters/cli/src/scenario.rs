//! TOML scenario files describing a battle map, its tokens and zones.

use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tactical_grid_core::{
    Ability, AoeShape, AreaOfEffect, CellCoord, CellRecord, CellStateMap, DamageSpec, GridConfig,
    GridTokenData, PersistentZone, SaveSpec, TokenId, Trigger, ZoneEffect, ZoneId,
    DEFAULT_FEET_PER_CELL,
};
use tactical_grid_system_zones::{damage_zone, difficult_terrain_zone, save_zone};

use crate::map_transfer::MapSnapshot;

const SUPPORTED_SCENARIO_VERSION: u32 = 1;
const DEFAULT_CELL_SIZE: f64 = 50.0;

/// Battle map loaded from a scenario file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Scenario {
    version: u32,
    grid: GridSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cells: Vec<CellRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tokens: Vec<TokenEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    zones: Vec<ZoneEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct GridSection {
    columns: u32,
    rows: u32,
    #[serde(default = "default_cell_size")]
    cell_size: f64,
    #[serde(default = "default_feet_per_cell")]
    feet_per_cell: u32,
    #[serde(default)]
    offset_x: f64,
    #[serde(default)]
    offset_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TokenEntry {
    id: u32,
    x: i32,
    y: i32,
    speed: u32,
    #[serde(default = "default_token_size")]
    size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    movement_remaining: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ZoneEntry {
    id: u32,
    name: String,
    shape: AoeShape,
    x: i32,
    y: i32,
    size_feet: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_round: Option<u32>,
    #[serde(default = "default_active")]
    active: bool,
    effects: Vec<EffectEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EffectEntry {
    DifficultTerrain,
    Damage {
        dice: String,
        damage_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<Trigger>,
    },
    SavingThrow {
        ability: Ability,
        dc: u32,
        trigger: Trigger,
        #[serde(default)]
        on_success: String,
        #[serde(default)]
        on_failure: String,
    },
    Custom {
        description: String,
    },
}

fn default_cell_size() -> f64 {
    DEFAULT_CELL_SIZE
}

fn default_feet_per_cell() -> u32 {
    DEFAULT_FEET_PER_CELL
}

fn default_token_size() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

impl Scenario {
    /// Loads and validates the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Parses and validates scenario TOML.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if scenario.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                scenario.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }

        let config = scenario.grid_config()?;
        for record in &scenario.cells {
            let cell = CellCoord::new(record.x, record.y);
            if !config.contains(cell) {
                bail!(
                    "cell {cell} lies outside the {}x{} grid",
                    scenario.grid.columns,
                    scenario.grid.rows
                );
            }
        }

        let mut token_ids = HashSet::new();
        for token in &scenario.tokens {
            if !token_ids.insert(token.id) {
                bail!("scenario contains duplicate token id {}", token.id);
            }
        }

        let mut zone_ids = HashSet::new();
        for zone in &scenario.zones {
            if !zone_ids.insert(zone.id) {
                bail!("scenario contains duplicate zone id {}", zone.id);
            }
            if zone.effects.is_empty() {
                bail!("zone {} '{}' has no effects", zone.id, zone.name);
            }
        }

        Ok(scenario)
    }

    /// Builds a scenario holding only the map carried by a transfer string.
    pub(crate) fn from_snapshot(snapshot: &MapSnapshot) -> Result<Self> {
        let config = &snapshot.config;
        let columns = u32::try_from(config.columns()).context("map has negative width")?;
        let rows = u32::try_from(config.rows()).context("map has negative height")?;
        Ok(Self {
            version: SUPPORTED_SCENARIO_VERSION,
            grid: GridSection {
                columns,
                rows,
                cell_size: config.cell_size,
                feet_per_cell: config.feet_per_cell,
                offset_x: config.offset_x,
                offset_y: config.offset_y,
            },
            cells: snapshot.cell_states.clone().into(),
            tokens: Vec::new(),
            zones: Vec::new(),
        })
    }

    /// Renders the scenario back to TOML.
    pub(crate) fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render scenario as toml")
    }

    /// Map geometry described by the `[grid]` section.
    pub(crate) fn grid_config(&self) -> Result<GridConfig> {
        let grid = &self.grid;
        let config = GridConfig::square(grid.columns, grid.rows, grid.cell_size)
            .with_offset(grid.offset_x, grid.offset_y)
            .with_feet_per_cell(grid.feet_per_cell);
        config.validate().context("invalid [grid] section")?;
        Ok(config)
    }

    /// Static terrain from the `[[cells]]` entries.
    pub(crate) fn cell_states(&self) -> CellStateMap {
        self.cells.clone().into()
    }

    /// Map geometry and terrain, ready for export.
    pub(crate) fn snapshot(&self) -> Result<MapSnapshot> {
        Ok(MapSnapshot {
            config: self.grid_config()?,
            cell_states: self.cell_states(),
        })
    }

    /// Every token on the map.
    pub(crate) fn tokens(&self) -> Vec<GridTokenData> {
        self.tokens.iter().map(TokenEntry::to_token).collect()
    }

    /// Token with the provided id.
    pub(crate) fn token(&self, id: u32) -> Result<GridTokenData> {
        self.tokens
            .iter()
            .find(|token| token.id == id)
            .map(TokenEntry::to_token)
            .with_context(|| format!("scenario has no token with id {id}"))
    }

    /// Every zone on the map, in file order.
    pub(crate) fn zones(&self) -> Vec<PersistentZone> {
        self.zones.iter().map(ZoneEntry::to_zone).collect()
    }
}

impl TokenEntry {
    fn to_token(&self) -> GridTokenData {
        let cell = CellCoord::new(self.x, self.y);
        let token =
            GridTokenData::new(TokenId::new(self.id), cell, self.speed).with_size(self.size);
        match self.movement_remaining {
            Some(remaining) => token.with_movement_remaining(remaining),
            None => token,
        }
    }
}

impl ZoneEntry {
    fn to_zone(&self) -> PersistentZone {
        let origin = CellCoord::new(self.x, self.y);
        let mut area = AreaOfEffect::new(self.shape, origin, self.size_feet);
        area.direction = self.direction;

        let id = ZoneId::new(self.id);
        let name = self.name.clone();
        let effects: Vec<ZoneEffect> = self.effects.iter().map(EffectEntry::to_effect).collect();
        // the first effect picks the preset and its overlay colour
        let mut zone = match effects.first() {
            Some(ZoneEffect::DifficultTerrain) => {
                difficult_terrain_zone(id, name, &area, self.duration_rounds)
            }
            Some(ZoneEffect::Damage { trigger, damage }) => {
                damage_zone(id, name, &area, damage.clone(), *trigger, self.duration_rounds)
            }
            Some(ZoneEffect::SavingThrow { trigger, save }) => {
                save_zone(id, name, &area, save.clone(), *trigger, self.duration_rounds)
            }
            Some(ZoneEffect::Custom { .. }) | None => {
                let mut zone = PersistentZone::new(id, name, &area);
                zone.duration_rounds = self.duration_rounds;
                zone
            }
        };
        zone.effects = effects;
        zone.current_round = self.current_round;
        zone.is_active = self.active;
        zone
    }
}

impl EffectEntry {
    fn to_effect(&self) -> ZoneEffect {
        match self {
            Self::DifficultTerrain => ZoneEffect::DifficultTerrain,
            Self::Damage {
                dice,
                damage_type,
                trigger,
            } => ZoneEffect::Damage {
                trigger: *trigger,
                damage: DamageSpec {
                    dice_expression: dice.clone(),
                    damage_type: damage_type.clone(),
                },
            },
            Self::SavingThrow {
                ability,
                dc,
                trigger,
                on_success,
                on_failure,
            } => ZoneEffect::SavingThrow {
                trigger: *trigger,
                save: SaveSpec {
                    ability: *ability,
                    dc: *dc,
                    on_success: on_success.clone(),
                    on_failure: on_failure.clone(),
                },
            },
            Self::Custom { description } => ZoneEffect::Custom {
                custom_description: description.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactical_grid_core::{CellState, EffectKind};
    use tactical_grid_system_zones::DAMAGE_COLOR;

    const SKIRMISH: &str = r#"
version = 1

[grid]
columns = 10
rows = 8
feet_per_cell = 5

[[cells]]
x = 4
y = 2
state = "blocked"

[[cells]]
x = 5
y = 5
state = "difficult"

[[tokens]]
id = 1
x = 0
y = 0
speed = 30

[[tokens]]
id = 2
x = 7
y = 3
speed = 25
size = 2
movement_remaining = 10

[[zones]]
id = 1
name = "Wall of Fire"
shape = "line"
x = 2
y = 6
size_feet = 20
duration_rounds = 10
effects = [
    { type = "damage", dice = "5d8", damage_type = "fire", trigger = "on_end_turn" },
    { type = "custom", description = "sheds bright light for 20 feet" },
]

[[zones]]
id = 2
name = "Web"
shape = "cube"
x = 6
y = 0
size_feet = 10
active = false
effects = [{ type = "difficult_terrain" }]

[[zones]]
id = 3
name = "Stinking Cloud"
shape = "sphere"
x = 3
y = 3
size_feet = 10
effects = [{ type = "saving_throw", ability = "con", dc = 13, trigger = "on_start_turn" }]
"#;

    #[test]
    fn parses_every_section() {
        let scenario = Scenario::parse(SKIRMISH).expect("scenario parses");
        let config = scenario.grid_config().expect("grid is valid");
        assert_eq!(config.columns(), 10);
        assert_eq!(config.rows(), 8);
        assert!((config.cell_size - DEFAULT_CELL_SIZE).abs() < f64::EPSILON);

        let cell_states = scenario.cell_states();
        assert_eq!(cell_states.state(CellCoord::new(4, 2)), CellState::Blocked);
        assert_eq!(cell_states.state(CellCoord::new(5, 5)), CellState::Difficult);

        let tokens = scenario.tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].movement_remaining, 30);
        assert_eq!(tokens[1].footprint_size(), 2);
        assert_eq!(tokens[1].movement_remaining, 10);
    }

    #[test]
    fn zones_are_built_from_presets() {
        let zones = Scenario::parse(SKIRMISH).expect("scenario parses").zones();
        assert_eq!(zones.len(), 3);

        assert!(matches!(
            &zones[0].effects[..],
            [ZoneEffect::Damage {
                trigger: Some(Trigger::OnEndTurn),
                damage,
            }, ZoneEffect::Custom { custom_description }]
                if damage.dice_expression == "5d8" && custom_description.contains("bright light")
        ));
        assert_eq!(zones[0].color, DAMAGE_COLOR);
        assert_eq!(zones[0].duration_rounds, Some(10));
        assert!(zones[1].has_effect(EffectKind::DifficultTerrain));
        assert!(!zones[1].is_active);
        assert!(zones[2].has_effect(EffectKind::SavingThrow));
        assert!(zones[2].is_permanent());
    }

    #[test]
    fn token_lookup_reports_missing_ids() {
        let scenario = Scenario::parse(SKIRMISH).expect("scenario parses");
        assert_eq!(scenario.token(2).expect("token exists").cell(), CellCoord::new(7, 3));
        assert!(scenario.token(9).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let error = Scenario::parse("version = 2\n[grid]\ncolumns = 4\nrows = 4\n")
            .expect_err("version 2 is unsupported");
        assert!(error.to_string().contains("unsupported scenario version"));
    }

    #[test]
    fn rejects_cells_outside_the_grid() {
        let contents = "version = 1\n[grid]\ncolumns = 4\nrows = 4\n\n[[cells]]\nx = 4\ny = 0\nstate = \"blocked\"\n";
        assert!(Scenario::parse(contents).is_err());
    }

    #[test]
    fn rejects_duplicate_token_ids() {
        let contents = "version = 1\n[grid]\ncolumns = 4\nrows = 4\n\n[[tokens]]\nid = 1\nx = 0\ny = 0\nspeed = 30\n\n[[tokens]]\nid = 1\nx = 1\ny = 1\nspeed = 30\n";
        assert!(Scenario::parse(contents).is_err());
    }

    #[test]
    fn custom_only_zone_keeps_its_description() {
        let contents = r#"
version = 1
[grid]
columns = 4
rows = 4

[[zones]]
id = 9
name = "Silence"
shape = "sphere"
x = 2
y = 2
size_feet = 5
duration_rounds = 3
effects = [{ type = "custom", description = "no sound inside" }]
"#;
        let zones = Scenario::parse(contents).expect("scenario parses").zones();
        assert_eq!(
            zones[0].effects,
            vec![ZoneEffect::Custom {
                custom_description: "no sound inside".to_owned()
            }]
        );
        assert_eq!(zones[0].duration_rounds, Some(3));
        assert!(zones[0].has_effect(EffectKind::Custom));
    }

    #[test]
    fn rejects_zone_without_effects() {
        let contents = "version = 1\n[grid]\ncolumns = 4\nrows = 4\n\n[[zones]]\nid = 1\nname = \"Empty\"\nshape = \"sphere\"\nx = 1\ny = 1\nsize_feet = 5\neffects = []\n";
        let error = Scenario::parse(contents).expect_err("zone without effects");
        assert!(error.to_string().contains("has no effects"));
    }

    #[test]
    fn rejects_zero_feet_per_cell() {
        let contents = "version = 1\n[grid]\ncolumns = 4\nrows = 4\nfeet_per_cell = 0\n";
        assert!(Scenario::parse(contents).is_err());
    }

    #[test]
    fn map_only_scenario_renders_back_to_toml() {
        let scenario = Scenario::parse(SKIRMISH).expect("scenario parses");
        let snapshot = scenario.snapshot().expect("snapshot builds");
        let rebuilt = Scenario::from_snapshot(&snapshot).expect("scenario rebuilds");

        let rendered = rebuilt.to_toml().expect("renders");
        let reparsed = Scenario::parse(&rendered).expect("rendered toml parses");
        assert_eq!(reparsed, rebuilt);
        assert_eq!(reparsed.cell_states(), scenario.cell_states());
        assert!(reparsed.tokens().is_empty());
    }
}
