#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that answers grid geometry queries over a scenario file.

mod map_transfer;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tactical_grid_core::{
    AffectedCell, AoeShape, AreaOfEffect, CancelFlag, CellCoord, CellStateMap, GridConfig,
    PersistentZone, TokenId, Trigger,
};
use tactical_grid_system_area_of_effect::{affected_cells, tokens_in_area};
use tactical_grid_system_cover::{calculate_token_cover, CoverBonus};
use tactical_grid_system_distance::{distance_feet, euclidean_distance_feet};
use tactical_grid_system_line_of_sight::{line_of_sight, visible_cells};
use tactical_grid_system_movement::reachable_cells_with;
use tactical_grid_system_zones::{
    advance_zone_rounds, triggered_effects, zones_at_cell, RoundAdvance, TriggeredEffect,
    ZoneTerrain,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{map_transfer::MapSnapshot, scenario::Scenario};

/// Tactical grid geometry queries over a TOML scenario.
#[derive(Debug, Parser)]
#[command(name = "tactical-grid", version)]
struct Cli {
    /// Scenario file describing the grid, terrain, tokens and zones.
    #[arg(long, short, global = true)]
    scenario: Option<PathBuf>,
    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Cells a token can reach with its remaining movement.
    Reach {
        /// Token id from the scenario.
        #[arg(long)]
        token: u32,
    },
    /// Tabletop distance between two cells.
    Measure {
        /// Starting cell as `x,y`.
        #[arg(long)]
        from: CellCoord,
        /// Destination cell as `x,y`.
        #[arg(long)]
        to: CellCoord,
    },
    /// Cells and tokens covered by an area of effect.
    Aoe {
        /// Template shape.
        #[arg(long, value_enum)]
        shape: ShapeArg,
        /// Origin cell as `x,y`.
        #[arg(long)]
        at: CellCoord,
        /// Radius, length or side in feet.
        #[arg(long)]
        size: u32,
        /// Facing in degrees; 0 faces east.
        #[arg(long, allow_hyphen_values = true)]
        direction: Option<f64>,
    },
    /// Line of sight between two cells.
    Los {
        /// Observer cell as `x,y`.
        #[arg(long)]
        from: CellCoord,
        /// Observed cell as `x,y`.
        #[arg(long)]
        to: CellCoord,
    },
    /// Cells visible from a cell within a radius.
    Visible {
        /// Observer cell as `x,y`.
        #[arg(long)]
        from: CellCoord,
        /// Radius in cells.
        #[arg(long)]
        range: u32,
    },
    /// Cover a target token has against an attacking token.
    Cover {
        /// Attacking token id.
        #[arg(long)]
        attacker: u32,
        /// Target token id.
        #[arg(long)]
        target: u32,
    },
    /// Zones covering a cell and the effects they trigger.
    Zones {
        /// Cell as `x,y`.
        #[arg(long)]
        at: CellCoord,
        /// Only list effects firing on this trigger.
        #[arg(long, value_enum)]
        trigger: Option<TriggerArg>,
    },
    /// Advances timed zones by whole rounds.
    Advance {
        /// Rounds to advance.
        #[arg(long, default_value_t = 1)]
        rounds: u32,
    },
    /// Prints the map as a single-line transfer string.
    Export,
    /// Converts a transfer string back into scenario TOML.
    Import {
        /// Transfer string produced by `export`.
        transfer: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeArg {
    Cone,
    Line,
    Sphere,
    Cube,
}

impl From<ShapeArg> for AoeShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Cone => Self::Cone,
            ShapeArg::Line => Self::Line,
            ShapeArg::Sphere => Self::Sphere,
            ShapeArg::Cube => Self::Cube,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TriggerArg {
    OnEnter,
    OnStartTurn,
    OnEndTurn,
}

impl From<TriggerArg> for Trigger {
    fn from(trigger: TriggerArg) -> Self {
        match trigger {
            TriggerArg::OnEnter => Self::OnEnter,
            TriggerArg::OnStartTurn => Self::OnStartTurn,
            TriggerArg::OnEndTurn => Self::OnEndTurn,
        }
    }
}

/// Entry point for the tactical grid command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    let scenario_path = cli.scenario;
    let load = || Battlefield::load(scenario_path.as_deref());

    match cli.command {
        Command::Reach { token } => {
            let field = load()?;
            let token = field.scenario.token(token)?;
            let zones = field.scenario.zones();
            let terrain = ZoneTerrain::new(&field.cell_states, &zones, &field.config);
            let reachable = reachable_cells_with(
                &token,
                &field.config,
                |cell| terrain.state(cell),
                &CancelFlag::new(),
            );
            emit(json, &reachable, |cells| {
                cells
                    .iter()
                    .map(|cell| {
                        let path = join_cells(&cell.path);
                        format!("{} {} ft via {path}", cell.cell(), cell.cost_feet)
                    })
                    .collect()
            })
        }
        Command::Measure { from, to } => {
            let field = load()?;
            let report = Measurement {
                distance_feet: distance_feet(from, to, &field.config),
                straight_line_feet: euclidean_distance_feet(from, to, &field.config),
            };
            emit(json, &report, |report| {
                vec![format!(
                    "{from} -> {to}: {} ft ({:.1} ft straight line)",
                    report.distance_feet, report.straight_line_feet
                )]
            })
        }
        Command::Aoe {
            shape,
            at,
            size,
            direction,
        } => {
            let field = load()?;
            let mut aoe = AreaOfEffect::new(shape.into(), at, size);
            aoe.direction = direction;
            let report = AreaReport {
                cells: affected_cells(&aoe, &field.config),
                tokens: tokens_in_area(&aoe, &field.scenario.tokens(), &field.config),
            };
            emit(json, &report, |report| {
                let mut lines: Vec<String> = report
                    .cells
                    .iter()
                    .map(|cell| format!("{} {} ft", cell.cell(), cell.distance_feet))
                    .collect();
                for token in &report.tokens {
                    lines.push(format!("token {} caught", token.get()));
                }
                lines
            })
        }
        Command::Los { from, to } => {
            let field = load()?;
            let result = line_of_sight(from, to, &field.cell_states, &field.config);
            emit(json, &result, |result| {
                let verdict = match result.blocking_cell {
                    None if result.has_line_of_sight => "clear".to_owned(),
                    None => "no sight".to_owned(),
                    Some(cell) => format!("blocked at {cell}"),
                };
                vec![format!("{from} -> {to}: {verdict}"), join_cells(&result.path_cells)]
            })
        }
        Command::Visible { from, range } => {
            let field = load()?;
            let cells = visible_cells(from, range, &field.cell_states, &field.config);
            emit(json, &cells, |cells| cells.iter().map(ToString::to_string).collect())
        }
        Command::Cover { attacker, target } => {
            let field = load()?;
            let attacker = field.scenario.token(attacker)?;
            let target = field.scenario.token(target)?;
            let result =
                calculate_token_cover(&attacker, &target, &field.cell_states, &field.config);
            emit(json, &result, |result| {
                let bonus = match result.ac_bonus {
                    CoverBonus::Flat(bonus) => format!("+{bonus}"),
                    CoverBonus::Unlimited => "untargetable".to_owned(),
                };
                vec![format!(
                    "{:?} cover ({bonus}), {}/{} sightlines blocked",
                    result.level, result.blocked_lines, result.total_lines
                )]
            })
        }
        Command::Zones { at, trigger } => {
            let field = load()?;
            let zones = field.scenario.zones();
            let triggered = match trigger {
                Some(trigger) => triggered_effects(at, trigger.into(), &zones, &field.config),
                None => Vec::new(),
            };
            let report = ZoneReport {
                zones: zones_at_cell(at, &zones, &field.config),
                triggered,
            };
            emit(json, &report, |report| {
                let mut lines: Vec<String> =
                    report.zones.iter().map(|zone| describe(zone)).collect();
                for fired in &report.triggered {
                    lines.push(format!("{} fires {:?}", fired.zone.name, fired.effect.kind()));
                }
                lines
            })
        }
        Command::Advance { rounds } => {
            let field = load()?;
            let advance = advance_rounds(&field.scenario.zones(), rounds);
            emit(json, &advance, |advance| {
                let active = advance.active_zones.iter().map(describe);
                let expired = advance
                    .expired_zones
                    .iter()
                    .map(|zone| format!("expired: {}", zone.name));
                active.chain(expired).collect()
            })
        }
        Command::Export => {
            let field = load()?;
            let transfer = field
                .scenario
                .snapshot()?
                .encode()
                .context("failed to export map")?;
            emit(json, &ExportReport { transfer }, |report| vec![report.transfer.clone()])
        }
        Command::Import { transfer } => {
            let snapshot = MapSnapshot::decode(&transfer).context("failed to import map")?;
            let scenario = Scenario::from_snapshot(&snapshot)?;
            if json {
                return print_json(&scenario);
            }
            print!("{}", scenario.to_toml()?);
            Ok(())
        }
    }
}

/// Scenario together with the grid views every query needs.
struct Battlefield {
    scenario: Scenario,
    config: GridConfig,
    cell_states: CellStateMap,
}

impl Battlefield {
    fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.context("a scenario file is required; pass --scenario <path>")?;
        let scenario = Scenario::load(path)?;
        let config = scenario.grid_config()?;
        let cell_states = scenario.cell_states();
        tracing::debug!(
            scenario = %path.display(),
            cells = cell_states.len(),
            "loaded scenario"
        );
        Ok(Self {
            scenario,
            config,
            cell_states,
        })
    }
}

/// Advances zones `rounds` times, collecting every zone that expires on the way.
fn advance_rounds(zones: &[PersistentZone], rounds: u32) -> RoundAdvance {
    let mut total = RoundAdvance {
        active_zones: zones.to_vec(),
        expired_zones: Vec::new(),
    };
    for _ in 0..rounds {
        let step = advance_zone_rounds(&total.active_zones);
        total.active_zones = step.active_zones;
        total.expired_zones.extend(step.expired_zones);
    }
    total
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Measurement {
    distance_feet: u32,
    straight_line_feet: f64,
}

#[derive(Debug, Serialize)]
struct AreaReport {
    cells: Vec<AffectedCell>,
    tokens: Vec<TokenId>,
}

#[derive(Debug, Serialize)]
struct ZoneReport<'a> {
    zones: Vec<&'a PersistentZone>,
    triggered: Vec<TriggeredEffect<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportReport {
    transfer: String,
}

fn emit<T, F>(json: bool, value: &T, lines: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> Vec<String>,
{
    if json {
        return print_json(value);
    }
    for line in lines(value) {
        println!("{line}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render json output")?;
    println!("{rendered}");
    Ok(())
}

fn describe(zone: &PersistentZone) -> String {
    match zone.rounds_remaining() {
        Some(remaining) => format!("{} ({remaining} rounds left)", zone.name),
        None => format!("{} (permanent)", zone.name),
    }
}

fn join_cells(cells: &[CellCoord]) -> String {
    cells
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
