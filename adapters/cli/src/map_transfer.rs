//! Single-line transfer strings for sharing a battle map between sessions.
//!
//! The format is `grid:v1:<columns>x<rows>:<payload>` where the payload is
//! unpadded base64 over a JSON document carrying the cell geometry and the
//! non-free cell states.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tactical_grid_core::{CellCoord, CellStateMap, ConfigError, GridConfig};
use thiserror::Error;

const TRANSFER_DOMAIN: &str = "grid";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded map payload.
pub(crate) const TRANSFER_HEADER: &str = "grid:v1";
const FIELD_DELIMITER: char = ':';

/// Grid configuration and terrain captured by a transfer string.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MapSnapshot {
    pub(crate) config: GridConfig,
    pub(crate) cell_states: CellStateMap,
}

impl MapSnapshot {
    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, TransferError> {
        let columns = dimension(self.config.columns())?;
        let rows = dimension(self.config.rows())?;
        let payload = Payload {
            cell_size: self.config.cell_size,
            feet_per_cell: self.config.feet_per_cell,
            offset_x: self.config.offset_x,
            offset_y: self.config.offset_y,
            cells: self.cell_states.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(TransferError::Encode)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{TRANSFER_HEADER}:{columns}x{rows}:{encoded}"))
    }

    /// Decodes a snapshot from its transfer string.
    pub(crate) fn decode(value: &str) -> Result<Self, TransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
        let version = parts.next().ok_or(TransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(TransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(TransferError::MissingPayload)?;

        if domain != TRANSFER_DOMAIN {
            return Err(TransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != TRANSFER_VERSION {
            return Err(TransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(TransferError::InvalidEncoding)?;
        let decoded: Payload =
            serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

        let config = GridConfig::square(columns, rows, decoded.cell_size)
            .with_offset(decoded.offset_x, decoded.offset_y)
            .with_feet_per_cell(decoded.feet_per_cell);
        config.validate()?;

        if let Some((cell, _)) = decoded
            .cells
            .iter()
            .find(|(cell, _)| !config.contains(*cell))
        {
            return Err(TransferError::CellOutOfBounds { cell, columns, rows });
        }

        Ok(Self {
            config,
            cell_states: decoded.cells,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    cell_size: f64,
    feet_per_cell: u32,
    #[serde(default)]
    offset_x: f64,
    #[serde(default)]
    offset_y: f64,
    cells: CellStateMap,
}

/// Errors that can occur while encoding or decoding map transfer strings.
#[derive(Debug, Error)]
pub(crate) enum TransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("transfer string was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("transfer string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("transfer string is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("transfer string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("transfer string is missing the payload")]
    MissingPayload,
    /// The string used an unexpected prefix.
    #[error("transfer prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The string used an unsupported version.
    #[error("transfer version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode map payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse map payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// The payload could not be serialised.
    #[error("could not encode map payload: {0}")]
    Encode(#[source] serde_json::Error),
    /// The decoded geometry does not form a usable grid.
    #[error("map geometry is invalid: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// A recorded cell lies outside the map.
    #[error("cell {cell} lies outside the {columns}x{rows} map")]
    CellOutOfBounds {
        /// Offending cell.
        cell: CellCoord,
        /// Map width in cells.
        columns: u32,
        /// Map height in cells.
        rows: u32,
    },
}

fn dimension(cells: i32) -> Result<u32, TransferError> {
    u32::try_from(cells)
        .ok()
        .filter(|cells| *cells > 0)
        .ok_or_else(|| TransferError::InvalidDimensions(cells.to_string()))
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), TransferError> {
    let invalid = || TransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}
