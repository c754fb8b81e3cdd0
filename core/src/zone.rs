//! Persistent zone descriptors owned by the combat UI.

use serde::{Deserialize, Serialize};

use crate::{AoeShape, AreaOfEffect, CellCoord, TokenId};

/// Unique identifier assigned to a persistent zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(u32);

impl ZoneId {
    /// Creates a new zone identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Colour used by the UI when drawing a zone overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl ZoneColor {
    /// Creates a new zone colour from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the colour.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the colour.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the colour.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// Moment during a turn at which a zone effect activates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// A creature enters the zone.
    OnEnter,
    /// A creature starts its turn inside the zone.
    OnStartTurn,
    /// A creature ends its turn inside the zone.
    OnEndTurn,
}

/// Ability score used for a saving throw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Strength.
    #[serde(rename = "str")]
    Strength,
    /// Dexterity.
    #[serde(rename = "dex")]
    Dexterity,
    /// Constitution.
    #[serde(rename = "con")]
    Constitution,
    /// Intelligence.
    #[serde(rename = "int")]
    Intelligence,
    /// Wisdom.
    #[serde(rename = "wis")]
    Wisdom,
    /// Charisma.
    #[serde(rename = "cha")]
    Charisma,
}

/// Damage dealt by a zone. The dice are rolled by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageSpec {
    /// Dice expression such as `2d6`.
    pub dice_expression: String,
    /// Damage type such as `fire`.
    pub damage_type: String,
}

/// Saving throw demanded by a zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSpec {
    /// Ability used for the save.
    pub ability: Ability,
    /// Difficulty class of the save.
    pub dc: u32,
    /// Narrative outcome of a successful save.
    pub on_success: String,
    /// Narrative outcome of a failed save.
    pub on_failure: String,
}

/// Effect carried by a persistent zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneEffect {
    /// Cells in the zone count as difficult terrain.
    DifficultTerrain,
    /// Creatures take damage when the trigger fires.
    Damage {
        /// Timing of the damage; absent means [`Trigger::OnEnter`].
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<Trigger>,
        /// Damage dealt.
        damage: DamageSpec,
    },
    /// Creatures must save when the trigger fires.
    SavingThrow {
        /// Timing of the save.
        trigger: Trigger,
        /// Save demanded.
        save: SaveSpec,
    },
    /// Free-form effect adjudicated by the game master.
    Custom {
        /// Description shown to the table.
        #[serde(rename = "customDescription")]
        custom_description: String,
    },
}

impl ZoneEffect {
    /// Variant of the effect without its payload.
    #[must_use]
    pub const fn kind(&self) -> EffectKind {
        match self {
            Self::DifficultTerrain => EffectKind::DifficultTerrain,
            Self::Damage { .. } => EffectKind::Damage,
            Self::SavingThrow { .. } => EffectKind::SavingThrow,
            Self::Custom { .. } => EffectKind::Custom,
        }
    }

    /// Trigger at which the effect fires.
    ///
    /// Damage without an explicit trigger fires on enter. Difficult terrain
    /// and custom effects carry no trigger.
    #[must_use]
    pub const fn effective_trigger(&self) -> Option<Trigger> {
        match self {
            Self::Damage { trigger, .. } => match trigger {
                Some(trigger) => Some(*trigger),
                None => Some(Trigger::OnEnter),
            },
            Self::SavingThrow { trigger, .. } => Some(*trigger),
            Self::DifficultTerrain | Self::Custom { .. } => None,
        }
    }
}

/// Payload-free discriminant of a [`ZoneEffect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// [`ZoneEffect::DifficultTerrain`].
    DifficultTerrain,
    /// [`ZoneEffect::Damage`].
    Damage,
    /// [`ZoneEffect::SavingThrow`].
    SavingThrow,
    /// [`ZoneEffect::Custom`].
    Custom,
}

/// Named, optionally timed area effect tracked across combat rounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentZone {
    /// Identifier of the zone.
    pub id: ZoneId,
    /// Display name of the zone.
    pub name: String,
    /// Shape covered by the zone.
    pub shape: AoeShape,
    /// Column of the zone's origin cell.
    pub origin_x: i32,
    /// Row of the zone's origin cell.
    pub origin_y: i32,
    /// Size of the zone in feet.
    pub size_feet: u32,
    /// Facing in degrees for directional shapes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    /// Effects applied to creatures in the zone.
    pub effects: Vec<ZoneEffect>,
    /// Overlay colour.
    pub color: ZoneColor,
    /// Overlay opacity in the range `0.0..=1.0`.
    pub opacity: f32,
    /// Number of rounds the zone lasts; absent means permanent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_rounds: Option<u32>,
    /// Rounds elapsed since the zone was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
    /// Token that created the zone, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<TokenId>,
    /// Whether the zone currently participates in cell queries.
    pub is_active: bool,
}

impl PersistentZone {
    /// Creates an active, permanent zone covering `area` with no effects.
    #[must_use]
    pub fn new(id: ZoneId, name: impl Into<String>, area: &AreaOfEffect) -> Self {
        Self {
            id,
            name: name.into(),
            shape: area.shape,
            origin_x: area.origin_x,
            origin_y: area.origin_y,
            size_feet: area.size_feet,
            direction: area.direction,
            effects: Vec::new(),
            color: ZoneColor::from_rgb(255, 255, 255),
            opacity: 0.3,
            duration_rounds: None,
            current_round: None,
            source_id: None,
            is_active: true,
        }
    }

    /// Appends an effect to the zone.
    #[must_use]
    pub fn with_effect(mut self, effect: ZoneEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Limits the zone to the provided number of rounds.
    #[must_use]
    pub fn with_duration(mut self, rounds: u32) -> Self {
        self.duration_rounds = Some(rounds);
        self
    }

    /// Records the token that created the zone.
    #[must_use]
    pub fn with_source(mut self, source: TokenId) -> Self {
        self.source_id = Some(source);
        self
    }

    /// Overrides the overlay colour and opacity.
    #[must_use]
    pub fn with_color(mut self, color: ZoneColor, opacity: f32) -> Self {
        self.color = color;
        self.opacity = opacity;
        self
    }

    /// Area of effect covered by the zone.
    #[must_use]
    pub fn area(&self) -> AreaOfEffect {
        AreaOfEffect {
            shape: self.shape,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            size_feet: self.size_feet,
            direction: self.direction,
        }
    }

    /// Origin cell of the zone.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        CellCoord::new(self.origin_x, self.origin_y)
    }

    /// Returns `true` when the zone has no duration.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.duration_rounds.is_none()
    }

    /// Rounds left before the zone expires, if it has a duration.
    #[must_use]
    pub fn rounds_remaining(&self) -> Option<u32> {
        self.duration_rounds
            .map(|duration| duration.saturating_sub(self.current_round.unwrap_or(0)))
    }

    /// Reports whether the zone carries an effect of the provided kind.
    #[must_use]
    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind() == kind)
    }
}
