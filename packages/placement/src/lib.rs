#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cell-sector placement for one loaded dataset.
//!
//! A [`PlacementSession`] turns call records into map entities. Each
//! distinct [`SectorKey`] becomes exactly one entity the first time a
//! record references it; later references resolve to that same entity.
//! Target and interlocutor entities of the same call are linked in both
//! directions so a presentation layer can draw the connection.
//!
//! Sessions are single-use. Build a new one for every load so that no
//! sector or color assignment leaks from one dataset into the next.

pub mod color;
pub mod key;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDateTime;
use erb_map_erb_models::{CallEvent, CellSite, LegRole, RecordOrigin, is_numeric_line};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

pub use color::{Color, ColorAllocator, DEFAULT_PALETTE, ExhaustionPolicy};
pub use key::SectorKey;

/// Weight given to every heatmap point.
pub const HEAT_WEIGHT: f64 = 0.5;

/// Placement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Record origins whose interlocutor leg is never placed.
    pub skip_interlocutor_origins: Vec<RecordOrigin>,
    /// Seed for color draws. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// What new groups get once the palette is used up.
    pub exhaustion: ExhaustionPolicy,
    /// Colors to draw from.
    pub palette: Vec<Color>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            skip_interlocutor_origins: vec![RecordOrigin::Connections],
            seed: None,
            exhaustion: ExhaustionPolicy::default(),
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

/// Identifier of a placed entity, unique within one session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rendered cell sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedEntity {
    /// Entity identifier.
    pub id: EntityId,
    /// Leg that first referenced the sector.
    pub role: LegRole,
    /// Deduplication key.
    pub key: SectorKey,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Azimuth in degrees; 0 when missing or not numeric.
    pub azimuth: f64,
    /// Color group (the target line).
    pub group: String,
    /// Line that owns this leg.
    pub line: String,
    /// Group color.
    pub color: Color,
    /// Origin of the first record.
    pub origin: RecordOrigin,
    /// Cell identifier.
    pub cell_label: Option<String>,
    /// City served by the cell.
    pub city: Option<String>,
    /// Feed line of the first record.
    pub first_line_number: usize,
    /// Timestamp of the first record.
    pub first_seen: Option<NaiveDateTime>,
    /// Entities on the other end of calls through this sector.
    pub linked: BTreeSet<EntityId>,
}

/// Why a leg was not placed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// The record has no cell for this leg.
    NoCell,
    /// The record's origin excludes the interlocutor leg.
    ExcludedOrigin,
    /// Latitude is missing or blank.
    MissingLatitude,
    /// The leg's line is missing or not all digits.
    NonNumericLine,
    /// Latitude or longitude is not a number.
    InvalidCoordinates,
}

/// Outcome of offering one leg to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementDecision {
    /// A new entity was created.
    Place(EntityId),
    /// The sector already had an entity.
    AlreadyPlaced(EntityId),
    /// The leg was not placed.
    Skipped(SkipReason),
}

impl PlacementDecision {
    /// The entity this leg resolved to, if any.
    #[must_use]
    pub const fn entity(self) -> Option<EntityId> {
        match self {
            Self::Place(id) | Self::AlreadyPlaced(id) => Some(id),
            Self::Skipped(_) => None,
        }
    }
}

/// Decisions for every leg of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPlacement {
    /// Target cell at call start.
    pub target: PlacementDecision,
    /// Target cell at call end, when the record has one.
    pub target_final: Option<PlacementDecision>,
    /// Interlocutor cell.
    pub interlocutor: PlacementDecision,
}

/// A weighted heatmap point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Point weight.
    pub weight: f64,
}

/// Leg counts for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementCounters {
    /// Legs that created an entity.
    pub placed: u64,
    /// Legs that resolved to an existing entity.
    pub already_placed: u64,
    /// Legs not placed, by reason.
    pub skipped: BTreeMap<SkipReason, u64>,
}

impl PlacementCounters {
    /// Total number of skipped legs.
    #[must_use]
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }
}

/// Everything a session produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementOutput {
    /// Entities in placement order.
    pub entities: Vec<PlacedEntity>,
    /// Color per group.
    pub colors: BTreeMap<String, Color>,
    /// One point per target-side entity.
    pub heat_points: Vec<HeatPoint>,
    /// Leg counts.
    pub counters: PlacementCounters,
}

/// Placement state for one load.
#[derive(Debug)]
pub struct PlacementSession {
    skip_interlocutor_origins: Vec<RecordOrigin>,
    seen: HashMap<SectorKey, EntityId>,
    entities: Vec<PlacedEntity>,
    colors: ColorAllocator,
    counters: PlacementCounters,
}

impl PlacementSession {
    /// Starts an empty session.
    #[must_use]
    pub fn new(config: &PlacementConfig) -> Self {
        Self {
            skip_interlocutor_origins: config.skip_interlocutor_origins.clone(),
            seen: HashMap::new(),
            entities: Vec::new(),
            colors: ColorAllocator::new(&config.palette, config.exhaustion, config.seed),
            counters: PlacementCounters::default(),
        }
    }

    /// Offers one leg of `event` for placement.
    ///
    /// Legs with no usable cell or line are skipped without marking their
    /// sector as seen, so a later valid record for the same sector still
    /// places it.
    pub fn place_or_skip(&mut self, role: LegRole, event: &CallEvent) -> PlacementDecision {
        let decision = match self.check(role, event) {
            // A skipped leg leaves its sector unclaimed; a later valid leg
            // at the same key still places it.
            Err(reason) => PlacementDecision::Skipped(reason),
            Ok((cell, line, latitude, longitude)) => {
                let key = SectorKey::from_cell(cell);
                if let Some(id) = self.seen.get(&key) {
                    PlacementDecision::AlreadyPlaced(*id)
                } else {
                    let id = self.insert(role, event, cell, key, line, latitude, longitude);
                    PlacementDecision::Place(id)
                }
            }
        };

        match decision {
            PlacementDecision::Place(_) => self.counters.placed += 1,
            PlacementDecision::AlreadyPlaced(_) => self.counters.already_placed += 1,
            PlacementDecision::Skipped(reason) => {
                log::debug!(
                    "Skipped {role} leg of line {}: {reason}",
                    event.line_number
                );
                *self.counters.skipped.entry(reason).or_default() += 1;
            }
        }

        decision
    }

    /// Places every leg of `event` and links the target to the
    /// interlocutor when both resolve to an entity.
    pub fn place_event(&mut self, event: &CallEvent) -> EventPlacement {
        let target = self.place_or_skip(LegRole::Target, event);
        let target_final = event
            .final_target_cell
            .is_some()
            .then(|| self.place_or_skip(LegRole::TargetFinal, event));
        let interlocutor = self.place_or_skip(LegRole::Interlocutor, event);

        if let (Some(a), Some(b)) = (target.entity(), interlocutor.entity()) {
            self.link(a, b);
        }

        EventPlacement {
            target,
            target_final,
            interlocutor,
        }
    }

    /// Entities placed so far.
    #[must_use]
    pub fn entities(&self) -> &[PlacedEntity] {
        &self.entities
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&PlacedEntity> {
        self.entities.get(id.0 as usize)
    }

    /// Ends the session.
    #[must_use]
    pub fn finish(self) -> PlacementOutput {
        let heat_points = self
            .entities
            .iter()
            .filter(|e| e.role.is_target_side())
            .map(|e| HeatPoint {
                latitude: e.latitude,
                longitude: e.longitude,
                weight: HEAT_WEIGHT,
            })
            .collect();

        PlacementOutput {
            entities: self.entities,
            colors: self.colors.into_assignments(),
            heat_points,
            counters: self.counters,
        }
    }

    fn check<'e>(
        &self,
        role: LegRole,
        event: &'e CallEvent,
    ) -> Result<(&'e CellSite, &'e str, f64, f64), SkipReason> {
        if role == LegRole::Interlocutor && self.skip_interlocutor_origins.contains(&event.origin) {
            return Err(SkipReason::ExcludedOrigin);
        }
        let cell = event.cell(role).ok_or(SkipReason::NoCell)?;
        if !cell.has_latitude() {
            return Err(SkipReason::MissingLatitude);
        }
        let line = event
            .line(role)
            .map(str::trim)
            .filter(|l| is_numeric_line(l))
            .ok_or(SkipReason::NonNumericLine)?;
        let (Some(latitude), Some(longitude)) = (cell.latitude_deg(), cell.longitude_deg()) else {
            return Err(SkipReason::InvalidCoordinates);
        };
        Ok((cell, line, latitude, longitude))
    }

    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        role: LegRole,
        event: &CallEvent,
        cell: &CellSite,
        key: SectorKey,
        line: &str,
        latitude: f64,
        longitude: f64,
    ) -> EntityId {
        #[allow(clippy::cast_possible_truncation)]
        let id = EntityId(self.entities.len() as u32);
        let group = event
            .target_line
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(line)
            .to_string();
        let color = self.colors.color_for(&group);

        self.seen.insert(key.clone(), id);
        self.entities.push(PlacedEntity {
            id,
            role,
            key,
            latitude,
            longitude,
            azimuth: cell.azimuth_deg().unwrap_or(0.0),
            group,
            line: line.to_string(),
            color,
            origin: event.origin,
            cell_label: cell.label.clone(),
            city: cell.city.clone(),
            first_line_number: event.line_number,
            first_seen: event.occurred_at(),
            linked: BTreeSet::new(),
        });
        id
    }

    fn link(&mut self, a: EntityId, b: EntityId) {
        if a == b {
            return;
        }
        if let Some(entity) = self.entities.get_mut(a.0 as usize) {
            entity.linked.insert(b);
        }
        if let Some(entity) = self.entities.get_mut(b.0 as usize) {
            entity.linked.insert(a);
        }
    }
}
