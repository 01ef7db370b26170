//! Battle log model - the events a dungeon run resolves into

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Lenient field decoding
// ============================================================================
//
// Every field goes through `Value` first. A null or wrong-typed field falls
// back to its default and the rest of the event is kept.

/// Any JSON number, rounded. Anything else reads as 0.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(|n| n.round() as i64).unwrap_or_default())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64().unwrap_or_default())
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn count_from(value: &Value) -> Option<u32> {
    value
        .as_f64()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round().min(u32::MAX as f64) as u32)
}

/// Non-negative count; negative, fractional-negative and non-numeric values
/// read as absent.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(count_from(&Value::deserialize(deserializer)?))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(count_from(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or_default())
}

fn lenient_opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_bool())
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

/// Whole nested value, or its default if it does not fit.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn list_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                tracing::warn!(%error, "dropping malformed list entry");
                None
            }
        })
        .collect()
}

/// An array with bad entries dropped; anything else is an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_opt_list(deserializer)?.unwrap_or_default())
}

/// Like `lenient_list`, but a missing or non-array roster stays absent.
fn lenient_opt_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(list_items(items)),
        _ => None,
    })
}

// ============================================================================
// Combatants
// ============================================================================

/// Named stat bag. The common stats get their own fields; anything else the
/// resolver sends is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Stats {
    #[serde(deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub attack: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub vitality: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Stats {
    /// Look up a stat by name, including extra numeric fields.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "attack" => self.attack,
            "vitality" => self.vitality,
            "speed" => self.speed,
            other => self.extra.get(other).and_then(Value::as_f64),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Skill {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u32>,
}

/// Skills keyed by tier. Only `basic` is expected on every unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Skills {
    #[serde(deserialize_with = "lenient_opt", skip_serializing_if = "Option::is_none")]
    pub basic: Option<Skill>,
    #[serde(deserialize_with = "lenient_opt", skip_serializing_if = "Option::is_none")]
    pub advanced: Option<Skill>,
    #[serde(deserialize_with = "lenient_opt", skip_serializing_if = "Option::is_none")]
    pub ultimate: Option<Skill>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Skill>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusEffect {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub effect_type: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: f64,
    /// Rounds remaining
    #[serde(deserialize_with = "lenient_u32")]
    pub duration: u32,
    #[serde(deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A combatant snapshot as the resolver reported it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct BattleUnit {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_int")]
    #[schemars(with = "i64")]
    pub hp: i64,
    #[serde(deserialize_with = "lenient_int")]
    #[schemars(with = "i64")]
    pub max_hp: i64,
    #[serde(deserialize_with = "lenient")]
    pub stats: Stats,
    #[serde(deserialize_with = "lenient")]
    pub skills: Skills,
    #[serde(deserialize_with = "lenient_list")]
    pub status_effects: Vec<StatusEffect>,
}

impl BattleUnit {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Health clamped to `0..=max_hp` for display.
    pub fn display_hp(&self) -> i64 {
        self.hp.clamp(0, self.max_hp.max(0))
    }

    /// Fraction of health remaining, `0.0..=1.0`.
    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.display_hp() as f64 / self.max_hp as f64
    }
}

// ============================================================================
// Events
// ============================================================================

/// One atomic action inside a round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct BattleAction {
    #[serde(deserialize_with = "lenient_string")]
    pub actor: String,
    #[serde(deserialize_with = "lenient_string")]
    pub skill: String,
    #[serde(deserialize_with = "lenient_string")]
    pub target: String,
    #[serde(deserialize_with = "lenient_int")]
    #[schemars(with = "i64")]
    pub damage: i64,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_critical: bool,
    #[serde(deserialize_with = "lenient_opt_bool", skip_serializing_if = "Option::is_none")]
    pub is_healing: Option<bool>,
    /// Literal narration that replaces the generated line.
    #[serde(deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "type",
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
}

impl BattleAction {
    pub fn is_heal(&self) -> bool {
        self.is_healing == Some(true) || self.kind.as_deref() == Some("heal")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct BattleStart {
    #[serde(deserialize_with = "lenient_opt_list", skip_serializing_if = "Option::is_none")]
    pub allies: Option<Vec<BattleUnit>>,
    #[serde(deserialize_with = "lenient_opt_list", skip_serializing_if = "Option::is_none")]
    pub enemies: Option<Vec<BattleUnit>>,
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub total_stages: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RoundEvent {
    #[serde(
        alias = "round",
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<u32>,
    #[serde(deserialize_with = "lenient_list")]
    pub actions: Vec<BattleAction>,
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub remaining_allies: Option<u32>,
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub remaining_enemies: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StageStart {
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<u32>,
    #[serde(deserialize_with = "lenient_opt_list", skip_serializing_if = "Option::is_none")]
    pub enemies: Option<Vec<BattleUnit>>,
    #[serde(deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StageComplete {
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<u32>,
    /// Survivors carried into the next stage.
    #[serde(deserialize_with = "lenient_opt_list", skip_serializing_if = "Option::is_none")]
    pub alive_allies: Option<Vec<BattleUnit>>,
    #[serde(deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SystemMessage {
    #[serde(deserialize_with = "lenient_string")]
    pub message: String,
}

/// Final result of a run, shared by `battle_end` and `dungeon_complete`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct BattleOutcome {
    #[serde(deserialize_with = "lenient_opt_bool", skip_serializing_if = "Option::is_none")]
    pub victory: Option<bool>,
    #[serde(
        alias = "stagesCompleted",
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_stages: Option<u32>,
    #[serde(deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub total_stages: Option<u32>,
    #[serde(deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A single entry of the battle log, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEvent {
    #[serde(alias = "init")]
    BattleStart(BattleStart),
    Round(RoundEvent),
    StageStart(StageStart),
    StageComplete(StageComplete),
    SystemMessage(SystemMessage),
    BattleEnd(BattleOutcome),
    DungeonComplete(BattleOutcome),
    /// Tags this viewer does not know about
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(thiserror::Error, Debug)]
pub enum LogParseError {
    #[error("battle log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("battle log has no event array")]
    MissingEvents,
}

/// Parse a recorded log: either a bare event array or an object with a
/// `battleLog` array.
pub fn parse_log(input: &str) -> Result<Vec<BattleEvent>, LogParseError> {
    let document: Value = serde_json::from_str(input)?;
    events_from_value(document)
}

pub fn events_from_value(document: Value) -> Result<Vec<BattleEvent>, LogParseError> {
    let raw = match document {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove("battleLog") {
            Some(Value::Array(items)) => items,
            _ => return Err(LogParseError::MissingEvents),
        },
        _ => return Err(LogParseError::MissingEvents),
    };
    Ok(decode_events(raw))
}

/// Decode each event on its own. Bad fields fall back to their defaults;
/// only entries that are not tagged objects are dropped.
pub fn decode_events(raw: Vec<Value>) -> Vec<BattleEvent> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(event) => Some(event),
            Err(error) => {
                tracing::warn!(index, %error, "skipping malformed battle event");
                None
            }
        })
        .collect()
}
