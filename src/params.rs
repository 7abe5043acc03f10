//! Effect parameter schemas.
//!
//! Each effect declares its parameters once as a static `EffectSchema`.
//! Incoming `ParameterSet`s from the UI are resolved against it: numbers are
//! clamped to their range, missing values take the declared default, and
//! unknown names are ignored. Values of the wrong type are rejected.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::FxError;

/// Display unit of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamUnit {
    Decibels,
    Hertz,
    Seconds,
    Milliseconds,
    Ratio,
    Percent,
    Semitones,
    Count,
    None,
}

/// Value domain of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    Float { min: f64, max: f64, default: f64 },
    Choice {
        options: &'static [&'static str],
        default: &'static str,
    },
    Toggle { default: bool },
}

/// A declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub unit: ParamUnit,
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn float(
        id: &'static str,
        name: &'static str,
        unit: ParamUnit,
        min: f64,
        max: f64,
        default: f64,
    ) -> Self {
        ParamSpec {
            id,
            name,
            unit,
            kind: ParamKind::Float { min, max, default },
        }
    }

    pub const fn choice(
        id: &'static str,
        name: &'static str,
        options: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        ParamSpec {
            id,
            name,
            unit: ParamUnit::None,
            kind: ParamKind::Choice { options, default },
        }
    }

    pub const fn toggle(id: &'static str, name: &'static str, default: bool) -> Self {
        ParamSpec {
            id,
            name,
            unit: ParamUnit::None,
            kind: ParamKind::Toggle { default },
        }
    }

    fn default_value(&self) -> Resolved {
        match self.kind {
            ParamKind::Float { default, .. } => Resolved::Float(default),
            ParamKind::Choice { default, .. } => Resolved::Choice(default),
            ParamKind::Toggle { default } => Resolved::Toggle(default),
        }
    }

    fn resolve(&self, value: &ParamValue) -> Result<Resolved, FxError> {
        match (self.kind, value) {
            (ParamKind::Float { min, max, default }, ParamValue::Number(v)) => {
                Ok(Resolved::Float(clamp_or_default(self.id, *v, min, max, default)))
            }
            (ParamKind::Float { min, max, default }, ParamValue::Text(s)) => {
                match s.trim().parse::<f64>() {
                    Ok(v) => Ok(Resolved::Float(clamp_or_default(self.id, v, min, max, default))),
                    Err(_) => Err(FxError::validation(format!(
                        "parameter '{}' expects a number, got '{s}'",
                        self.id
                    ))),
                }
            }
            (ParamKind::Choice { options, .. }, ParamValue::Text(s)) => options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(s.trim()))
                .map(|o| Resolved::Choice(*o))
                .ok_or_else(|| {
                    FxError::validation(format!(
                        "parameter '{}' must be one of {options:?}, got '{s}'",
                        self.id
                    ))
                }),
            (ParamKind::Toggle { .. }, ParamValue::Bool(b)) => Ok(Resolved::Toggle(*b)),
            (ParamKind::Toggle { .. }, ParamValue::Number(v)) => Ok(Resolved::Toggle(*v != 0.0)),
            (ParamKind::Toggle { .. }, ParamValue::Text(s)) => match s.trim() {
                "true" | "on" | "1" => Ok(Resolved::Toggle(true)),
                "false" | "off" | "0" => Ok(Resolved::Toggle(false)),
                _ => Err(FxError::validation(format!(
                    "parameter '{}' expects a boolean, got '{s}'",
                    self.id
                ))),
            },
            (_, other) => Err(FxError::validation(format!(
                "parameter '{}' has the wrong type: {other:?}",
                self.id
            ))),
        }
    }
}

fn clamp_or_default(id: &str, v: f64, min: f64, max: f64, default: f64) -> f64 {
    if !v.is_finite() {
        warn!("parameter '{id}' is not finite, using default {default}");
        return default;
    }
    let clamped = v.clamp(min, max);
    if clamped != v {
        debug!("parameter '{id}' = {v} clamped to {clamped}");
    }
    clamped
}

/// The declared interface of one effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectSchema {
    pub id: &'static str,
    pub name: &'static str,
    pub params: &'static [ParamSpec],
}

impl EffectSchema {
    pub fn spec(&self, id: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.id == id)
    }

    /// Resolve a user parameter set into a fully-populated, clamped one.
    pub fn resolve(&self, set: &ParameterSet) -> Result<ResolvedParams, FxError> {
        for name in set.0.keys() {
            if self.spec(name).is_none() {
                debug!("{}: ignoring unknown parameter '{name}'", self.id);
            }
        }

        let mut values = BTreeMap::new();
        for spec in self.params {
            let value = match set.get(spec.id) {
                Some(v) => spec.resolve(v)?,
                None => spec.default_value(),
            };
            values.insert(spec.id, value);
        }
        Ok(ResolvedParams { values })
    }

    /// All defaults, as a resolved set.
    pub fn defaults(&self) -> ResolvedParams {
        ResolvedParams {
            values: self
                .params
                .iter()
                .map(|p| (p.id, p.default_value()))
                .collect(),
        }
    }
}

/// A raw parameter value coming from the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Parameters for one apply, keyed by parameter id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: &str, value: impl Into<ParamValue>) -> Self {
        self.set(id, value);
        self
    }

    pub fn set(&mut self, id: &str, value: impl Into<ParamValue>) {
        self.0.insert(id.to_string(), value.into());
    }

    pub fn get(&self, id: &str) -> Option<&ParamValue> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, FxError> {
        serde_json::from_str(json)
            .map_err(|e| FxError::validation(format!("parameter JSON: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Resolved {
    Float(f64),
    Choice(&'static str),
    Toggle(bool),
}

/// A validated parameter set: every declared parameter present and in range.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    values: BTreeMap<&'static str, Resolved>,
}

impl ResolvedParams {
    pub fn float(&self, id: &str) -> f64 {
        match self.values.get(id) {
            Some(Resolved::Float(v)) => *v,
            _ => {
                debug_assert!(false, "'{id}' is not a declared float parameter");
                0.0
            }
        }
    }

    /// A float parameter rounded to the nearest integer count.
    pub fn count(&self, id: &str) -> usize {
        self.float(id).round().max(0.0) as usize
    }

    pub fn choice(&self, id: &str) -> &'static str {
        match self.values.get(id) {
            Some(Resolved::Choice(v)) => *v,
            _ => {
                debug_assert!(false, "'{id}' is not a declared choice parameter");
                ""
            }
        }
    }

    pub fn toggle(&self, id: &str) -> bool {
        match self.values.get(id) {
            Some(Resolved::Toggle(v)) => *v,
            _ => {
                debug_assert!(false, "'{id}' is not a declared toggle parameter");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SCHEMA: EffectSchema = EffectSchema {
        id: "test",
        name: "Test",
        params: &[
            ParamSpec::float("ratio", "Ratio", ParamUnit::Ratio, 1.0, 20.0, 4.0),
            ParamSpec::choice("model", "Model", &["clean", "vintage"], "clean"),
            ParamSpec::toggle("auto", "Auto", false),
        ],
    };

    #[test]
    fn missing_values_take_defaults() {
        let p = SCHEMA.resolve(&ParameterSet::new()).unwrap();
        assert_eq!(p.float("ratio"), 4.0);
        assert_eq!(p.choice("model"), "clean");
        assert!(!p.toggle("auto"));
    }

    #[test]
    fn numbers_are_clamped() {
        let p = SCHEMA.resolve(&ParameterSet::new().with("ratio", -5.0)).unwrap();
        assert_eq!(p.float("ratio"), 1.0);
        let p = SCHEMA.resolve(&ParameterSet::new().with("ratio", 1000.0)).unwrap();
        assert_eq!(p.float("ratio"), 20.0);
        let p = SCHEMA.resolve(&ParameterSet::new().with("ratio", f64::NAN)).unwrap();
        assert_eq!(p.float("ratio"), 4.0);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let p = SCHEMA.resolve(&ParameterSet::new().with("ratio", "8")).unwrap();
        assert_eq!(p.float("ratio"), 8.0);
    }

    #[test]
    fn choices_match_case_insensitively() {
        let p = SCHEMA.resolve(&ParameterSet::new().with("model", "Vintage")).unwrap();
        assert_eq!(p.choice("model"), "vintage");
    }

    #[test]
    fn unknown_choice_and_wrong_types_fail() {
        assert!(SCHEMA.resolve(&ParameterSet::new().with("model", "tube")).is_err());
        assert!(SCHEMA.resolve(&ParameterSet::new().with("ratio", true)).is_err());
        assert!(SCHEMA.resolve(&ParameterSet::new().with("auto", "maybe")).is_err());
    }

    #[test]
    fn unknown_names_are_ignored() {
        let p = SCHEMA.resolve(&ParameterSet::new().with("wobble", 3.0)).unwrap();
        assert_eq!(p.float("ratio"), 4.0);
    }

    #[test]
    fn parameter_set_from_json() {
        let set = ParameterSet::from_json(r#"{"ratio": 2.5, "model": "vintage", "auto": true}"#).unwrap();
        let p = SCHEMA.resolve(&set).unwrap();
        assert_eq!(p.float("ratio"), 2.5);
        assert_eq!(p.choice("model"), "vintage");
        assert!(p.toggle("auto"));
    }

    #[test]
    fn schema_serializes() {
        let json = serde_json::to_value(SCHEMA).unwrap();
        assert_eq!(json["params"][0]["kind"], "float");
        assert_eq!(json["params"][1]["options"][1], "vintage");
    }
}
