//! Named, typed parameters with change tracking.
//!
//! Every externally adjustable value (shaper sliders, camera, render mode,
//! selections) lives in a [`ParamHost`] under an OSC-style address such as
//! `/shaper/radius`. Setting a value marks it changed for broadcasting and
//! queues a change event that the sculpture system drains once per frame.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use crate::error::{Result, SculptError};

/// Typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec3(Vec3),
    /// Enumerated choice stored by key (e.g. `SOLID`)
    Choice(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Vec3(_) => "vec3",
            Self::Choice(_) => "choice",
        }
    }

    /// Convert `self` into the variant of `target`, if the conversion is meaningful
    pub fn coerce_like(&self, target: &ParamValue) -> Option<ParamValue> {
        match (target, self) {
            (Self::Float(_), Self::Float(v)) => Some(Self::Float(*v)),
            (Self::Float(_), Self::Int(v)) => Some(Self::Float(*v as f32)),
            (Self::Int(_), Self::Int(v)) => Some(Self::Int(*v)),
            (Self::Int(_), Self::Float(v)) => Some(Self::Int(*v as i32)),
            (Self::Bool(_), Self::Bool(v)) => Some(Self::Bool(*v)),
            (Self::Bool(_), Self::Int(v)) => Some(Self::Bool(*v != 0)),
            (Self::Bool(_), Self::Float(v)) => Some(Self::Bool(*v != 0.0)),
            (Self::Vec3(_), Self::Vec3(v)) => Some(Self::Vec3(*v)),
            (Self::Choice(_), Self::Choice(v)) => Some(Self::Choice(v.clone())),
            _ => None,
        }
    }

    /// Parse `text` as a value of the same variant as `self`
    pub fn parse_like(&self, text: &str) -> std::result::Result<ParamValue, String> {
        let text = text.trim();
        match self {
            Self::Float(_) => text
                .parse::<f32>()
                .map(Self::Float)
                .map_err(|e| format!("'{}': {}", text, e)),
            Self::Int(_) => text
                .parse::<i32>()
                .or_else(|_| text.parse::<f32>().map(|f| f as i32))
                .map(Self::Int)
                .map_err(|e| format!("'{}': {}", text, e)),
            Self::Bool(_) => text
                .parse::<bool>()
                .map(Self::Bool)
                .map_err(|e| format!("'{}': {}", text, e)),
            Self::Vec3(current) => {
                // Missing trailing components keep their current value
                let mut v = *current;
                for (i, part) in text.split(',').take(3).enumerate() {
                    v[i] = part
                        .trim()
                        .parse::<f32>()
                        .map_err(|e| format!("'{}': {}", part, e))?;
                }
                Ok(Self::Vec3(v))
            }
            Self::Choice(_) => Ok(Self::Choice(text.to_string())),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Vec3(v) => write!(f, "{},{},{}", v.x, v.y, v.z),
            Self::Choice(v) => f.write_str(v),
        }
    }
}

/// A named, externally observable value
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub address: String,
    pub label: String,
    pub value: ParamValue,
    /// Inclusive slider range for numeric values
    pub range: Option<(f32, f32)>,
    changed: bool,
}

impl Parameter {
    pub fn new(address: impl Into<String>, value: ParamValue) -> Self {
        let address = address.into();
        Self {
            label: address.clone(),
            address,
            value,
            range: None,
            changed: true,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    fn clamp(&self, value: ParamValue) -> ParamValue {
        match (self.range, value) {
            (Some((lo, hi)), ParamValue::Float(v)) => ParamValue::Float(v.clamp(lo, hi)),
            (Some((lo, hi)), ParamValue::Int(v)) => ParamValue::Int(v.clamp(lo as i32, hi as i32)),
            (_, other) => other,
        }
    }
}

/// Static description of a numeric shaper slider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub address: &'static str,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    /// Whole-number slider (stored as `Int`)
    pub integer: bool,
}

impl ParamSpec {
    pub fn parameter(&self) -> Parameter {
        let value = if self.integer {
            ParamValue::Int(self.default as i32)
        } else {
            ParamValue::Float(self.default)
        };
        Parameter::new(self.address, value)
            .with_label(self.label)
            .with_range(self.min, self.max)
    }

    /// Current value from `host`, or the default when not registered
    pub fn read(&self, host: &ParamHost) -> f32 {
        host.float(self.address).unwrap_or(self.default)
    }
}

/// Ordered parameter registry
#[derive(Debug, Clone, Default)]
pub struct ParamHost {
    params: Vec<Parameter>,
    pending: Vec<String>,
}

impl ParamHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter, replacing any previous one at the same address
    pub fn register(&mut self, param: Parameter) {
        match self.params.iter_mut().find(|p| p.address == param.address) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
    }

    pub fn remove(&mut self, address: &str) -> Option<Parameter> {
        let pos = self.params.iter().position(|p| p.address == address)?;
        self.pending.retain(|a| a != address);
        Some(self.params.remove(pos))
    }

    pub fn contains(&self, address: &str) -> bool {
        self.get(address).is_some()
    }

    pub fn get(&self, address: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.address == address)
    }

    pub fn value(&self, address: &str) -> Option<&ParamValue> {
        self.get(address).map(|p| &p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Set a value, converting between numeric kinds and clamping to the range.
    ///
    /// Queues a change event even when the value is unchanged.
    pub fn set(&mut self, address: &str, value: ParamValue) -> Result<()> {
        let param = self
            .params
            .iter_mut()
            .find(|p| p.address == address)
            .ok_or_else(|| SculptError::invalid(format!("unknown parameter {}", address)))?;

        let coerced = value.coerce_like(&param.value).ok_or_else(|| {
            SculptError::invalid(format!(
                "{} expects a {} value, got {}",
                address,
                param.value.type_name(),
                value.type_name()
            ))
        })?;
        param.value = param.clamp(coerced);
        param.changed = true;

        if !self.pending.iter().any(|a| a == address) {
            self.pending.push(address.to_string());
        }
        Ok(())
    }

    /// Parse `text` against the parameter's type and set it
    pub fn set_from_str(&mut self, address: &str, text: &str) -> Result<()> {
        let current = self
            .value(address)
            .ok_or_else(|| SculptError::invalid(format!("unknown parameter {}", address)))?;
        let value = current
            .parse_like(text)
            .map_err(|reason| SculptError::invalid(format!("{}: {}", address, reason)))?;
        self.set(address, value)
    }

    /// Numeric value (floats and ints)
    pub fn float(&self, address: &str) -> Option<f32> {
        match self.value(address)? {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn int(&self, address: &str) -> Option<i32> {
        match self.value(address)? {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(v) => Some(*v as i32),
            _ => None,
        }
    }

    pub fn bool(&self, address: &str) -> Option<bool> {
        match self.value(address)? {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn vec3(&self, address: &str) -> Option<Vec3> {
        match self.value(address)? {
            ParamValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn choice(&self, address: &str) -> Option<&str> {
        match self.value(address)? {
            ParamValue::Choice(v) => Some(v),
            _ => None,
        }
    }

    /// Choice parsed into its enum type
    pub fn choice_as<T: FromStr>(&self, address: &str) -> Option<T> {
        self.choice(address)?.parse().ok()
    }

    /// Whether `address` was set since the last drain
    pub fn is_pending(&self, address: &str) -> bool {
        self.pending.iter().any(|a| a == address)
    }

    /// Addresses set since the last drain, in order of first change
    pub fn drain_changes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    /// Values flagged as changed since the last call (for broadcasting); resets the flags
    pub fn take_changed(&mut self) -> Vec<(String, ParamValue)> {
        self.params
            .iter_mut()
            .filter(|p| p.changed)
            .map(|p| {
                p.changed = false;
                (p.address.clone(), p.value.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> ParamHost {
        let mut host = ParamHost::new();
        host.register(Parameter::new("/a/float", ParamValue::Float(1.0)).with_range(0.0, 10.0));
        host.register(Parameter::new("/a/int", ParamValue::Int(2)).with_range(0.0, 8.0));
        host.register(Parameter::new("/a/pos", ParamValue::Vec3(Vec3::new(0.0, 0.0, 700.0))));
        host.register(Parameter::new("/a/mode", ParamValue::Choice("SOLID".into())));
        host
    }

    #[test]
    fn test_set_coerces_and_clamps() {
        let mut host = host();
        host.set("/a/float", ParamValue::Int(4)).unwrap();
        assert_eq!(host.float("/a/float"), Some(4.0));

        host.set("/a/float", ParamValue::Float(99.0)).unwrap();
        assert_eq!(host.float("/a/float"), Some(10.0));

        host.set("/a/int", ParamValue::Float(3.7)).unwrap();
        assert_eq!(host.int("/a/int"), Some(3));

        assert!(host.set("/a/pos", ParamValue::Float(1.0)).is_err());
        assert!(host.set("/missing", ParamValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_change_events_are_deduplicated() {
        let mut host = host();
        host.set("/a/float", ParamValue::Float(2.0)).unwrap();
        host.set("/a/int", ParamValue::Int(1)).unwrap();
        host.set("/a/float", ParamValue::Float(3.0)).unwrap();

        assert!(host.is_pending("/a/int"));
        assert!(!host.is_pending("/a/mode"));
        assert_eq!(host.drain_changes(), vec!["/a/float", "/a/int"]);
        assert!(host.drain_changes().is_empty());
        assert!(!host.is_pending("/a/int"));
    }

    #[test]
    fn test_take_changed_resets_flags() {
        let mut host = host();
        // Freshly registered parameters count as changed
        assert_eq!(host.take_changed().len(), 4);
        assert!(host.take_changed().is_empty());

        host.set("/a/mode", ParamValue::Choice("POINTS".into())).unwrap();
        let changed = host.take_changed();
        assert_eq!(changed, vec![("/a/mode".to_string(), ParamValue::Choice("POINTS".into()))]);
    }

    #[test]
    fn test_string_round_trip() {
        let mut host = host();
        host.set_from_str("/a/pos", "1.5,-2,3").unwrap();
        assert_eq!(host.vec3("/a/pos"), Some(Vec3::new(1.5, -2.0, 3.0)));
        assert_eq!(host.value("/a/pos").unwrap().to_string(), "1.5,-2,3");

        // Partial vectors keep remaining components
        host.set_from_str("/a/pos", "9").unwrap();
        assert_eq!(host.vec3("/a/pos"), Some(Vec3::new(9.0, -2.0, 3.0)));

        host.set_from_str("/a/int", "5.0").unwrap();
        assert_eq!(host.int("/a/int"), Some(5));

        assert!(host.set_from_str("/a/float", "loud").is_err());
    }

    #[test]
    fn test_spec_read_falls_back_to_default() {
        let spec = ParamSpec {
            address: "/shaper/test",
            label: "Test",
            min: 0.0,
            max: 10.0,
            default: 1.5,
            integer: false,
        };
        let mut host = ParamHost::new();
        assert_eq!(spec.read(&host), 1.5);

        host.register(spec.parameter());
        host.set(spec.address, ParamValue::Float(2.5)).unwrap();
        assert_eq!(spec.read(&host), 2.5);

        host.remove(spec.address);
        assert_eq!(spec.read(&host), 1.5);
    }
}
