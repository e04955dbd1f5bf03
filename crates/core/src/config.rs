//! Tunable constants for sampling, morphing and idle drift.

use crate::params::{param_f32, param_range, param_u8, param_usize};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_INITIAL_SHAPE_SIZE: f32 = 8.0;
const DEFAULT_SWARM_DISTANCE_FACTOR: f32 = 1.5;
const DEFAULT_SWIRL_FACTOR: f32 = 2.0;
const DEFAULT_NOISE_FREQUENCY: f32 = 0.15;
const DEFAULT_NOISE_TIME_SCALE: f32 = 0.03;
const DEFAULT_NOISE_MAX_STRENGTH: f32 = 1.5;
/// Seconds.
const DEFAULT_MORPH_DURATION: f32 = 3.0;
const DEFAULT_PARTICLE_SIZE_RANGE: [f32; 2] = [0.05, 0.15];
const DEFAULT_IDLE_FLOW_STRENGTH: f32 = 0.15;
const DEFAULT_IDLE_FLOW_SPEED: f32 = 0.05;
const DEFAULT_IDLE_FLOW_FREQUENCY: f32 = 0.1;
const DEFAULT_IDLE_LERP: f32 = 0.03;
const DEFAULT_IMAGE_SCALE: f32 = 0.04;
const DEFAULT_PARTICLE_COUNT: usize = 5000;
const DEFAULT_EFFECT_THRESHOLD: f32 = 0.001;
const DEFAULT_ALPHA_THRESHOLD: u8 = 128;
const DEFAULT_MORPH_SIZE_FACTOR: f32 = 0.3;
const DEFAULT_MORPH_BRIGHTNESS_FACTOR: f32 = 0.4;

/// Every tunable of the morph system.
///
/// [`Default`] reproduces the reference look; [`MorphConfig::from_json`]
/// overlays a partial override object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphConfig {
    /// Edge length of the random cube particles start in.
    pub initial_shape_size: f32,
    /// Scales the constant swarm offset added to every midpoint.
    pub swarm_distance_factor: f32,
    /// Swirl angle (radians) at full effect strength.
    pub swirl_factor: f32,
    /// Spatial frequency of morph turbulence.
    pub noise_frequency: f32,
    /// Elapsed-time multiplier for the turbulence time axis.
    pub noise_time_scale: f32,
    /// Turbulence displacement at full effect strength.
    pub noise_max_strength: f32,
    /// Morph length in seconds.
    pub morph_duration: f32,
    pub particle_size_range: [f32; 2],
    pub idle_flow_strength: f32,
    pub idle_flow_speed: f32,
    pub idle_flow_frequency: f32,
    /// Fraction of the remaining distance covered per idle frame.
    pub idle_lerp: f32,
    /// World units per image pixel.
    pub image_scale: f32,
    /// Particle count used when the bootstrap image has no opaque pixels.
    pub default_particle_count: usize,
    /// Effect strength below which swirl and turbulence are skipped.
    pub effect_threshold: f32,
    /// Pixels with alpha strictly above this are sampled.
    pub alpha_threshold: u8,
    pub morph_size_factor: f32,
    pub morph_brightness_factor: f32,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            initial_shape_size: DEFAULT_INITIAL_SHAPE_SIZE,
            swarm_distance_factor: DEFAULT_SWARM_DISTANCE_FACTOR,
            swirl_factor: DEFAULT_SWIRL_FACTOR,
            noise_frequency: DEFAULT_NOISE_FREQUENCY,
            noise_time_scale: DEFAULT_NOISE_TIME_SCALE,
            noise_max_strength: DEFAULT_NOISE_MAX_STRENGTH,
            morph_duration: DEFAULT_MORPH_DURATION,
            particle_size_range: DEFAULT_PARTICLE_SIZE_RANGE,
            idle_flow_strength: DEFAULT_IDLE_FLOW_STRENGTH,
            idle_flow_speed: DEFAULT_IDLE_FLOW_SPEED,
            idle_flow_frequency: DEFAULT_IDLE_FLOW_FREQUENCY,
            idle_lerp: DEFAULT_IDLE_LERP,
            image_scale: DEFAULT_IMAGE_SCALE,
            default_particle_count: DEFAULT_PARTICLE_COUNT,
            effect_threshold: DEFAULT_EFFECT_THRESHOLD,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            morph_size_factor: DEFAULT_MORPH_SIZE_FACTOR,
            morph_brightness_factor: DEFAULT_MORPH_BRIGHTNESS_FACTOR,
        }
    }
}

impl MorphConfig {
    /// Overlays `params` on the defaults. Unknown keys are ignored.
    ///
    /// A non-positive `morph_duration` would stall the timeline, so it is
    /// rejected in favour of the default.
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        let morph_duration = param_f32(params, "morph_duration", d.morph_duration);
        Self {
            initial_shape_size: param_f32(params, "initial_shape_size", d.initial_shape_size),
            swarm_distance_factor: param_f32(
                params,
                "swarm_distance_factor",
                d.swarm_distance_factor,
            ),
            swirl_factor: param_f32(params, "swirl_factor", d.swirl_factor),
            noise_frequency: param_f32(params, "noise_frequency", d.noise_frequency),
            noise_time_scale: param_f32(params, "noise_time_scale", d.noise_time_scale),
            noise_max_strength: param_f32(params, "noise_max_strength", d.noise_max_strength),
            morph_duration: if morph_duration > 0.0 {
                morph_duration
            } else {
                d.morph_duration
            },
            particle_size_range: param_range(params, "particle_size_range", d.particle_size_range),
            idle_flow_strength: param_f32(params, "idle_flow_strength", d.idle_flow_strength),
            idle_flow_speed: param_f32(params, "idle_flow_speed", d.idle_flow_speed),
            idle_flow_frequency: param_f32(params, "idle_flow_frequency", d.idle_flow_frequency),
            idle_lerp: param_f32(params, "idle_lerp", d.idle_lerp).clamp(0.0, 1.0),
            image_scale: param_f32(params, "image_scale", d.image_scale),
            default_particle_count: param_usize(
                params,
                "default_particle_count",
                d.default_particle_count,
            ),
            effect_threshold: param_f32(params, "effect_threshold", d.effect_threshold),
            alpha_threshold: param_u8(params, "alpha_threshold", d.alpha_threshold),
            morph_size_factor: param_f32(params, "morph_size_factor", d.morph_size_factor),
            morph_brightness_factor: param_f32(
                params,
                "morph_brightness_factor",
                d.morph_brightness_factor,
            ),
        }
    }

    /// Current values as a JSON object.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Constant offset added to every swarm displacement.
    pub fn swarm_center_offset(&self) -> f32 {
        self.initial_shape_size * self.swarm_distance_factor * 0.5
    }

    /// Parameter schema: type, default, range and description per key.
    pub fn schema() -> Value {
        json!({
            "initial_shape_size": {
                "type": "number", "default": DEFAULT_INITIAL_SHAPE_SIZE, "min": 0.0, "max": 100.0,
                "description": "Edge length of the random cube particles start in"
            },
            "swarm_distance_factor": {
                "type": "number", "default": DEFAULT_SWARM_DISTANCE_FACTOR, "min": 0.0, "max": 10.0,
                "description": "Scale of the constant outward bulge of each morph path"
            },
            "swirl_factor": {
                "type": "number", "default": DEFAULT_SWIRL_FACTOR, "min": 0.0, "max": 10.0,
                "description": "Swirl angle in radians at peak effect strength"
            },
            "noise_frequency": {
                "type": "number", "default": DEFAULT_NOISE_FREQUENCY, "min": 0.0, "max": 5.0,
                "description": "Spatial frequency of morph turbulence"
            },
            "noise_time_scale": {
                "type": "number", "default": DEFAULT_NOISE_TIME_SCALE, "min": 0.0, "max": 1.0,
                "description": "Rate at which turbulence evolves over time"
            },
            "noise_max_strength": {
                "type": "number", "default": DEFAULT_NOISE_MAX_STRENGTH, "min": 0.0, "max": 10.0,
                "description": "Turbulence displacement at peak effect strength"
            },
            "morph_duration": {
                "type": "number", "default": DEFAULT_MORPH_DURATION, "min": 0.1, "max": 60.0,
                "description": "Morph length in seconds"
            },
            "particle_size_range": {
                "type": "array", "default": DEFAULT_PARTICLE_SIZE_RANGE,
                "description": "Uniform range of per-particle base sizes"
            },
            "idle_flow_strength": {
                "type": "number", "default": DEFAULT_IDLE_FLOW_STRENGTH, "min": 0.0, "max": 2.0,
                "description": "Amplitude of idle drift around the anchor"
            },
            "idle_flow_speed": {
                "type": "number", "default": DEFAULT_IDLE_FLOW_SPEED, "min": 0.0, "max": 1.0,
                "description": "Rate at which idle drift evolves over time"
            },
            "idle_flow_frequency": {
                "type": "number", "default": DEFAULT_IDLE_FLOW_FREQUENCY, "min": 0.0, "max": 5.0,
                "description": "Spatial frequency of idle drift"
            },
            "idle_lerp": {
                "type": "number", "default": DEFAULT_IDLE_LERP, "min": 0.0, "max": 1.0,
                "description": "Fraction of the remaining distance covered per idle frame"
            },
            "image_scale": {
                "type": "number", "default": DEFAULT_IMAGE_SCALE, "min": 0.0, "max": 1.0,
                "description": "World units per image pixel"
            },
            "default_particle_count": {
                "type": "integer", "default": DEFAULT_PARTICLE_COUNT, "min": 1,
                "description": "Particle count when the bootstrap image has no opaque pixels"
            },
            "effect_threshold": {
                "type": "number", "default": DEFAULT_EFFECT_THRESHOLD, "min": 0.0, "max": 1.0,
                "description": "Effect strength below which swirl and turbulence are skipped"
            },
            "alpha_threshold": {
                "type": "integer", "default": DEFAULT_ALPHA_THRESHOLD, "min": 0, "max": 255,
                "description": "Pixels with alpha above this are sampled"
            },
            "morph_size_factor": {
                "type": "number", "default": DEFAULT_MORPH_SIZE_FACTOR, "min": 0.0, "max": 1.0,
                "description": "Point size reduction at peak effect strength"
            },
            "morph_brightness_factor": {
                "type": "number", "default": DEFAULT_MORPH_BRIGHTNESS_FACTOR, "min": 0.0, "max": 4.0,
                "description": "Brightness boost at peak effect strength"
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        assert_eq!(MorphConfig::from_json(&json!({})), MorphConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = MorphConfig::from_json(&json!({
            "morph_duration": 1.25,
            "swirl_factor": 0,
            "default_particle_count": 37,
            "particle_size_range": [0.1, 0.3],
        }));
        assert_eq!(cfg.morph_duration, 1.25);
        assert_eq!(cfg.swirl_factor, 0.0);
        assert_eq!(cfg.default_particle_count, 37);
        assert_eq!(cfg.particle_size_range, [0.1, 0.3]);
        assert_eq!(cfg.image_scale, DEFAULT_IMAGE_SCALE);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let cfg = MorphConfig::from_json(&json!({"morph_duration": 0.0}));
        assert_eq!(cfg.morph_duration, DEFAULT_MORPH_DURATION);
        let cfg = MorphConfig::from_json(&json!({"morph_duration": -3}));
        assert_eq!(cfg.morph_duration, DEFAULT_MORPH_DURATION);
    }

    #[test]
    fn idle_lerp_is_clamped() {
        let cfg = MorphConfig::from_json(&json!({"idle_lerp": 4.0}));
        assert_eq!(cfg.idle_lerp, 1.0);
    }

    #[test]
    fn swarm_center_offset_matches_reference() {
        assert!((MorphConfig::default().swarm_center_offset() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn to_json_round_trips_through_serde() {
        let cfg = MorphConfig {
            swirl_factor: 0.5,
            ..MorphConfig::default()
        };
        let restored: MorphConfig = serde_json::from_value(cfg.to_json()).unwrap();
        assert_eq!(cfg, restored);
    }

    #[test]
    fn partial_json_deserializes_with_defaults() {
        let cfg: MorphConfig = serde_json::from_str(r#"{"idle_lerp": 0.1}"#).unwrap();
        assert_eq!(cfg.idle_lerp, 0.1);
        assert_eq!(cfg.morph_duration, DEFAULT_MORPH_DURATION);
    }

    #[test]
    fn schema_covers_every_field() {
        let schema = MorphConfig::schema();
        let values = MorphConfig::default().to_json();
        for key in values.as_object().unwrap().keys() {
            let entry = schema.get(key).unwrap_or_else(|| panic!("schema missing {key}"));
            assert!(entry.get("type").is_some(), "{key} missing 'type'");
            assert!(entry.get("default").is_some(), "{key} missing 'default'");
            assert!(entry.get("description").is_some(), "{key} missing 'description'");
        }
    }
}
