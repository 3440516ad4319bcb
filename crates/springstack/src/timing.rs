#![forbid(unsafe_code)]

//! Timing profiles.
//!
//! A [`TimingMode`] names one of five presets; [`TimingOverrides`] replaces
//! any subset of a preset's fields. [`resolve_timing_config`] merges the two
//! into the [`TimingConfig`] the engine snapshots when an operation starts.
//!
//! | mode | beat | track | morph | fade | crumb height |
//! |------|------|-------|-------|------|--------------|
//! | normal | 250 | 220 | 480 | 30 | 100 |
//! | reduced | 80 | 80 | 80 | 40 | 80 |
//! | off | 0 | 0 | 0 | 0 | 0 |
//! | gratuitous | 250 | 150 | 250 | 30 | 100 |
//! | slow | 1000 | 600 | 1000 | 120 | 400 |
//!
//! All durations are milliseconds. Pause beats are 1 everywhere except `off`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animation::{Ease, EaseDirection};

/// Named timing preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    #[default]
    Normal,
    Reduced,
    Off,
    /// Exaggerated motion for demos; also accepted as `exaggerated`.
    #[serde(alias = "exaggerated")]
    Gratuitous,
    Slow,
}

impl TimingMode {
    pub const ALL: [Self; 5] = [
        Self::Normal,
        Self::Reduced,
        Self::Off,
        Self::Gratuitous,
        Self::Slow,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Reduced => "reduced",
            Self::Off => "off",
            Self::Gratuitous => "gratuitous",
            Self::Slow => "slow",
        }
    }
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "reduced" => Ok(Self::Reduced),
            "off" => Ok(Self::Off),
            "gratuitous" | "exaggerated" => Ok(Self::Gratuitous),
            "slow" => Ok(Self::Slow),
            other => Err(format!("unknown timing mode `{other}`")),
        }
    }
}

/// Fully resolved timing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Base wait unit.
    pub beat_ms: u64,
    pub track_duration_ms: u64,
    pub morph_duration_ms: u64,
    /// Crossfade length, capped at 40% of the morph.
    pub fade_duration_ms: u64,
    pub crumb_height_duration_ms: u64,
    /// Beats to wait between pushes of a drill.
    pub push_pause_beats: f64,
    /// Beats to wait between pops of a pop-to.
    pub pop_pause_beats: f64,
    pub track_ease: Ease,
    pub morph_ease: Ease,
    pub fade_ease: Ease,
    pub crumb_height_ease: Ease,
    pub enter_ease: Ease,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::preset(TimingMode::Normal)
    }
}

fn power(power: u8, direction: EaseDirection) -> Ease {
    Ease::Power { power, direction }
}

fn back(overshoot: f64, direction: EaseDirection) -> Ease {
    Ease::Back {
        overshoot,
        direction,
    }
}

impl TimingConfig {
    /// The preset for `mode`.
    #[must_use]
    pub fn preset(mode: TimingMode) -> Self {
        use EaseDirection::{InOut, Out};
        match mode {
            TimingMode::Normal => Self {
                beat_ms: 250,
                track_duration_ms: 220,
                morph_duration_ms: 480,
                fade_duration_ms: 30,
                crumb_height_duration_ms: 100,
                push_pause_beats: 1.0,
                pop_pause_beats: 1.0,
                track_ease: Ease::SlowMo {
                    linear_ratio: 0.2,
                    power: 0.7,
                    yoyo: false,
                },
                morph_ease: Ease::Elastic {
                    amplitude: 1.0,
                    period: 0.35,
                    direction: Out,
                },
                fade_ease: power(2, Out),
                crumb_height_ease: power(3, InOut),
                enter_ease: power(2, Out),
            },
            TimingMode::Reduced => Self {
                beat_ms: 80,
                track_duration_ms: 80,
                morph_duration_ms: 80,
                fade_duration_ms: 40,
                crumb_height_duration_ms: 80,
                push_pause_beats: 1.0,
                pop_pause_beats: 1.0,
                track_ease: power(2, InOut),
                morph_ease: power(2, Out),
                fade_ease: power(2, Out),
                crumb_height_ease: power(2, InOut),
                enter_ease: power(2, Out),
            },
            TimingMode::Off => Self {
                beat_ms: 0,
                track_duration_ms: 0,
                morph_duration_ms: 0,
                fade_duration_ms: 0,
                crumb_height_duration_ms: 0,
                push_pause_beats: 0.0,
                pop_pause_beats: 0.0,
                track_ease: Ease::Linear,
                morph_ease: Ease::Linear,
                fade_ease: Ease::Linear,
                crumb_height_ease: Ease::Linear,
                enter_ease: Ease::Linear,
            },
            TimingMode::Gratuitous => Self {
                beat_ms: 250,
                track_duration_ms: 150,
                morph_duration_ms: 250,
                fade_duration_ms: 30,
                crumb_height_duration_ms: 100,
                push_pause_beats: 1.0,
                pop_pause_beats: 1.0,
                track_ease: back(2.0, InOut),
                morph_ease: Ease::Elastic {
                    amplitude: 1.2,
                    period: 0.3,
                    direction: Out,
                },
                fade_ease: power(2, Out),
                crumb_height_ease: back(1.8, Out),
                enter_ease: back(2.0, Out),
            },
            TimingMode::Slow => Self {
                beat_ms: 1000,
                track_duration_ms: 600,
                morph_duration_ms: 1000,
                fade_duration_ms: 120,
                crumb_height_duration_ms: 400,
                push_pause_beats: 1.0,
                pop_pause_beats: 1.0,
                track_ease: back(1.1, InOut),
                morph_ease: back(1.2, Out),
                fade_ease: power(2, Out),
                crumb_height_ease: power(3, InOut),
                enter_ease: power(3, Out),
            },
        }
    }

    /// Apply every field set in `overrides`.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &TimingOverrides) -> Self {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &overrides.$field {
                    self.$field = v.clone();
                })*
            };
        }
        take!(
            beat_ms,
            track_duration_ms,
            morph_duration_ms,
            fade_duration_ms,
            crumb_height_duration_ms,
            push_pause_beats,
            pop_pause_beats,
            track_ease,
            morph_ease,
            fade_ease,
            crumb_height_ease,
            enter_ease,
        );
        self
    }

    #[must_use]
    pub fn beat(&self) -> Duration {
        Duration::from_millis(self.beat_ms)
    }

    #[must_use]
    pub fn track(&self) -> Duration {
        Duration::from_millis(self.track_duration_ms)
    }

    #[must_use]
    pub fn morph(&self) -> Duration {
        Duration::from_millis(self.morph_duration_ms)
    }

    #[must_use]
    pub fn crumb_height(&self) -> Duration {
        Duration::from_millis(self.crumb_height_duration_ms)
    }

    /// Crossfade window: `min(fade, 0.4 × morph)`.
    #[must_use]
    pub fn crossfade(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms).min(self.morph().mul_f64(0.4))
    }

    /// Pause between drill pushes.
    #[must_use]
    pub fn push_pause(&self) -> Duration {
        beats(self.beat_ms, self.push_pause_beats)
    }

    /// Pause between pop-to steps.
    #[must_use]
    pub fn pop_pause(&self) -> Duration {
        beats(self.beat_ms, self.pop_pause_beats)
    }

    /// Problems with this config; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("push_pause_beats", self.push_pause_beats),
            ("pop_pause_beats", self.pop_pause_beats),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("timing.{name} must be a finite value >= 0, got {value}"));
            }
        }
        errors
    }
}

fn beats(beat_ms: u64, count: f64) -> Duration {
    if !count.is_finite() || count <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(beat_ms as f64 * count / 1000.0).unwrap_or(Duration::MAX)
}

/// Partial timing configuration; every `Some` replaces the preset value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingOverrides {
    pub beat_ms: Option<u64>,
    pub track_duration_ms: Option<u64>,
    pub morph_duration_ms: Option<u64>,
    pub fade_duration_ms: Option<u64>,
    pub crumb_height_duration_ms: Option<u64>,
    pub push_pause_beats: Option<f64>,
    pub pop_pause_beats: Option<f64>,
    pub track_ease: Option<Ease>,
    pub morph_ease: Option<Ease>,
    pub fade_ease: Option<Ease>,
    pub crumb_height_ease: Option<Ease>,
    pub enter_ease: Option<Ease>,
}

impl TimingOverrides {
    /// Field-wise merge; values set in `other` win.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        macro_rules! pick {
            ($($field:ident),* $(,)?) => {
                Self { $($field: other.$field.clone().or_else(|| self.$field.clone()),)* }
            };
        }
        pick!(
            beat_ms,
            track_duration_ms,
            morph_duration_ms,
            fade_duration_ms,
            crumb_height_duration_ms,
            push_pause_beats,
            pop_pause_beats,
            track_ease,
            morph_ease,
            fade_ease,
            crumb_height_ease,
            enter_ease,
        )
    }
}

/// The preset for `mode` with `overrides` applied.
#[must_use]
pub fn resolve_timing_config(mode: TimingMode, overrides: Option<&TimingOverrides>) -> TimingConfig {
    let preset = TimingConfig::preset(mode);
    match overrides {
        Some(o) => preset.with_overrides(o),
        None => preset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_eases_match_their_names() {
        let expected = [
            (TimingMode::Normal, ["slow(0.2, 0.7, false)", "elastic.out(1, 0.35)", "power2.out", "power3.inOut", "power2.out"]),
            (TimingMode::Reduced, ["power2.inOut", "power2.out", "power2.out", "power2.inOut", "power2.out"]),
            (TimingMode::Off, ["none", "none", "none", "none", "none"]),
            (TimingMode::Gratuitous, ["back.inOut(2)", "elastic.out(1.2, 0.3)", "power2.out", "back.out(1.8)", "back.out(2)"]),
            (TimingMode::Slow, ["back.inOut(1.1)", "back.out(1.2)", "power2.out", "power3.inOut", "power3.out"]),
        ];
        for (mode, names) in expected {
            let c = TimingConfig::preset(mode);
            let actual = [
                c.track_ease.to_string(),
                c.morph_ease.to_string(),
                c.fade_ease.to_string(),
                c.crumb_height_ease.to_string(),
                c.enter_ease.to_string(),
            ];
            assert_eq!(actual, names.map(String::from), "{mode}");
        }
    }

    #[test]
    fn normal_durations() {
        let c = resolve_timing_config(TimingMode::Normal, None);
        assert_eq!(c.beat(), Duration::from_millis(250));
        assert_eq!(c.track(), Duration::from_millis(220));
        assert_eq!(c.morph(), Duration::from_millis(480));
        assert_eq!(c.crossfade(), Duration::from_millis(30));
        assert_eq!(c.push_pause(), Duration::from_millis(250));
    }

    #[test]
    fn crossfade_is_capped_by_morph() {
        let c = resolve_timing_config(
            TimingMode::Reduced,
            Some(&TimingOverrides {
                fade_duration_ms: Some(200),
                ..Default::default()
            }),
        );
        // 0.4 × 80ms
        assert_eq!(c.crossfade(), Duration::from_millis(32));
    }

    #[test]
    fn off_has_no_time_at_all() {
        let c = TimingConfig::preset(TimingMode::Off);
        assert_eq!(c.beat(), Duration::ZERO);
        assert_eq!(c.crossfade(), Duration::ZERO);
        assert_eq!(c.push_pause(), Duration::ZERO);
        assert_eq!(c.pop_pause(), Duration::ZERO);
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let o = TimingOverrides {
            beat_ms: Some(10),
            morph_ease: Some(Ease::Linear),
            ..Default::default()
        };
        let c = resolve_timing_config(TimingMode::Slow, Some(&o));
        assert_eq!(c.beat_ms, 10);
        assert_eq!(c.morph_ease, Ease::Linear);
        assert_eq!(c.track_duration_ms, 600);
    }

    #[test]
    fn merged_overrides_prefer_newer() {
        let a = TimingOverrides {
            beat_ms: Some(10),
            track_duration_ms: Some(20),
            ..Default::default()
        };
        let b = TimingOverrides {
            beat_ms: Some(99),
            ..Default::default()
        };
        let m = a.merged(&b);
        assert_eq!(m.beat_ms, Some(99));
        assert_eq!(m.track_duration_ms, Some(20));
    }

    #[test]
    fn mode_parsing_accepts_alias() {
        assert_eq!("exaggerated".parse::<TimingMode>(), Ok(TimingMode::Gratuitous));
        assert_eq!("Slow".parse::<TimingMode>(), Ok(TimingMode::Slow));
        assert!("warp".parse::<TimingMode>().is_err());
        let mode: TimingMode = serde_json::from_str("\"exaggerated\"").unwrap();
        assert_eq!(mode, TimingMode::Gratuitous);
        for mode in TimingMode::ALL {
            assert_eq!(mode.as_str().parse::<TimingMode>(), Ok(mode));
        }
    }

    #[test]
    fn config_deserializes_partially() {
        let c: TimingConfig = serde_json::from_str(r#"{"beat_ms": 5, "track_ease": "power1.in"}"#).unwrap();
        assert_eq!(c.beat_ms, 5);
        assert_eq!(c.track_ease.to_string(), "power1.in");
        assert_eq!(c.morph_duration_ms, 480);
    }

    #[test]
    fn negative_pause_is_reported() {
        let mut c = TimingConfig::default();
        c.pop_pause_beats = -1.0;
        assert_eq!(c.validate().len(), 1);
        assert_eq!(c.pop_pause(), Duration::ZERO);
    }

    #[test]
    fn huge_pause_saturates() {
        let mut c = TimingConfig::default();
        c.push_pause_beats = 1e300;
        assert!(c.validate().is_empty());
        assert_eq!(c.push_pause(), Duration::MAX);
    }
}
