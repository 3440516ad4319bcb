#![forbid(unsafe_code)]

//! Named easing curves.
//!
//! Timing profiles name their curves with the compact vocabulary used by
//! motion designers: `power2.out`, `back.inOut(2)`, `elastic.out(1, 0.35)`,
//! `slow(0.2, 0.7, false)`. [`Ease`] parses those names, evaluates them, and
//! prints them back in canonical form so a profile survives a config round trip.
//!
//! # Invariants
//!
//! 1. `apply(0.0) == 0.0` and `apply(1.0) == 1.0` for every curve except a
//!    yoyo slow-mo, which returns to 0.0.
//! 2. Input is clamped to `[0, 1]`; output is not (back and elastic overshoot).
//! 3. `Ease::parse(&ease.to_string()) == Ok(ease)`.
//!
//! # Failure Modes
//!
//! - Unknown curve names yield [`EaseError::Unknown`].
//! - Non-numeric or surplus arguments yield [`EaseError::BadArguments`].

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EaseError;

const DEFAULT_BACK_OVERSHOOT: f64 = 1.70158;

/// Which end of the curve carries the acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EaseDirection {
    In,
    Out,
    InOut,
}

impl EaseDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::InOut => "inOut",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in" | "easein" => Some(Self::In),
            "out" | "easeout" => Some(Self::Out),
            "inout" | "easeinout" => Some(Self::InOut),
            _ => None,
        }
    }
}

/// An easing curve mapping progress `t ∈ [0, 1]` to eased progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ease {
    /// `none` / `linear` / `power0`.
    #[default]
    Linear,
    /// `power1..power4` (quad, cubic, quart, quint).
    Power { power: u8, direction: EaseDirection },
    Sine(EaseDirection),
    Expo(EaseDirection),
    Circ(EaseDirection),
    Back { overshoot: f64, direction: EaseDirection },
    Elastic {
        amplitude: f64,
        period: f64,
        direction: EaseDirection,
    },
    /// Slow-motion: fast, then a linear middle section, then fast again.
    SlowMo {
        linear_ratio: f64,
        power: f64,
        yoyo: bool,
    },
}

impl Ease {
    /// Parse a curve name such as `power2.out` or `elastic.out(1, 0.35)`.
    pub fn parse(input: &str) -> Result<Self, EaseError> {
        let trimmed = input.trim();
        let (head, args) = match trimmed.find('(') {
            Some(open) => {
                let close = trimmed
                    .rfind(')')
                    .filter(|&c| c > open && c == trimmed.len() - 1)
                    .ok_or_else(|| EaseError::BadArguments {
                        name: trimmed.to_string(),
                        args: trimmed[open..].to_string(),
                    })?;
                (&trimmed[..open], Some(&trimmed[open + 1..close]))
            }
            None => (trimmed, None),
        };
        let args: Vec<&str> = args
            .map(|a| a.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let (name, direction) = match head.split_once('.') {
            Some((name, dir)) => {
                let dir =
                    EaseDirection::parse(dir).ok_or_else(|| EaseError::Unknown(input.to_string()))?;
                (name, Some(dir))
            }
            None => (head, None),
        };
        let name = name.to_ascii_lowercase();
        let dir = direction.unwrap_or(EaseDirection::Out);
        let bad = || EaseError::BadArguments {
            name: name.clone(),
            args: args.join(", "),
        };
        let number = |i: usize| -> Result<Option<f64>, EaseError> {
            args.get(i)
                .map(|a| a.parse::<f64>().map_err(|_| bad()))
                .transpose()
        };

        let no_args = |ease: Ease| if args.is_empty() { Ok(ease) } else { Err(bad()) };

        match name.as_str() {
            "none" | "linear" | "power0" => no_args(Self::Linear),
            "power1" | "quad" => no_args(Self::Power { power: 1, direction: dir }),
            "power2" | "cubic" => no_args(Self::Power { power: 2, direction: dir }),
            "power3" | "quart" => no_args(Self::Power { power: 3, direction: dir }),
            "power4" | "quint" | "strong" => no_args(Self::Power { power: 4, direction: dir }),
            "sine" => no_args(Self::Sine(dir)),
            "expo" => no_args(Self::Expo(dir)),
            "circ" => no_args(Self::Circ(dir)),
            "back" => {
                if args.len() > 1 {
                    return Err(bad());
                }
                Ok(Self::Back {
                    overshoot: number(0)?.unwrap_or(DEFAULT_BACK_OVERSHOOT),
                    direction: dir,
                })
            }
            "elastic" => {
                if args.len() > 2 {
                    return Err(bad());
                }
                let default_period = if dir == EaseDirection::InOut { 0.45 } else { 0.3 };
                Ok(Self::Elastic {
                    amplitude: number(0)?.unwrap_or(1.0),
                    period: number(1)?.unwrap_or(default_period),
                    direction: dir,
                })
            }
            "slow" | "slowmo" => {
                if args.len() > 3 || direction.is_some() {
                    return Err(bad());
                }
                let yoyo = match args.get(2) {
                    None => false,
                    Some(&"true") => true,
                    Some(&"false") => false,
                    Some(_) => return Err(bad()),
                };
                Ok(Self::SlowMo {
                    linear_ratio: number(0)?.unwrap_or(0.7),
                    power: number(1)?.unwrap_or(0.7),
                    yoyo,
                })
            }
            _ => Err(EaseError::Unknown(input.to_string())),
        }
    }

    /// Evaluate the curve at progress `t`.
    #[must_use]
    pub fn apply(&self, t: f64) -> f64 {
        let p = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match *self {
            Self::Linear => p,
            Self::Power { power, direction } => {
                let exp = i32::from(power) + 1;
                from_in(direction, p, |x| x.powi(exp))
            }
            Self::Sine(direction) => from_in(direction, p, |x| {
                if x >= 1.0 { 1.0 } else { 1.0 - (x * FRAC_PI_2).cos() }
            }),
            Self::Expo(direction) => from_in(direction, p, |x| {
                if x <= 0.0 { 0.0 } else { 2f64.powf(10.0 * (x - 1.0)) }
            }),
            Self::Circ(direction) => from_in(direction, p, |x| 1.0 - (1.0 - x * x).max(0.0).sqrt()),
            Self::Back {
                overshoot,
                direction,
            } => from_in(direction, p, |x| {
                if x <= 0.0 { 0.0 } else { x * x * ((overshoot + 1.0) * x - overshoot) }
            }),
            Self::Elastic {
                amplitude,
                period,
                direction,
            } => elastic(amplitude, period, direction, p),
            Self::SlowMo {
                linear_ratio,
                power,
                yoyo,
            } => slow_mo(linear_ratio, power, yoyo, p),
        }
    }
}

/// Derive out/in-out variants from an ease-in curve.
fn from_in(direction: EaseDirection, p: f64, ease_in: impl Fn(f64) -> f64) -> f64 {
    match direction {
        EaseDirection::In => ease_in(p),
        EaseDirection::Out => 1.0 - ease_in(1.0 - p),
        EaseDirection::InOut => {
            if p < 0.5 {
                ease_in(p * 2.0) / 2.0
            } else {
                1.0 - ease_in((1.0 - p) * 2.0) / 2.0
            }
        }
    }
}

fn elastic(amplitude: f64, period: f64, direction: EaseDirection, p: f64) -> f64 {
    let p1 = amplitude.max(1.0);
    let p2 = period / amplitude.min(1.0).max(f64::EPSILON);
    let p3 = p2 / TAU * (1.0 / p1).asin();
    let freq = TAU / p2;
    let ease_out = |x: f64| {
        if x >= 1.0 {
            1.0
        } else {
            p1 * 2f64.powf(-10.0 * x) * ((x - p3) * freq).sin() + 1.0
        }
    };
    match direction {
        EaseDirection::Out => ease_out(p),
        EaseDirection::In => 1.0 - ease_out(1.0 - p),
        EaseDirection::InOut => {
            if p < 0.5 {
                (1.0 - ease_out(1.0 - p * 2.0)) / 2.0
            } else {
                0.5 + ease_out((p - 0.5) * 2.0) / 2.0
            }
        }
    }
}

fn slow_mo(linear_ratio: f64, power: f64, yoyo: bool, p: f64) -> f64 {
    let ratio = if linear_ratio > 0.0 { linear_ratio.min(1.0) } else { 0.7 };
    let pow = if ratio < 1.0 { power } else { 0.0 };
    let p1 = (1.0 - ratio) / 2.0;
    let p3 = p1 + ratio;
    let r = p + (0.5 - p) * pow;
    if p < p1 {
        let q = 1.0 - p / p1;
        if yoyo { 1.0 - q * q } else { r - q * q * q * q * r }
    } else if p > p3 {
        let q = (p - p3) / p1;
        if yoyo {
            if p >= 1.0 { 0.0 } else { 1.0 - q * q }
        } else {
            r + (p - r) * q * q * q * q
        }
    } else if yoyo {
        1.0
    } else {
        r
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("none"),
            Self::Power { power, direction } => write!(f, "power{power}.{}", direction.as_str()),
            Self::Sine(d) => write!(f, "sine.{}", d.as_str()),
            Self::Expo(d) => write!(f, "expo.{}", d.as_str()),
            Self::Circ(d) => write!(f, "circ.{}", d.as_str()),
            Self::Back {
                overshoot,
                direction,
            } => write!(f, "back.{}({overshoot})", direction.as_str()),
            Self::Elastic {
                amplitude,
                period,
                direction,
            } => write!(f, "elastic.{}({amplitude}, {period})", direction.as_str()),
            Self::SlowMo {
                linear_ratio,
                power,
                yoyo,
            } => write!(f, "slow({linear_ratio}, {power}, {yoyo})"),
        }
    }
}

impl FromStr for Ease {
    type Err = EaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ease {
    type Error = EaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ease> for String {
    fn from(ease: Ease) -> Self {
        ease.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn preset_names() -> [&'static str; 11] {
        [
            "slow(0.2, 0.7, false)",
            "elastic.out(1, 0.35)",
            "power2.out",
            "power3.inOut",
            "power2.inOut",
            "none",
            "back.inOut(2)",
            "elastic.out(1.2, 0.3)",
            "back.out(1.8)",
            "back.out(1.2)",
            "power3.out",
        ]
    }

    #[test]
    fn preset_names_round_trip() {
        for name in preset_names() {
            let ease = Ease::parse(name).unwrap();
            assert_eq!(ease.to_string(), name, "canonical form of {name}");
            assert_eq!(Ease::parse(&ease.to_string()).unwrap(), ease);
        }
    }

    #[test]
    fn endpoints_are_fixed() {
        for name in preset_names() {
            let ease = Ease::parse(name).unwrap();
            assert!(ease.apply(0.0).abs() < EPS, "{name} at 0 = {}", ease.apply(0.0));
            assert!((ease.apply(1.0) - 1.0).abs() < EPS, "{name} at 1 = {}", ease.apply(1.0));
        }
    }

    #[test]
    fn input_is_clamped() {
        let ease = Ease::parse("power2.out").unwrap();
        assert_eq!(ease.apply(-3.0), 0.0);
        assert_eq!(ease.apply(7.0), 1.0);
        assert_eq!(ease.apply(f64::NAN), 0.0);
    }

    #[test]
    fn power_out_is_cubic() {
        let ease = Ease::parse("power2.out").unwrap();
        assert!((ease.apply(0.5) - 0.875).abs() < EPS);
        let ease_in = Ease::parse("power2.in").unwrap();
        assert!((ease_in.apply(0.5) - 0.125).abs() < EPS);
    }

    #[test]
    fn in_out_is_symmetric() {
        let ease = Ease::parse("power3.inOut").unwrap();
        assert!((ease.apply(0.5) - 0.5).abs() < EPS);
        for i in 1..10 {
            let t = f64::from(i) / 10.0;
            assert!((ease.apply(t) + ease.apply(1.0 - t) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn back_overshoots() {
        let ease = Ease::parse("back.out(1.8)").unwrap();
        let peak = (1..100)
            .map(|i| ease.apply(f64::from(i) / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn elastic_rings_around_target() {
        let ease = Ease::parse("elastic.out(1, 0.35)").unwrap();
        let samples: Vec<f64> = (1..100).map(|i| ease.apply(f64::from(i) / 100.0)).collect();
        assert!(samples.iter().any(|&v| v > 1.0));
        assert!(samples.iter().any(|&v| v < 1.0));
    }

    #[test]
    fn slow_mo_middle_is_linear() {
        let ease = Ease::parse("slow(0.2, 0.7, false)").unwrap();
        let a = ease.apply(0.45);
        let b = ease.apply(0.5);
        let c = ease.apply(0.55);
        assert!(((b - a) - (c - b)).abs() < 1e-9);
        assert!((b - 0.5).abs() < EPS);
    }

    #[test]
    fn yoyo_slow_mo_returns_home() {
        let ease = Ease::parse("slow(0.5, 0.7, true)").unwrap();
        assert!(ease.apply(1.0).abs() < EPS);
        assert!((ease.apply(0.5) - 1.0).abs() < EPS);
    }

    #[test]
    fn defaults_fill_missing_arguments() {
        assert_eq!(
            Ease::parse("back").unwrap(),
            Ease::Back {
                overshoot: DEFAULT_BACK_OVERSHOOT,
                direction: EaseDirection::Out
            }
        );
        assert_eq!(
            Ease::parse("elastic.inOut").unwrap(),
            Ease::Elastic {
                amplitude: 1.0,
                period: 0.45,
                direction: EaseDirection::InOut
            }
        );
        assert_eq!(Ease::parse("linear").unwrap(), Ease::Linear);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(Ease::parse("wobble.out"), Err(EaseError::Unknown(_))));
        assert!(matches!(Ease::parse("power2.sideways"), Err(EaseError::Unknown(_))));
        assert!(matches!(Ease::parse("back.out(x)"), Err(EaseError::BadArguments { .. })));
        assert!(matches!(Ease::parse("power2.out(3)"), Err(EaseError::BadArguments { .. })));
        assert!(matches!(Ease::parse("back.out(1"), Err(EaseError::BadArguments { .. })));
    }

    #[test]
    fn serde_uses_names() {
        let ease: Ease = serde_json::from_str("\"back.inOut(2)\"").unwrap();
        assert_eq!(
            ease,
            Ease::Back {
                overshoot: 2.0,
                direction: EaseDirection::InOut
            }
        );
        assert_eq!(serde_json::to_string(&ease).unwrap(), "\"back.inOut(2)\"");
        assert!(serde_json::from_str::<Ease>("\"nope\"").is_err());
    }
}
