#![forbid(unsafe_code)]

//! Start offsets for staggered groups.

use std::time::Duration;

/// Start offset of each of `count` items, `delay` apart, first at zero.
#[must_use]
pub fn stagger_offsets(count: usize, delay: Duration) -> Vec<Duration> {
    (0..count)
        .map(|i| delay.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_evenly_spaced() {
        let offsets = stagger_offsets(4, Duration::from_millis(40));
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(40),
                Duration::from_millis(80),
                Duration::from_millis(120)
            ]
        );
    }

    #[test]
    fn empty_group() {
        assert!(stagger_offsets(0, Duration::from_millis(40)).is_empty());
    }
}
