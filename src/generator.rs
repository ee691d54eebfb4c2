//! Random level generation.
//!
//! Levels are a blind shuffle: no attempt is made to check that the result
//! can actually be sorted.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::model::{FluidContainer, FluidPacket, Level, LevelError};

/// Empty containers added next to the colored ones.
pub const BUFFER_CONTAINERS: usize = 2;

pub const BASE_COLORS: usize = 3;
pub const MAX_COLORS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("a level needs at least one color")]
    NoColors,

    #[error("container capacity must be at least 1")]
    ZeroCapacity,

    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Palette size for a 0-based level number: three colors, one more every
/// second level, never more than six.
pub fn colors_for_level(level: u32) -> usize {
    colors_for_level_with(level, BASE_COLORS, MAX_COLORS)
}

pub fn colors_for_level_with(level: u32, base: usize, max: usize) -> usize {
    base.saturating_add((level / 2) as usize).min(max)
}

/// Shuffles `num_colors * capacity` packets and deals them container by
/// container, each filled to `capacity` before the next, then appends
/// [`BUFFER_CONTAINERS`] empty ones.
#[instrument(skip(rng))]
pub fn generate_level<R: Rng + ?Sized>(
    num_colors: usize,
    capacity: usize,
    rng: &mut R,
) -> Result<Level, GenerateError> {
    if num_colors == 0 {
        return Err(GenerateError::NoColors);
    }
    if capacity == 0 {
        return Err(GenerateError::ZeroCapacity);
    }

    let mut packets: Vec<FluidPacket> = (0..num_colors)
        .flat_map(|color_id| std::iter::repeat_n(FluidPacket::new(color_id), capacity))
        .collect();
    packets.shuffle(rng);

    let mut fluid_containers: Vec<FluidContainer> = packets
        .chunks(capacity)
        .map(|chunk| FluidContainer::with_packets(capacity, chunk.to_vec()))
        .collect::<Result<_, LevelError>>()?;
    fluid_containers.extend((0..BUFFER_CONTAINERS).map(|_| FluidContainer::new(capacity)));

    let level = Level::new(fluid_containers)?;
    debug!(containers = level.len(), units = level.total_units(), "generated level");
    Ok(level)
}

/// [`generate_level`] with a reproducible RNG when `seed` is given, the
/// thread RNG otherwise.
pub fn generate_seeded(
    num_colors: usize,
    capacity: usize,
    seed: Option<u64>,
) -> Result<Level, GenerateError> {
    match seed {
        Some(seed) => generate_level(num_colors, capacity, &mut StdRng::seed_from_u64(seed)),
        None => generate_level(num_colors, capacity, &mut rand::rng()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn difficulty_curve() {
        let curve: Vec<usize> = (0..12).map(colors_for_level).collect();
        assert_eq!(curve, vec![3, 3, 4, 4, 5, 5, 6, 6, 6, 6, 6, 6]);
        assert_eq!(colors_for_level_with(4, 2, 10), 4);
    }

    #[test]
    fn shape_and_conservation() {
        let mut rng = StdRng::seed_from_u64(7);
        for num_colors in 1..=6 {
            let level = generate_level(num_colors, 4, &mut rng).unwrap();
            assert_eq!(level.len(), num_colors + BUFFER_CONTAINERS);
            assert_eq!(level.capacity(), 4);
            assert_eq!(level.total_units(), num_colors * 4);

            let (filled, empty) = level.containers().split_at(num_colors);
            assert!(filled.iter().all(FluidContainer::is_full));
            assert!(empty.iter().all(FluidContainer::is_empty));

            let mut counts: HashMap<usize, usize> = HashMap::new();
            for packet in level.containers().iter().flat_map(|c| c.get_packets()) {
                *counts.entry(packet.get_color_id()).or_default() += 1;
            }
            assert_eq!(counts.len(), num_colors);
            assert!(counts.values().all(|&n| n == 4));
        }
    }

    #[test]
    fn seed_makes_generation_reproducible() {
        let a = generate_seeded(5, 4, Some(42)).unwrap();
        let b = generate_seeded(5, 4, Some(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_degenerate_input() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(generate_level(0, 4, &mut rng), Err(GenerateError::NoColors));
        assert_eq!(generate_level(3, 0, &mut rng), Err(GenerateError::ZeroCapacity));
    }
}
