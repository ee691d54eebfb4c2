use std::fmt;

use thiserror::Error;

use crate::error::InvalidIndex;

pub const COLOR_NAMES: [&str; 32] = [
    "red", "blue", "yellow", "green", "purple", "orange", "cyan", "magenta",
    "lime", "pink", "brown", "navy", "turquoise", "olive", "maroon", "aqua",
    "teal", "gold", "silver", "coral", "violet", "mint", "beige", "salmon",
    "sandybrown", "indigo", "crimson", "khaki", "plum", "chocolate", "darkgreen",
    "darkorange",
];

/// One unit of colored liquid. Only the color identity matters to the rules.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FluidPacket {
    color_id: usize,
}

impl FluidPacket {
    pub const fn new(color_id: usize) -> Self {
        FluidPacket { color_id }
    }

    /// Parses a letter label. `"."` and blank input mean "no packet".
    pub fn new_from_repr(repr: &str) -> Option<Self> {
        let s = repr.trim();
        if s.is_empty() || s == "." {
            return None;
        }
        Self::letters_to_color_id(s).map(Self::new)
    }

    /// Convert a single letter (A-Z) into a 0-based id.
    pub fn letter_to_color_id(ch: char) -> Option<usize> {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let up = ch.to_ascii_uppercase();
        Some((up as u8 - b'A') as usize)
    }

    /// Convert a letter sequence like "A", "Z", "AA" into a 0-based id.
    /// Uses Excel-style base-26 numbering: A=0, B=1, ..., Z=25, AA=26, AB=27, ...
    fn letters_to_color_id(s: &str) -> Option<usize> {
        let mut acc: usize = 0;
        for ch in s.chars() {
            let digit = Self::letter_to_color_id(ch)?;
            acc = acc.checked_mul(26)?.checked_add(digit + 1)?;
        }
        acc.checked_sub(1)
    }

    pub fn get_color_id(&self) -> usize {
        self.color_id
    }

    pub fn get_name(&self) -> &'static str {
        COLOR_NAMES[self.color_id % COLOR_NAMES.len()]
    }

    pub fn get_letter_representation(&self) -> String {
        let mut chars = Vec::new();
        let mut id = self.color_id + 1; // 1-based for easier calculation
        while id > 0 {
            let rem = (id - 1) % 26;
            chars.push((b'A' + rem as u8) as char);
            id = (id - 1) / 26;
        }
        chars.iter().rev().collect()
    }
}

impl fmt::Display for FluidPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_letter_representation())
    }
}

/// Errors building a container or level from raw parts or text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("a level needs at least one container")]
    NoContainers,

    #[error("container capacity must be at least 1")]
    ZeroCapacity,

    #[error("{len} packets do not fit in a container of capacity {capacity}")]
    Overflow { len: usize, capacity: usize },

    #[error("container {index} has capacity {found}, expected {expected}")]
    MixedCapacity {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("unrecognised token '{token}' in container {index}")]
    BadToken { index: usize, token: String },

    #[error("container {index} has liquid floating above a free slot")]
    FloatingPacket { index: usize },
}

/// A tube: packets ordered bottom-to-top, never more than `capacity` of them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FluidContainer {
    packets: Vec<FluidPacket>,
    capacity: usize,
}

impl FluidContainer {
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn with_packets(capacity: usize, packets: Vec<FluidPacket>) -> Result<Self, LevelError> {
        if capacity == 0 {
            return Err(LevelError::ZeroCapacity);
        }
        if packets.len() > capacity {
            return Err(LevelError::Overflow {
                len: packets.len(),
                capacity,
            });
        }
        Ok(Self { packets, capacity })
    }

    /// Parses `"AAB."`-style text, bottom first. Labels longer than one
    /// letter need commas: `"AA,B,."`. The token count is the capacity.
    pub fn new_from_repr(repr: &str, index: usize) -> Result<Self, LevelError> {
        let tokens: Vec<String> = if repr.contains(',') {
            repr.split(',').map(|t| t.trim().to_string()).collect()
        } else {
            repr.chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c.to_string())
                .collect()
        };

        let mut packets = Vec::with_capacity(tokens.len());
        let mut seen_free_slot = false;
        for token in &tokens {
            match FluidPacket::new_from_repr(token) {
                Some(_) if seen_free_slot => {
                    return Err(LevelError::FloatingPacket { index });
                }
                Some(packet) => packets.push(packet),
                None if token.is_empty() || token == "." => seen_free_slot = true,
                None => {
                    return Err(LevelError::BadToken {
                        index,
                        token: token.clone(),
                    });
                }
            }
        }
        Self::with_packets(tokens.len(), packets)
    }

    /// Appends a packet if there is room. Color rules are the pour engine's job.
    pub(crate) fn add_fluid(&mut self, packet: FluidPacket) -> bool {
        if self.is_full() {
            return false;
        }
        self.packets.push(packet);
        true
    }

    pub(crate) fn pop_fluid(&mut self) -> Option<FluidPacket> {
        self.packets.pop()
    }

    pub fn is_full(&self) -> bool {
        self.packets.len() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// True when every packet has the same color. Empty containers are uniform.
    pub fn is_uniform(&self) -> bool {
        match self.packets.first() {
            Some(first) => self.packets.iter().all(|p| p == first),
            None => true,
        }
    }

    pub fn is_solved(&self) -> bool {
        !self.is_empty() && self.is_full() && self.is_uniform()
    }

    pub fn get_empty_space(&self) -> usize {
        self.capacity - self.packets.len()
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_filled_amount(&self) -> usize {
        self.packets.len()
    }

    pub fn get_top_fluid(&self) -> Option<FluidPacket> {
        self.packets.last().copied()
    }

    /// Length of the contiguous same-color run at the top.
    pub fn get_top_fluid_depth(&self) -> usize {
        let Some(top) = self.get_top_fluid() else {
            return 0;
        };
        self.packets.iter().rev().take_while(|p| **p == top).count()
    }

    pub fn get_packets(&self) -> &[FluidPacket] {
        &self.packets
    }

    pub fn get_text_representation(&self) -> String {
        let mut repr: Vec<String> = self
            .packets
            .iter()
            .map(FluidPacket::get_letter_representation)
            .collect();
        repr.extend(std::iter::repeat_n(".".to_string(), self.get_empty_space()));
        let has_multi_char = repr.iter().any(|s| s.len() > 1);
        let separator = if has_multi_char { "," } else { "" };
        repr.join(separator)
    }
}

/// An ordered set of containers that all share one capacity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Level {
    fluid_containers: Vec<FluidContainer>,
    capacity: usize,
}

impl Level {
    pub fn new(fluid_containers: Vec<FluidContainer>) -> Result<Self, LevelError> {
        let capacity = fluid_containers
            .first()
            .ok_or(LevelError::NoContainers)?
            .get_capacity();
        if capacity == 0 {
            return Err(LevelError::ZeroCapacity);
        }
        if let Some((index, container)) = fluid_containers
            .iter()
            .enumerate()
            .find(|(_, c)| c.get_capacity() != capacity)
        {
            return Err(LevelError::MixedCapacity {
                index,
                expected: capacity,
                found: container.get_capacity(),
            });
        }
        Ok(Self {
            fluid_containers,
            capacity,
        })
    }

    /// One container per non-blank line, see [`FluidContainer::new_from_repr`].
    pub fn from_text(repr: &str) -> Result<Self, LevelError> {
        let containers = repr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, line)| FluidContainer::new_from_repr(line, index))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(containers)
    }

    pub fn to_text(&self) -> String {
        self.fluid_containers
            .iter()
            .map(FluidContainer::get_text_representation)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.fluid_containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fluid_containers.is_empty()
    }

    pub fn containers(&self) -> &[FluidContainer] {
        &self.fluid_containers
    }

    pub fn container(&self, index: usize) -> Result<&FluidContainer, InvalidIndex> {
        InvalidIndex::check(index, self.len()).map(|i| &self.fluid_containers[i])
    }

    pub fn total_units(&self) -> usize {
        self.fluid_containers
            .iter()
            .map(FluidContainer::get_filled_amount)
            .sum()
    }

    pub fn solved_indices(&self) -> Vec<usize> {
        self.fluid_containers
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_solved())
            .map(|(i, _)| i)
            .collect()
    }

    /// Every non-empty container is solved. Empty containers never block.
    pub fn is_victory(&self) -> bool {
        self.fluid_containers
            .iter()
            .all(|c| c.is_empty() || c.is_solved())
    }

    /// Two distinct containers borrowed mutably at once.
    pub(crate) fn pair_mut(&mut self, a: usize, b: usize) -> (&mut FluidContainer, &mut FluidContainer) {
        assert_ne!(a, b, "pair_mut needs two distinct containers");
        if a < b {
            let (low, high) = self.fluid_containers.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.fluid_containers.split_at_mut(a);
            (&mut high[0], &mut low[b])
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
