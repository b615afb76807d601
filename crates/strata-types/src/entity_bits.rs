use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask selecting which kinds of entities a reader should decode.
///
/// Bit layout:
///   bit 0 = node
///   bit 1 = way
///   bit 2 = relation
///   bit 3 = changeset
///   bits 4-7 = unused
///
/// The decode pipeline passes the mask to concrete parsers unmodified;
/// only the parsers interpret it.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntityBits(u8);

impl EntityBits {
    /// No entities at all. Useful to read only the header.
    pub const NOTHING: Self = Self(0);

    pub const NODE: Self = Self(0b0000_0001);
    pub const WAY: Self = Self(0b0000_0010);
    pub const RELATION: Self = Self(0b0000_0100);
    pub const CHANGESET: Self = Self(0b0000_1000);

    /// Every OSM object kind except changesets.
    pub const OBJECT: Self = Self(0b0000_0111);

    pub const ALL: Self = Self(0b0000_1111);

    /// Create a mask from a raw byte. Unused bits are cleared.
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        Self(raw & Self::ALL.0)
    }

    #[must_use]
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is also set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share at least one bit.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EntityBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EntityBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for EntityBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(EntityBits, &str); 4] = [
            (EntityBits::NODE, "NODE"),
            (EntityBits::WAY, "WAY"),
            (EntityBits::RELATION, "RELATION"),
            (EntityBits::CHANGESET, "CHANGESET"),
        ];

        if self.is_empty() {
            return f.write_str("EntityBits(NOTHING)");
        }
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "EntityBits({})", names.join(" | "))
    }
}
