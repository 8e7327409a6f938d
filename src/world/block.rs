//! Block taxonomy and the static terrain property table.

use serde::{Deserialize, Serialize};

/// Kind of block occupying a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockKind {
    Air = 0,
    Stone,
    Dirt,
    Grass,
    Sand,
    Gravel,
    Plank,
    Leaves,
    Water,
    Lava,
}

/// Per-kind terrain properties.
#[derive(Clone, Copy, Debug)]
pub struct BlockProps {
    pub solid: bool,
    pub liquid: bool,
    /// Mining hardness hint, also used as a dig-cost estimate
    pub hardness: f32,
}

/// Immutable process-wide property table, indexed by `BlockKind`.
static PROPS: [BlockProps; 10] = [
    // Air
    BlockProps {
        solid: false,
        liquid: false,
        hardness: 0.0,
    },
    // Stone
    BlockProps {
        solid: true,
        liquid: false,
        hardness: 1.5,
    },
    // Dirt
    BlockProps {
        solid: true,
        liquid: false,
        hardness: 0.5,
    },
    // Grass
    BlockProps {
        solid: true,
        liquid: false,
        hardness: 0.6,
    },
    // Sand
    BlockProps {
        solid: true,
        liquid: false,
        hardness: 0.5,
    },
    // Gravel
    BlockProps {
        solid: true,
        liquid: false,
        hardness: 0.6,
    },
    // Plank
    BlockProps {
        solid: true,
        liquid: false,
        hardness: 2.0,
    },
    // Leaves
    BlockProps {
        solid: true,
        liquid: false,
        hardness: 0.2,
    },
    // Water
    BlockProps {
        solid: false,
        liquid: true,
        hardness: 100.0,
    },
    // Lava
    BlockProps {
        solid: false,
        liquid: true,
        hardness: 100.0,
    },
];

impl BlockKind {
    #[inline]
    fn props(self) -> &'static BlockProps {
        &PROPS[self as usize]
    }
}

/// A sampled block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
}

impl Block {
    #[inline]
    pub fn new(kind: BlockKind) -> Self {
        Self { kind }
    }

    /// Whether an agent collides with this block
    #[inline]
    pub fn is_solid(&self) -> bool {
        self.kind.props().solid
    }

    /// Whether this block is a fluid
    #[inline]
    pub fn is_liquid(&self) -> bool {
        self.kind.props().liquid
    }

    /// Mining hardness / dig-cost hint
    #[inline]
    pub fn hardness(&self) -> f32 {
        self.kind.props().hardness
    }
}
