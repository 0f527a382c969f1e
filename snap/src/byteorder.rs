//! Byte-order correction for captured blocks.
//!
//! The IP tags every snap with the order in which it packed bytes into
//! 32-bit words. Labels give the significance of bytes 0..3 of a word, so
//! `O1234` is big-endian and `O4321` little-endian. Any two orders differ by
//! one of three swaps:
//!
//! ```text
//!             1234        2143        3412        4321
//!   1234      -           bytes       words       bytes+words
//!   2143      bytes       -           bytes+words words
//!   3412      words       bytes+words -           bytes
//!   4321      bytes+words words       bytes       -
//! ```
//!
//! "bytes" swaps the two bytes of each 16-bit half, "words" swaps the two
//! 16-bit halves of each 32-bit word.

/// Byte packing of a 32-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ByteOrder {
    O1234 = 0,
    O2143 = 1,
    O3412 = 2,
    O4321 = 3,
}

impl ByteOrder {
    pub const ALL: [ByteOrder; 4] = [
        ByteOrder::O1234,
        ByteOrder::O2143,
        ByteOrder::O3412,
        ByteOrder::O4321,
    ];

    /// Order of the CPU this crate is compiled for.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::O4321
        } else {
            ByteOrder::O1234
        }
    }
}

/// Which swap turns one order into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapClass {
    None,
    SwapBytes,
    SwapWords,
    SwapBytesAndWords,
}

use SwapClass::{None as Nop, SwapBytes as Sb, SwapBytesAndWords as Sbw, SwapWords as Sw};

const SWAP_TABLE: [[SwapClass; 4]; 4] = [
    [Nop, Sb, Sw, Sbw],
    [Sb, Nop, Sbw, Sw],
    [Sw, Sbw, Nop, Sb],
    [Sbw, Sw, Sb, Nop],
];

/// Classify the conversion `from` → `to`. Symmetric.
#[inline]
pub fn classify(from: ByteOrder, to: ByteOrder) -> SwapClass {
    SWAP_TABLE[from as usize][to as usize]
}

#[inline]
fn swap_word(word: [u8; 4], class: SwapClass) -> [u8; 4] {
    let [a, b, c, d] = word;
    match class {
        SwapClass::None => word,
        SwapClass::SwapBytes => [b, a, d, c],
        SwapClass::SwapWords => [c, d, a, b],
        SwapClass::SwapBytesAndWords => [d, c, b, a],
    }
}

/// Convert `block` in place from `from` to `to` packing.
///
/// Returns the swap that was applied. A trailing partial word is left as is.
pub fn apply(block: &mut [u8], from: ByteOrder, to: ByteOrder) -> SwapClass {
    let class = classify(from, to);
    if class == SwapClass::None {
        return class;
    }

    for chunk in block.chunks_exact_mut(4) {
        let word = [chunk[0], chunk[1], chunk[2], chunk[3]];
        chunk.copy_from_slice(&swap_word(word, class));
    }

    class
}
