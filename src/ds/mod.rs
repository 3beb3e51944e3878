pub mod arena;
pub mod radix;

pub use arena::{SlotId, ValueArena};
pub use radix::RadixTree;
