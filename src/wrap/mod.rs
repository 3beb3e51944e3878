pub mod locker;
pub mod prefixed;
pub mod sharded;
pub mod updater;

pub use locker::{Locker, ReadTx, WriteTx};
pub use prefixed::Prefixed;
pub use sharded::{NumberMapper, Sharded, StringMapper};
pub use updater::Updater;
