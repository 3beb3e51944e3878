pub use crate::builder::{AnyCache, CacheBuilder, EngineKind};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::engine::{KvCache, MapCache, RingCache, TtlCache};
pub use crate::error::{BoxError, CacheError};
pub use crate::metrics::CacheMetrics;
pub use crate::traits::{Cache, Mapper, PrefixSearch};
pub use crate::wrap::{Locker, NumberMapper, Prefixed, Sharded, StringMapper, Updater};
