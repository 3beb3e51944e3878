pub mod kv;
pub mod map;
pub mod ring;
pub mod ttl;

pub use kv::KvCache;
pub use map::MapCache;
pub use ring::RingCache;
pub use ttl::TtlCache;
