//! In-process result cache with an injected clock.

mod clock;
mod key;
mod result_cache;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use result_cache::{CacheSettings, CacheStats, ResultCache};
