pub mod candle;
pub mod direction;
pub mod signal;

pub use candle::{Candle, CandleWindow};
pub use direction::{GaleLevel, Outcome, SignalDirection, TrendDirection};
pub use signal::{CandleRecord, GaleItem, Signal};
