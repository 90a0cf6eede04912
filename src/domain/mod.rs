pub mod decision;
pub mod market;

pub use decision::TradeDecision;
pub use market::{Event, Market};
