//! Carry forecast computation
//!
//! Turns front/further futures prices and expirations into a
//! volatility-normalized, multi-horizon, diversification-adjusted forecast
//! bounded to `[-20, 20]`.

pub mod combiner;
pub mod error;
pub mod expiry;
pub mod forecast;
pub mod pipeline;
pub mod risk_adjusted;
pub mod volatility;


pub use combiner::{diversification_multiplier, CorrelationMatrix};
pub use error::{CarryError, ExpiryFault};
pub use forecast::HorizonCalibration;
pub use pipeline::{CarryPipeline, CarrySeries};
