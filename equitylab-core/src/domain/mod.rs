//! Domain types: raw bars, price rows, feature rows.

pub mod feature;
pub mod price;

pub use feature::FeatureRow;
pub use price::{PriceRow, RawPriceRow, SourceRow};
