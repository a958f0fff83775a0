pub mod set;
pub mod unit;
pub mod value;

pub use set::MeasurementSet;
pub use unit::{MeasurementUnit, UnitCategory};
pub use value::MeasurementValue;
