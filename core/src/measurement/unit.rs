use serde::{Deserialize, Serialize};
use std::fmt;

/// Family of mutually convertible units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    Length,
    Weight,
    Volume,
    Angle,
    Temperature,
}

impl UnitCategory {
    /// Valid amounts expressed in the category's base unit.
    pub fn base_range(&self) -> (f64, f64) {
        match self {
            UnitCategory::Length => (0.0, 1.0e6),
            UnitCategory::Weight => (0.0, 1.0e6),
            UnitCategory::Volume => (0.0, 1.0e9),
            UnitCategory::Angle => (-360.0, 360.0),
            UnitCategory::Temperature => (-273.15, 1.0e6),
        }
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitCategory::Length => "length",
            UnitCategory::Weight => "weight",
            UnitCategory::Volume => "volume",
            UnitCategory::Angle => "angle",
            UnitCategory::Temperature => "temperature",
        };
        f.write_str(name)
    }
}

/// Unit of measure. Base units: metre, kilogram, litre, degree, degree Celsius.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementUnit {
    Millimeter,
    Centimeter,
    Meter,
    Kilometer,
    Inch,
    Foot,
    Yard,
    Milligram,
    Gram,
    Kilogram,
    Ounce,
    Pound,
    Milliliter,
    Liter,
    CubicCentimeter,
    CubicMeter,
    FluidOunce,
    Gallon,
    Degree,
    Radian,
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl MeasurementUnit {
    pub const ALL: [MeasurementUnit; 23] = [
        MeasurementUnit::Millimeter,
        MeasurementUnit::Centimeter,
        MeasurementUnit::Meter,
        MeasurementUnit::Kilometer,
        MeasurementUnit::Inch,
        MeasurementUnit::Foot,
        MeasurementUnit::Yard,
        MeasurementUnit::Milligram,
        MeasurementUnit::Gram,
        MeasurementUnit::Kilogram,
        MeasurementUnit::Ounce,
        MeasurementUnit::Pound,
        MeasurementUnit::Milliliter,
        MeasurementUnit::Liter,
        MeasurementUnit::CubicCentimeter,
        MeasurementUnit::CubicMeter,
        MeasurementUnit::FluidOunce,
        MeasurementUnit::Gallon,
        MeasurementUnit::Degree,
        MeasurementUnit::Radian,
        MeasurementUnit::Celsius,
        MeasurementUnit::Fahrenheit,
        MeasurementUnit::Kelvin,
    ];

    pub fn category(&self) -> UnitCategory {
        use MeasurementUnit::*;
        match self {
            Millimeter | Centimeter | Meter | Kilometer | Inch | Foot | Yard => {
                UnitCategory::Length
            }
            Milligram | Gram | Kilogram | Ounce | Pound => UnitCategory::Weight,
            Milliliter | Liter | CubicCentimeter | CubicMeter | FluidOunce | Gallon => {
                UnitCategory::Volume
            }
            Degree | Radian => UnitCategory::Angle,
            Celsius | Fahrenheit | Kelvin => UnitCategory::Temperature,
        }
    }

    pub fn symbol(&self) -> &'static str {
        use MeasurementUnit::*;
        match self {
            Millimeter => "mm",
            Centimeter => "cm",
            Meter => "m",
            Kilometer => "km",
            Inch => "in",
            Foot => "ft",
            Yard => "yd",
            Milligram => "mg",
            Gram => "g",
            Kilogram => "kg",
            Ounce => "oz",
            Pound => "lb",
            Milliliter => "ml",
            Liter => "l",
            CubicCentimeter => "cm3",
            CubicMeter => "m3",
            FluidOunce => "fl oz",
            Gallon => "gal",
            Degree => "deg",
            Radian => "rad",
            Celsius => "°C",
            Fahrenheit => "°F",
            Kelvin => "K",
        }
    }

    /// `(scale, offset)` such that `base = amount * scale + offset`.
    fn to_base_affine(self) -> (f64, f64) {
        use MeasurementUnit::*;
        match self {
            Millimeter => (0.001, 0.0),
            Centimeter => (0.01, 0.0),
            Meter => (1.0, 0.0),
            Kilometer => (1000.0, 0.0),
            Inch => (0.0254, 0.0),
            Foot => (0.3048, 0.0),
            Yard => (0.9144, 0.0),
            Milligram => (1.0e-6, 0.0),
            Gram => (0.001, 0.0),
            Kilogram => (1.0, 0.0),
            Ounce => (0.028_349_523_125, 0.0),
            Pound => (0.453_592_37, 0.0),
            Milliliter => (0.001, 0.0),
            Liter => (1.0, 0.0),
            CubicCentimeter => (0.001, 0.0),
            CubicMeter => (1000.0, 0.0),
            FluidOunce => (0.029_573_529_562_5, 0.0),
            Gallon => (3.785_411_784, 0.0),
            Degree => (1.0, 0.0),
            Radian => (180.0 / std::f64::consts::PI, 0.0),
            Celsius => (1.0, 0.0),
            Fahrenheit => (5.0 / 9.0, -32.0 * 5.0 / 9.0),
            Kelvin => (1.0, -273.15),
        }
    }

    pub fn to_base(&self, amount: f64) -> f64 {
        let (scale, offset) = self.to_base_affine();
        amount * scale + offset
    }

    pub fn from_base(&self, base: f64) -> f64 {
        let (scale, offset) = self.to_base_affine();
        (base - offset) / scale
    }

    /// Valid amounts for this unit, derived from the category's base range.
    pub fn valid_range(&self) -> (f64, f64) {
        let (low, high) = self.category().base_range();
        (self.from_base(low), self.from_base(high))
    }

    pub fn is_valid_amount(&self, amount: f64) -> bool {
        if !amount.is_finite() {
            return false;
        }
        let (low, high) = self.category().base_range();
        let base = self.to_base(amount);
        // Tolerate rounding at the edges, e.g. 0 K -> -273.15 °C.
        let slack = 1e-9 * high.abs().max(low.abs()).max(1.0);
        base >= low - slack && base <= high + slack
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
