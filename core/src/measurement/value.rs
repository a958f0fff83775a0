use crate::measurement::unit::{MeasurementUnit, UnitCategory};
use crate::prelude::{check_unit_interval, MeasureError, MeasureResult};
use serde::Serialize;
use std::fmt;

/// One physical measurement with the confidence it was taken at.
///
/// Values are immutable and valid by construction: the amount is finite and
/// inside the unit's range, and conversions never cross unit categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementValue {
    amount: f64,
    unit: MeasurementUnit,
    confidence: f32,
}

impl MeasurementValue {
    pub fn new(amount: f64, unit: MeasurementUnit, confidence: f32) -> MeasureResult<Self> {
        check_unit_interval(confidence, "measurement confidence")
            .map_err(MeasureError::InvalidRecord)?;
        Self::checked(amount, unit, confidence)
    }

    fn checked(amount: f64, unit: MeasurementUnit, confidence: f32) -> MeasureResult<Self> {
        if !unit.is_valid_amount(amount) {
            return Err(MeasureError::OutOfRange { amount, unit });
        }
        Ok(Self {
            amount,
            unit,
            confidence,
        })
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn unit(&self) -> MeasurementUnit {
        self.unit
    }

    pub fn category(&self) -> UnitCategory {
        self.unit.category()
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn convert_to(&self, target: MeasurementUnit) -> MeasureResult<Self> {
        if self.unit.category() != target.category() {
            return Err(MeasureError::IncompatibleUnits {
                from: self.unit,
                to: target,
            });
        }
        if self.unit == target {
            return Ok(*self);
        }
        let converted = target.from_base(self.unit.to_base(self.amount));
        Self::checked(converted, target, self.confidence)
    }

    /// Sum in `self`'s unit; confidence is the weaker of the two.
    pub fn add(&self, other: &MeasurementValue) -> MeasureResult<Self> {
        let rhs = other.convert_to(self.unit)?;
        self.combine(self.amount + rhs.amount, rhs.confidence, "addition")
    }

    pub fn subtract(&self, other: &MeasurementValue) -> MeasureResult<Self> {
        let rhs = other.convert_to(self.unit)?;
        self.combine(self.amount - rhs.amount, rhs.confidence, "subtraction")
    }

    pub fn scale(&self, factor: f64) -> MeasureResult<Self> {
        if !factor.is_finite() {
            return Err(MeasureError::InvalidArithmetic(format!(
                "scale factor {factor} is not finite"
            )));
        }
        self.combine(self.amount * factor, self.confidence, "scaling")
    }

    fn combine(&self, amount: f64, other_confidence: f32, operation: &str) -> MeasureResult<Self> {
        if !amount.is_finite() {
            return Err(MeasureError::InvalidArithmetic(format!(
                "{operation} of {self} overflowed"
            )));
        }
        Self::checked(amount, self.unit, self.confidence.min(other_confidence))
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.unit)
    }
}
