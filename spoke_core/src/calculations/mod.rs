//! # Calculations
//!
//! Each calculation follows the pattern:
//!
//! - input type (parsed, numeric)
//! - result type (JSON-serializable)
//! - `calculate(input) -> Result<Result, CalcError>` - pure function
//!
//! ## Available Calculations
//!
//! - [`spoke`] - Left/right spoke length from hub and rim geometry

pub mod spoke;

pub use spoke::{
    calculate, calculate_breakdown, compute, floor_to_tenth, CalculationResult, Side, SideBreakdown,
    SpokeBreakdown,
};
