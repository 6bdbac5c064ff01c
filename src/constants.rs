//! # Constants and type definitions for conjunct
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - Astronomical and geophysical constants
//! - Unit conversions (degrees ↔ radians, arcseconds ↔ radians, days ↔ minutes)
//! - Geodetic constants of the WGS-72 model used by SGP4 element sets
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of minutes in a Julian day
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Radius of the geosynchronous orbit in kilometers
pub const GEO_RADIUS_KM: Kilometer = 42_164.0;

/// Default radius of the protected region around the Earth, 1.10 × 1.10 × GEO.
pub const PROTECTED_RADIUS_KM: Kilometer = 1.10 * 1.10 * GEO_RADIUS_KM;

// -------------------------------------------------------------------------------------------------
// WGS-72 constants (the geodetic model of the SGP4 theory)
// -------------------------------------------------------------------------------------------------

/// WGS-72 Earth equatorial radius in kilometers
pub const WGS72_RADIUS_KM: Kilometer = 6378.135;

/// WGS-72 Earth gravitational parameter in km³/s²
pub const WGS72_MU: f64 = 398_600.8;

/// WGS-72 second zonal harmonic
pub const WGS72_J2: f64 = 0.001_082_616;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
/// NORAD catalog number of a tracked object
pub type CatalogNumber = u64;
