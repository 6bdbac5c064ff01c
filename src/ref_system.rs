//! # Inertial frame rotations
//!
//! Rotation matrices between the quasi-inertial frames met by the search:
//!
//! * **TEME** (True Equator, Mean Equinox of date), the output frame of SGP4,
//! * **TOD** / **MOD** (true and mean equator and equinox of date),
//! * **J2000** mean equator and equinox,
//! * **GCRS**, aligned with ICRF, the frame of geocentric Horizons vectors.
//!
//! The chain used for SGP4 output is
//!
//! ```text
//! x_gcrs = Bᵀ · Pᵀ · Nᵀ · R3(-Eqeq) · x_teme
//! ```
//!
//! with `Eqeq = Δψ cos ε` the classical equation of the equinoxes, `N` the IAU 1980 nutation,
//! `P` the IAU 1976 precession and `B` the IERS 2003 frame bias.
//!
//! All elementary rotations follow the **passive** convention (change of basis): `rotmt(α, k)`
//! expresses in the rotated frame a vector given in the original one.
use nalgebra::Matrix3;

use crate::{
    constants::{ArcSec, Radian, DPI, MJD, RADEG, RADSEC, T2000},
    state::ReferenceFrame,
};

/// Principal axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Elementary passive rotation of angle `alpha` (radians) around `axis`.
///
/// For the Z axis:
///
/// ```text
///        |  cos α   sin α   0 |
/// R3(α) = | -sin α   cos α   0 |
///        |    0       0     1 |
/// ```
pub fn rotmt(alpha: Radian, axis: Axis) -> Matrix3<f64> {
    let (s, c) = alpha.sin_cos();
    match axis {
        Axis::X => Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c),
        Axis::Y => Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c),
        Axis::Z => Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0),
    }
}

/// Mean obliquity of the ecliptic at a given epoch (IAU 1976 model).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * Mean obliquity of the ecliptic in radians, evaluated with Horner's method:
///
/// ```text
/// ε = ((ob3 * t + ob2) * t + ob1) * t + ob0
/// ```
pub fn obleq(tjm: MJD) -> Radian {
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.0006 * RADSEC;
    let ob3 = 0.00181 * RADSEC;

    let t = (tjm - T2000) / 36525.0;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// Delaunay arguments of the IAU 1980 theory: polynomial coefficients in arcseconds for
/// l (Moon mean anomaly), l' (Sun mean anomaly), F, D and Ω.
const DELAUNAY_ARCSEC: [[f64; 4]; 5] = [
    [485866.733, 1717915922.633, 31.310, 0.064],
    [1287099.804, 129596581.224, -0.577, -0.012],
    [335778.877, 1739527263.137, -13.257, 0.011],
    [1072261.307, 1602961601.328, -6.891, 0.019],
    [450160.280, -6962890.539, 7.455, 0.008],
];

/// One term of the nutation series.
struct NutationTerm {
    /// multipliers of (l, l', F, D, Ω)
    args: [i8; 5],
    /// Δψ coefficient and its rate per Julian century, in 0.0001"
    psi: (f64, f64),
    /// Δε coefficient and its rate per Julian century, in 0.0001"
    eps: (f64, f64),
}

const fn term(args: [i8; 5], psi: (f64, f64), eps: (f64, f64)) -> NutationTerm {
    NutationTerm { args, psi, eps }
}

/// Leading terms of the IAU 1980 nutation series, by decreasing amplitude.
/// The omitted terms sum to a few milliarcseconds.
const NUTATION_1980: [NutationTerm; 30] = [
    term([0, 0, 0, 0, 1], (-171996.0, -174.2), (92025.0, 8.9)),
    term([0, 0, 2, -2, 2], (-13187.0, -1.6), (5736.0, -3.1)),
    term([0, 0, 2, 0, 2], (-2274.0, -0.2), (977.0, -0.5)),
    term([0, 0, 0, 0, 2], (2062.0, 0.2), (-895.0, 0.5)),
    term([0, 1, 0, 0, 0], (1426.0, -3.4), (54.0, -0.1)),
    term([1, 0, 0, 0, 0], (712.0, 0.1), (-7.0, 0.0)),
    term([0, 1, 2, -2, 2], (-517.0, 1.2), (224.0, -0.6)),
    term([0, 0, 2, 0, 1], (-386.0, -0.4), (200.0, 0.0)),
    term([1, 0, 2, 0, 2], (-301.0, 0.0), (129.0, -0.1)),
    term([0, -1, 2, -2, 2], (217.0, -0.5), (-95.0, 0.3)),
    term([1, 0, 0, -2, 0], (-158.0, 0.0), (-1.0, 0.0)),
    term([0, 0, 2, -2, 1], (129.0, 0.1), (-70.0, 0.0)),
    term([-1, 0, 2, 0, 2], (123.0, 0.0), (-53.0, 0.0)),
    term([1, 0, 0, 0, 1], (63.0, 0.1), (-33.0, 0.0)),
    term([0, 0, 0, 2, 0], (63.0, 0.0), (-2.0, 0.0)),
    term([-1, 0, 2, 2, 2], (-59.0, 0.0), (26.0, 0.0)),
    term([-1, 0, 0, 0, 1], (-58.0, -0.1), (32.0, 0.0)),
    term([1, 0, 2, 0, 1], (-51.0, 0.0), (27.0, 0.0)),
    term([2, 0, 0, -2, 0], (48.0, 0.0), (1.0, 0.0)),
    term([-2, 0, 2, 0, 1], (46.0, 0.0), (-24.0, 0.0)),
    term([0, 0, 2, 2, 2], (-38.0, 0.0), (16.0, 0.0)),
    term([2, 0, 2, 0, 2], (-31.0, 0.0), (13.0, 0.0)),
    term([2, 0, 0, 0, 0], (29.0, 0.0), (-1.0, 0.0)),
    term([1, 0, 2, -2, 2], (29.0, 0.0), (-12.0, 0.0)),
    term([0, 0, 2, 0, 0], (26.0, 0.0), (-1.0, 0.0)),
    term([0, 0, 2, -2, 0], (-22.0, 0.0), (0.0, 0.0)),
    term([-1, 0, 2, 0, 1], (21.0, 0.0), (-10.0, 0.0)),
    term([0, 2, 0, 0, 0], (17.0, -0.1), (0.0, 0.0)),
    term([0, 2, 2, -2, 2], (-16.0, 0.1), (7.0, 0.0)),
    term([-1, 0, 0, 2, 1], (16.0, 0.0), (-8.0, 0.0)),
];

/// Nutation in longitude and obliquity (Δψ, Δε) from the IAU 1980 (Wahr) theory.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * `(Δψ, Δε)` in arcseconds.
pub fn nutn80(tjm: MJD) -> (ArcSec, ArcSec) {
    let t = (tjm - T2000) / 36525.0;

    let delaunay = DELAUNAY_ARCSEC.map(|[c0, c1, c2, c3]| {
        let arcsec = ((c3 * t + c2) * t + c1) * t + c0;
        (arcsec * RADSEC) % DPI
    });

    let (dpsi, deps) = NUTATION_1980.iter().fold((0.0, 0.0), |(dpsi, deps), term| {
        let arg: f64 = term
            .args
            .iter()
            .zip(delaunay.iter())
            .map(|(&k, &a)| f64::from(k) * a)
            .sum();
        let (s, c) = arg.sin_cos();
        (
            dpsi + (term.psi.0 + term.psi.1 * t) * s,
            deps + (term.eps.0 + term.eps.1 * t) * c,
        )
    });

    // 0.0001" → "
    (dpsi * 1e-4, deps * 1e-4)
}

/// Nutation matrix `N` such that `x_tod = N · x_mod`.
///
/// `N = R1(-ε - Δε) · R3(-Δψ) · R1(ε)`
pub fn rnut80(tjm: MJD) -> Matrix3<f64> {
    let epsm = obleq(tjm);
    let (dpsi, deps) = nutn80(tjm);
    let epst = epsm + deps * RADSEC;

    let r1 = rotmt(epsm, Axis::X);
    let r2 = rotmt(-dpsi * RADSEC, Axis::Z);
    let r3 = rotmt(-epst, Axis::X);

    r3 * r2 * r1
}

/// IAU 1976 precession matrix `P` such that `x_mod = P · x_j2000`.
///
/// `P = R3(-z) · R2(θ) · R3(-ζ)`
pub fn prec(tjm: MJD) -> Matrix3<f64> {
    let zed = 0.6406161 * RADEG;
    let zd = 0.6406161 * RADEG;
    let thd = 0.5567530 * RADEG;

    let zedd = 0.0000839 * RADEG;
    let zdd = 0.0003041 * RADEG;
    let thdd = -0.0001185 * RADEG;

    let zeddd = 0.0000050 * RADEG;
    let zddd = 0.0000051 * RADEG;
    let thddd = -0.0000116 * RADEG;

    let t = (tjm - T2000) / 36525.0;

    let zeta = ((zeddd * t + zedd) * t + zed) * t;
    let z = ((zddd * t + zdd) * t + zd) * t;
    let theta = ((thddd * t + thdd) * t + thd) * t;

    let r1 = rotmt(-zeta, Axis::Z);
    let r2 = rotmt(theta, Axis::Y);
    let r3 = rotmt(-z, Axis::Z);

    r3 * r2 * r1
}

/// IERS 2003 frame bias `B` such that `x_j2000 = B · x_gcrs`.
pub fn frame_bias() -> Matrix3<f64> {
    let xi0 = -0.016_617 * RADSEC;
    let eta0 = -0.006_819_2 * RADSEC;
    let da0 = -0.014_6 * RADSEC;

    rotmt(-eta0, Axis::X) * rotmt(xi0, Axis::Y) * rotmt(da0, Axis::Z)
}

/// Classical equation of the equinoxes `Δψ cos ε`, in radians.
pub fn equation_of_equinoxes(tjm: MJD) -> Radian {
    let (dpsi, _) = nutn80(tjm);
    dpsi * RADSEC * obleq(tjm).cos()
}

/// Rotation from TEME of date to GCRS, `x_gcrs = M · x_teme`.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale) of the state vector.
pub fn teme_to_gcrs(tjm: MJD) -> Matrix3<f64> {
    let teme_to_tod = rotmt(-equation_of_equinoxes(tjm), Axis::Z);
    let tod_to_mod = rnut80(tjm).transpose();
    let mod_to_j2000 = prec(tjm).transpose();
    let j2000_to_gcrs = frame_bias().transpose();

    j2000_to_gcrs * mod_to_j2000 * tod_to_mod * teme_to_tod
}

/// Rotation taking a vector from frame `from` to frame `to` at date `tjm` (MJD TT).
pub fn rotation_between(from: ReferenceFrame, to: ReferenceFrame, tjm: MJD) -> Matrix3<f64> {
    match (from, to) {
        (ReferenceFrame::Teme, ReferenceFrame::Gcrs) => teme_to_gcrs(tjm),
        (ReferenceFrame::Gcrs, ReferenceFrame::Teme) => teme_to_gcrs(tjm).transpose(),
        _ => Matrix3::identity(),
    }
}
