// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::coords::LonLat;

/// Equatorial radius of Earth, in meters.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Calculates the great-circle distance between two positions
/// on Earth using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
/// Returns the result in meters.
pub fn distance(a: LonLat, b: LonLat) -> f64 {
    let a_lat = a.lat.degrees().to_radians();
    let b_lat = b.lat.degrees().to_radians();

    let sin_dlat_half = ((b_lat - a_lat) * 0.5).sin();
    let sin_dlon_half = ((b.lon.degrees() - a.lon.degrees()).to_radians() * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half
        + a_lat.cos() * b_lat.cos() * sin_dlon_half * sin_dlon_half;

    2.0 * EARTH_RADIUS * h.sqrt().asin()
}

/// Calculates the initial bearing from `a` to `b` along the great circle.
/// Returns radians in (-pi, pi], with zero pointing north and positive
/// values turning east.
pub fn bearing(a: LonLat, b: LonLat) -> f64 {
    let a_lat = a.lat.degrees().to_radians();
    let b_lat = b.lat.degrees().to_radians();
    let dlon = (b.lon.degrees() - a.lon.degrees()).to_radians();

    let y = dlon.sin() * b_lat.cos();
    let x = a_lat.cos() * b_lat.sin() - a_lat.sin() * b_lat.cos() * dlon.cos();

    y.atan2(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    const CENTRUM: (f64, f64) = (21.01062, 52.23024);
    const STADION: (f64, f64) = (21.0446, 52.23852);
    const FALENICA: (f64, f64) = (21.21147, 52.16125);

    fn p(lonlat: (f64, f64)) -> LonLat {
        LonLat::from_degrees(lonlat.0, lonlat.1)
    }

    #[test]
    fn distance_along_equator() {
        // one milli-degree of arc at the equator
        let d = distance(p((0.0, 0.0)), p((0.001, 0.0)));
        assert!((d - 111.319_490_793).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn distance_centrum_stadion() {
        let d = distance(p(CENTRUM), p(STADION));
        assert!((d - 2493.3).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        for (a, b) in [(CENTRUM, STADION), (CENTRUM, FALENICA), (STADION, FALENICA)] {
            let there = distance(p(a), p(b));
            let back = distance(p(b), p(a));
            assert!((there - back).abs() < 1e-6 * there, "{a:?} <-> {b:?}");
        }
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = p((0.0, 0.0));
        assert_eq!(bearing(origin, p((0.0, 0.001))), 0.0);
        assert_eq!(bearing(origin, p((0.001, 0.0))), FRAC_PI_2);
        assert_eq!(bearing(origin, p((0.0, -0.001))), PI);
        assert_eq!(bearing(origin, p((-0.001, 0.0))), -FRAC_PI_2);
    }

    #[test]
    fn bearing_reverses_across_the_pair() {
        // along a meridian or the equator the back bearing is exactly
        // the forward bearing plus pi; elsewhere meridian convergence
        // shifts it
        let pairs = [
            ((21.0, 52.0), (21.0, 54.5)),
            ((10.0, 0.0), (12.5, 0.0)),
            ((0.0, -30.0), (0.0, 10.0)),
        ];
        for (a, b) in pairs {
            let forth = bearing(p(a), p(b));
            let back = bearing(p(b), p(a));
            let delta = (back - forth - PI).rem_euclid(TAU);
            assert!(
                delta < 1e-6 || TAU - delta < 1e-6,
                "{a:?} <-> {b:?}: delta {delta}"
            );
        }
    }
}
