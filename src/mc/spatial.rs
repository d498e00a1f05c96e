/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::cosmic::SourceFrame;
use crate::utils::wrap_2pi;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::f64::consts::TAU;

/// Fractional part of the golden ratio, used to spread the longitudes of the spiral.
const GOLDEN_FRACTION: f64 = 0.618_033_988_749_894_9;

/// Region of a source sphere: longitudes and latitudes in radians, radius in radii of the source body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceRegion {
    pub exobase: f64,
    /// Longitude range, which wraps through zero when the first bound exceeds the second
    pub longitude: (f64, f64),
    pub latitude: (f64, f64),
    pub frame: SourceFrame,
}

impl SurfaceRegion {
    /// The whole sphere of radius `exobase`.
    pub fn sphere(exobase: f64, frame: SourceFrame) -> Self {
        Self {
            exobase,
            longitude: (0.0, TAU),
            latitude: (-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2),
            frame,
        }
    }

    /// Width of the longitude range, handling the wrap around
    pub fn longitude_width(&self) -> f64 {
        let (lo, hi) = self.longitude;
        if hi >= lo {
            hi - lo
        } else {
            hi + TAU - lo
        }
    }

    fn longitude_at(&self, u: f64) -> f64 {
        let lon = self.longitude.0 + u * self.longitude_width();
        if self.longitude_width() >= TAU {
            wrap_2pi(lon)
        } else if lon > TAU {
            lon - TAU
        } else {
            lon
        }
    }

    /// Latitude whose cumulative area fraction is `u`
    fn latitude_at(&self, u: f64) -> f64 {
        let (s0, s1) = (self.latitude.0.sin(), self.latitude.1.sin());
        (s0 + u * (s1 - s0)).clamp(-1.0, 1.0).asin()
    }

    /// Whether `(lon, lat)` falls inside the region, up to `eps` radians.
    pub fn contains(&self, lon: f64, lat: f64, eps: f64) -> bool {
        let offset = (lon - self.longitude.0).rem_euclid(TAU);
        let in_lon = offset <= self.longitude_width() + eps || TAU - offset <= eps;
        in_lon && lat >= self.latitude.0 - eps && lat <= self.latitude.1 + eps
    }
}

/// Distribution of the ejection points on the source surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SpatialDistribution {
    /// Random points, uniform per unit area of the region.
    Uniform(SurfaceRegion),
    /// Deterministic, nearly uniform grid of points along a golden spiral covering the region.
    GoldenSpiral(SurfaceRegion),
}

impl SpatialDistribution {
    pub fn region(&self) -> &SurfaceRegion {
        match self {
            Self::Uniform(region) | Self::GoldenSpiral(region) => region,
        }
    }

    pub fn exobase(&self) -> f64 {
        self.region().exobase
    }

    pub fn frame(&self) -> SourceFrame {
        self.region().frame
    }

    /// Draws `n` longitudes and latitudes. The golden spiral does not consume random numbers.
    pub fn choose_points<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<(f64, f64)> {
        match self {
            Self::Uniform(region) => {
                let unit = Uniform::new_inclusive(0.0, 1.0);
                (0..n)
                    .map(|_| {
                        let lon = region.longitude_at(unit.sample(rng));
                        let lat = region.latitude_at(unit.sample(rng));
                        (lon, lat)
                    })
                    .collect()
            }
            Self::GoldenSpiral(region) => (0..n)
                .map(|k| {
                    let u_lat = (k as f64 + 0.5) / n as f64;
                    let u_lon = (k as f64 * GOLDEN_FRACTION).fract();
                    (region.longitude_at(u_lon), region.latitude_at(u_lat))
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod ut_spatial {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn wrapped_longitudes() {
        let region = SurfaceRegion {
            exobase: 1.0,
            longitude: (300.0_f64.to_radians(), 60.0_f64.to_radians()),
            latitude: (-0.5, 0.5),
            frame: SourceFrame::SolarFixed,
        };
        assert!((region.longitude_width() - 120.0_f64.to_radians()).abs() < 1e-12);
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let points = SpatialDistribution::Uniform(region).choose_points(10_000, &mut rng);
        for (lon, lat) in &points {
            assert!(region.contains(*lon, *lat, 1e-12), "{lon} {lat}");
            assert!(*lon >= 0.0 && *lon < TAU);
        }
        // Both sides of the wrap are populated
        assert!(points.iter().any(|(lon, _)| *lon > 5.0));
        assert!(points.iter().any(|(lon, _)| *lon < 1.0));
    }

    #[test]
    fn equal_area_latitudes() {
        let region = SurfaceRegion::sphere(1.0, SourceFrame::Iau);
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let points = SpatialDistribution::Uniform(region).choose_points(100_000, &mut rng);
        // Half of the area of a sphere lies within 30 degrees of the equator
        let inside = points
            .iter()
            .filter(|(_, lat)| lat.abs() < 30.0_f64.to_radians())
            .count() as f64;
        assert!((inside / 1e5 - 0.5).abs() < 0.01);
    }

    #[test]
    fn golden_spiral_is_deterministic() {
        let region = SurfaceRegion::sphere(1.2, SourceFrame::Solar);
        let spiral = SpatialDistribution::GoldenSpiral(region);
        let mut rng_a = Pcg64Mcg::seed_from_u64(1);
        let mut rng_b = Pcg64Mcg::seed_from_u64(2);
        let a = spiral.choose_points(500, &mut rng_a);
        assert_eq!(a, spiral.choose_points(500, &mut rng_b));
        let north = a.iter().filter(|(_, lat)| *lat > 0.0).count();
        assert_eq!(north, 250);
        assert_eq!(spiral.exobase(), 1.2);
        assert_eq!(spiral.frame(), SourceFrame::Solar);
    }

    #[test]
    fn single_point() {
        let region = SurfaceRegion {
            exobase: 1.0,
            longitude: (0.0, 0.0),
            latitude: (0.0, 0.0),
            frame: SourceFrame::SolarFixed,
        };
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        for (lon, lat) in SpatialDistribution::Uniform(region).choose_points(10, &mut rng) {
            assert_eq!((lon, lat), (0.0, 0.0));
        }
    }
}
