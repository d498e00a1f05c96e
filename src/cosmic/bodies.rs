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

use super::{EphemerisError, UnknownBodySnafu};
use crate::units::G_KM3_KG_S2;
use serde_derive::{Deserialize, Serialize};
use snafu::OptionExt;
use std::collections::HashMap;
use std::fmt;

const DAY_S: f64 = 86_400.0;
const HOUR_S: f64 = 3_600.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    Star,
    Planet,
    Moon,
}

/// Physical constants of a solar system body.
///
/// Distances are in km, gravitational parameters in km^3/s^2 and periods in seconds. A negative period denotes a
/// retrograde rotation or orbit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Body {
    pub name: &'static str,
    pub kind: BodyKind,
    /// Name of the body this one orbits, `None` for the Sun
    pub parent: Option<&'static str>,
    pub radius_km: f64,
    pub gm_km3_s2: f64,
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    /// Obliquity of the spin axis to the orbit, in degrees
    pub tilt_deg: f64,
    pub rotation_period_s: f64,
    pub orbital_period_s: f64,
    pub satellites: &'static [&'static str],
    /// NAIF identifier used by the ephemeris providers
    pub naif_id: i32,
}

#[allow(clippy::too_many_arguments)]
const fn body(
    name: &'static str,
    kind: BodyKind,
    parent: Option<&'static str>,
    radius_km: f64,
    gm_km3_s2: f64,
    semi_major_axis_km: f64,
    eccentricity: f64,
    tilt_deg: f64,
    rotation_period_s: f64,
    orbital_period_s: f64,
    satellites: &'static [&'static str],
    naif_id: i32,
) -> Body {
    Body {
        name,
        kind,
        parent,
        radius_km,
        gm_km3_s2,
        semi_major_axis_km,
        eccentricity,
        tilt_deg,
        rotation_period_s,
        orbital_period_s,
        satellites,
        naif_id,
    }
}

use BodyKind::{Moon, Planet, Star};

const CATALOGUE_DATA: &[Body] = &[
    body("Sun", Star, None, 695_700.0, 1.327_124_400_18e11, 0.0, 0.0, 7.25, 25.38 * DAY_S, 0.0,
        &["Mercury", "Venus", "Earth", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune", "Pluto"], 10),
    body("Mercury", Planet, Some("Sun"), 2_439.7, 22_031.868_55, 57_909_050.0, 0.205_630, 0.034,
        58.646_2 * DAY_S, 87.969_1 * DAY_S, &[], 199),
    body("Venus", Planet, Some("Sun"), 6_051.8, 324_858.592, 108_208_000.0, 0.006_772, 177.36,
        -243.022_6 * DAY_S, 224.701 * DAY_S, &[], 299),
    body("Earth", Planet, Some("Sun"), 6_378.137, 398_600.435_436, 149_598_023.0, 0.016_708_6, 23.439_281_1,
        0.997_269_68 * DAY_S, 365.256_363 * DAY_S, &["Moon"], 399),
    body("Moon", Moon, Some("Earth"), 1_737.4, 4_902.800_066, 384_399.0, 0.054_9, 6.687,
        27.321_661 * DAY_S, 27.321_661 * DAY_S, &[], 301),
    body("Mars", Planet, Some("Sun"), 3_389.5, 42_828.375_214, 227_939_200.0, 0.093_4, 25.19,
        1.025_956_76 * DAY_S, 686.980 * DAY_S, &["Phobos", "Deimos"], 499),
    body("Phobos", Moon, Some("Mars"), 11.08, 7.087e-4, 9_376.0, 0.015_1, 0.0,
        0.318_910_23 * DAY_S, 0.318_910_23 * DAY_S, &[], 401),
    body("Deimos", Moon, Some("Mars"), 6.2, 9.615e-5, 23_463.2, 0.000_33, 0.0,
        1.263 * DAY_S, 1.263 * DAY_S, &[], 402),
    body("Jupiter", Planet, Some("Sun"), 71_492.0, 126_686_531.9, 778_570_000.0, 0.048_9, 3.13,
        9.925 * HOUR_S, 4_332.59 * DAY_S, &["Io", "Europa", "Ganymede", "Callisto"], 599),
    body("Io", Moon, Some("Jupiter"), 1_821.6, 5_959.916, 421_700.0, 0.004_1, 0.0,
        1.769_137_786 * DAY_S, 1.769_137_786 * DAY_S, &[], 501),
    body("Europa", Moon, Some("Jupiter"), 1_560.8, 3_202.739, 671_034.0, 0.009, 0.1,
        3.551_181 * DAY_S, 3.551_181 * DAY_S, &[], 502),
    body("Ganymede", Moon, Some("Jupiter"), 2_634.1, 9_887.834, 1_070_412.0, 0.001_3, 0.33,
        7.154_552_96 * DAY_S, 7.154_552_96 * DAY_S, &[], 503),
    body("Callisto", Moon, Some("Jupiter"), 2_410.3, 7_179.289, 1_882_709.0, 0.007_4, 0.0,
        16.689_018_4 * DAY_S, 16.689_018_4 * DAY_S, &[], 504),
    body("Saturn", Planet, Some("Sun"), 60_268.0, 37_931_207.8, 1_433_530_000.0, 0.056_5, 26.73,
        10.656 * HOUR_S, 10_759.22 * DAY_S,
        &["Mimas", "Enceladus", "Tethys", "Dione", "Rhea", "Titan", "Iapetus"], 699),
    body("Mimas", Moon, Some("Saturn"), 198.2, 2.503, 185_539.0, 0.019_6, 0.0,
        0.942 * DAY_S, 0.942 * DAY_S, &[], 601),
    body("Enceladus", Moon, Some("Saturn"), 252.1, 7.211, 237_948.0, 0.004_7, 0.0,
        1.370_218 * DAY_S, 1.370_218 * DAY_S, &[], 602),
    body("Tethys", Moon, Some("Saturn"), 531.1, 41.21, 294_619.0, 0.000_1, 0.0,
        1.887_802 * DAY_S, 1.887_802 * DAY_S, &[], 603),
    body("Dione", Moon, Some("Saturn"), 561.4, 73.11, 377_396.0, 0.002_2, 0.0,
        2.736_915 * DAY_S, 2.736_915 * DAY_S, &[], 604),
    body("Rhea", Moon, Some("Saturn"), 763.8, 153.94, 527_108.0, 0.001, 0.0,
        4.518_212 * DAY_S, 4.518_212 * DAY_S, &[], 605),
    body("Titan", Moon, Some("Saturn"), 2_574.73, 8_978.14, 1_221_870.0, 0.028_8, 0.0,
        15.945 * DAY_S, 15.945 * DAY_S, &[], 606),
    body("Iapetus", Moon, Some("Saturn"), 734.5, 120.5, 3_560_820.0, 0.028_6, 0.0,
        79.321_5 * DAY_S, 79.321_5 * DAY_S, &[], 608),
    body("Uranus", Planet, Some("Sun"), 25_559.0, 5_793_951.3, 2_870_972_000.0, 0.047_17, 97.77,
        -17.24 * HOUR_S, 30_688.5 * DAY_S, &[], 799),
    body("Neptune", Planet, Some("Sun"), 24_764.0, 6_835_099.5, 4_500_000_000.0, 0.008_678, 28.32,
        16.11 * HOUR_S, 60_182.0 * DAY_S, &["Triton"], 899),
    body("Triton", Moon, Some("Neptune"), 1_353.4, 1_427.6, 354_759.0, 0.000_016, 0.0,
        -5.876_854 * DAY_S, -5.876_854 * DAY_S, &[], 801),
    body("Pluto", Planet, Some("Sun"), 1_188.3, 869.6, 5_906_376_272.0, 0.248_8, 122.53,
        -6.387_230 * DAY_S, 90_560.0 * DAY_S, &["Charon"], 999),
    body("Charon", Moon, Some("Pluto"), 606.0, 106.1, 19_591.0, 0.000_2, 0.0,
        6.387_230 * DAY_S, 6.387_230 * DAY_S, &[], 901),
];

lazy_static! {
    static ref CATALOGUE: HashMap<String, &'static Body> = CATALOGUE_DATA
        .iter()
        .map(|b| (b.name.to_lowercase(), b))
        .collect();
}

impl Body {
    /// Looks up a body by name, case insensitive.
    pub fn from_name(name: &str) -> Result<&'static Body, EphemerisError> {
        CATALOGUE
            .get(&name.trim().to_lowercase())
            .copied()
            .context(UnknownBodySnafu { name })
    }

    /// Looks up a body by its NAIF identifier.
    pub fn from_naif_id(naif_id: i32) -> Result<&'static Body, EphemerisError> {
        CATALOGUE_DATA
            .iter()
            .find(|b| b.naif_id == naif_id)
            .context(UnknownBodySnafu {
                name: format!("NAIF {naif_id}"),
            })
    }

    /// The Sun
    pub fn sun() -> &'static Body {
        &CATALOGUE_DATA[0]
    }

    /// Iterates through the whole catalogue
    pub fn all() -> impl Iterator<Item = &'static Body> {
        CATALOGUE_DATA.iter()
    }

    pub fn is_star(&self) -> bool {
        self.kind == BodyKind::Star
    }

    pub fn is_moon(&self) -> bool {
        self.kind == BodyKind::Moon
    }

    /// Mass of the body in kg, derived from its gravitational parameter
    pub fn mass_kg(&self) -> f64 {
        self.gm_km3_s2 / G_KM3_KG_S2
    }

    pub fn parent_body(&self) -> Option<&'static Body> {
        self.parent.and_then(|name| Body::from_name(name).ok())
    }

    /// The planet of the system this body belongs to: itself for a planet, its parent for a moon, `None` for the Sun.
    pub fn planet(&self) -> Option<&'static Body> {
        match self.kind {
            BodyKind::Star => None,
            BodyKind::Planet => Body::from_name(self.name).ok(),
            BodyKind::Moon => self.parent_body(),
        }
    }

    pub fn satellite_bodies(&self) -> Vec<&'static Body> {
        self.satellites
            .iter()
            .filter_map(|name| Body::from_name(name).ok())
            .collect()
    }

    /// Mean motion of the body on its orbit, in rad/s (negative when retrograde)
    pub fn mean_motion(&self) -> f64 {
        if self.orbital_period_s == 0.0 {
            0.0
        } else {
            std::f64::consts::TAU / self.orbital_period_s
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod ut_bodies {
    use super::*;

    #[test]
    fn lookup() {
        let mercury = Body::from_name("mercury").unwrap();
        assert_eq!(mercury.name, "Mercury");
        assert_eq!(mercury.naif_id, 199);
        assert_eq!(mercury.planet().unwrap().name, "Mercury");
        assert_eq!(mercury.parent_body().unwrap(), Body::sun());

        let io = Body::from_name(" Io ").unwrap();
        assert!(io.is_moon());
        assert_eq!(io.planet().unwrap().name, "Jupiter");
        assert_eq!(Body::from_naif_id(501).unwrap().name, "Io");

        let jupiter = Body::from_name("Jupiter").unwrap();
        assert_eq!(jupiter.satellite_bodies().len(), 4);

        assert!(Body::sun().is_star());
        assert!(Body::sun().planet().is_none());
        assert!(Body::from_name("Vulcan").is_err());
    }

    #[test]
    fn every_parent_and_satellite_exists() {
        for body in Body::all() {
            if let Some(parent) = body.parent {
                let parent = Body::from_name(parent).unwrap();
                if body.is_moon() {
                    assert!(parent.satellites.contains(&body.name), "{body} not in {parent}");
                }
            }
            for sat in body.satellites {
                assert!(Body::from_name(sat).is_ok());
            }
            assert!(body.mass_kg() > 0.0);
        }
    }
}
