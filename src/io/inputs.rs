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

use super::{ConfigRepr, ConfigSnafu, InputError, OutOfRangeSnafu, UnknownBodySnafu};
use crate::atomic::atomic_mass;
use crate::cosmic::{Body, SourceFrame};
use crate::dynamics::SurfaceInteraction;
use crate::mc::{AngularDistribution, SpatialDistribution, SpeedDistribution, SurfaceRegion};
use crate::plasma::PlasmaModel;
use crate::time::Epoch;
use crate::utils::{isclose, mod_close};
use serde_derive::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};
use std::str::FromStr;

/// Equality of input groups used to find the run of a set of inputs.
///
/// Floats are compared with `isclose`, body and species names without regard to case.
pub trait Matches {
    fn matches(&self, other: &Self) -> bool;
}

fn out_of_range(key: &str, value: f64, min: f64, max: f64) -> Result<(), InputError> {
    ensure!(
        value >= min && value <= max,
        OutOfRangeSnafu {
            key,
            value,
            min,
            max
        }
    );
    Ok(())
}

fn positive(key: &str, value: f64) -> Result<(), InputError> {
    ensure!(
        value > 0.0 && value.is_finite(),
        OutOfRangeSnafu {
            key,
            value,
            min: 0.0,
            max: f64::INFINITY
        }
    );
    Ok(())
}

/// Parses a pair of comma separated numbers, as in `"0,360"`.
pub fn parse_pair(key: &str, value: &str) -> Result<(f64, f64), InputError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    ensure!(
        parts.len() == 2,
        ConfigSnafu {
            key,
            reason: format!("expected two comma separated numbers, got `{value}`")
        }
    );
    let parse = |s: &str| {
        f64::from_str(s).map_err(|e| InputError::Config {
            key: key.to_string(),
            reason: format!("`{s}` is not a number: {e}"),
        })
    };
    Ok((parse(parts[0])?, parse(parts[1])?))
}

/// Parses a longitude range in degrees into radians. The range wraps through zero when the first bound exceeds the
/// second.
fn parse_longitudes(key: &str, value: &str) -> Result<(f64, f64), InputError> {
    let (lo, hi) = parse_pair(key, value)?;
    out_of_range(key, lo, 0.0, 360.0)?;
    out_of_range(key, hi, 0.0, 360.0)?;
    Ok((lo.to_radians(), hi.to_radians()))
}

/// Parses an ordered angular range in degrees, within `[min, max]`, into radians.
fn parse_ordered(key: &str, value: &str, min: f64, max: f64) -> Result<(f64, f64), InputError> {
    let (lo, hi) = parse_pair(key, value)?;
    out_of_range(key, lo, min, max)?;
    out_of_range(key, hi, min, max)?;
    ensure!(
        lo <= hi,
        ConfigSnafu {
            key,
            reason: format!("lower bound {lo} exceeds upper bound {hi}")
        }
    );
    Ok((lo.to_radians(), hi.to_radians()))
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn close_pair(a: (f64, f64), b: (f64, f64)) -> bool {
    isclose(a.0, b.0) && isclose(a.1, b.1)
}

/// Compares two ranges given as strings on their parsed values, falling back to the text for invalid ranges.
fn same_range(key: &str, a: &str, b: &str) -> bool {
    match (parse_pair(key, a), parse_pair(key, b)) {
        (Ok(a), Ok(b)) => close_pair(a, b),
        _ => a.trim() == b.trim(),
    }
}

fn lookup(name: &str) -> Result<&'static Body, InputError> {
    Body::from_name(name).ok().context(UnknownBodySnafu { name })
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_dtaa() -> f64 {
    2.0
}

fn default_longitudes() -> String {
    "0,360".to_string()
}

fn default_latitudes() -> String {
    "-90,90".to_string()
}

fn default_altitudes() -> String {
    "0,90".to_string()
}

/// Planetary system of the run and the instant it is simulated at.
///
/// Either `modeltime` is given, or the geometry is time-free and defined by the true anomaly of the planet, the
/// orbital phases of its moons and the subsolar point of the central body. Angles are in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryInputs {
    pub central_body: String,
    /// Body the packets are ejected from, the central body by default
    #[serde(default)]
    pub startpoint: Option<String>,
    /// Bodies in scope; the central body, its satellites and the start point by default
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// End of the run, as an ISO date
    #[serde(default)]
    pub modeltime: Option<String>,
    #[serde(default)]
    pub taa: Option<f64>,
    /// Orbital phases of the satellites of the planet, in catalogue order
    #[serde(default)]
    pub phi: Vec<f64>,
    /// Subsolar longitude and latitude, as `"lon,lat"`
    #[serde(default)]
    pub subsolarpoint: Option<String>,
    /// Tolerance on the true anomaly when matching runs
    #[serde(default = "default_dtaa")]
    pub dtaa: f64,
}

impl GeometryInputs {
    /// A time-free geometry at the given true anomaly, in degrees, with the Sun above the origin of the body-fixed
    /// frame.
    pub fn time_free(central_body: &str, taa_deg: f64) -> Self {
        Self {
            central_body: central_body.to_string(),
            startpoint: None,
            include: None,
            modeltime: None,
            taa: Some(taa_deg),
            phi: Vec::new(),
            subsolarpoint: None,
            dtaa: default_dtaa(),
        }
    }

    /// A geometry at the given date.
    pub fn at(central_body: &str, modeltime: &str) -> Self {
        Self {
            modeltime: Some(modeltime.to_string()),
            taa: None,
            ..Self::time_free(central_body, 0.0)
        }
    }

    pub fn central(&self) -> Result<&'static Body, InputError> {
        lookup(&self.central_body)
    }

    pub fn startpoint_body(&self) -> Result<&'static Body, InputError> {
        match &self.startpoint {
            Some(name) => lookup(name),
            None => self.central(),
        }
    }

    /// Bodies in scope, without the central body.
    pub fn included_bodies(&self) -> Result<Vec<&'static Body>, InputError> {
        let central = self.central()?;
        let mut bodies = match &self.include {
            Some(names) => names.iter().map(|name| lookup(name)).collect::<Result<Vec<_>, _>>()?,
            None => central.satellite_bodies(),
        };
        bodies.push(self.startpoint_body()?);
        bodies.retain(|body| body.name != central.name);
        bodies.sort_by_key(|body| body.naif_id);
        bodies.dedup_by_key(|body| body.naif_id);
        Ok(bodies)
    }

    pub fn is_time_free(&self) -> bool {
        self.modeltime.is_none()
    }

    /// End of the run for dated geometries.
    pub fn epoch(&self) -> Result<Option<Epoch>, InputError> {
        match &self.modeltime {
            Some(date) => Epoch::from_str(date.trim())
                .map(Some)
                .map_err(|e| InputError::Config {
                    key: "modeltime".to_string(),
                    reason: format!("`{date}` is not a date: {e}"),
                }),
            None => Ok(None),
        }
    }

    /// True anomaly in radians for time-free geometries.
    pub fn taa_rad(&self) -> Option<f64> {
        self.taa.map(f64::to_radians)
    }

    pub fn phases_rad(&self) -> Vec<f64> {
        self.phi.iter().map(|phi| phi.to_radians()).collect()
    }

    /// Subsolar longitude and latitude in radians, the origin of the body-fixed frame by default.
    pub fn subsolar_point_rad(&self) -> Result<(f64, f64), InputError> {
        match &self.subsolarpoint {
            Some(point) => {
                let (lon, lat) = parse_pair("subsolarpoint", point)?;
                out_of_range("subsolarpoint", lat, -90.0, 90.0)?;
                Ok((lon.to_radians(), lat.to_radians()))
            }
            None => Ok((0.0, 0.0)),
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let central = self.central()?;
        let startpoint = self.startpoint_body()?;
        ensure!(
            startpoint.name == central.name
                || central.is_star()
                || startpoint.parent_body().map(|p| p.name) == Some(central.name),
            ConfigSnafu {
                key: "startpoint",
                reason: format!("{startpoint} is not in the system of {central}")
            }
        );
        self.included_bodies()?;
        out_of_range("dtaa", self.dtaa, 0.0, 180.0)?;

        match (&self.modeltime, self.taa) {
            (Some(_), Some(_)) => ConfigSnafu {
                key: "taa",
                reason: "give either modeltime or taa, not both",
            }
            .fail(),
            (None, None) => ConfigSnafu {
                key: "modeltime",
                reason: "either modeltime or taa is required",
            }
            .fail(),
            (Some(_), None) => self.epoch().map(|_| ()),
            (None, Some(taa)) => {
                out_of_range("taa", taa, 0.0, 360.0)?;
                let planet = central.planet().context(ConfigSnafu {
                    key: "taa",
                    reason: format!("a time-free geometry needs a planetary system, not {central}"),
                })?;
                ensure!(
                    self.phi.len() <= planet.satellites.len(),
                    ConfigSnafu {
                        key: "phi",
                        reason: format!(
                            "{} phases given but {planet} has {} satellites",
                            self.phi.len(),
                            planet.satellites.len()
                        )
                    }
                );
                for phi in &self.phi {
                    out_of_range("phi", *phi, 0.0, 360.0)?;
                }
                self.subsolar_point_rad().map(|_| ())
            }
        }
    }

    fn included_names(&self) -> Option<Vec<&'static str>> {
        self.included_bodies()
            .ok()
            .map(|bodies| bodies.iter().map(|body| body.name).collect())
    }

    fn phase(&self, i: usize) -> f64 {
        self.phi.get(i).copied().unwrap_or(0.0)
    }
}

impl Matches for GeometryInputs {
    fn matches(&self, other: &Self) -> bool {
        if !same_name(&self.central_body, &other.central_body) {
            return false;
        }
        match (self.startpoint_body(), other.startpoint_body()) {
            (Ok(a), Ok(b)) if a.name == b.name => {}
            _ => return false,
        }
        if self.included_names() != other.included_names() {
            return false;
        }
        match (&self.modeltime, &other.modeltime) {
            (Some(_), Some(_)) => matches!((self.epoch(), other.epoch()), (Ok(a), Ok(b)) if a == b),
            (None, None) => {
                let taa_close = match (self.taa, other.taa) {
                    (Some(a), Some(b)) => mod_close(a, b, 360.0, self.dtaa.max(other.dtaa)),
                    (a, b) => a == b,
                };
                let n_phases = self.phi.len().max(other.phi.len());
                taa_close
                    && (0..n_phases).all(|i| isclose(self.phase(i), other.phase(i)))
                    && matches!(
                        (self.subsolar_point_rad(), other.subsolar_point_rad()),
                        (Ok(a), Ok(b)) if close_pair(a, b)
                    )
            }
            _ => false,
        }
    }
}

/// Forces acting on the packets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcesInputs {
    #[serde(default = "default_true")]
    pub gravity: bool,
    #[serde(default = "default_true")]
    pub radpres: bool,
}

impl Default for ForcesInputs {
    fn default() -> Self {
        Self {
            gravity: true,
            radpres: true,
        }
    }
}

impl Matches for ForcesInputs {
    fn matches(&self, other: &Self) -> bool {
        self == other
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SurfaceInputs {
    Constant {
        #[serde(default = "default_one")]
        stickcoef: f64,
        /// Required when the sticking coefficient is below one
        #[serde(default)]
        accomfactor: Option<f64>,
    },
}

impl Default for SurfaceInputs {
    fn default() -> Self {
        Self::Constant {
            stickcoef: 1.0,
            accomfactor: None,
        }
    }
}

impl SurfaceInputs {
    pub fn validate(&self) -> Result<(), InputError> {
        self.interaction().map(|_| ())
    }

    pub fn interaction(&self) -> Result<SurfaceInteraction, InputError> {
        match self {
            Self::Constant {
                stickcoef,
                accomfactor,
            } => {
                out_of_range("stickcoef", *stickcoef, 0.0, 1.0)?;
                let accomfactor = match accomfactor {
                    Some(accom) => {
                        out_of_range("accomfactor", *accom, 0.0, 1.0)?;
                        *accom
                    }
                    None if *stickcoef < 1.0 => {
                        return ConfigSnafu {
                            key: "accomfactor",
                            reason: "required when stickcoef is below 1",
                        }
                        .fail()
                    }
                    None => 0.0,
                };
                Ok(SurfaceInteraction::Constant {
                    stickcoef: *stickcoef,
                    accomfactor,
                })
            }
        }
    }
}

impl Matches for SurfaceInputs {
    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Constant {
                    stickcoef: s1,
                    accomfactor: a1,
                },
                Self::Constant {
                    stickcoef: s2,
                    accomfactor: a2,
                },
            ) => {
                // The accommodation is irrelevant when everything sticks
                isclose(*s1, *s2)
                    && (*s1 >= 1.0 || isclose(a1.unwrap_or(0.0), a2.unwrap_or(0.0)))
            }
        }
    }
}

/// Distribution of the ejection points. Longitudes and latitudes are degree ranges written as `"lo,hi"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpatialInputs {
    Uniform {
        #[serde(default = "default_one")]
        exobase: f64,
        #[serde(default = "default_longitudes")]
        longitude: String,
        #[serde(default = "default_latitudes")]
        latitude: String,
        #[serde(default)]
        frame: SourceFrame,
    },
    GoldenSpiral {
        #[serde(default = "default_one")]
        exobase: f64,
        #[serde(default = "default_longitudes")]
        longitude: String,
        #[serde(default = "default_latitudes")]
        latitude: String,
        #[serde(default)]
        frame: SourceFrame,
    },
}

impl SpatialInputs {
    /// Uniform over the whole sphere of radius `exobase`.
    pub fn uniform(exobase: f64) -> Self {
        Self::Uniform {
            exobase,
            longitude: default_longitudes(),
            latitude: default_latitudes(),
            frame: SourceFrame::default(),
        }
    }

    fn parts(&self) -> (f64, &str, &str, SourceFrame) {
        match self {
            Self::Uniform {
                exobase,
                longitude,
                latitude,
                frame,
            }
            | Self::GoldenSpiral {
                exobase,
                longitude,
                latitude,
                frame,
            } => (*exobase, longitude, latitude, *frame),
        }
    }

    pub fn region(&self) -> Result<SurfaceRegion, InputError> {
        let (exobase, longitude, latitude, frame) = self.parts();
        positive("exobase", exobase)?;
        Ok(SurfaceRegion {
            exobase,
            longitude: parse_longitudes("longitude", longitude)?,
            latitude: parse_ordered("latitude", latitude, -90.0, 90.0)?,
            frame,
        })
    }

    pub fn distribution(&self) -> Result<SpatialDistribution, InputError> {
        let region = self.region()?;
        Ok(match self {
            Self::Uniform { .. } => SpatialDistribution::Uniform(region),
            Self::GoldenSpiral { .. } => SpatialDistribution::GoldenSpiral(region),
        })
    }
}

impl Matches for SpatialInputs {
    fn matches(&self, other: &Self) -> bool {
        if std::mem::discriminant(self) != std::mem::discriminant(other) {
            return false;
        }
        let (exo1, lon1, lat1, frame1) = self.parts();
        let (exo2, lon2, lat2, frame2) = other.parts();
        isclose(exo1, exo2)
            && same_range("longitude", lon1, lon2)
            && same_range("latitude", lat1, lat2)
            && frame1 == frame2
    }
}

/// Distribution of the ejection speeds, in km/s. Temperatures are in K and binding energies in eV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpeedInputs {
    Flat { vmin: f64, vmax: f64 },
    Maxwellian { temperature: f64 },
    Sputtering { alpha: f64, beta: f64, u: f64 },
    Gaussian { vprob: f64, sigma: f64 },
}

impl SpeedInputs {
    /// Builds the distribution for the species of the run.
    pub fn distribution(&self, species: &str) -> Result<SpeedDistribution, InputError> {
        match *self {
            Self::Flat { vmin, vmax } => {
                out_of_range("vmin", vmin, 0.0, f64::INFINITY)?;
                out_of_range("vmax", vmax, vmin, f64::INFINITY)?;
                Ok(SpeedDistribution::flat(vmin, vmax))
            }
            Self::Maxwellian { temperature } => {
                positive("temperature", temperature)?;
                SpeedDistribution::maxwellian(temperature, species_mass(species)?).context(ConfigSnafu {
                    key: "temperature",
                    reason: format!("no Maxwellian at {temperature} K"),
                })
            }
            Self::Sputtering { alpha, beta, u } => {
                positive("u", u)?;
                positive("alpha", alpha)?;
                out_of_range("beta", beta, -0.5, f64::INFINITY)?;
                SpeedDistribution::sputtering(alpha, beta, u, species_mass(species)?).context(ConfigSnafu {
                    key: "alpha",
                    reason: format!("no sputtering distribution for alpha = {alpha}, beta = {beta}, U = {u} eV"),
                })
            }
            Self::Gaussian { vprob, sigma } => {
                positive("vprob", vprob)?;
                positive("sigma", sigma)?;
                Ok(SpeedDistribution::gaussian(vprob, sigma))
            }
        }
    }
}

fn species_mass(species: &str) -> Result<f64, InputError> {
    atomic_mass(species).map_err(|e| InputError::Config {
        key: "species".to_string(),
        reason: e.to_string(),
    })
}

impl Matches for SpeedInputs {
    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Flat { vmin: a0, vmax: a1 }, Self::Flat { vmin: b0, vmax: b1 }) => {
                close_pair((*a0, *a1), (*b0, *b1))
            }
            (Self::Maxwellian { temperature: a }, Self::Maxwellian { temperature: b }) => isclose(*a, *b),
            (
                Self::Sputtering {
                    alpha: a1,
                    beta: b1,
                    u: u1,
                },
                Self::Sputtering {
                    alpha: a2,
                    beta: b2,
                    u: u2,
                },
            ) => isclose(*a1, *a2) && isclose(*b1, *b2) && isclose(*u1, *u2),
            (Self::Gaussian { vprob: a0, sigma: a1 }, Self::Gaussian { vprob: b0, sigma: b1 }) => {
                close_pair((*a0, *a1), (*b0, *b1))
            }
            _ => false,
        }
    }
}

/// Distribution of the ejection directions. Azimuths and altitudes are degree ranges written as `"lo,hi"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AngularInputs {
    Radial,
    Isotropic {
        #[serde(default = "default_longitudes")]
        azimuth: String,
        #[serde(default = "default_altitudes")]
        altitude: String,
    },
}

impl AngularInputs {
    pub fn distribution(&self) -> Result<AngularDistribution, InputError> {
        match self {
            Self::Radial => Ok(AngularDistribution::Radial),
            Self::Isotropic { azimuth, altitude } => Ok(AngularDistribution::Isotropic {
                azimuth: parse_longitudes("azimuth", azimuth)?,
                altitude: parse_ordered("altitude", altitude, 0.0, 90.0)?,
            }),
        }
    }
}

impl Matches for AngularInputs {
    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Radial, Self::Radial) => true,
            (
                Self::Isotropic {
                    azimuth: az1,
                    altitude: alt1,
                },
                Self::Isotropic {
                    azimuth: az2,
                    altitude: alt2,
                },
            ) => same_range("azimuth", az1, az2) && same_range("altitude", alt1, alt2),
            _ => false,
        }
    }
}

/// Loss of the packets' weight. A constant lifetime, in seconds, replaces every physical process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LossInputs {
    #[serde(default)]
    pub constant_lifetime: Option<f64>,
    /// Photoionisation lifetime at 1 AU in seconds, or 0 to use the rate of the atomic data
    #[serde(default)]
    pub photo_lifetime: f64,
    #[serde(default = "default_one")]
    pub photo_factor: f64,
    #[serde(default = "default_one")]
    pub eimp_factor: f64,
    #[serde(default = "default_one")]
    pub chx_factor: f64,
}

impl Default for LossInputs {
    fn default() -> Self {
        Self {
            constant_lifetime: None,
            photo_lifetime: 0.0,
            photo_factor: 1.0,
            eimp_factor: 1.0,
            chx_factor: 1.0,
        }
    }
}

impl LossInputs {
    pub fn constant(lifetime_s: f64) -> Self {
        Self {
            constant_lifetime: Some(lifetime_s),
            ..Default::default()
        }
    }

    /// No loss at all.
    pub fn none() -> Self {
        Self {
            photo_factor: 0.0,
            eimp_factor: 0.0,
            chx_factor: 0.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if let Some(lifetime) = self.constant_lifetime {
            positive("constant_lifetime", lifetime)?;
        }
        for (key, value) in [
            ("photo_lifetime", self.photo_lifetime),
            ("photo_factor", self.photo_factor),
            ("eimp_factor", self.eimp_factor),
            ("chx_factor", self.chx_factor),
        ] {
            out_of_range(key, value, 0.0, f64::INFINITY)?;
        }
        Ok(())
    }

    /// Whether no process removes weight.
    pub fn is_lossless(&self) -> bool {
        self.constant_lifetime.is_none()
            && self.photo_factor == 0.0
            && self.eimp_factor == 0.0
            && self.chx_factor == 0.0
    }
}

impl Matches for LossInputs {
    fn matches(&self, other: &Self) -> bool {
        match (self.constant_lifetime, other.constant_lifetime) {
            (Some(a), Some(b)) => isclose(a, b),
            (None, None) => {
                isclose(self.photo_lifetime, other.photo_lifetime)
                    && isclose(self.photo_factor, other.photo_factor)
                    && isclose(self.eimp_factor, other.eimp_factor)
                    && isclose(self.chx_factor, other.chx_factor)
            }
            _ => false,
        }
    }
}

impl Matches for PlasmaModel {
    fn matches(&self, other: &Self) -> bool {
        self == other
    }
}

fn default_outer_edge() -> f64 {
    20.0
}

fn default_resolution() -> f64 {
    1e-4
}

fn default_iterations() -> u32 {
    1
}

/// Run options. The number of packets, of iterations and the batch size do not change the physics and are not
/// part of the run matching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Duration of the run, in seconds
    pub runtime: f64,
    pub species: String,
    /// Escape distance, in radii of the central body
    #[serde(default = "default_outer_edge")]
    pub outer_edge: f64,
    /// Body the escape distance is measured from, the central body by default
    #[serde(default)]
    pub edge_origin: Option<String>,
    /// Fixed step in seconds, 0 for an adaptive step
    #[serde(default)]
    pub step_size: f64,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    /// Whether the results are meant to be fitted to observations, in which case the packet weights are rescaled
    /// afterwards
    #[serde(default)]
    pub fitted: bool,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub start_together: bool,
    #[serde(default = "default_iterations")]
    pub n_iterations: u32,
    pub n_packets: usize,
    /// Largest number of packets integrated at once
    #[serde(default)]
    pub max_batch: Option<usize>,
    /// Number of samples of the ephemeris tracks
    #[serde(default)]
    pub ephemeris_samples: Option<usize>,
}

impl SimulationOptions {
    pub fn new(runtime: f64, species: &str, n_packets: usize) -> Self {
        Self {
            runtime,
            species: species.to_string(),
            outer_edge: default_outer_edge(),
            edge_origin: None,
            step_size: 0.0,
            resolution: default_resolution(),
            fitted: false,
            random_seed: None,
            start_together: false,
            n_iterations: default_iterations(),
            n_packets,
            max_batch: None,
            ephemeris_samples: None,
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        positive("runtime", self.runtime)?;
        species_mass(&self.species)?;
        ensure!(
            self.outer_edge > 1.0,
            OutOfRangeSnafu {
                key: "outer_edge",
                value: self.outer_edge,
                min: 1.0,
                max: f64::INFINITY
            }
        );
        out_of_range("step_size", self.step_size, 0.0, self.runtime)?;
        positive("resolution", self.resolution)?;
        ensure!(
            self.n_packets > 0,
            ConfigSnafu {
                key: "n_packets",
                reason: "at least one packet is needed"
            }
        );
        ensure!(
            self.n_iterations > 0,
            ConfigSnafu {
                key: "n_iterations",
                reason: "at least one iteration is needed"
            }
        );
        ensure!(
            self.max_batch != Some(0),
            ConfigSnafu {
                key: "max_batch",
                reason: "batches must hold at least one packet"
            }
        );
        ensure!(
            self.ephemeris_samples.map_or(true, |n| n >= 2),
            ConfigSnafu {
                key: "ephemeris_samples",
                reason: "tracks need at least two samples"
            }
        );
        Ok(())
    }

    pub fn is_adaptive(&self) -> bool {
        self.step_size == 0.0
    }
}

impl Matches for SimulationOptions {
    fn matches(&self, other: &Self) -> bool {
        isclose(self.runtime, other.runtime)
            && same_name(&self.species, &other.species)
            && isclose(self.outer_edge, other.outer_edge)
            && match (&self.edge_origin, &other.edge_origin) {
                (Some(a), Some(b)) => same_name(a, b),
                (a, b) => a == b,
            }
            && isclose(self.step_size, other.step_size)
            && (!self.is_adaptive() || isclose(self.resolution, other.resolution))
            && self.fitted == other.fitted
            && self.random_seed == other.random_seed
            && self.start_together == other.start_together
            && self.ephemeris_samples == other.ephemeris_samples
    }
}

/// Complete inputs of a run, as loaded from YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    pub geometry: GeometryInputs,
    #[serde(default)]
    pub forces: ForcesInputs,
    #[serde(default)]
    pub surface: SurfaceInputs,
    pub spatial: SpatialInputs,
    pub speed: SpeedInputs,
    pub angular: AngularInputs,
    #[serde(default)]
    pub loss: LossInputs,
    #[serde(default)]
    pub plasma: PlasmaModel,
    pub options: SimulationOptions,
}

impl ConfigRepr for RunInputs {}

impl RunInputs {
    /// Checks every group, reporting the first invalid value.
    pub fn validate(&self) -> Result<(), InputError> {
        self.geometry.validate()?;
        if let Some(origin) = &self.options.edge_origin {
            let origin = lookup(origin)?;
            let central = self.geometry.central()?;
            ensure!(
                origin.name == central.name
                    || self.geometry.included_bodies()?.iter().any(|body| body.name == origin.name),
                ConfigSnafu {
                    key: "edge_origin",
                    reason: format!("{origin} is not in the scope of the run")
                }
            );
        }
        self.surface.validate()?;
        self.spatial.distribution()?;
        self.options.validate()?;
        self.speed.distribution(&self.options.species)?;
        self.angular.distribution()?;
        self.loss.validate()
    }
}

impl Matches for RunInputs {
    fn matches(&self, other: &Self) -> bool {
        self.geometry.matches(&other.geometry)
            && self.forces.matches(&other.forces)
            && self.surface.matches(&other.surface)
            && self.spatial.matches(&other.spatial)
            && self.speed.matches(&other.speed)
            && self.angular.matches(&other.angular)
            && self.loss.matches(&other.loss)
            && self.plasma.matches(&other.plasma)
            && self.options.matches(&other.options)
    }
}

#[cfg(test)]
mod ut_inputs {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, TAU};

    const MERCURY: &str = r#"
geometry:
  central_body: Mercury
  taa: 10.0
forces:
  gravity: true
  radpres: false
spatial:
  type: uniform
  exobase: 1.0
  longitude: "0,360"
speed:
  type: flat
  vmin: 2.0
  vmax: 2.0
angular:
  type: radial
loss:
  constant_lifetime: 1000.0
options:
  runtime: 100.0
  species: Na
  n_packets: 1
"#;

    fn mercury() -> RunInputs {
        RunInputs::loads(MERCURY).unwrap()
    }

    #[test]
    fn load_with_defaults() {
        let inputs = mercury();
        inputs.validate().unwrap();
        assert_eq!(inputs.geometry.dtaa, 2.0);
        assert!(inputs.geometry.is_time_free());
        assert_eq!(inputs.geometry.startpoint_body().unwrap().name, "Mercury");
        assert!(inputs.geometry.included_bodies().unwrap().is_empty());
        assert_eq!(inputs.surface.interaction().unwrap(), SurfaceInteraction::default());
        assert!(inputs.plasma.is_none());
        assert_eq!(inputs.options.outer_edge, 20.0);
        assert!(inputs.options.is_adaptive());
        assert_eq!(inputs.options.n_iterations, 1);

        let region = inputs.spatial.region().unwrap();
        assert_eq!(region.longitude, (0.0, TAU));
        assert_eq!(region.latitude, (-FRAC_PI_2, FRAC_PI_2));
        assert_eq!(region.frame, SourceFrame::SolarFixed);
    }

    #[test]
    fn jupiter_system() {
        let mut geometry = GeometryInputs::at("Jupiter", "2023-01-01T00:00:00 UTC");
        geometry.startpoint = Some("io".to_string());
        geometry.validate().unwrap();
        assert!(geometry.epoch().unwrap().is_some());
        let names: Vec<&str> = geometry.included_bodies().unwrap().iter().map(|b| b.name).collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"Io"));

        geometry.include = Some(vec!["Europa".to_string()]);
        let names: Vec<&str> = geometry.included_bodies().unwrap().iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Io", "Europa"]);

        geometry.startpoint = Some("Mercury".to_string());
        assert!(matches!(geometry.validate(), Err(InputError::Config { .. })));
    }

    #[test]
    fn configuration_and_range_errors() {
        let mut inputs = mercury();
        inputs.surface = SurfaceInputs::Constant {
            stickcoef: 1.5,
            accomfactor: None,
        };
        assert!(matches!(inputs.validate(), Err(InputError::OutOfRange { .. })));

        inputs.surface = SurfaceInputs::Constant {
            stickcoef: 0.5,
            accomfactor: None,
        };
        assert!(matches!(inputs.validate(), Err(InputError::Config { .. })));

        let mut inputs = mercury();
        inputs.geometry.central_body = "Vulcan".to_string();
        assert!(matches!(inputs.validate(), Err(InputError::UnknownBody { .. })));

        let mut inputs = mercury();
        inputs.geometry.modeltime = Some("not a date".to_string());
        inputs.geometry.taa = None;
        assert!(matches!(inputs.validate(), Err(InputError::Config { .. })));

        let mut inputs = mercury();
        inputs.options.outer_edge = 1.0;
        assert!(matches!(inputs.validate(), Err(InputError::OutOfRange { .. })));

        let mut inputs = mercury();
        inputs.spatial = SpatialInputs::Uniform {
            exobase: 1.0,
            longitude: "0,360".to_string(),
            latitude: "10,-10".to_string(),
            frame: SourceFrame::Iau,
        };
        assert!(matches!(inputs.validate(), Err(InputError::Config { .. })));

        let mut inputs = mercury();
        inputs.loss = LossInputs::constant(0.0);
        assert!(matches!(inputs.validate(), Err(InputError::OutOfRange { .. })));

        assert!(matches!(
            RunInputs::loads("geometry: 3"),
            Err(InputError::Parse { .. })
        ));
    }

    #[test]
    fn matching_rules() {
        let base = mercury();
        assert!(base.matches(&base));

        // True anomalies within the tolerance, including through 360
        let mut other = base.clone();
        other.geometry.taa = Some(11.5);
        assert!(base.matches(&other));
        other.geometry.taa = Some(12.5);
        assert!(!base.matches(&other));
        let mut wrapped = base.clone();
        wrapped.geometry.taa = Some(359.0);
        other.geometry.taa = Some(0.5);
        assert!(wrapped.matches(&other) && other.matches(&wrapped));

        // Run size does not matter, physics does
        let mut other = base.clone();
        other.options.n_packets = 1000;
        other.options.n_iterations = 4;
        other.options.species = "na".to_string();
        assert!(base.matches(&other));
        other.options.runtime = 101.0;
        assert!(!base.matches(&other));

        let mut other = base.clone();
        other.forces.radpres = true;
        assert!(!base.matches(&other));

        let mut other = base.clone();
        other.spatial = SpatialInputs::Uniform {
            exobase: 1.0,
            longitude: " 0, 360.0".to_string(),
            latitude: "-90,90".to_string(),
            frame: SourceFrame::SolarFixed,
        };
        assert!(base.matches(&other));
    }

    #[test]
    fn speed_distributions() {
        let maxwellian = SpeedInputs::Maxwellian { temperature: 1500.0 };
        assert!(matches!(
            maxwellian.distribution("Na").unwrap(),
            SpeedDistribution::Maxwellian { .. }
        ));
        assert!(matches!(
            maxwellian.distribution("Unobtainium"),
            Err(InputError::Config { .. })
        ));
        let flat = SpeedInputs::Flat { vmin: 3.0, vmax: 2.0 };
        assert!(matches!(flat.distribution("Na"), Err(InputError::OutOfRange { .. })));

        let yaml = "type: sputtering\nalpha: 3.0\nbeta: 1.0\nu: 2.0\n";
        let sputtering: SpeedInputs = serde_yaml::from_str(yaml).unwrap();
        assert!(sputtering.distribution("Na").is_ok());
    }
}
