//! Coordinate reference system transforms.
//!
//! Transforms are evaluated with [proj4rs]. `EPSG:<code>` descriptors are
//! resolved to PROJ strings through [crs_definitions], anything else is taken
//! as a PROJ string. Geographic coordinates cross this boundary as degrees,
//! longitude first.

use crate::Bounds;
use proj4rs::proj::Proj;

/// Target of the bounding region transform
pub const GEOGRAPHIC_CRS: &str = "+proj=longlat +datum=WGS84 +no_defs";
/// Target of the content transform
pub const GEOCENTRIC_CRS: &str = "+proj=geocent +datum=WGS84 +units=m +no_defs";

/// Resolves a CRS descriptor into a PROJ string
pub fn proj_string(crs: &str) -> crate::Result<String> {
    let crs = crs.trim();
    let code = crs
        .strip_prefix("EPSG:")
        .or_else(|| crs.strip_prefix("epsg:"));
    match code {
        Some(code) => {
            let code: u16 = code
                .parse()
                .map_err(|_| crate::Error::Projection(format!("invalid EPSG code {code:?}")))?;
            crs_definitions::from_code(code)
                .map(|def| def.proj4.to_string())
                .ok_or(crate::Error::InvalidEPSGCode(code))
        }
        None => Ok(crs.to_string()),
    }
}

fn is_geographic(proj_string: &str) -> bool {
    proj_string.split_whitespace().any(|param| {
        matches!(
            param,
            "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"
        )
    })
}

/// A transform between two coordinate reference systems
pub struct CrsTransform {
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl std::fmt::Debug for CrsTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrsTransform")
            .field("source_geographic", &self.source_geographic)
            .field("target_geographic", &self.target_geographic)
            .finish()
    }
}

impl CrsTransform {
    /// Creates the transform, failing for unknown or malformed descriptors
    pub fn new(source: &str, target: &str) -> crate::Result<Self> {
        let source = proj_string(source)?;
        let target = proj_string(target)?;
        Ok(CrsTransform {
            source: Proj::from_proj_string(&source)
                .map_err(|e| crate::Error::Projection(format!("{source}: {e:?}")))?,
            target: Proj::from_proj_string(&target)
                .map_err(|e| crate::Error::Projection(format!("{target}: {e:?}")))?,
            source_geographic: is_geographic(&source),
            target_geographic: is_geographic(&target),
        })
    }

    /// Transform in the opposite direction
    pub fn inverse(self) -> Self {
        CrsTransform {
            source: self.target,
            target: self.source,
            source_geographic: self.target_geographic,
            target_geographic: self.source_geographic,
        }
    }

    pub fn forward(&self, p: [f64; 3]) -> crate::Result<[f64; 3]> {
        let mut point = if self.source_geographic {
            (p[0].to_radians(), p[1].to_radians(), p[2])
        } else {
            (p[0], p[1], p[2])
        };
        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| crate::Error::Projection(format!("{p:?}: {e:?}")))?;
        let (x, y, z) = point;
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(crate::Error::Projection(format!("{p:?} has no image")));
        }
        if self.target_geographic {
            Ok([x.to_degrees(), y.to_degrees(), z])
        } else {
            Ok([x, y, z])
        }
    }

    /// Transforms all points in place, stopping at the first failure
    pub fn forward_in_place(&self, points: &mut [[f64; 3]]) -> crate::Result<()> {
        for p in points.iter_mut() {
            *p = self.forward(*p)?;
        }
        Ok(())
    }
}

/// Transforms from one source CRS into the geographic and geocentric frames
/// used by a tileset.
///
/// Transform creation failures are logged once; the affected operations then
/// degrade instead of aborting.
#[derive(Debug)]
pub struct Projector {
    crs: String,
    geographic: Option<CrsTransform>,
    geocentric: Option<CrsTransform>,
}

impl Projector {
    pub fn new(crs: &str) -> Self {
        let create = |target: &str| match CrsTransform::new(crs, target) {
            Ok(transform) => Some(transform),
            Err(e) => {
                log::error!("Cannot create transform from {crs} to {target}: {e}");
                None
            }
        };
        Projector {
            crs: crs.to_string(),
            geographic: create(GEOGRAPHIC_CRS),
            geocentric: create(GEOCENTRIC_CRS),
        }
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// Bounding region `[west, south, east, north, min height, max height]`,
    /// angles in radians.
    ///
    /// Falls back to zero angles with the box heights if the box can not be
    /// reprojected.
    pub fn region(&self, bounds: &Bounds) -> [f64; 6] {
        let degraded = [0.0, 0.0, 0.0, 0.0, bounds.min_z, bounds.max_z];
        let Some(transform) = &self.geographic else {
            return degraded;
        };
        let mut region = [
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            bounds.min_z,
            bounds.max_z,
        ];
        for (x, y) in [
            (bounds.min_x, bounds.min_y),
            (bounds.max_x, bounds.min_y),
            (bounds.min_x, bounds.max_y),
            (bounds.max_x, bounds.max_y),
        ] {
            match transform.forward([x, y, bounds.min_z]) {
                Ok([lon, lat, _]) => {
                    region[0] = region[0].min(lon.to_radians());
                    region[1] = region[1].min(lat.to_radians());
                    region[2] = region[2].max(lon.to_radians());
                    region[3] = region[3].max(lat.to_radians());
                }
                Err(e) => {
                    log::error!("Cannot reproject bounds {:?}: {e}", bounds.to_array());
                    return degraded;
                }
            }
        }
        region
    }

    /// Reprojects points into the geocentric frame
    pub fn to_geocentric(&self, points: &mut [[f64; 3]]) -> crate::Result<()> {
        match &self.geocentric {
            Some(transform) => transform.forward_in_place(points),
            None => Err(crate::Error::TransformUnavailable {
                crs: self.crs.clone(),
                frame: "geocentric",
            }),
        }
    }

    pub fn has_geocentric(&self) -> bool {
        self.geocentric.is_some()
    }
}
