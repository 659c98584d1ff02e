//! Input items and the per-variant bounds and error formulas.

use crate::tree::{OctreeNode, SpatialTree};
use crate::Bounds;

/// Default density used to cap point counts in the error estimate
pub const POINTS_PER_CUBIC_METER_DEFAULT: f64 = 1000.0;

/// Vertex positions of a mesh, in source CRS coordinates
#[derive(Clone, Debug, PartialEq)]
pub enum Positions {
    F32(Vec<[f32; 3]>),
    F64(Vec<[f64; 3]>),
    /// Integer positions can be bounded but not reprojected
    I32(Vec<[i32; 3]>),
}

impl Positions {
    pub fn len(&self) -> usize {
        match self {
            Positions::F32(p) => p.len(),
            Positions::F64(p) => p.len(),
            Positions::I32(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component_type(&self) -> &'static str {
        match self {
            Positions::F32(_) => "f32",
            Positions::F64(_) => "f64",
            Positions::I32(_) => "i32",
        }
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::default();
        match self {
            Positions::F32(p) => p
                .iter()
                .for_each(|v| bounds.expand_xyz(v[0] as f64, v[1] as f64, v[2] as f64)),
            Positions::F64(p) => p.iter().for_each(|v| bounds.expand_xyz(v[0], v[1], v[2])),
            Positions::I32(p) => p
                .iter()
                .for_each(|v| bounds.expand_xyz(v[0] as f64, v[1] as f64, v[2] as f64)),
        }
        bounds
    }

    /// Double precision copy of the positions.
    ///
    /// Single precision positions are widened, integer positions are rejected.
    pub fn to_f64(&self) -> crate::Result<Vec<[f64; 3]>> {
        match self {
            Positions::F64(p) => Ok(p.clone()),
            Positions::F32(p) => {
                log::warn!("Converting float to double points.");
                Ok(p
                    .iter()
                    .map(|v| [v[0] as f64, v[1] as f64, v[2] as f64])
                    .collect())
            }
            Positions::I32(_) => Err(crate::Error::UnsupportedVertexType(self.component_type())),
        }
    }
}

/// Triangle mesh, one part of a building
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub positions: Positions,
    /// Vertex indices, three per triangle
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(positions: Positions, triangles: Vec<[u32; 3]>) -> Self {
        Mesh {
            positions,
            triangles,
        }
    }
}

/// A building: a named composite of mesh parts
#[derive(Clone, Debug, PartialEq)]
pub struct Building {
    pub name: String,
    pub parts: Vec<Mesh>,
}

impl Building {
    pub fn new<S: Into<String>>(name: S, parts: Vec<Mesh>) -> Self {
        Building {
            name: name.into(),
            parts,
        }
    }

    /// Union of the bounds of all parts
    pub fn bounds(&self) -> Bounds {
        self.parts
            .iter()
            .fold(Bounds::default(), |b, part| Bounds::sum(b, &part.positions.bounds()))
    }
}

/// Building input: one item per building
#[derive(Clone, Copy, Debug)]
pub struct Buildings<'a> {
    pub buildings: &'a [Building],
}

impl Buildings<'_> {
    pub fn tight_bounds(&self, items: &[usize]) -> Bounds {
        items.iter().fold(Bounds::default(), |b, &i| {
            Bounds::sum(b, &self.buildings[i].bounds())
        })
    }

    fn items_volume(&self, items: &[usize]) -> f64 {
        items
            .iter()
            .map(|&i| self.buildings[i].bounds().volume())
            .sum()
    }

    /// Cube root of the summed child error cubes and child item volumes
    pub fn node_error<'t>(&self, children: impl Iterator<Item = (&'t OctreeNode, f64)>) -> f64 {
        let mut error: f64 = 0.0;
        for (child, child_error) in children {
            // items in child nodes contribute to the error in the parent
            error += child_error.powi(3);
            error += self.items_volume(child.items());
        }
        error.cbrt()
    }

    /// Cube root of the root error plus the volume of the root's own items.
    ///
    /// The root error enters as is, it is not cubed.
    pub fn tileset_error(&self, root: &OctreeNode, root_error: f64) -> f64 {
        (root_error + self.items_volume(root.items())).cbrt()
    }
}

/// Point cloud input: one item per point
#[derive(Clone, Copy, Debug)]
pub struct Points<'a> {
    pub positions: &'a [[f64; 3]],
    /// Points per cubic unit beyond which a cell counts as saturated
    pub density: f64,
}

impl Points<'_> {
    pub fn tight_bounds(&self, items: &[usize]) -> Bounds {
        items.iter().fold(Bounds::default(), |b, &i| {
            Bounds::sum(b, &Bounds::from_point(self.positions[i]))
        })
    }

    /// Cell volume scaled by the point count, the count capped at the density
    pub fn volume_error(&self, node: &OctreeNode) -> f64 {
        let count = node.items().len();
        if count == 0 {
            return 0.0;
        }
        let volume = node.cell.volume();
        let capped = (count as f64).min((self.density * volume).floor());
        volume * capped / self.density
    }

    /// Cube root of the largest child error cube or child volume error
    pub fn node_error<'t>(&self, children: impl Iterator<Item = (&'t OctreeNode, f64)>) -> f64 {
        let mut error: f64 = 0.0;
        for (child, child_error) in children {
            error = error.max(child_error.powi(3)).max(self.volume_error(child));
        }
        error.cbrt()
    }

    /// Cube root of the larger of the root error, not cubed, and the root volume error
    pub fn tileset_error(&self, root: &OctreeNode, root_error: f64) -> f64 {
        root_error.max(self.volume_error(root)).cbrt()
    }
}

/// The items a tileset is built from. One variant per run.
#[derive(Clone, Copy, Debug)]
pub enum Input<'a> {
    Buildings(Buildings<'a>),
    Points(Points<'a>),
}

impl<'a> Input<'a> {
    pub fn buildings(buildings: &'a [Building]) -> Self {
        Input::Buildings(Buildings { buildings })
    }

    pub fn points(positions: &'a [[f64; 3]]) -> Self {
        Input::points_with_density(positions, POINTS_PER_CUBIC_METER_DEFAULT)
    }

    pub fn points_with_density(positions: &'a [[f64; 3]], density: f64) -> Self {
        Input::Points(Points { positions, density })
    }

    pub fn number_of_items(&self) -> usize {
        match self {
            Input::Buildings(b) => b.buildings.len(),
            Input::Points(p) => p.positions.len(),
        }
    }

    /// Checks the density and that every item referenced by the tree exists
    pub fn validate(&self, tree: &SpatialTree) -> crate::Result<()> {
        if let Input::Points(p) = self {
            if !p.density.is_normal() || p.density < 0.0 {
                return Err(crate::Error::InvalidDensity(p.density));
            }
        }
        let count = self.number_of_items();
        for node in tree.nodes() {
            if let Some(&item) = node.items().iter().find(|&&i| i >= count) {
                return Err(crate::Error::ItemOutOfRange {
                    node: node.id,
                    item,
                    count,
                });
            }
        }
        Ok(())
    }

    pub fn tight_bounds(&self, items: &[usize]) -> Bounds {
        match self {
            Input::Buildings(b) => b.tight_bounds(items),
            Input::Points(p) => p.tight_bounds(items),
        }
    }

    pub fn node_error<'t>(&self, children: impl Iterator<Item = (&'t OctreeNode, f64)>) -> f64 {
        match self {
            Input::Buildings(b) => b.node_error(children),
            Input::Points(p) => p.node_error(children),
        }
    }

    pub fn tileset_error(&self, root: &OctreeNode, root_error: f64) -> f64 {
        match self {
            Input::Buildings(b) => b.tileset_error(root, root_error),
            Input::Points(p) => p.tileset_error(root, root_error),
        }
    }
}
