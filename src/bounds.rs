#[derive(Clone, Copy, PartialEq, Debug)]
/// 3D axis aligned bounding box
///
/// The default value is the empty box, with every minimum at `+inf` and every
/// maximum at `-inf`, so that expanding it by any box yields that box.
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            min_z: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Bounds {
        Bounds {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
        }
    }

    /// Bounds from the `(xmin, xmax, ymin, ymax, zmin, zmax)` tuple order
    pub fn from_array(b: [f64; 6]) -> Bounds {
        Bounds::new(b[0], b[2], b[4], b[1], b[3], b[5])
    }

    /// `(xmin, xmax, ymin, ymax, zmin, zmax)`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.min_x, self.max_x, self.min_y, self.max_y, self.min_z, self.max_z,
        ]
    }

    /// A box enclosing a single point
    pub fn from_point(p: [f64; 3]) -> Bounds {
        Bounds::new(p[0], p[1], p[2], p[0], p[1], p[2])
    }

    pub fn sum(mut a: Bounds, b: &Bounds) -> Bounds {
        a.expand(b);
        a
    }

    #[inline]
    pub fn expand(&mut self, r: &Bounds) {
        self.min_x = self.min_x.min(r.min_x);
        self.min_y = self.min_y.min(r.min_y);
        self.min_z = self.min_z.min(r.min_z);
        self.max_x = self.max_x.max(r.max_x);
        self.max_y = self.max_y.max(r.max_y);
        self.max_z = self.max_z.max(r.max_z);
    }

    #[inline]
    pub fn expand_xyz(&mut self, x: f64, y: f64, z: f64) {
        self.expand(&Bounds::new(x, y, z, x, y, z));
    }

    /// `false` for the empty box and for anything with a minimum above its maximum
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y && self.min_z <= self.max_z
    }

    pub fn volume(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        (self.max_x - self.min_x) * (self.max_y - self.min_y) * (self.max_z - self.min_z)
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min_x + self.max_x) / 2.,
            (self.min_y + self.max_y) / 2.,
            (self.min_z + self.max_z) / 2.,
        ]
    }

    pub fn contains(&self, r: &Bounds) -> bool {
        self.min_x <= r.min_x
            && self.min_y <= r.min_y
            && self.min_z <= r.min_z
            && self.max_x >= r.max_x
            && self.max_y >= r.max_y
            && self.max_z >= r.max_z
    }

    /// Cell of the child with index `i` in an octree subdivision of this box.
    ///
    /// Bit 0 of `i` selects the upper half along x, bit 1 along y and bit 2 along z.
    pub fn octant(&self, i: usize) -> Bounds {
        let [cx, cy, cz] = self.center();
        let (min_x, max_x) = if i & 1 == 0 {
            (self.min_x, cx)
        } else {
            (cx, self.max_x)
        };
        let (min_y, max_y) = if i & 2 == 0 {
            (self.min_y, cy)
        } else {
            (cy, self.max_y)
        };
        let (min_z, max_z) = if i & 4 == 0 {
            (self.min_z, cz)
        } else {
            (cz, self.max_z)
        };
        Bounds::new(min_x, min_y, min_z, max_x, max_y, max_z)
    }
}
