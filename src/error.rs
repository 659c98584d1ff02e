use thiserror::Error;

/// crate specific Result type
pub type Result<T> = std::result::Result<T, Error>;

/// crate specific Error enum
#[derive(Error, Debug)]
pub enum Error {
    /// [las::Error]
    #[error(transparent)]
    LasError(#[from] las::Error),

    /// [std::io::Error]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// [serde_json::Error]
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A node id is not equal to its position in the node arena,
    /// or a child id points outside of the arena
    #[error("node id {} is not a valid index into the octree", .0)]
    InvalidNodeId(usize),

    /// A node is listed as child of more than one node, or the root is listed as a child
    #[error("node {} is referenced more than once in the octree", .0)]
    NodeReferencedTwice(usize),

    /// The octree does not contain any node
    #[error("the octree does not contain any node")]
    EmptyTree,

    /// A node references an item that is not part of the input
    #[error("node {node} references item {item}, but only {count} items were given")]
    ItemOutOfRange {
        /// id of the referencing node
        node: usize,
        /// the item index
        item: usize,
        /// number of input items
        count: usize,
    },

    /// The requested point density is either negative or not normal
    #[error("the requested point density is not possible: {}", .0)]
    InvalidDensity(f64),

    /// Unsupported epsg
    #[error("the epsg-code {} is not defined in the crs-definitions library", .0)]
    InvalidEPSGCode(u16),

    /// The CRS transform could not be created or evaluated
    #[error("projection failed: {}", .0)]
    Projection(String),

    /// A transform is required but could not be created earlier
    #[error("no transform from {} to the {} frame is available", .crs, .frame)]
    TransformUnavailable {
        /// source CRS descriptor
        crs: String,
        /// target frame name
        frame: &'static str,
    },

    /// Vertex positions use a component type that can not be reprojected
    #[error("points are not float or double: {}", .0)]
    UnsupportedVertexType(&'static str),
}
