//! Tile content gathering and export.

use crate::input::{Building, Input, Mesh};
use crate::projection::Projector;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Container format of the tile contents, fixed for a whole tileset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Batched 3D Model
    #[default]
    B3dm,
    /// Binary glTF, requires the `3DTILES_content_gltf` extension
    Glb,
    /// JSON glTF, requires the `3DTILES_content_gltf` extension
    Gltf,
}

impl ContentKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ContentKind::B3dm => ".b3dm",
            ContentKind::Glb => ".glb",
            ContentKind::Gltf => ".gltf",
        }
    }

    /// glTF content is only allowed through the `3DTILES_content_gltf` extension
    pub fn requires_gltf_extension(&self) -> bool {
        *self != ContentKind::B3dm
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::B3dm => "B3DM",
            ContentKind::Glb => "GLB",
            ContentKind::Gltf => "GLTF",
        };
        f.write_str(name)
    }
}

/// Reprojectable triangle mesh in double precision
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileMesh {
    pub positions: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl TileMesh {
    /// Appends `other`, shifting its indices past the current vertices
    pub fn append(&mut self, other: TileMesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.triangles.extend(
            other
                .triangles
                .into_iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }
}

/// Geometry of one named block of a tile
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Meshes(Vec<TileMesh>),
    Points(Vec<[f64; 3]>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContentBlock {
    pub name: String,
    pub geometry: Geometry,
}

/// Everything that goes into one content file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileContent {
    pub blocks: Vec<ContentBlock>,
}

impl TileContent {
    /// Applies `f` to the vertex positions of every mesh and point block
    pub fn try_for_each_positions<F>(&mut self, mut f: F) -> crate::Result<()>
    where
        F: FnMut(&mut [[f64; 3]]) -> crate::Result<()>,
    {
        for block in self.blocks.iter_mut() {
            match &mut block.geometry {
                Geometry::Meshes(meshes) => {
                    for mesh in meshes.iter_mut() {
                        f(&mut mesh.positions)?;
                    }
                }
                Geometry::Points(points) => f(points)?,
            }
        }
        Ok(())
    }

    pub fn number_of_vertices(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| match &block.geometry {
                Geometry::Meshes(meshes) => meshes.iter().map(|m| m.positions.len()).sum(),
                Geometry::Points(points) => points.len(),
            })
            .sum()
    }
}

/// Serializes tile contents to files
pub trait ContentWriter {
    fn write_content(&mut self, path: &Path, kind: ContentKind, content: &TileContent)
        -> crate::Result<()>;
}

/// Relative URI of the content of node `id`
pub fn content_uri(id: usize, kind: ContentKind) -> String {
    format!("{id}/{id}{}", kind.extension())
}

/// Gathers, reprojects and writes the content of leaf nodes
#[derive(Debug)]
pub struct ContentExporter<W> {
    output_dir: PathBuf,
    kind: ContentKind,
    merge: bool,
    writer: W,
    written: Vec<PathBuf>,
    failed: usize,
}

impl<W: ContentWriter> ContentExporter<W> {
    /// `merge` selects a single merged mesh per tile over one block per building
    pub fn new<P: Into<PathBuf>>(output_dir: P, kind: ContentKind, merge: bool, writer: W) -> Self {
        ContentExporter {
            output_dir: output_dir.into(),
            kind,
            merge,
            writer,
            written: Vec::new(),
            failed: 0,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// `<output dir>/<id>/<id><extension>`
    pub fn content_path(&self, id: usize) -> PathBuf {
        self.output_dir
            .join(id.to_string())
            .join(format!("{id}{}", self.kind.extension()))
    }

    /// Paths of the content files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Number of leaves whose content could not be exported
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Forgets the written paths and failures of a previous export run
    pub fn reset(&mut self) {
        self.written.clear();
        self.failed = 0;
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Collects the geometry of `items`.
    ///
    /// Mesh parts with positions that can not be reprojected are skipped.
    pub fn gather(&self, input: &Input<'_>, items: &[usize]) -> TileContent {
        match input {
            Input::Buildings(b) => {
                let buildings = items.iter().map(|&i| &b.buildings[i]);
                if self.merge {
                    let mut merged = TileMesh::default();
                    for building in buildings {
                        for mesh in tile_meshes(building) {
                            merged.append(mesh);
                        }
                    }
                    TileContent {
                        blocks: vec![ContentBlock {
                            name: "tile".to_string(),
                            geometry: Geometry::Meshes(vec![merged]),
                        }],
                    }
                } else {
                    TileContent {
                        blocks: buildings
                            .map(|building| ContentBlock {
                                name: building.name.clone(),
                                geometry: Geometry::Meshes(tile_meshes(building).collect()),
                            })
                            .collect(),
                    }
                }
            }
            Input::Points(p) => TileContent {
                blocks: vec![ContentBlock {
                    name: "points".to_string(),
                    geometry: Geometry::Points(items.iter().map(|&i| p.positions[i]).collect()),
                }],
            },
        }
    }

    /// Exports the content of leaf `id` and returns its URI.
    ///
    /// Failures are logged and reported as `None`; they never affect other tiles.
    pub fn export(
        &mut self,
        id: usize,
        input: &Input<'_>,
        items: &[usize],
        projector: &Projector,
    ) -> Option<String> {
        match self.try_export(id, input, items, projector) {
            Ok(path) => {
                self.written.push(path);
                Some(content_uri(id, self.kind))
            }
            Err(e) => {
                log::error!("Cannot export content of node {id}: {e}");
                self.failed += 1;
                None
            }
        }
    }

    fn try_export(
        &mut self,
        id: usize,
        input: &Input<'_>,
        items: &[usize],
        projector: &Projector,
    ) -> crate::Result<PathBuf> {
        let mut content = self.gather(input, items);
        content.try_for_each_positions(|positions| projector.to_geocentric(positions))?;
        let path = self.content_path(id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        log::info!(
            "Saving {} file for {} items ({} vertices)...",
            self.kind,
            items.len(),
            content.number_of_vertices()
        );
        self.writer.write_content(&path, self.kind, &content)?;
        Ok(path)
    }
}

fn tile_meshes(building: &Building) -> impl Iterator<Item = TileMesh> + '_ {
    building.parts.iter().filter_map(move |part| to_tile_mesh(building, part))
}

fn to_tile_mesh(building: &Building, mesh: &Mesh) -> Option<TileMesh> {
    match mesh.positions.to_f64() {
        Ok(positions) => Some(TileMesh {
            positions,
            triangles: mesh.triangles.clone(),
        }),
        Err(e) => {
            log::error!("Skipping part of building {:?}: {e}", building.name);
            None
        }
    }
}
