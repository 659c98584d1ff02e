//! 3D Tiles tileset writer.

use crate::content::{ContentExporter, ContentKind, ContentWriter};
use crate::gltf::GltfWriter;
use crate::info::TreeInformation;
use crate::input::Input;
use crate::projection::Projector;
use crate::tileset::{ManifestBuilder, Tileset};
use crate::tree::SpatialTree;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the manifest inside the output directory
pub const TILESET_FILE_NAME: &str = "tileset.json";

/// Settings fixed for a whole tileset
#[derive(Clone, Debug)]
pub struct TilesetOptions {
    /// Directory receiving the content files, `<output_dir>/<id>/<id><ext>`
    pub output_dir: PathBuf,
    /// CRS of the input coordinates, an `EPSG:<code>` or a PROJ string
    pub crs: String,
    pub content_kind: ContentKind,
    /// One merged mesh per tile instead of one block per building
    pub merge_tile_meshes: bool,
}

impl Default for TilesetOptions {
    fn default() -> Self {
        TilesetOptions {
            output_dir: PathBuf::from("."),
            crs: "EPSG:4326".to_string(),
            content_kind: ContentKind::default(),
            merge_tile_meshes: true,
        }
    }
}

impl TilesetOptions {
    pub fn output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn crs<S: Into<String>>(mut self, crs: S) -> Self {
        self.crs = crs.into();
        self
    }

    pub fn content_kind(mut self, content_kind: ContentKind) -> Self {
        self.content_kind = content_kind;
        self
    }

    pub fn merge_tile_meshes(mut self, merge: bool) -> Self {
        self.merge_tile_meshes = merge;
        self
    }
}

/// 3D Tiles tileset writer
pub struct TilesetWriter<'a, W = GltfWriter> {
    tree: &'a SpatialTree,
    input: Input<'a>,
    options: TilesetOptions,
    info: TreeInformation,
    projector: Projector,
    exporter: ContentExporter<W>,
}

impl<'a> TilesetWriter<'a, GltfWriter> {
    /// Creates a writer that stores tile contents with [GltfWriter]
    ///
    /// see [with_content_writer] for details
    ///
    /// [with_content_writer]: Self::with_content_writer
    pub fn new(
        tree: &'a SpatialTree,
        input: Input<'a>,
        options: TilesetOptions,
    ) -> crate::Result<Self> {
        TilesetWriter::with_content_writer(tree, input, options, GltfWriter::default())
    }
}

impl<'a, W: ContentWriter> TilesetWriter<'a, W> {
    /// Validates `input` against `tree` and computes the bounds and geometric
    /// error of every node.
    ///
    /// Returns a [crate::Error] if the tree references items that are not in
    /// `input` or if the point density is not a positive number.
    /// A CRS that can not be used is not an error: it is logged and the
    /// affected regions and contents degrade.
    pub fn with_content_writer(
        tree: &'a SpatialTree,
        input: Input<'a>,
        options: TilesetOptions,
        content_writer: W,
    ) -> crate::Result<Self> {
        input.validate(tree)?;
        let info = TreeInformation::compute(tree, &input);
        let projector = Projector::new(&options.crs);
        let exporter = ContentExporter::new(
            options.output_dir.clone(),
            options.content_kind,
            options.merge_tile_meshes,
            content_writer,
        );
        Ok(TilesetWriter {
            tree,
            input,
            options,
            info,
            projector,
            exporter,
        })
    }

    pub fn info(&self) -> &TreeInformation {
        &self.info
    }

    pub fn options(&self) -> &TilesetOptions {
        &self.options
    }

    pub fn exporter(&self) -> &ContentExporter<W> {
        &self.exporter
    }

    /// Builds the manifest, writing the content of every non-empty leaf.
    ///
    /// Calling this again writes the contents again and replaces the export
    /// summary of the previous call.
    pub fn tileset(&mut self) -> Tileset {
        ManifestBuilder {
            tree: self.tree,
            input: &self.input,
            info: &self.info,
            projector: &self.projector,
            exporter: &mut self.exporter,
        }
        .build()
    }

    /// Writes the contents and the manifest to `path`
    pub fn write<P: AsRef<Path>>(&mut self, path: P) -> crate::Result<Tileset> {
        let tileset = self.tileset();
        let path = path.as_ref();
        let file = File::create(path).inspect_err(|_| {
            log::error!("Cannot open {} for writing", path.display());
        })?;
        let mut file = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut file, &tileset)?;
        writeln!(file)?;
        file.flush()?;
        log::info!(
            "Wrote {} with {} tiles, {} content files ({} failed)",
            path.display(),
            tileset.root.count(),
            self.exporter.written().len(),
            self.exporter.failed()
        );
        Ok(tileset)
    }

    /// Writes the contents and `<output_dir>/tileset.json`
    pub fn write_to_output_dir(&mut self) -> crate::Result<Tileset> {
        fs::create_dir_all(&self.options.output_dir)?;
        let path = self.options.output_dir.join(TILESET_FILE_NAME);
        self.write(path)
    }
}
