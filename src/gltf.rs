//! glTF based tile content writer.
//!
//! Positions are stored as `f32` offsets from the center of the tile, the
//! center itself goes into the translation of every node so that geocentric
//! coordinates keep their precision.

use crate::content::{ContentKind, ContentWriter, Geometry, TileContent, TileMesh};
use crate::Bounds;
use base64::Engine;
use byteorder::{LittleEndian, WriteBytesExt};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const GLB_CHUNK_BIN: u32 = 0x004E_4942;
const B3DM_HEADER_SIZE: usize = 28;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const MODE_POINTS: u32 = 0;
const MODE_TRIANGLES: u32 = 4;

/// Writes `.gltf`, `.glb` and `.b3dm` tile contents
#[derive(Clone, Debug)]
pub struct GltfWriter {
    generator: String,
}

impl Default for GltfWriter {
    fn default() -> Self {
        GltfWriter {
            generator: concat!("tiles3d-rs ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ContentWriter for GltfWriter {
    fn write_content(
        &mut self,
        path: &Path,
        kind: ContentKind,
        content: &TileContent,
    ) -> crate::Result<()> {
        let bytes = match kind {
            ContentKind::Gltf => self.to_gltf(content)?,
            ContentKind::Glb => self.to_glb(content)?,
            ContentKind::B3dm => self.to_b3dm(content)?,
        };
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(())
    }
}

impl GltfWriter {
    /// JSON glTF with the buffer embedded as a data URI
    pub fn to_gltf(&self, content: &TileContent) -> crate::Result<Vec<u8>> {
        let (mut document, buffer) = self.document(content)?;
        if let Some(buffers) = document.get_mut("buffers").and_then(Value::as_array_mut) {
            let data = base64::engine::general_purpose::STANDARD.encode(&buffer);
            buffers[0]["uri"] = Value::from(format!("data:application/octet-stream;base64,{data}"));
        }
        Ok(serde_json::to_vec(&document)?)
    }

    /// Binary glTF
    pub fn to_glb(&self, content: &TileContent) -> crate::Result<Vec<u8>> {
        let (document, buffer) = self.document(content)?;
        let mut json = serde_json::to_vec(&document)?;
        pad(&mut json, 4, b' ');
        let mut bin = buffer;
        pad(&mut bin, 4, 0);

        let mut length = 12 + 8 + json.len();
        if !bin.is_empty() {
            length += 8 + bin.len();
        }
        let mut glb = Vec::with_capacity(length);
        glb.write_u32::<LittleEndian>(GLB_MAGIC)?;
        glb.write_u32::<LittleEndian>(2)?;
        glb.write_u32::<LittleEndian>(length as u32)?;
        glb.write_u32::<LittleEndian>(json.len() as u32)?;
        glb.write_u32::<LittleEndian>(GLB_CHUNK_JSON)?;
        glb.extend_from_slice(&json);
        if !bin.is_empty() {
            glb.write_u32::<LittleEndian>(bin.len() as u32)?;
            glb.write_u32::<LittleEndian>(GLB_CHUNK_BIN)?;
            glb.extend_from_slice(&bin);
        }
        Ok(glb)
    }

    /// Batched 3D Model wrapping a binary glTF, without batch table
    pub fn to_b3dm(&self, content: &TileContent) -> crate::Result<Vec<u8>> {
        let mut glb = self.to_glb(content)?;
        pad(&mut glb, 8, 0);
        let mut feature_table = br#"{"BATCH_LENGTH":0}"#.to_vec();
        // the glb must start on an 8 byte boundary
        while (B3DM_HEADER_SIZE + feature_table.len()) % 8 != 0 {
            feature_table.push(b' ');
        }
        let length = B3DM_HEADER_SIZE + feature_table.len() + glb.len();

        let mut b3dm = Vec::with_capacity(length);
        b3dm.extend_from_slice(b"b3dm");
        b3dm.write_u32::<LittleEndian>(1)?;
        b3dm.write_u32::<LittleEndian>(length as u32)?;
        b3dm.write_u32::<LittleEndian>(feature_table.len() as u32)?;
        b3dm.write_u32::<LittleEndian>(0)?; // feature table binary
        b3dm.write_u32::<LittleEndian>(0)?; // batch table JSON
        b3dm.write_u32::<LittleEndian>(0)?; // batch table binary
        b3dm.extend_from_slice(&feature_table);
        b3dm.extend_from_slice(&glb);
        Ok(b3dm)
    }

    fn document(&self, content: &TileContent) -> crate::Result<(Value, Vec<u8>)> {
        let mut bounds = Bounds::default();
        for block in &content.blocks {
            match &block.geometry {
                Geometry::Meshes(meshes) => meshes
                    .iter()
                    .flat_map(|m| m.positions.iter())
                    .for_each(|p| bounds.expand_xyz(p[0], p[1], p[2])),
                Geometry::Points(points) => points
                    .iter()
                    .for_each(|p| bounds.expand_xyz(p[0], p[1], p[2])),
            }
        }
        let center = if bounds.is_valid() {
            bounds.center()
        } else {
            [0.0; 3]
        };

        let mut builder = DocumentBuilder {
            center,
            ..Default::default()
        };
        for block in &content.blocks {
            let primitives = match &block.geometry {
                Geometry::Meshes(meshes) => meshes
                    .iter()
                    // a triangle primitive needs indices
                    .filter(|m| !m.positions.is_empty() && !m.triangles.is_empty())
                    .map(|m| builder.triangles(m))
                    .collect::<crate::Result<Vec<_>>>()?,
                Geometry::Points(points) if !points.is_empty() => vec![builder.points(points)?],
                Geometry::Points(_) => vec![],
            };
            if primitives.is_empty() {
                continue;
            }
            let mesh = builder.meshes.len();
            builder.meshes.push(json!({ "name": block.name, "primitives": primitives }));
            builder.nodes.push(json!({
                "name": block.name,
                "mesh": mesh,
                "translation": center,
            }));
        }

        let nodes: Vec<usize> = (0..builder.nodes.len()).collect();
        let mut document = json!({
            "asset": { "version": "2.0", "generator": self.generator },
            "scene": 0,
            "scenes": [{ "nodes": nodes }],
        });
        for (name, items) in [
            ("nodes", builder.nodes),
            ("meshes", builder.meshes),
            ("accessors", builder.accessors),
            ("bufferViews", builder.buffer_views),
        ] {
            if !items.is_empty() {
                document[name] = Value::Array(items);
            }
        }
        if !builder.buffer.is_empty() {
            document["buffers"] = json!([{ "byteLength": builder.buffer.len() }]);
        }
        Ok((document, builder.buffer))
    }
}

#[derive(Default)]
struct DocumentBuilder {
    center: [f64; 3],
    buffer: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
    meshes: Vec<Value>,
    nodes: Vec<Value>,
}

impl DocumentBuilder {
    fn triangles(&mut self, mesh: &TileMesh) -> crate::Result<Value> {
        let position = self.positions(&mesh.positions)?;
        let indices = self.indices(&mesh.triangles)?;
        Ok(json!({
            "attributes": { "POSITION": position },
            "indices": indices,
            "mode": MODE_TRIANGLES,
        }))
    }

    fn points(&mut self, points: &[[f64; 3]]) -> crate::Result<Value> {
        let position = self.positions(points)?;
        Ok(json!({
            "attributes": { "POSITION": position },
            "mode": MODE_POINTS,
        }))
    }

    fn positions(&mut self, positions: &[[f64; 3]]) -> crate::Result<usize> {
        let offset = self.buffer.len();
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for p in positions {
            for i in 0..3 {
                let v = (p[i] - self.center[i]) as f32;
                min[i] = min[i].min(v);
                max[i] = max[i].max(v);
                self.buffer.write_f32::<LittleEndian>(v)?;
            }
        }
        let view = self.view(offset, ARRAY_BUFFER);
        Ok(self.accessor(json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": positions.len(),
            "type": "VEC3",
            "min": min,
            "max": max,
        })))
    }

    fn indices(&mut self, triangles: &[[u32; 3]]) -> crate::Result<usize> {
        let offset = self.buffer.len();
        for index in triangles.iter().flatten() {
            self.buffer.write_u32::<LittleEndian>(*index)?;
        }
        let view = self.view(offset, ELEMENT_ARRAY_BUFFER);
        Ok(self.accessor(json!({
            "bufferView": view,
            "componentType": UNSIGNED_INT,
            "count": triangles.len() * 3,
            "type": "SCALAR",
        })))
    }

    fn view(&mut self, offset: usize, target: u32) -> usize {
        self.buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": self.buffer.len() - offset,
            "target": target,
        }));
        self.buffer_views.len() - 1
    }

    fn accessor(&mut self, accessor: Value) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }
}

fn pad(data: &mut Vec<u8>, alignment: usize, fill: u8) {
    while data.len() % alignment != 0 {
        data.push(fill);
    }
}
