//! Point positions from LAS and LAZ files.

use std::path::Path;

/// Reads the positions of all points of a las or laz file
///
/// The positions are returned in the CRS of the file, with scale and offset
/// applied.
pub fn read_las_points<P: AsRef<Path>>(path: P) -> crate::Result<Vec<[f64; 3]>> {
    let mut reader = las::Reader::from_path(path)?;
    let mut positions = Vec::with_capacity(reader.header().number_of_points() as usize);
    for point in reader.points() {
        let point = point?;
        positions.push([point.x, point.y, point.z]);
    }
    log::debug!("Read {} points", positions.len());
    Ok(positions)
}
