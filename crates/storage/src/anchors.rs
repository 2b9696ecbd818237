use rusqlite::{Connection, params};
use tracing::debug;

use wellops_core::{
    clock::Timestamp,
    ids::WellId,
    proposal::{AnchorInput, Quadrant},
};

use crate::error::StorageError;
use crate::sqlite::to_array;
use crate::traits::AnchorRecord;

/// Upsert anchors keyed by `(well_id, quadrant)`. An existing row only has
/// its coordinates replaced. `None` is a no-op.
///
/// Entries are applied one at a time; a failing entry leaves the earlier
/// ones written, so callers run this inside their own transaction.
pub fn upsert_anchors(
    conn: &Connection,
    well_id: WellId,
    anchors: Option<&[AnchorInput]>,
    now: Timestamp,
) -> Result<usize, StorageError> {
    let Some(anchors) = anchors else {
        return Ok(0);
    };

    let mut stmt = conn.prepare(
        "INSERT INTO anchors (well_id, quadrant, lat, lng, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(well_id, quadrant) DO UPDATE SET lat = excluded.lat, lng = excluded.lng, updated_at = excluded.updated_at",
    )?;
    for anchor in anchors {
        stmt.execute(params![
            well_id.as_bytes().as_slice(),
            anchor.quadrant.as_str(),
            anchor.lat,
            anchor.lng,
            now.as_millis(),
        ])
        .map_err(|e| {
            StorageError::from_write(e, &format!("upsert anchor {}", anchor.quadrant.as_str()))
        })?;
    }
    debug!(%well_id, count = anchors.len(), "upserted anchors");
    Ok(anchors.len())
}

pub fn get_anchors(conn: &Connection, well_id: WellId) -> Result<Vec<AnchorRecord>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT well_id, quadrant, lat, lng FROM anchors WHERE well_id = ?1 ORDER BY quadrant",
    )?;
    let mut rows = stmt.query(params![well_id.as_bytes().as_slice()])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let well_id_bytes: Vec<u8> = row.get(0)?;
        let quadrant: String = row.get(1)?;
        result.push(AnchorRecord {
            well_id: WellId::from_bytes(to_array::<16>(well_id_bytes, "well_id")?),
            quadrant: quadrant.parse::<Quadrant>()?,
            lat: row.get(2)?,
            lng: row.get(3)?,
        });
    }
    Ok(result)
}
