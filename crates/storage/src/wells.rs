use rusqlite::{Connection, Row, params};

use wellops_core::{clock::Timestamp, ids::*, proposal::normalize_api};

use crate::error::StorageError;
use crate::sqlite::to_array;
use crate::traits::{HistoryRecord, WellRecord, WellSnapshot};

const WELL_COLUMNS: &str = "well_id, api, company_id, company_man_name, company_man_number, \
     company_man_email, company_man_cell, previous_anchor_company, last_test_date, updated_at";

fn read_well(row: &Row) -> Result<WellRecord, StorageError> {
    let well_id_bytes: Vec<u8> = row.get(0)?;
    let company_id_bytes: Option<Vec<u8>> = row.get(2)?;
    Ok(WellRecord {
        well_id: WellId::from_bytes(to_array::<16>(well_id_bytes, "well_id")?),
        api: row.get(1)?,
        company_id: company_id_bytes
            .map(|b| to_array::<16>(b, "company_id").map(CompanyId::from_bytes))
            .transpose()?,
        company_man_name: row.get(3)?,
        company_man_number: row.get(4)?,
        company_man_email: row.get(5)?,
        company_man_cell: row.get(6)?,
        previous_anchor_company: row.get(7)?,
        last_test_date: row.get(8)?,
        updated_at: Timestamp::from_millis(row.get(9)?),
    })
}

fn query_one_well(
    conn: &Connection,
    filter: &str,
    param: &dyn rusqlite::ToSql,
) -> Result<Option<WellRecord>, StorageError> {
    let mut stmt = conn.prepare(&format!("SELECT {WELL_COLUMNS} FROM wells WHERE {filter}"))?;
    let mut rows = stmt.query([param])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_well(row)?)),
        None => Ok(None),
    }
}

pub fn get_well(conn: &Connection, well_id: WellId) -> Result<Option<WellRecord>, StorageError> {
    query_one_well(conn, "well_id = ?1", &well_id.as_bytes().as_slice())
}

/// Lookup by api code; surrounding whitespace is ignored and a blank code
/// matches nothing.
pub fn find_well_by_api(conn: &Connection, api: &str) -> Result<Option<WellRecord>, StorageError> {
    match normalize_api(Some(api)) {
        Some(api) => query_one_well(conn, "api = ?1", &api),
        None => Ok(None),
    }
}

pub fn insert_well(
    conn: &Connection,
    well: &WellRecord,
    created_at: Timestamp,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO wells (well_id, api, company_id, company_man_name, company_man_number, company_man_email, company_man_cell, previous_anchor_company, last_test_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            well.well_id.as_bytes().as_slice(),
            well.api,
            well.company_id.map(|id| id.as_bytes().to_vec()),
            well.company_man_name,
            well.company_man_number,
            well.company_man_email,
            well.company_man_cell,
            well.previous_anchor_company,
            well.last_test_date,
            created_at.as_millis(),
            well.updated_at.as_millis(),
        ],
    )
    .map_err(|e| StorageError::from_write(e, "insert well"))?;
    Ok(())
}

/// Overwrite every mutable column of an existing well.
pub fn update_well(conn: &Connection, well: &WellRecord) -> Result<(), StorageError> {
    let changed = conn
        .execute(
            "UPDATE wells SET api = ?1, company_id = ?2, company_man_name = ?3, company_man_number = ?4,
                company_man_email = ?5, company_man_cell = ?6, previous_anchor_company = ?7,
                last_test_date = ?8, updated_at = ?9
             WHERE well_id = ?10",
            params![
                well.api,
                well.company_id.map(|id| id.as_bytes().to_vec()),
                well.company_man_name,
                well.company_man_number,
                well.company_man_email,
                well.company_man_cell,
                well.previous_anchor_company,
                well.last_test_date,
                well.updated_at.as_millis(),
                well.well_id.as_bytes().as_slice(),
            ],
        )
        .map_err(|e| StorageError::from_write(e, "update well"))?;
    if changed == 0 {
        return Err(StorageError::NotFound(format!("well {}", well.well_id)));
    }
    Ok(())
}

pub fn well_count(conn: &Connection) -> Result<u64, StorageError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM wells", [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn append_history(
    conn: &Connection,
    change_id: ChangeId,
    snapshot: &WellSnapshot,
    recorded_at: Timestamp,
) -> Result<HistoryRecord, StorageError> {
    let snapshot_json =
        serde_json::to_string(snapshot).map_err(|e| StorageError::Serialization(e.to_string()))?;
    let checksum = *blake3::hash(snapshot_json.as_bytes()).as_bytes();
    conn.execute(
        "INSERT INTO well_history (well_id, change_id, snapshot, checksum, recorded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            snapshot.well.well_id.as_bytes().as_slice(),
            change_id.as_bytes().as_slice(),
            snapshot_json,
            &checksum[..],
            recorded_at.as_millis(),
        ],
    )
    .map_err(|e| StorageError::from_write(e, "append well history"))?;
    Ok(HistoryRecord {
        well_id: snapshot.well.well_id,
        change_id,
        snapshot_json,
        checksum,
        recorded_at,
    })
}

fn read_history(row: &Row) -> Result<HistoryRecord, StorageError> {
    let well_id_bytes: Vec<u8> = row.get(0)?;
    let change_id_bytes: Vec<u8> = row.get(1)?;
    let checksum_bytes: Vec<u8> = row.get(3)?;
    Ok(HistoryRecord {
        well_id: WellId::from_bytes(to_array::<16>(well_id_bytes, "well_id")?),
        change_id: ChangeId::from_bytes(to_array::<16>(change_id_bytes, "change_id")?),
        snapshot_json: row.get(2)?,
        checksum: to_array::<32>(checksum_bytes, "checksum")?,
        recorded_at: Timestamp::from_millis(row.get(4)?),
    })
}

pub fn get_history(conn: &Connection, well_id: WellId) -> Result<Vec<HistoryRecord>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT well_id, change_id, snapshot, checksum, recorded_at FROM well_history WHERE well_id = ?1 ORDER BY rowid",
    )?;
    let mut rows = stmt.query(params![well_id.as_bytes().as_slice()])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(read_history(row)?);
    }
    Ok(result)
}

pub fn history_for_change(
    conn: &Connection,
    change_id: ChangeId,
) -> Result<Option<HistoryRecord>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT well_id, change_id, snapshot, checksum, recorded_at FROM well_history WHERE change_id = ?1",
    )?;
    let mut rows = stmt.query(params![change_id.as_bytes().as_slice()])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_history(row)?)),
        None => Ok(None),
    }
}
