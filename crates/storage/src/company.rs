use rusqlite::{Connection, Row, params};
use tracing::debug;

use wellops_core::{clock::Timestamp, ids::CompanyId, proposal::CompanyInput};

use crate::error::StorageError;
use crate::sqlite::to_array;
use crate::traits::CompanyRecord;

fn read_company(row: &Row) -> Result<CompanyRecord, StorageError> {
    let id_bytes: Vec<u8> = row.get(0)?;
    Ok(CompanyRecord {
        company_id: CompanyId::from_bytes(to_array::<16>(id_bytes, "company_id")?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
    })
}

/// Case-insensitive exact name lookup (the column collates NOCASE).
pub fn find_company_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<CompanyRecord>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT company_id, name, email, phone, address FROM companies WHERE name = ?1",
    )?;
    let mut rows = stmt.query(params![name.trim()])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_company(row)?)),
        None => Ok(None),
    }
}

pub fn get_company(
    conn: &Connection,
    company_id: CompanyId,
) -> Result<Option<CompanyRecord>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT company_id, name, email, phone, address FROM companies WHERE company_id = ?1",
    )?;
    let mut rows = stmt.query(params![company_id.as_bytes().as_slice()])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_company(row)?)),
        None => Ok(None),
    }
}

pub fn company_count(conn: &Connection) -> Result<u64, StorageError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Resolve the company a proposal references, creating it on first use.
///
/// Returns `None` when no company (or a blank name) is given. An existing
/// row is returned untouched: contact details from later proposals never
/// overwrite the first ones. The insert ignores a name conflict and
/// reselects, so two writers racing on a new name still end up sharing
/// one row.
pub fn ensure_company(
    conn: &Connection,
    input: Option<&CompanyInput>,
    now: Timestamp,
) -> Result<Option<CompanyId>, StorageError> {
    let Some(input) = input else {
        return Ok(None);
    };
    let Some(name) = input.resolved_name() else {
        return Ok(None);
    };

    if let Some(existing) = find_company_by_name(conn, name)? {
        return Ok(Some(existing.company_id));
    }

    let company_id = CompanyId::new();
    let inserted = conn
        .execute(
            "INSERT INTO companies (company_id, name, email, phone, address, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO NOTHING",
            params![
                company_id.as_bytes().as_slice(),
                name,
                input.email,
                input.phone,
                input.address,
                now.as_millis(),
            ],
        )
        .map_err(|e| StorageError::from_write(e, "insert company"))?;

    if inserted == 1 {
        debug!(%company_id, company = name, "created company");
        return Ok(Some(company_id));
    }

    find_company_by_name(conn, name)?
        .map(|c| Some(c.company_id))
        .ok_or_else(|| StorageError::NotFound(format!("company {name}")))
}
