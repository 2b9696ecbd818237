//! Field-level merge of proposal payloads into well rows.

use wellops_core::{clock::Timestamp, ids::*, proposal::WellFields};
use wellops_storage::WellRecord;

/// Incoming value when present, stored value otherwise.
fn coalesce_field<T: Clone>(incoming: &Option<T>, stored: &Option<T>) -> Option<T> {
    incoming.as_ref().or(stored.as_ref()).cloned()
}

/// Build the row for a newly created well. Absent fields stay NULL.
pub fn new_well(
    well_id: WellId,
    fields: &WellFields,
    company_id: Option<CompanyId>,
    now: Timestamp,
) -> WellRecord {
    WellRecord {
        well_id,
        api: fields.api_code().map(str::to_string),
        company_id,
        company_man_name: fields.company_man_name.clone(),
        company_man_number: fields.company_man_number.clone(),
        company_man_email: fields.company_man_email.clone(),
        company_man_cell: fields.company_man_cell.clone(),
        previous_anchor_company: fields.previous_anchor_company.clone(),
        last_test_date: fields.last_test_date,
        updated_at: now,
    }
}

/// Merge an update payload over the stored row. Every mutable field takes
/// the payload value if present and keeps the stored one otherwise; the
/// identity never changes and `updated_at` is refreshed.
pub fn coalesce(
    current: &WellRecord,
    fields: &WellFields,
    company_id: Option<CompanyId>,
    now: Timestamp,
) -> WellRecord {
    WellRecord {
        well_id: current.well_id,
        api: fields
            .api_code()
            .map(str::to_string)
            .or_else(|| current.api.clone()),
        company_id: company_id.or(current.company_id),
        company_man_name: coalesce_field(&fields.company_man_name, &current.company_man_name),
        company_man_number: coalesce_field(&fields.company_man_number, &current.company_man_number),
        company_man_email: coalesce_field(&fields.company_man_email, &current.company_man_email),
        company_man_cell: coalesce_field(&fields.company_man_cell, &current.company_man_cell),
        previous_anchor_company: coalesce_field(
            &fields.previous_anchor_company,
            &current.previous_anchor_company,
        ),
        last_test_date: fields.last_test_date.or(current.last_test_date),
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn stored() -> WellRecord {
        WellRecord {
            well_id: WellId::new(),
            api: Some("30-015-12345".into()),
            company_id: Some(CompanyId::new()),
            company_man_name: Some("R. Ortiz".into()),
            company_man_number: Some("575-555-0101".into()),
            company_man_email: None,
            company_man_cell: Some("575-555-0199".into()),
            previous_anchor_company: Some("Permian Anchor".into()),
            last_test_date: date(2023, 6, 1),
            updated_at: Timestamp::from_millis(10),
        }
    }

    #[test]
    fn absent_fields_keep_stored_values() {
        let current = stored();
        let merged = coalesce(&current, &WellFields::default(), None, Timestamp::from_millis(20));
        assert_eq!(merged.api, current.api);
        assert_eq!(merged.company_id, current.company_id);
        assert_eq!(merged.company_man_name, current.company_man_name);
        assert_eq!(merged.last_test_date, current.last_test_date);
        assert_eq!(merged.updated_at, Timestamp::from_millis(20));
    }

    #[test]
    fn present_fields_overwrite() {
        let current = stored();
        let company_id = CompanyId::new();
        let fields = WellFields {
            company_man_email: Some("ortiz@ops.test".into()),
            last_test_date: date(2024, 2, 29),
            ..WellFields::default()
        };
        let merged = coalesce(&current, &fields, Some(company_id), Timestamp::from_millis(20));
        assert_eq!(merged.company_man_email.as_deref(), Some("ortiz@ops.test"));
        assert_eq!(merged.last_test_date, date(2024, 2, 29));
        assert_eq!(merged.company_id, Some(company_id));
        assert_eq!(merged.company_man_cell, current.company_man_cell);
        assert_eq!(merged.well_id, current.well_id);
    }

    #[test]
    fn new_well_leaves_absent_fields_null() {
        let fields = WellFields {
            api: Some("30-000-11111".into()),
            ..WellFields::default()
        };
        let well_id = WellId::new();
        let record = new_well(well_id, &fields, None, Timestamp::from_millis(5));
        assert_eq!(record.well_id, well_id);
        assert_eq!(record.api.as_deref(), Some("30-000-11111"));
        assert_eq!(record.company_man_name, None);
        assert_eq!(record.last_test_date, None);
    }

    #[test]
    fn api_is_stored_trimmed() {
        let padded = WellFields {
            api: Some(" 30-015-12345 ".into()),
            ..WellFields::default()
        };
        let record = new_well(WellId::new(), &padded, None, Timestamp::from_millis(5));
        assert_eq!(record.api.as_deref(), Some("30-015-12345"));

        let current = stored();
        let merged = coalesce(&current, &padded, None, Timestamp::from_millis(20));
        assert_eq!(merged.api, current.api);

        let blank = WellFields {
            api: Some("   ".into()),
            ..WellFields::default()
        };
        let merged = coalesce(&current, &blank, None, Timestamp::from_millis(20));
        assert_eq!(merged.api, current.api);
    }
}
