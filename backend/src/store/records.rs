//! Records ("students") and their field values.
//!
//! Values are stored keyed by field id; every read joins them back to the
//! field table so callers get field names.

use super::{batches, Store};
use crate::error::{PipelineError, Result};
use chrono::Utc;
use common::model::record::{DeliveryOutcome, FieldValue, NewRecord, Record};
use common::requests::UpdateRecordRequest;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Text column mapping for `DeliveryOutcome`.
struct Outcome(DeliveryOutcome);

impl ToSql for Outcome {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for Outcome {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map(Outcome)
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Add one record to an existing batch.
pub fn insert(store: &Store, batch_id: i64, new_record: &NewRecord) -> Result<Record> {
    store.with_conn(|conn| {
        batches::load(conn, batch_id)?;
        let tx = conn.transaction()?;
        let id = insert_in(&tx, batch_id, new_record)?;
        tx.commit()?;
        load(conn, id)
    })
}

/// Insert a record and its values using `conn`, typically inside a transaction.
pub(crate) fn insert_in(conn: &Connection, batch_id: i64, new_record: &NewRecord) -> Result<i64> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO records (batch_id, contact, email, outcome, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            batch_id,
            new_record.contact,
            new_record.email,
            Outcome(DeliveryOutcome::Pending),
            now
        ],
    )?;
    let record_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare_cached(
        "INSERT INTO field_values (record_id, field_id, value, created_at) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (field_id, value) in &new_record.values {
        stmt.execute(params![record_id, field_id, value, now])?;
    }
    Ok(record_id)
}

pub fn get(store: &Store, id: i64) -> Result<Record> {
    store.with_conn(|conn| load(conn, id))
}

/// All records of a batch in upload order.
pub fn list_by_batch(store: &Store, batch_id: i64) -> Result<Vec<Record>> {
    store.with_conn(|conn| {
        batches::load(conn, batch_id)?;
        query_batch(conn, batch_id, false)
    })
}

/// Records of a batch whose last outcome is not `Sent`.
pub fn list_failed(store: &Store, batch_id: i64) -> Result<Vec<Record>> {
    store.with_conn(|conn| {
        batches::load(conn, batch_id)?;
        query_batch(conn, batch_id, true)
    })
}

pub fn update(store: &Store, id: i64, req: &UpdateRecordRequest) -> Result<Record> {
    store.with_conn(|conn| {
        let current = load(conn, id)?;
        let contact = req.contact.as_deref().map(str::trim).unwrap_or(&current.contact);
        if contact.is_empty() {
            return Err(PipelineError::InvalidInput("contact must not be empty".to_string()));
        }
        // An empty email clears it; an absent one keeps the stored value.
        let email = match req.email.as_deref().map(str::trim) {
            Some("") => None,
            Some(email) => Some(email),
            None => current.email.as_deref(),
        };

        conn.execute(
            "UPDATE records SET contact = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
            params![contact, email, Utc::now(), id],
        )?;
        load(conn, id)
    })
}

/// Overwrite the delivery outcome and last-modified time of a record.
pub fn set_outcome(store: &Store, id: i64, outcome: DeliveryOutcome) -> Result<Record> {
    store.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE records SET outcome = ?1, updated_at = ?2 WHERE id = ?3",
            params![Outcome(outcome), Utc::now(), id],
        )?;
        if changed == 0 {
            return Err(PipelineError::not_found("record", id));
        }
        load(conn, id)
    })
}

/// Delete a record after its field values.
pub fn delete(store: &Store, id: i64) -> Result<Record> {
    store.with_conn(|conn| {
        let record = load(conn, id)?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM field_values WHERE record_id = ?1", params![id])?;
        tx.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(record)
    })
}

const RECORD_COLUMNS: &str = "id, batch_id, contact, email, outcome, created_at, updated_at";

fn load(conn: &Connection, id: i64) -> Result<Record> {
    let mut record = conn
        .query_row(
            &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
            params![id],
            record_from_row,
        )
        .optional()?
        .ok_or_else(|| PipelineError::not_found("record", id))?;

    record.values = conn
        .prepare(
            "SELECT fv.field_id, f.name, fv.value
             FROM field_values fv JOIN fields f ON f.id = fv.field_id
             WHERE fv.record_id = ?1
             ORDER BY f.sequence, f.id",
        )?
        .query_map(params![id], |row| {
            Ok(FieldValue {
                field_id: row.get(0)?,
                field_name: row.get(1)?,
                value: row.get(2)?,
            })
        })?
        .collect::<Result<_, _>>()?;
    Ok(record)
}

fn query_batch(conn: &Connection, batch_id: i64, only_unsent: bool) -> Result<Vec<Record>> {
    let filter = if only_unsent { "AND outcome <> 'sent'" } else { "" };
    let mut records = conn
        .prepare(&format!(
            "SELECT {} FROM records WHERE batch_id = ?1 {} ORDER BY id",
            RECORD_COLUMNS, filter
        ))?
        .query_map(params![batch_id], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut values: HashMap<i64, Vec<FieldValue>> = HashMap::new();
    let rows = conn
        .prepare(
            "SELECT fv.record_id, fv.field_id, f.name, fv.value
             FROM field_values fv
             JOIN fields f ON f.id = fv.field_id
             JOIN records r ON r.id = fv.record_id
             WHERE r.batch_id = ?1
             ORDER BY fv.record_id, f.sequence, f.id",
        )?
        .query_map(params![batch_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                FieldValue {
                    field_id: row.get(1)?,
                    field_name: row.get(2)?,
                    value: row.get(3)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (record_id, value) in rows {
        values.entry(record_id).or_default().push(value);
    }

    for record in &mut records {
        record.values = values.remove(&record.id).unwrap_or_default();
    }
    Ok(records)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        contact: row.get(2)?,
        email: row.get(3)?,
        outcome: row.get::<_, Outcome>(4)?.0,
        values: Vec::new(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::templates;
    use common::requests::{CreateBatchRequest, CreateTemplateRequest, FieldRequest};

    fn setup() -> (Store, i64, Vec<i64>) {
        let store = Store::open_in_memory().unwrap();
        let template = templates::create(
            &store,
            &CreateTemplateRequest {
                name: "Fees".to_string(),
                channel_template: "fees".to_string(),
                preview_text: None,
                fields: vec![
                    FieldRequest {
                        name: "Amount".to_string(),
                        sequence: 2,
                        active: true,
                    },
                    FieldRequest {
                        name: "Name".to_string(),
                        sequence: 1,
                        active: true,
                    },
                ],
            },
        )
        .unwrap();
        let batch = batches::create_with_records(
            &store,
            &CreateBatchRequest {
                template_id: template.id,
                name: "July".to_string(),
                kind: "Fee reminder".to_string(),
                description: String::new(),
            },
            None,
            &[],
        )
        .unwrap();
        let field_ids = template.fields.iter().map(|f| f.id).collect();
        (store, batch.id, field_ids)
    }

    fn new_record(contact: &str, values: Vec<(i64, &str)>) -> NewRecord {
        NewRecord {
            contact: contact.to_string(),
            email: Some("asha@example.com".to_string()),
            values: values.into_iter().map(|(id, v)| (id, v.to_string())).collect(),
        }
    }

    #[test]
    fn insert_starts_pending_with_named_values() {
        let (store, batch_id, fields) = setup();
        let record = insert(
            &store,
            batch_id,
            &new_record("+911234567890", vec![(fields[0], "500"), (fields[1], "Asha")]),
        )
        .unwrap();

        assert_eq!(record.outcome, DeliveryOutcome::Pending);
        assert_eq!(record.email.as_deref(), Some("asha@example.com"));
        // Values come back in sequence order.
        let names: Vec<&str> = record.values.iter().map(|v| v.field_name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Amount"]);
        assert_eq!(record.value_of("Amount"), Some("500"));
    }

    #[test]
    fn insert_into_missing_batch_fails() {
        let (store, _, _) = setup();
        let err = insert(&store, 404, &new_record("+91", vec![])).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { entity: "batch", id: 404 }));
    }

    #[test]
    fn set_outcome_overwrites_and_filters_failed() {
        let (store, batch_id, fields) = setup();
        let a = insert(&store, batch_id, &new_record("+911", vec![(fields[1], "A")])).unwrap();
        let b = insert(&store, batch_id, &new_record("+912", vec![(fields[1], "B")])).unwrap();
        let c = insert(&store, batch_id, &new_record("+913", vec![(fields[1], "C")])).unwrap();

        set_outcome(&store, a.id, DeliveryOutcome::Sent).unwrap();
        set_outcome(&store, b.id, DeliveryOutcome::Failed).unwrap();

        let unsent: Vec<i64> = list_failed(&store, batch_id).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(unsent, vec![b.id, c.id]);

        let b = set_outcome(&store, b.id, DeliveryOutcome::Sent).unwrap();
        assert_eq!(b.outcome, DeliveryOutcome::Sent);
        assert_eq!(list_failed(&store, batch_id).unwrap().len(), 1);
        assert_eq!(list_by_batch(&store, batch_id).unwrap().len(), 3);
    }

    #[test]
    fn set_outcome_on_missing_record_is_not_found() {
        let (store, _, _) = setup();
        assert!(matches!(
            set_outcome(&store, 9, DeliveryOutcome::Sent),
            Err(PipelineError::NotFound { entity: "record", id: 9 })
        ));
    }

    #[test]
    fn update_and_delete() {
        let (store, batch_id, fields) = setup();
        let record = insert(&store, batch_id, &new_record("+911", vec![(fields[1], "A")])).unwrap();

        let updated = update(
            &store,
            record.id,
            &UpdateRecordRequest {
                contact: Some(" +919999999999 ".to_string()),
                email: None,
            },
        )
        .unwrap();
        assert_eq!(updated.contact, "+919999999999");
        assert_eq!(updated.email, record.email);

        let with_email = update(
            &store,
            record.id,
            &UpdateRecordRequest {
                contact: None,
                email: Some("asha@example.in".to_string()),
            },
        )
        .unwrap();
        assert_eq!(with_email.email.as_deref(), Some("asha@example.in"));
        assert_eq!(with_email.contact, "+919999999999");

        let cleared = update(
            &store,
            record.id,
            &UpdateRecordRequest {
                contact: None,
                email: Some(String::new()),
            },
        )
        .unwrap();
        assert_eq!(cleared.email, None);

        delete(&store, record.id).unwrap();
        assert!(get(&store, record.id).is_err());
        let values: i64 = store
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM field_values", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(values, 0);
    }
}
