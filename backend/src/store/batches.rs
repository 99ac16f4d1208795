//! Batches ("events") and the records uploaded with them.

use super::{records, templates, Store};
use crate::error::{PipelineError, Result};
use chrono::Utc;
use common::model::batch::{Batch, BatchSummary};
use common::model::record::NewRecord;
use common::requests::{CreateBatchRequest, UpdateBatchRequest};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Create a batch and all of its records in one transaction.
///
/// Either the batch is stored with every record and field value, or nothing
/// is written.
pub fn create_with_records(
    store: &Store,
    req: &CreateBatchRequest,
    source_md5: Option<&str>,
    new_records: &[NewRecord],
) -> Result<Batch> {
    if req.name.trim().is_empty() {
        return Err(PipelineError::InvalidInput("batch name must not be empty".to_string()));
    }

    store.with_conn(|conn| {
        // Fails with NotFound before anything is written.
        templates::load(conn, req.template_id)?;

        let tx = conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO batches (template_id, name, kind, description, source_md5, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                req.template_id,
                req.name.trim(),
                req.kind.trim(),
                req.description,
                source_md5,
                now
            ],
        )?;
        let batch_id = tx.last_insert_rowid();

        for record in new_records {
            records::insert_in(&tx, batch_id, record)?;
        }

        let batch = load(&tx, batch_id)?;
        tx.commit()?;
        Ok(batch)
    })
}

pub fn get(store: &Store, id: i64) -> Result<Batch> {
    store.with_conn(|conn| load(conn, id))
}

pub fn summary(store: &Store, id: i64) -> Result<BatchSummary> {
    store.with_conn(|conn| {
        let batch = load(conn, id)?;
        summarize(conn, batch)
    })
}

/// Batch summaries, newest first, optionally restricted to one template.
pub fn list(store: &Store, template_id: Option<i64>) -> Result<Vec<BatchSummary>> {
    store.with_conn(|conn| {
        let batches = conn
            .prepare(
                "SELECT id, template_id, name, kind, description, source_md5, created_at, updated_at
                 FROM batches WHERE ?1 IS NULL OR template_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?
            .query_map(params![template_id], batch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        batches.into_iter().map(|b| summarize(conn, b)).collect()
    })
}

pub fn update(store: &Store, id: i64, req: &UpdateBatchRequest) -> Result<Batch> {
    store.with_conn(|conn| {
        let current = load(conn, id)?;
        let name = req.name.as_deref().map(str::trim).unwrap_or(&current.name);
        if name.is_empty() {
            return Err(PipelineError::InvalidInput("batch name must not be empty".to_string()));
        }
        let kind = req.kind.as_deref().map(str::trim).unwrap_or(&current.kind);
        let description = req.description.as_deref().unwrap_or(&current.description);

        conn.execute(
            "UPDATE batches SET name = ?1, kind = ?2, description = ?3, updated_at = ?4 WHERE id = ?5",
            params![name, kind, description, Utc::now(), id],
        )?;
        load(conn, id)
    })
}

/// Delete a batch top-down: field values, then records, then the batch row.
pub fn delete(store: &Store, id: i64) -> Result<Batch> {
    store.with_conn(|conn| {
        let batch = load(conn, id)?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM field_values
             WHERE record_id IN (SELECT id FROM records WHERE batch_id = ?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM records WHERE batch_id = ?1", params![id])?;
        tx.execute("DELETE FROM batches WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(batch)
    })
}

pub(crate) fn load(conn: &Connection, id: i64) -> Result<Batch> {
    conn.query_row(
        "SELECT id, template_id, name, kind, description, source_md5, created_at, updated_at
         FROM batches WHERE id = ?1",
        params![id],
        batch_from_row,
    )
    .optional()?
    .ok_or_else(|| PipelineError::not_found("batch", id))
}

fn summarize(conn: &Connection, batch: Batch) -> Result<BatchSummary> {
    let (total, sent): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(outcome = 'sent'), 0) FROM records WHERE batch_id = ?1",
        params![batch.id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let template_name: String = conn
        .query_row(
            "SELECT name FROM templates WHERE id = ?1",
            params![batch.template_id],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or_default();

    Ok(BatchSummary {
        batch,
        template_name,
        total_records: total as u64,
        failed_records: (total - sent) as u64,
    })
}

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<Batch> {
    Ok(Batch {
        id: row.get(0)?,
        template_id: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        description: row.get(4)?,
        source_md5: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::record::DeliveryOutcome;
    use common::requests::{CreateTemplateRequest, FieldRequest};

    fn setup() -> (Store, i64, Vec<i64>) {
        let store = Store::open_in_memory().unwrap();
        let template = templates::create(
            &store,
            &CreateTemplateRequest {
                name: "Welcome".to_string(),
                channel_template: "welcome-template-id".to_string(),
                preview_text: None,
                fields: vec![
                    FieldRequest {
                        name: "Name".to_string(),
                        sequence: 1,
                        active: true,
                    },
                    FieldRequest {
                        name: "Amount".to_string(),
                        sequence: 2,
                        active: true,
                    },
                ],
            },
        )
        .unwrap();
        let field_ids = template.fields.iter().map(|f| f.id).collect();
        (store, template.id, field_ids)
    }

    fn request(template_id: i64, name: &str) -> CreateBatchRequest {
        CreateBatchRequest {
            template_id,
            name: name.to_string(),
            kind: "Admission".to_string(),
            description: "June intake".to_string(),
        }
    }

    fn student(contact: &str, values: Vec<(i64, &str)>) -> NewRecord {
        NewRecord {
            contact: contact.to_string(),
            email: None,
            values: values.into_iter().map(|(id, v)| (id, v.to_string())).collect(),
        }
    }

    fn count(store: &Store, table: &str) -> i64 {
        store
            .with_conn(|c| {
                Ok(c.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
            })
            .unwrap()
    }

    #[test]
    fn create_with_records_writes_everything() {
        let (store, template_id, fields) = setup();
        let batch = create_with_records(
            &store,
            &request(template_id, "June"),
            Some("abc"),
            &[
                student("+911111111111", vec![(fields[0], "Asha"), (fields[1], "")]),
                student("+912222222222", vec![(fields[0], "Ravi")]),
            ],
        )
        .unwrap();

        assert_eq!(batch.source_md5.as_deref(), Some("abc"));
        assert_eq!(count(&store, "records"), 2);
        assert_eq!(count(&store, "field_values"), 3);

        let summary = summary(&store, batch.id).unwrap();
        assert_eq!(summary.template_name, "Welcome");
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.failed_records, 2);
    }

    #[test]
    fn unknown_template_writes_nothing() {
        let (store, _, _) = setup();
        let err = create_with_records(&store, &request(999, "Ghost"), None, &[]).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { entity: "template", id: 999 }));
        assert_eq!(count(&store, "batches"), 0);
    }

    #[test]
    fn summary_counts_sent_records() {
        let (store, template_id, fields) = setup();
        let batch = create_with_records(
            &store,
            &request(template_id, "June"),
            None,
            &[
                student("+911111111111", vec![(fields[0], "Asha")]),
                student("+912222222222", vec![(fields[0], "Ravi")]),
            ],
        )
        .unwrap();
        let stored = records::list_by_batch(&store, batch.id).unwrap();
        records::set_outcome(&store, stored[0].id, DeliveryOutcome::Sent).unwrap();

        let summaries = list(&store, Some(template_id)).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_records, 2);
        assert_eq!(summaries[0].failed_records, 1);
        assert!(list(&store, Some(template_id + 1)).unwrap().is_empty());
    }

    #[test]
    fn list_returns_newest_first() {
        let (store, template_id, _) = setup();
        let first = create_with_records(&store, &request(template_id, "First"), None, &[]).unwrap();
        let second = create_with_records(&store, &request(template_id, "Second"), None, &[]).unwrap();

        let ids: Vec<i64> = list(&store, None).unwrap().iter().map(|s| s.batch.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn update_changes_only_given_members() {
        let (store, template_id, _) = setup();
        let batch = create_with_records(&store, &request(template_id, "June"), None, &[]).unwrap();

        let updated = update(
            &store,
            batch.id,
            &UpdateBatchRequest {
                description: Some("Re-run".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.name, "June");
        assert_eq!(updated.kind, "Admission");
        assert_eq!(updated.description, "Re-run");
    }

    #[test]
    fn delete_leaves_no_orphans() {
        let (store, template_id, fields) = setup();
        let keep = create_with_records(
            &store,
            &request(template_id, "Keep"),
            None,
            &[student("+913333333333", vec![(fields[0], "Meera")])],
        )
        .unwrap();
        let gone = create_with_records(
            &store,
            &request(template_id, "Gone"),
            None,
            &[
                student("+911111111111", vec![(fields[0], "Asha"), (fields[1], "10")]),
                student("+912222222222", vec![(fields[0], "Ravi")]),
            ],
        )
        .unwrap();

        delete(&store, gone.id).unwrap();

        assert!(matches!(get(&store, gone.id), Err(PipelineError::NotFound { .. })));
        assert_eq!(count(&store, "records"), 1);
        assert_eq!(count(&store, "field_values"), 1);
        assert_eq!(records::list_by_batch(&store, keep.id).unwrap().len(), 1);
    }
}
