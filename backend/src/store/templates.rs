//! # Template Registry
//!
//! Templates ("alerts") and their fields. A template's active fields define
//! both the columns an upload must carry and the positional parameters sent
//! to the messaging channel, so the registry guards the one invariant the
//! resolver relies on: no two active fields of a template share a sequence.

use super::{constraint_as_invalid, Store};
use crate::error::{PipelineError, Result};
use chrono::Utc;
use common::model::template::{Field, Template};
use common::requests::{
    CreateTemplateRequest, FieldRequest, UpdateFieldRequest, UpdateTemplateRequest,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub fn create(store: &Store, req: &CreateTemplateRequest) -> Result<Template> {
    require_non_empty("template name", &req.name)?;
    require_non_empty("channel template", &req.channel_template)?;
    for field in &req.fields {
        require_non_empty("field name", &field.name)?;
    }
    check_unique_sequences(req.fields.iter().filter(|f| f.active).map(|f| f.sequence))?;

    store.with_conn(|conn| {
        let tx = conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO templates (name, channel_template, preview_text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![req.name.trim(), req.channel_template.trim(), req.preview_text, now],
        )
        .map_err(|e| constraint_as_invalid(e, "template name and channel template must be unique"))?;
        let template_id = tx.last_insert_rowid();

        for field in &req.fields {
            insert_field(&tx, template_id, field)?;
        }
        let template = load(&tx, template_id)?;
        tx.commit()?;
        Ok(template)
    })
}

pub fn get(store: &Store, id: i64) -> Result<Template> {
    store.with_conn(|conn| load(conn, id))
}

pub fn find_by_name(store: &Store, name: &str) -> Result<Option<Template>> {
    store.with_conn(|conn| {
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM templates WHERE name = ?1",
                params![name.trim()],
                |row| row.get(0),
            )
            .optional()?;
        id.map(|id| load(conn, id)).transpose()
    })
}

pub fn list(store: &Store) -> Result<Vec<Template>> {
    store.with_conn(|conn| {
        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM templates ORDER BY name")?
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        ids.into_iter().map(|id| load(conn, id)).collect()
    })
}

pub fn update(store: &Store, id: i64, req: &UpdateTemplateRequest) -> Result<Template> {
    if let Some(name) = &req.name {
        require_non_empty("template name", name)?;
    }
    if let Some(channel_template) = &req.channel_template {
        require_non_empty("channel template", channel_template)?;
    }

    store.with_conn(|conn| {
        let current = load(conn, id)?;
        let name = req.name.as_deref().map(str::trim).unwrap_or(&current.name);
        let channel_template = req
            .channel_template
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.channel_template);
        let preview_text = req.preview_text.as_ref().or(current.preview_text.as_ref());

        conn.execute(
            "UPDATE templates SET name = ?1, channel_template = ?2, preview_text = ?3, updated_at = ?4
             WHERE id = ?5",
            params![name, channel_template, preview_text, Utc::now(), id],
        )
        .map_err(|e| constraint_as_invalid(e, "template name and channel template must be unique"))?;
        load(conn, id)
    })
}

/// Delete a template and its fields. Refused while any batch uses it.
pub fn delete(store: &Store, id: i64) -> Result<Template> {
    store.with_conn(|conn| {
        let template = load(conn, id)?;
        let batches: i64 = conn.query_row(
            "SELECT COUNT(*) FROM batches WHERE template_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if batches > 0 {
            return Err(PipelineError::InvalidInput(format!(
                "template '{}' is used by {} batch(es)",
                template.name, batches
            )));
        }

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM fields WHERE template_id = ?1", params![id])?;
        tx.execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(template)
    })
}

pub fn add_field(store: &Store, template_id: i64, req: &FieldRequest) -> Result<Field> {
    require_non_empty("field name", &req.name)?;
    store.with_conn(|conn| {
        let template = load(conn, template_id)?;
        if req.active {
            check_sequence_free(&template, req.sequence, None)?;
        }
        let field_id = insert_field(conn, template_id, req)?;
        load_field(conn, field_id)
    })
}

pub fn update_field(store: &Store, field_id: i64, req: &UpdateFieldRequest) -> Result<Field> {
    if let Some(name) = &req.name {
        require_non_empty("field name", name)?;
    }
    store.with_conn(|conn| {
        let current = load_field(conn, field_id)?;
        let name = req.name.as_deref().map(str::trim).unwrap_or(&current.name);
        let sequence = req.sequence.unwrap_or(current.sequence);
        let active = req.active.unwrap_or(current.active);

        if active {
            let template = load(conn, current.template_id)?;
            check_sequence_free(&template, sequence, Some(field_id))?;
        }

        conn.execute(
            "UPDATE fields SET name = ?1, sequence = ?2, active = ?3, updated_at = ?4 WHERE id = ?5",
            params![name, sequence, active, Utc::now(), field_id],
        )?;
        load_field(conn, field_id)
    })
}

/// Delete a field together with every value stored for it.
pub fn delete_field(store: &Store, field_id: i64) -> Result<Field> {
    store.with_conn(|conn| {
        let field = load_field(conn, field_id)?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM field_values WHERE field_id = ?1", params![field_id])?;
        tx.execute("DELETE FROM fields WHERE id = ?1", params![field_id])?;
        tx.commit()?;
        Ok(field)
    })
}

/// Load a template with all of its fields, in fetch (insertion) order.
pub(crate) fn load(conn: &Connection, id: i64) -> Result<Template> {
    let template = conn
        .query_row(
            "SELECT id, name, channel_template, preview_text, created_at, updated_at
             FROM templates WHERE id = ?1",
            params![id],
            |row| {
                Ok(Template {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    channel_template: row.get(2)?,
                    preview_text: row.get(3)?,
                    fields: Vec::new(),
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| PipelineError::not_found("template", id))?;

    let fields = conn
        .prepare(
            "SELECT id, template_id, name, sequence, active FROM fields
             WHERE template_id = ?1 ORDER BY id",
        )?
        .query_map(params![id], field_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Template { fields, ..template })
}

fn load_field(conn: &Connection, field_id: i64) -> Result<Field> {
    conn.query_row(
        "SELECT id, template_id, name, sequence, active FROM fields WHERE id = ?1",
        params![field_id],
        field_from_row,
    )
    .optional()?
    .ok_or_else(|| PipelineError::not_found("field", field_id))
}

fn field_from_row(row: &Row<'_>) -> rusqlite::Result<Field> {
    Ok(Field {
        id: row.get(0)?,
        template_id: row.get(1)?,
        name: row.get(2)?,
        sequence: row.get(3)?,
        active: row.get(4)?,
    })
}

fn insert_field(conn: &Connection, template_id: i64, field: &FieldRequest) -> Result<i64> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO fields (template_id, name, sequence, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![template_id, field.name.trim(), field.sequence, field.active, now],
    )?;
    Ok(conn.last_insert_rowid())
}

fn check_sequence_free(template: &Template, sequence: i32, except: Option<i64>) -> Result<()> {
    let taken = template
        .fields
        .iter()
        .filter(|f| f.active && Some(f.id) != except)
        .find(|f| f.sequence == sequence);
    match taken {
        Some(f) => Err(PipelineError::InvalidInput(format!(
            "sequence {} is already used by field '{}'",
            sequence, f.name
        ))),
        None => Ok(()),
    }
}

fn check_unique_sequences(sequences: impl Iterator<Item = i32>) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for sequence in sequences {
        if !seen.insert(sequence) {
            return Err(PipelineError::InvalidInput(format!(
                "sequence {} is used by more than one active field",
                sequence
            )));
        }
    }
    Ok(())
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(())
}
