//! CSV exports: the blank upload sheet of a template and record listings.

use super::resolve::resolve;
use crate::error::{PipelineError, Result};
use common::model::record::Record;
use common::model::template::Template;

/// Header-only sheet staff fill in before uploading: the template's active
/// fields in sequence order, then the contact column.
pub fn upload_sheet(template: &Template, contact_column: &str) -> Result<Vec<u8>> {
    let mut header = template.field_names();
    header.push(contact_column.to_string());

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).map_err(encode_error)?;
    writer.into_inner().map_err(|e| PipelineError::Encode(e.to_string()))
}

/// One line per record: id, contact, email, outcome, then the field values in
/// the same order they are sent.
pub fn records_csv(template: &Template, records: &[Record]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "id".to_string(),
        "contact".to_string(),
        "email".to_string(),
        "outcome".to_string(),
    ];
    header.extend(template.field_names());
    writer.write_record(&header).map_err(encode_error)?;

    for record in records {
        let mut line = vec![
            record.id.to_string(),
            record.contact.clone(),
            record.email.clone().unwrap_or_default(),
            record.outcome.to_string(),
        ];
        line.extend(resolve(record, template));
        writer.write_record(&line).map_err(encode_error)?;
    }

    writer.into_inner().map_err(|e| PipelineError::Encode(e.to_string()))
}

fn encode_error(e: csv::Error) -> PipelineError {
    PipelineError::Encode(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::model::record::{DeliveryOutcome, FieldValue};
    use common::model::template::Field;

    fn template() -> Template {
        Template {
            id: 1,
            name: "Welcome".to_string(),
            channel_template: "welcome-template-id".to_string(),
            preview_text: None,
            fields: vec![
                Field {
                    id: 2,
                    template_id: 1,
                    name: "Amount".to_string(),
                    sequence: 2,
                    active: true,
                },
                Field {
                    id: 1,
                    template_id: 1,
                    name: "Name".to_string(),
                    sequence: 1,
                    active: true,
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upload_sheet_lists_fields_then_contact() {
        let sheet = upload_sheet(&template(), "WhatsApp No.").unwrap();
        assert_eq!(String::from_utf8(sheet).unwrap(), "Name,Amount,WhatsApp No.\n");
    }

    #[test]
    fn records_csv_uses_send_order() {
        let record = Record {
            id: 7,
            batch_id: 1,
            contact: "+911234567890".to_string(),
            email: None,
            outcome: DeliveryOutcome::Failed,
            values: vec![FieldValue {
                field_id: 1,
                field_name: "Name".to_string(),
                value: "Asha, R".to_string(),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let csv = String::from_utf8(records_csv(&template(), &[record]).unwrap()).unwrap();
        assert_eq!(
            csv,
            "id,contact,email,outcome,Name,Amount\n7,+911234567890,,failed,\"Asha, R\",\n"
        );
    }
}
