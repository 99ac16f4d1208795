use common::model::record::Record;
use common::model::template::Template;

/// Build the positional parameter list for `record` under `template`.
///
/// One entry per active field, in ascending `sequence` order; a field the
/// record has no value for yields `""`. Position `i` always means the same
/// field for every record of the template. Values are matched by field id.
pub fn resolve(record: &Record, template: &Template) -> Vec<String> {
    template
        .ordered_fields()
        .into_iter()
        .map(|field| record.value_for(field.id).unwrap_or_default().to_string())
        .collect()
}
