use std::collections::BTreeMap;

use super::input::RawInput;
use crate::models::board_post::BoardPostForm;
use crate::models::board_template::{BoardTemplate, StandardField};

fn label(template: &BoardTemplate, field: StandardField) -> String {
    template
        .field_config
        .get(field)
        .map(|s| s.label.clone())
        .unwrap_or_else(|| super::builder::default_label(field).to_string())
}

/// Build a post for `board_id` from form input, honouring what the board's
/// template enables and requires. Custom values arrive as `custom[<name>]`.
/// Disabled fields are dropped rather than rejected.
pub fn prepare_post(
    template: &BoardTemplate,
    board_id: i64,
    input: &RawInput,
) -> Result<BoardPostForm, Vec<String>> {
    let config = &template.field_config;
    let mut errors = Vec::new();

    // Title and content are always collected
    let title = input.get("title").unwrap_or_default().to_string();
    if title.is_empty() {
        errors.push(format!("{} is required.", label(template, StandardField::Title)));
    }
    let content = input.get("content").unwrap_or_default().to_string();
    if content.is_empty() {
        errors.push(format!("{} is required.", label(template, StandardField::Content)));
    }

    let author_name = if config.is_enabled(StandardField::AuthorName) {
        let value = input.get("author_name").map(str::to_string);
        if value.is_none() && config.is_required(StandardField::AuthorName) {
            errors.push(format!("{} is required.", label(template, StandardField::AuthorName)));
        }
        value
    } else {
        None
    };

    let is_secret = config.is_enabled(StandardField::IsSecret) && input.is_set("is_secret");
    let is_notice = template.enable_notice && input.is_set("is_notice");

    let mut custom_fields = BTreeMap::new();
    for spec in template.custom_fields_config.iter().flatten() {
        let key = format!("custom[{}]", spec.name);
        let value = match input.get(&key) {
            Some(v) => v,
            None => {
                if spec.required {
                    errors.push(format!("{} is required.", spec.label));
                }
                continue;
            }
        };
        if let Some(max) = spec.max_length {
            if value.chars().count() > max as usize {
                errors.push(format!("{} must be at most {} characters.", spec.label, max));
                continue;
            }
        }
        let options = spec.option_list();
        if !options.is_empty() && !options.contains(&value) {
            errors.push(format!("{} has an invalid choice.", spec.label));
            continue;
        }
        custom_fields.insert(spec.name.clone(), value.to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(BoardPostForm {
        board_id,
        title,
        content,
        author_name,
        is_notice,
        is_secret,
        custom_fields,
    })
}
