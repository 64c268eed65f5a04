//! Turns flat template form input into the structures stored on a template.

use std::collections::HashMap;

use super::input::RawInput;
use super::TemplateError;
use crate::models::board_template::{
    CustomFieldSpec, FieldConfig, FieldSetting, Permission, StandardField, TemplateDraft,
    DEFAULT_LIST_COUNT,
};

/// Form keys and default label for one standard field.
pub struct FieldKeys {
    pub field: StandardField,
    pub enabled_key: &'static str,
    pub required_key: &'static str,
    pub label_key: &'static str,
    pub default_label: &'static str,
}

pub const STANDARD_FIELDS: [FieldKeys; 9] = [
    FieldKeys {
        field: StandardField::Title,
        enabled_key: "field_title_enabled",
        required_key: "field_title_required",
        label_key: "field_title_label",
        default_label: "제목",
    },
    FieldKeys {
        field: StandardField::Content,
        enabled_key: "field_content_enabled",
        required_key: "field_content_required",
        label_key: "field_content_label",
        default_label: "내용",
    },
    FieldKeys {
        field: StandardField::Category,
        enabled_key: "field_category_enabled",
        required_key: "field_category_required",
        label_key: "field_category_label",
        default_label: "카테고리",
    },
    FieldKeys {
        field: StandardField::AuthorName,
        enabled_key: "field_author_name_enabled",
        required_key: "field_author_name_required",
        label_key: "field_author_name_label",
        default_label: "작성자",
    },
    FieldKeys {
        field: StandardField::Password,
        enabled_key: "field_password_enabled",
        required_key: "field_password_required",
        label_key: "field_password_label",
        default_label: "비밀번호",
    },
    FieldKeys {
        field: StandardField::Attachments,
        enabled_key: "field_attachments_enabled",
        required_key: "field_attachments_required",
        label_key: "field_attachments_label",
        default_label: "첨부파일",
    },
    FieldKeys {
        field: StandardField::Thumbnail,
        enabled_key: "field_thumbnail_enabled",
        required_key: "field_thumbnail_required",
        label_key: "field_thumbnail_label",
        default_label: "썸네일",
    },
    FieldKeys {
        field: StandardField::IsSecret,
        enabled_key: "field_is_secret_enabled",
        required_key: "field_is_secret_required",
        label_key: "field_is_secret_label",
        default_label: "비밀글",
    },
    FieldKeys {
        field: StandardField::CreatedAt,
        enabled_key: "field_created_at_enabled",
        required_key: "field_created_at_required",
        label_key: "field_created_at_label",
        default_label: "등록일",
    },
];

pub fn default_label(field: StandardField) -> &'static str {
    STANDARD_FIELDS
        .iter()
        .find(|k| k.field == field)
        .map(|k| k.default_label)
        .unwrap_or("")
}

/// Always yields all nine standard fields; missing keys read as off.
pub fn build_field_config(input: &RawInput) -> FieldConfig {
    let mut config = FieldConfig::default();
    for keys in &STANDARD_FIELDS {
        config.insert(
            keys.field,
            FieldSetting {
                enabled: input.is_set(keys.enabled_key),
                required: input.is_set(keys.required_key),
                label: input
                    .get(keys.label_key)
                    .unwrap_or(keys.default_label)
                    .to_string(),
            },
        );
    }
    config
}

fn non_empty(row: &HashMap<String, String>, key: &str) -> Option<String> {
    row.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Rows lacking a name, label or type are dropped. `None` when nothing is left.
pub fn build_custom_fields_config(input: &RawInput) -> Option<Vec<CustomFieldSpec>> {
    let rows = input.custom_fields()?;

    let specs: Vec<CustomFieldSpec> = rows
        .iter()
        .filter_map(|row| {
            let name = non_empty(row, "name")?;
            let label = non_empty(row, "label")?;
            let field_type = non_empty(row, "type")?;
            Some(CustomFieldSpec {
                name,
                label,
                field_type,
                max_length: non_empty(row, "max_length").and_then(|v| v.parse().ok()),
                required: row
                    .get("required")
                    .map(|v| super::input::truthy(v))
                    .unwrap_or(false),
                options: non_empty(row, "options"),
                placeholder: non_empty(row, "placeholder"),
            })
        })
        .collect();

    if specs.is_empty() {
        None
    } else {
        Some(specs)
    }
}

/// Title and content must both be enabled.
pub fn validate_field_config(config: &FieldConfig) -> bool {
    config.is_enabled(StandardField::Title) && config.is_enabled(StandardField::Content)
}

pub const LIST_COUNT_RANGE: std::ops::RangeInclusive<i64> = 5..=100;

fn permission(input: &RawInput, key: &str, default: Permission, errors: &mut Vec<String>) -> Permission {
    match input.get(key) {
        None => default,
        Some(raw) => Permission::parse(raw).unwrap_or_else(|| {
            errors.push(format!("Invalid value '{}' for {}.", raw, key));
            default
        }),
    }
}

/// Everything a full save needs, with checkbox defaults applied.
/// Collects every problem rather than stopping at the first one.
pub fn build_draft(input: &RawInput) -> Result<TemplateDraft, TemplateError> {
    let mut errors = Vec::new();

    let name = input.get("name").unwrap_or_default().to_string();
    if name.is_empty() {
        errors.push("Template name is required.".to_string());
    }

    let skin_id = match input.get("skin_id").map(str::parse::<i64>) {
        Some(Ok(id)) if id > 0 => id,
        _ => {
            errors.push("A skin must be selected.".to_string());
            0
        }
    };

    let list_count = match input.get("list_count").map(str::parse::<i64>) {
        None => DEFAULT_LIST_COUNT,
        Some(Ok(n)) if LIST_COUNT_RANGE.contains(&n) => n,
        Some(_) => {
            errors.push(format!(
                "Posts per page must be between {} and {}.",
                LIST_COUNT_RANGE.start(),
                LIST_COUNT_RANGE.end()
            ));
            DEFAULT_LIST_COUNT
        }
    };

    let defaults = TemplateDraft::default();
    let permission_read = permission(input, "permission_read", defaults.permission_read, &mut errors);
    let permission_write = permission(input, "permission_write", defaults.permission_write, &mut errors);
    let permission_comment =
        permission(input, "permission_comment", defaults.permission_comment, &mut errors);

    let field_config = build_field_config(input);
    if !validate_field_config(&field_config) {
        errors.push("Title and content fields must be enabled.".to_string());
    }

    if !errors.is_empty() {
        return Err(TemplateError::Invalid(errors));
    }

    Ok(TemplateDraft {
        name,
        description: input.get("description").map(str::to_string),
        skin_id,
        is_active: input.flag("is_active").unwrap_or(true),
        field_config,
        custom_fields_config: build_custom_fields_config(input),
        category_group: input.get("category_group").map(str::to_string),
        enable_notice: input.is_set("enable_notice"),
        enable_sorting: input.is_set("enable_sorting"),
        enable_category: input.is_set("enable_category"),
        list_count,
        permission_read,
        permission_write,
        permission_comment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> RawInput {
        RawInput::new()
            .with("name", "Notices")
            .with("skin_id", "3")
            .with("field_title_enabled", "1")
            .with("field_content_enabled", "1")
    }

    #[test]
    fn field_config_has_all_nine_fields_for_any_input() {
        let inputs = [
            RawInput::new(),
            RawInput::new().with("field_unknown_enabled", "1"),
            valid_input().with("field_thumbnail_required", "1"),
        ];
        for input in &inputs {
            let config = build_field_config(input);
            assert_eq!(config.len(), 9);
            for keys in &STANDARD_FIELDS {
                assert!(config.get(keys.field).is_some());
            }
        }
    }

    #[test]
    fn empty_input_gives_disabled_fields_with_default_labels() {
        let config = build_field_config(&RawInput::new());
        for keys in &STANDARD_FIELDS {
            let setting = config.get(keys.field).unwrap();
            assert!(!setting.enabled);
            assert!(!setting.required);
            assert_eq!(setting.label, keys.default_label);
        }
    }

    #[test]
    fn field_config_reads_enabled_required_and_label() {
        let input = RawInput::new()
            .with("field_author_name_enabled", "1")
            .with("field_author_name_required", "1")
            .with("field_author_name_label", "글쓴이")
            .with("field_password_enabled", "0");
        let config = build_field_config(&input);
        let author = config.get(StandardField::AuthorName).unwrap();
        assert!(author.enabled);
        assert!(author.required);
        assert_eq!(author.label, "글쓴이");
        assert!(!config.is_enabled(StandardField::Password));
        assert_eq!(config.get(StandardField::Password).unwrap().label, "비밀번호");
    }

    #[test]
    fn field_config_serializes_as_name_keyed_object() {
        let config = build_field_config(&valid_input());
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["title"]["enabled"], true);
        assert_eq!(json["is_secret"]["label"], "비밀글");
        assert_eq!(json.as_object().unwrap().len(), 9);
        let back: FieldConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn custom_fields_absent_input_is_none() {
        assert_eq!(build_custom_fields_config(&RawInput::new()), None);
    }

    #[test]
    fn custom_fields_drop_incomplete_rows() {
        let input = RawInput::new()
            .with_custom_field(&[("name", "phone"), ("label", "연락처")])
            .with_custom_field(&[("label", "이메일"), ("type", "email")])
            .with_custom_field(&[("name", "size"), ("label", ""), ("type", "text")]);
        assert_eq!(build_custom_fields_config(&input), None);
    }

    #[test]
    fn custom_fields_keep_order_and_normalize() {
        let input = RawInput::new()
            .with_custom_field(&[
                ("name", "company"),
                ("label", "회사명"),
                ("type", "text"),
                ("max_length", "50"),
                ("required", "1"),
                ("placeholder", "회사명을 입력하세요"),
            ])
            .with_custom_field(&[("name", "broken")])
            .with_custom_field(&[
                ("name", "size"),
                ("label", "규모"),
                ("type", "select"),
                ("options", "small,medium,large"),
            ]);
        let specs = build_custom_fields_config(&input).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "company");
        assert_eq!(specs[0].max_length, Some(50));
        assert!(specs[0].required);
        assert_eq!(specs[0].placeholder.as_deref(), Some("회사명을 입력하세요"));
        assert_eq!(specs[1].name, "size");
        assert!(!specs[1].required);
        assert_eq!(specs[1].max_length, None);
        assert_eq!(specs[1].option_list(), vec!["small", "medium", "large"]);
    }

    #[test]
    fn validate_requires_title_and_content() {
        let both = build_field_config(&valid_input());
        assert!(validate_field_config(&both));

        let only_title = build_field_config(&RawInput::new().with("field_title_enabled", "1"));
        assert!(!validate_field_config(&only_title));

        let only_content = build_field_config(&RawInput::new().with("field_content_enabled", "1"));
        assert!(!validate_field_config(&only_content));

        assert!(!validate_field_config(&build_field_config(&RawInput::new())));
        assert!(!validate_field_config(&FieldConfig::default()));
    }

    #[test]
    fn draft_applies_checkbox_defaults() {
        let draft = build_draft(&valid_input()).unwrap();
        assert_eq!(draft.name, "Notices");
        assert_eq!(draft.skin_id, 3);
        assert!(draft.is_active);
        assert!(!draft.enable_notice);
        assert!(!draft.enable_sorting);
        assert!(!draft.enable_category);
        assert_eq!(draft.list_count, DEFAULT_LIST_COUNT);
        assert_eq!(draft.permission_read, Permission::All);
        assert_eq!(draft.custom_fields_config, None);
    }

    #[test]
    fn draft_collects_all_errors() {
        let input = RawInput::new()
            .with("list_count", "500")
            .with("permission_read", "everyone");
        match build_draft(&input) {
            Err(TemplateError::Invalid(errors)) => {
                assert_eq!(errors.len(), 5, "{:?}", errors);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
