use log::{info, warn};

use super::builder;
use super::input::RawInput;
use super::TemplateError;
use crate::models::board_template::{BoardTemplate, TemplateDraft, TemplateKind};
use crate::store::Store;

pub const COPY_SUFFIX: &str = " (복사본)";

/// What an update is allowed to write, decided by the template's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateUpdate {
    Activation { is_active: bool },
    Full(TemplateDraft),
}

/// Why a template cannot be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBlock {
    System,
    InUse(i64),
}

impl DeleteBlock {
    pub fn message(&self) -> String {
        match self {
            DeleteBlock::System => "System templates cannot be deleted.".to_string(),
            DeleteBlock::InUse(n) => format!("This template is used by {} board(s).", n),
        }
    }
}

fn check_skin(store: &dyn Store, draft: &TemplateDraft) -> Result<(), TemplateError> {
    if store.skin_find_by_id(draft.skin_id).is_none() {
        return Err(TemplateError::Invalid(vec![
            "The selected skin does not exist.".to_string(),
        ]));
    }
    Ok(())
}

pub fn create(store: &dyn Store, input: &RawInput) -> Result<BoardTemplate, TemplateError> {
    let draft = builder::build_draft(input)?;
    check_skin(store, &draft)?;

    let id = store
        .template_create(&draft, false)
        .map_err(TemplateError::Storage)?;
    info!("Created board template {} ({})", id, draft.name);
    store
        .template_find_by_id(id)
        .ok_or_else(|| TemplateError::Storage(format!("template {} vanished after insert", id)))
}

/// System templates only take `is_active`, everything else in the input is ignored.
pub fn plan_update(template: &BoardTemplate, input: &RawInput) -> Result<TemplateUpdate, TemplateError> {
    match template.kind() {
        TemplateKind::System => Ok(TemplateUpdate::Activation {
            is_active: input.flag("is_active").unwrap_or(template.is_active),
        }),
        TemplateKind::User => builder::build_draft(input).map(TemplateUpdate::Full),
    }
}

pub fn update(store: &dyn Store, template: &BoardTemplate, input: &RawInput) -> Result<(), TemplateError> {
    let result = match plan_update(template, input)? {
        TemplateUpdate::Activation { is_active } => store.template_set_active(template.id, is_active),
        TemplateUpdate::Full(draft) => {
            check_skin(store, &draft)?;
            store.template_update(template.id, &draft)
        }
    };
    result.map_err(|e| {
        warn!("Updating board template {} failed: {}", template.id, e);
        TemplateError::Storage(e)
    })
}

pub fn deletion_block(store: &dyn Store, template: &BoardTemplate) -> Option<DeleteBlock> {
    if template.is_system {
        return Some(DeleteBlock::System);
    }
    match store.template_count_boards(template.id) {
        0 => None,
        n => Some(DeleteBlock::InUse(n)),
    }
}

/// False, with nothing changed, for system templates and templates boards still use.
pub fn delete(store: &dyn Store, template: &BoardTemplate) -> bool {
    if let Some(block) = deletion_block(store, template) {
        info!("Refused to delete board template {}: {:?}", template.id, block);
        return false;
    }
    match store.template_delete(template.id) {
        Ok(removed) => removed,
        Err(e) => {
            warn!("Deleting board template {} failed: {}", template.id, e);
            false
        }
    }
}

/// Copies every field into a new user template named `<name> (복사본)`.
pub fn duplicate(store: &dyn Store, template: &BoardTemplate) -> Result<BoardTemplate, TemplateError> {
    let mut draft = TemplateDraft::from(template);
    draft.name = format!("{}{}", template.name, COPY_SUFFIX);

    let id = store
        .template_create(&draft, false)
        .map_err(TemplateError::Storage)?;
    info!("Duplicated board template {} as {}", template.id, id);
    store
        .template_find_by_id(id)
        .ok_or_else(|| TemplateError::Storage(format!("template {} vanished after insert", id)))
}
