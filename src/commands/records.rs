use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, Context, parse_assignments, read_file_parts};
use crate::autofill::PublicAutofill;
use crate::cli::{FieldArgs, OutputOptions};
use crate::display::{format_list, format_record, format_toast, format_validation_errors};
use crate::entity::{Record, RecordId};
use crate::error::{BackofficeError, Result};
use crate::form::{DrawerFormController, FormMode};
use crate::list::{ListController, ListOptions, ListQuery};
use crate::resource::ResourceClient;
use crate::schema::{COLLECTIONS, Collection, FieldKind};

fn list_controller(ctx: &Context, collection: &'static Collection) -> ListController<Record> {
    let client = ResourceClient::new(ctx.transport.clone(), collection);
    ListController::new(
        client,
        ListOptions {
            per_page: ctx.config.per_page(),
            search_debounce: ctx.config.search_debounce(),
            ..ListOptions::default()
        },
    )
}

/// List one page of a collection
pub async fn cmd_ls(
    collection: &str,
    page: u32,
    per_page: Option<u32>,
    search: Option<&str>,
    offline: bool,
    output: OutputOptions,
) -> Result<()> {
    let collection = Collection::by_name(collection)?;
    let ctx = Context::new(offline)?;
    let list = list_controller(&ctx, collection);

    list.load_query(ListQuery {
        page,
        per_page: per_page.unwrap_or_else(|| ctx.config.per_page()),
        search: search.unwrap_or_default().trim().to_string(),
    })
    .await?;

    let state = list.snapshot();
    let json_output = match &state.page {
        Some(page) => json!({
            "collection": collection.name,
            "items": page.items,
            "current_page": page.current_page,
            "last_page": page.last_page,
            "per_page": page.per_page,
            "total": page.total,
        }),
        None => json!({ "collection": collection.name, "items": [] }),
    };

    CommandOutput::new(json_output)
        .with_text(format_list(collection, &state))
        .print(output)
}

/// Show a single record
pub async fn cmd_show(collection: &str, id: &str, offline: bool, output: OutputOptions) -> Result<()> {
    let collection = Collection::by_name(collection)?;
    let ctx = Context::new(offline)?;
    let client = ResourceClient::<Record>::new(ctx.transport.clone(), collection);
    let record = client.get(&RecordId::new(id)).await?;

    CommandOutput::new(serde_json::to_value(&record)?)
        .with_text(format_record(collection, &record))
        .print(output)
}

/// Fill the draft from command-line arguments, then submit it.
async fn fill_and_submit(
    ctx: &Context,
    form: &DrawerFormController<Record>,
    fields: &FieldArgs,
) -> Result<Record> {
    let collection = form.collection();
    for (name, value) in parse_assignments(collection, &fields.set)? {
        form.set_field(&name, value)?;
    }
    for part in read_file_parts(&fields.files).await? {
        form.attach_file(part)?;
    }

    if fields.autofill {
        let pincode_field = collection
            .fields
            .iter()
            .find(|f| f.kind == FieldKind::Pincode)
            .ok_or_else(|| {
                BackofficeError::InvalidInput(format!(
                    "{} has no postal code field to autofill from",
                    collection.name
                ))
            })?;
        let autofill = PublicAutofill::new(
            ctx.config.postal_api(),
            ctx.config.geocoder(),
            ctx.config.timeout(),
        )?;
        if !form.autofill_pincode(pincode_field.name, &autofill).await? {
            eprintln!("{}", "Address autofill found nothing; fields left as given".yellow());
        }
    }

    let mut toasts = form_toasts(form);
    let result = form.submit().await;
    while let Ok(toast) = toasts.try_recv() {
        eprintln!("{}", format_toast(&toast));
    }

    match result {
        Err(BackofficeError::Validation(errors)) => {
            eprint!("{}", format_validation_errors(&errors));
            Err(BackofficeError::Validation(errors))
        }
        other => other,
    }
}

fn form_toasts(
    form: &DrawerFormController<Record>,
) -> tokio::sync::broadcast::Receiver<crate::notify::Toast> {
    form.list().notifier().subscribe()
}

/// Create a record through the form controller
pub async fn cmd_create(
    collection: &str,
    fields: &FieldArgs,
    offline: bool,
    output: OutputOptions,
) -> Result<()> {
    let collection = Collection::by_name(collection)?;
    let ctx = Context::new(offline)?;
    let form = DrawerFormController::new(list_controller(&ctx, collection));
    form.open(FormMode::Create, None)?;

    let record = fill_and_submit(&ctx, &form, fields).await?;

    CommandOutput::new(json!({
        "action": "created",
        "collection": collection.name,
        "record": record,
    }))
    .with_text(format!(
        "Created {} {}",
        collection.entity_key,
        record.id.to_string().cyan()
    ))
    .print(output)
}

/// Update a record through the form controller
pub async fn cmd_update(
    collection: &str,
    id: &str,
    fields: &FieldArgs,
    offline: bool,
    output: OutputOptions,
) -> Result<()> {
    let collection = Collection::by_name(collection)?;
    if fields.set.is_empty() && fields.files.is_empty() && !fields.autofill {
        return Err(BackofficeError::InvalidInput(
            "nothing to update. Pass --set NAME=VALUE or --file NAME=PATH".to_string(),
        ));
    }
    let ctx = Context::new(offline)?;
    let list = list_controller(&ctx, collection);
    let current = list.client().get(&RecordId::new(id)).await?;

    let form = DrawerFormController::new(list);
    form.open(FormMode::Edit, Some(&current))?;
    let record = fill_and_submit(&ctx, &form, fields).await?;

    CommandOutput::new(json!({
        "action": "updated",
        "collection": collection.name,
        "record": record,
    }))
    .with_text(format!(
        "Updated {} {}",
        collection.entity_key,
        record.id.to_string().cyan()
    ))
    .print(output)
}

/// Delete a record
pub async fn cmd_rm(collection: &str, id: &str, offline: bool, output: OutputOptions) -> Result<()> {
    let collection = Collection::by_name(collection)?;
    let ctx = Context::new(offline)?;
    let list = list_controller(&ctx, collection);
    let id = RecordId::new(id);
    list.delete(&id).await?;

    CommandOutput::new(json!({
        "action": "deleted",
        "collection": collection.name,
        "id": id,
    }))
    .with_text(format!("Deleted {} {}", collection.entity_key, id.to_string().cyan()))
    .print(output)
}

fn kind_label(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text { max_len } => format!("text (max {max_len})"),
        FieldKind::Email => "email".to_string(),
        FieldKind::Phone => "phone (10 digits)".to_string(),
        FieldKind::Pincode => "postal code (6 digits)".to_string(),
        FieldKind::Decimal => "decimal".to_string(),
        FieldKind::Integer => "integer".to_string(),
        FieldKind::Boolean => "boolean".to_string(),
        FieldKind::Choice(values) => format!("one of {}", values.join("|")),
        FieldKind::Reference(target) => format!("{target} id"),
        FieldKind::Image => "image file".to_string(),
        FieldKind::Latitude => "latitude".to_string(),
        FieldKind::Longitude => "longitude".to_string(),
    }
}

/// List collections, or the fields of one
pub fn cmd_collections(name: Option<&str>, output: OutputOptions) -> Result<()> {
    match name {
        None => {
            let json_output = json!(
                COLLECTIONS
                    .iter()
                    .map(|c| json!({ "name": c.name, "path": c.path, "fields": c.fields.len() }))
                    .collect::<Vec<_>>()
            );
            let text = COLLECTIONS
                .iter()
                .map(|c| format!("{:12} {} fields", c.name.cyan(), c.fields.len()))
                .collect::<Vec<_>>()
                .join("\n");
            CommandOutput::new(json_output).with_text(text).print(output)
        }
        Some(name) => {
            let collection = Collection::by_name(name)?;
            let json_output = json!({
                "name": collection.name,
                "path": collection.path,
                "fields": collection.fields.iter().map(|f| json!({
                    "name": f.name,
                    "label": f.label,
                    "kind": kind_label(f.kind),
                    "required": f.required,
                })).collect::<Vec<_>>(),
            });
            let mut text = format!("{}\n", collection.name.cyan().bold());
            for f in collection.fields {
                let required = if f.required {
                    "required".red().to_string()
                } else {
                    "optional".dimmed().to_string()
                };
                text.push_str(&format!("  {:16} {:28} {required}\n", f.name, kind_label(f.kind)));
            }
            CommandOutput::new(json_output).with_text(text).print(output)
        }
    }
}
