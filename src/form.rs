//! Create/edit drawer for one collection.
//!
//! [`DrawerFormController`] owns a [`Draft`], validates it against the
//! collection schema and submits it through the owning list, which shows the
//! change optimistically and rolls it back if the server refuses.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::autofill::AddressAutofill;
use crate::entity::{Entity, RecordId};
use crate::error::{BackofficeError, ErrorKind, Result};
use crate::http::FilePart;
use crate::list::ListController;
use crate::notify::Toast;
use crate::optimistic::{Mutation, Outcome};
use crate::resource::Payload;
use crate::schema::{Collection, FieldKind};
use crate::validation::{ValidationErrors, validate_field, validate_fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

crate::wire_enum!(FormMode, "form mode", {
    Create => "create",
    Edit => "edit",
});

/// The values being edited. `target_id` is set exactly when editing.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub mode: FormMode,
    pub target_id: Option<RecordId>,
    pub fields: Map<String, Value>,
    pub files: Vec<FilePart>,
}

impl Draft {
    fn file_fields(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.field.as_str()).collect()
    }

    fn payload(&self) -> Payload {
        Payload::new(self.fields.clone()).with_files(self.files.clone())
    }
}

#[derive(Debug, Default)]
struct FormState {
    draft: Option<Draft>,
    errors: ValidationErrors,
    submitting: bool,
    last_error: Option<String>,
}

pub struct DrawerFormController<T: Entity> {
    list: ListController<T>,
    state: Arc<Mutex<FormState>>,
}

impl<T: Entity> Clone for DrawerFormController<T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Entity> DrawerFormController<T> {
    pub fn new(list: ListController<T>) -> Self {
        Self {
            list,
            state: Arc::new(Mutex::new(FormState::default())),
        }
    }

    /// The list this form submits through.
    pub fn list(&self) -> &ListController<T> {
        &self.list
    }

    pub fn collection(&self) -> &'static Collection {
        self.list.client().collection()
    }

    /// Open the drawer. Editing requires the record being edited, whose
    /// fields prefill the draft. Refused while a submission is in flight.
    pub fn open(&self, mode: FormMode, initial: Option<&T>) -> Result<()> {
        let draft = match (mode, initial) {
            (FormMode::Create, initial) => Draft {
                mode,
                target_id: None,
                fields: initial.map(Entity::fields).unwrap_or_default(),
                files: Vec::new(),
            },
            (FormMode::Edit, Some(record)) => Draft {
                mode,
                target_id: Some(record.id().clone()),
                fields: record.fields(),
                files: Vec::new(),
            },
            (FormMode::Edit, None) => {
                return Err(BackofficeError::InvalidInput(
                    "edit mode needs the record to edit".to_string(),
                ));
            }
        };

        let mut state = self.state.lock();
        if state.submitting {
            return Err(BackofficeError::SubmitInProgress);
        }
        *state = FormState {
            draft: Some(draft),
            ..FormState::default()
        };
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().draft.is_some()
    }

    pub fn draft(&self) -> Option<Draft> {
        self.state.lock().draft.clone()
    }

    pub fn errors(&self) -> ValidationErrors {
        self.state.lock().errors.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.state.lock().submitting
    }

    /// Message of the last failed submission, if the drawer is still open.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Set a field value. The field's previous validation error is cleared.
    pub fn set_field(&self, name: &str, value: Value) -> Result<()> {
        let collection = self.collection();
        if collection.field(name).is_none() {
            return Err(BackofficeError::InvalidInput(format!(
                "{} has no field '{name}'",
                collection.name
            )));
        }

        let mut state = self.state.lock();
        let draft = state.draft.as_mut().ok_or(BackofficeError::FormNotOpen)?;
        draft.fields.insert(name.to_string(), value);
        state.errors.remove(name);
        Ok(())
    }

    /// Attach an upload to an image field, replacing any earlier upload.
    pub fn attach_file(&self, file: FilePart) -> Result<()> {
        let collection = self.collection();
        match collection.field(&file.field) {
            Some(spec) if spec.kind == FieldKind::Image => {}
            _ => {
                return Err(BackofficeError::InvalidInput(format!(
                    "{} has no image field '{}'",
                    collection.name, file.field
                )));
            }
        }

        let mut state = self.state.lock();
        let field = file.field.clone();
        let draft = state.draft.as_mut().ok_or(BackofficeError::FormNotOpen)?;
        draft.files.retain(|f| f.field != file.field);
        draft.files.push(file);
        state.errors.remove(&field);
        Ok(())
    }

    /// Validate a single field of the draft, e.g. when it loses focus.
    pub fn validate_field(&self, name: &str) -> Result<Option<String>> {
        let spec = self.collection().field(name).ok_or_else(|| {
            BackofficeError::InvalidInput(format!("unknown field '{name}'"))
        })?;
        let mut state = self.state.lock();
        let draft = state.draft.as_ref().ok_or(BackofficeError::FormNotOpen)?;
        let has_file = draft.files.iter().any(|f| f.field == name);
        let message = validate_field(spec, draft.fields.get(name), has_file);
        match &message {
            Some(m) => state.errors.insert(name, m.clone()),
            None => state.errors.remove(name),
        }
        Ok(message)
    }

    /// Validate the whole draft and remember the errors for display.
    pub fn validate(&self) -> ValidationErrors {
        let fields = self.collection().fields;
        let mut state = self.state.lock();
        let errors = match &state.draft {
            Some(draft) => validate_fields(fields, &draft.fields, &draft.file_fields()),
            None => ValidationErrors::new(),
        };
        state.errors = errors.clone();
        errors
    }

    fn optimistic_mutation(&self, draft: &Draft) -> Option<Mutation<T>> {
        match (&draft.mode, &draft.target_id) {
            (FormMode::Create, _) => Some(Mutation::Create {
                placeholder: T::from_draft(RecordId::local(), &draft.fields),
            }),
            (FormMode::Edit, Some(id)) => {
                let previous = self.list.find(id)?;
                let mut merged = previous.fields();
                merged.extend(draft.fields.clone());
                Some(Mutation::Update {
                    target_id: id.clone(),
                    patched: T::from_draft(id.clone(), &merged),
                    previous,
                })
            }
            (FormMode::Edit, None) => None,
        }
    }

    /// Submit the draft.
    ///
    /// Validation errors block the submission and nothing reaches the list.
    /// Otherwise the change is shown on the list immediately, sent, and then
    /// either confirmed (the list refreshes and the drawer closes) or rolled
    /// back (the drawer stays open with the draft intact).
    pub async fn submit(&self) -> Result<T> {
        let draft = {
            let mut state = self.state.lock();
            let draft = state.draft.clone().ok_or(BackofficeError::FormNotOpen)?;
            if state.submitting {
                return Err(BackofficeError::SubmitInProgress);
            }
            let errors =
                validate_fields(self.collection().fields, &draft.fields, &draft.file_fields());
            if !errors.is_empty() {
                state.errors = errors.clone();
                return Err(BackofficeError::Validation(errors));
            }
            state.errors = ValidationErrors::new();
            state.submitting = true;
            state.last_error = None;
            draft
        };

        let mutation = self.optimistic_mutation(&draft);
        if let Some(m) = &mutation {
            self.list.begin_mutation(m);
        }

        let client = self.list.client();
        let payload = draft.payload();
        let result = match &draft.target_id {
            Some(id) if draft.mode == FormMode::Edit => client.update(id, &payload).await,
            _ => client.create(&payload).await,
        };

        match result {
            Ok(entity) => {
                if let Some(m) = &mutation {
                    self.list
                        .settle_mutation(m, &Outcome::Success(Some(entity.clone())));
                }
                {
                    let mut state = self.state.lock();
                    *state = FormState::default();
                }
                let verb = match draft.mode {
                    FormMode::Create => "Created",
                    FormMode::Edit => "Updated",
                };
                self.list.notifier().notify(Toast::success(format!(
                    "{verb} {} {}",
                    self.collection().entity_key,
                    entity.id()
                )));
                self.list.refresh_after_mutation().await;
                Ok(entity)
            }
            Err(e) => {
                if let Some(m) = &mutation {
                    self.list.settle_mutation(m, &Outcome::Failure);
                }
                tracing::debug!(mode = %draft.mode, "submit rolled back: {e}");
                {
                    let mut state = self.state.lock();
                    state.submitting = false;
                    if state.draft.is_some() {
                        state.last_error = Some(e.to_string());
                    }
                }
                if e.kind() != ErrorKind::Auth {
                    self.list.notifier().notify(Toast::error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    /// Close the drawer and drop the draft.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.draft = None;
        state.errors = ValidationErrors::new();
        state.last_error = None;
    }

    /// Merge looked-up address parts into the draft. Only fields the
    /// collection has are written. Returns whether anything was filled.
    fn merge_address(&self, fields: Map<String, Value>, skip: &str) -> Result<bool> {
        let collection = self.collection();
        let mut state = self.state.lock();
        let draft = state.draft.as_mut().ok_or(BackofficeError::FormNotOpen)?;
        let mut filled = Vec::new();
        for (name, value) in fields {
            if name == skip || collection.field(&name).is_none() {
                continue;
            }
            draft.fields.insert(name.clone(), value);
            filled.push(name);
        }
        for name in &filled {
            state.errors.remove(name);
        }
        Ok(!filled.is_empty())
    }

    /// Fill state and district from the postal code in `field`.
    ///
    /// A failed lookup leaves the draft as it is and returns `Ok(false)`.
    pub async fn autofill_pincode(
        &self,
        field: &str,
        autofill: &dyn AddressAutofill,
    ) -> Result<bool> {
        let pincode = {
            let state = self.state.lock();
            let draft = state.draft.as_ref().ok_or(BackofficeError::FormNotOpen)?;
            match draft.fields.get(field) {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Ok(false),
            }
        };

        match autofill.lookup_pincode(&pincode).await {
            Some(fragment) => self.merge_address(fragment.into_fields(), field),
            None => {
                tracing::debug!(%pincode, "no address found for postal code");
                Ok(false)
            }
        }
    }

    /// Record a coordinate pair and fill address fields from it.
    pub async fn autofill_location(
        &self,
        latitude: f64,
        longitude: f64,
        autofill: &dyn AddressAutofill,
    ) -> Result<bool> {
        {
            let mut state = self.state.lock();
            let draft = state.draft.as_mut().ok_or(BackofficeError::FormNotOpen)?;
            let collection = self.list.client().collection();
            if collection.field("latitude").is_some() {
                draft
                    .fields
                    .insert("latitude".to_string(), Value::from(latitude));
            }
            if collection.field("longitude").is_some() {
                draft
                    .fields
                    .insert("longitude".to_string(), Value::from(longitude));
            }
        }

        match autofill.reverse_geocode(latitude, longitude).await {
            Some(fragment) => self.merge_address(fragment.into_fields(), ""),
            None => Ok(false),
        }
    }
}
