//! Create/edit controller behind the admin book form.
//!
//! # State machine
//! ```text
//! Uninitialized ─ no id ───────────────▶ Create
//!               └ id ─▶ Loading ─ ok ──▶ Edit
//!                               └ err ─▶ Create (error retained)
//! Create | Edit ─ submit ─▶ Submitting(mode) ─ ok ──▶ Completed(mode)
//!                                            └ err ─▶ mode
//! any ─ dispose ─▶ Disposed
//! ```
//!
//! Every remote call races the controller's cancellation token and the
//! configured request timeout. Once disposed, late results are dropped.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::{
    domain::{BookId, Category},
    protocol::{BookFormData, UploadBuffer},
};
use thiserror::Error;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    categories::CategorySource,
    form::{BookFormFields, ValidationErrors},
    gateway::{Ack, EntityGateway},
    preview::{self, AttachedFile},
    Navigator, NotificationSink,
};

const DEFAULT_UPLOAD_ROUTE_PREFIX: &str = "/Upload/";
const DEFAULT_LIST_ROUTE: &str = "/admin/books";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct FormSettings {
    /// Route the service serves stored cover images from.
    pub upload_route_prefix: String,
    /// Where to go after a successful save.
    pub list_route: String,
    pub request_timeout: Duration,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            upload_route_prefix: DEFAULT_UPLOAD_ROUTE_PREFIX.into(),
            list_route: DEFAULT_LIST_ROUTE.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

impl FormMode {
    pub fn title(self) -> &'static str {
        match self {
            FormMode::Create => "Add",
            FormMode::Edit => "Edit",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            FormMode::Create => "The book data is added successfully.",
            FormMode::Edit => "The book data is updated successfully.",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            FormMode::Create => "add",
            FormMode::Edit => "update",
        }
    }
}

impl From<FormMode> for FormPhase {
    fn from(mode: FormMode) -> Self {
        match mode {
            FormMode::Create => FormPhase::Create,
            FormMode::Edit => FormPhase::Edit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Uninitialized,
    Loading,
    Create,
    Edit,
    Submitting(FormMode),
    Completed(FormMode),
    Disposed,
}

impl FormPhase {
    pub fn mode(self) -> Option<FormMode> {
        match self {
            FormPhase::Create => Some(FormMode::Create),
            FormPhase::Edit => Some(FormMode::Edit),
            FormPhase::Submitting(mode) | FormPhase::Completed(mode) => Some(mode),
            FormPhase::Uninitialized | FormPhase::Loading | FormPhase::Disposed => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("failed to fetch book {id}: {source}")]
    Fetch { id: BookId, source: anyhow::Error },
    #[error("failed to {} book: {source}", .mode.verb())]
    Submit { mode: FormMode, source: anyhow::Error },
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("failed to read attachment {file_name}: {source}")]
    Attachment {
        file_name: String,
        source: std::io::Error,
    },
    #[error("failed to encode form data: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Saved { mode: FormMode, ack: Ack },
    /// Client-side validation failed; nothing was sent.
    Invalid(ValidationErrors),
    Failed(FormError),
    /// A previous submit is still waiting on the service.
    InFlight,
    /// The form has not finished initializing, or was already saved.
    NotReady,
    Disposed,
}

pub struct FormDependencies {
    pub gateway: Arc<dyn EntityGateway>,
    pub categories: Arc<dyn CategorySource>,
    pub notifier: Arc<dyn NotificationSink>,
    pub navigator: Arc<dyn Navigator>,
}

struct FormState {
    phase: FormPhase,
    title_mode: FormMode,
    fields: BookFormFields,
    files: Vec<AttachedFile>,
    cover_image_path: Option<String>,
    preview_generation: u64,
    load_generation: u64,
    last_error: Option<String>,
}

pub struct BookFormController {
    gateway: Arc<dyn EntityGateway>,
    categories: Arc<dyn CategorySource>,
    notifier: Arc<dyn NotificationSink>,
    navigator: Arc<dyn Navigator>,
    settings: FormSettings,
    cancel: CancellationToken,
    disposed: AtomicBool,
    inner: Mutex<FormState>,
}

impl BookFormController {
    /// Builds the controller and kicks off the category load.
    pub fn new(deps: FormDependencies, settings: FormSettings) -> Arc<Self> {
        deps.categories.load();
        Arc::new(Self {
            gateway: deps.gateway,
            categories: deps.categories,
            notifier: deps.notifier,
            navigator: deps.navigator,
            settings,
            cancel: CancellationToken::new(),
            disposed: AtomicBool::new(false),
            inner: Mutex::new(FormState {
                phase: FormPhase::Uninitialized,
                title_mode: FormMode::Create,
                fields: BookFormFields::default(),
                files: Vec::new(),
                cover_image_path: None,
                preview_generation: 0,
                load_generation: 0,
                last_error: None,
            }),
        })
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub async fn phase(&self) -> FormPhase {
        if self.is_disposed() {
            return FormPhase::Disposed;
        }
        self.inner.lock().await.phase
    }

    pub async fn mode(&self) -> Option<FormMode> {
        self.phase().await.mode()
    }

    /// "Add" or "Edit". Stays "Edit" when an id was requested even if the
    /// fetch failed.
    pub async fn form_title(&self) -> &'static str {
        self.inner.lock().await.title_mode.title()
    }

    pub async fn fields(&self) -> BookFormFields {
        self.inner.lock().await.fields.clone()
    }

    pub async fn set_fields(&self, fields: BookFormFields) {
        self.update_fields(|current| *current = fields).await;
    }

    pub async fn update_fields(&self, edit: impl FnOnce(&mut BookFormFields)) {
        let mut state = self.inner.lock().await;
        if self.is_disposed() || matches!(state.phase, FormPhase::Submitting(_)) {
            return;
        }
        edit(&mut state.fields);
    }

    pub async fn cover_image_path(&self) -> Option<String> {
        self.inner.lock().await.cover_image_path.clone()
    }

    pub async fn staged_files(&self) -> Vec<AttachedFile> {
        self.inner.lock().await.files.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    pub fn categories(&self) -> WatchStream<Vec<Category>> {
        WatchStream::new(self.categories.subscribe())
    }

    /// Enters create mode, or loads the book and enters edit mode.
    pub async fn initialize(&self, id: Option<BookId>) -> FormPhase {
        let (id, generation) = {
            let mut state = self.inner.lock().await;
            if self.is_disposed() {
                return FormPhase::Disposed;
            }
            if matches!(state.phase, FormPhase::Submitting(_)) {
                warn!("initialize ignored while a submit is in flight");
                return state.phase;
            }

            state.load_generation += 1;
            match id.filter(|id| !id.is_unsaved()) {
                Some(id) => {
                    state.phase = FormPhase::Loading;
                    state.title_mode = FormMode::Edit;
                    (id, state.load_generation)
                }
                None => {
                    state.phase = FormPhase::Create;
                    state.title_mode = FormMode::Create;
                    state.fields = BookFormFields::default();
                    debug!("book form ready to add");
                    return FormPhase::Create;
                }
            }
        };

        debug!(book_id = %id, "loading book for edit");
        let fetched = self
            .remote("fetch book", self.gateway.fetch_by_id(id), |source| {
                FormError::Fetch { id, source }
            })
            .await;
        let Some(fetched) = fetched else {
            return FormPhase::Disposed;
        };

        let mut state = self.inner.lock().await;
        if self.is_disposed() {
            return FormPhase::Disposed;
        }
        if state.load_generation != generation {
            debug!(book_id = %id, "discarding book fetched for a replaced form");
            return state.phase;
        }
        match fetched {
            Ok(book) => {
                state.fields = BookFormFields::from_book(&book);
                state.cover_image_path = book.cover_file_name.as_deref().map(|name| {
                    preview::stored_cover_path(&self.settings.upload_route_prefix, name)
                });
                state.last_error = None;
                state.phase = FormPhase::Edit;
                info!(book_id = %id, "book loaded for edit");
            }
            Err(err) => {
                error!(book_id = %id, error = %err, "error occurred while fetching book data");
                state.last_error = Some(err.to_string());
                state.fields = BookFormFields::default();
                state.phase = FormPhase::Create;
            }
        }
        state.phase
    }

    /// Replaces the staged files and previews the first one in the
    /// background. The returned handle may be ignored.
    pub async fn attach_files(
        self: &Arc<Self>,
        files: Vec<AttachedFile>,
    ) -> Option<JoinHandle<()>> {
        let mut state = self.inner.lock().await;
        if self.is_disposed() {
            return None;
        }
        state.files = files;
        state.preview_generation += 1;
        let generation = state.preview_generation;
        let first = state.files.first().cloned()?;
        drop(state);

        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            let preview = tokio::select! {
                biased;
                _ = controller.cancel.cancelled() => return,
                preview = preview::read_preview(&first) => preview,
            };

            match preview {
                Ok(uri) => {
                    let mut state = controller.inner.lock().await;
                    if controller.is_disposed() || state.preview_generation != generation {
                        debug!(file = first.file_name(), "discarding stale cover preview");
                        return;
                    }
                    state.cover_image_path = Some(uri);
                }
                Err(err) => {
                    warn!(file = first.file_name(), error = %err, "failed to read cover preview");
                }
            }
        }))
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let (mode, form, files) = {
            let mut state = self.inner.lock().await;
            if self.is_disposed() {
                return SubmitOutcome::Disposed;
            }
            let mode = match state.phase {
                FormPhase::Create => FormMode::Create,
                FormPhase::Edit => FormMode::Edit,
                FormPhase::Submitting(_) => {
                    warn!("submit ignored while a request is in flight");
                    return SubmitOutcome::InFlight;
                }
                _ => return SubmitOutcome::NotReady,
            };
            let form = match state.fields.validate() {
                Ok(form) => form,
                Err(errors) => {
                    debug!(%errors, "book form is invalid");
                    return SubmitOutcome::Invalid(errors);
                }
            };
            state.phase = FormPhase::Submitting(mode);
            (mode, form, state.files.clone())
        };

        let upload = match build_upload(&form, &files).await {
            Ok(upload) => upload,
            Err(err) => {
                warn!(error = %err, "failed to assemble book upload");
                let mut state = self.inner.lock().await;
                if self.is_disposed() {
                    return SubmitOutcome::Disposed;
                }
                state.phase = mode.into();
                state.last_error = Some(err.to_string());
                return SubmitOutcome::Failed(err);
            }
        };

        info!(
            mode = mode.verb(),
            files = upload.files().len(),
            "submitting book form"
        );
        let wrap = move |source: anyhow::Error| FormError::Submit { mode, source };
        let sent = match mode {
            FormMode::Create => {
                self.remote("add book", self.gateway.create(upload), wrap)
                    .await
            }
            FormMode::Edit => {
                self.remote("update book", self.gateway.update(upload), wrap)
                    .await
            }
        };
        let Some(sent) = sent else {
            return SubmitOutcome::Disposed;
        };

        let mut state = self.inner.lock().await;
        if self.is_disposed() {
            return SubmitOutcome::Disposed;
        }
        match sent {
            Ok(ack) => {
                state.phase = FormPhase::Completed(mode);
                state.last_error = None;
                drop(state);

                info!(mode = mode.verb(), status = ack.status, "book saved");
                self.notifier.show(mode.success_message());
                self.navigator.navigate(&self.settings.list_route);
                SubmitOutcome::Saved { mode, ack }
            }
            Err(err) => {
                if mode == FormMode::Create {
                    state.fields = BookFormFields::default();
                }
                state.phase = mode.into();
                state.last_error = Some(err.to_string());
                error!(mode = mode.verb(), error = %err, "error occurred while saving book data");
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Cancels everything still pending. Only the first call has an effect.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();
        debug!("book form disposed");
        true
    }

    /// `None` when the controller was disposed before the call finished.
    async fn remote<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = anyhow::Result<T>>,
        wrap: impl FnOnce(anyhow::Error) -> FormError,
    ) -> Option<Result<T, FormError>> {
        let after = self.settings.request_timeout;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = tokio::time::timeout(after, call) => Some(match outcome {
                Ok(result) => result.map_err(wrap),
                Err(_) => Err(FormError::Timeout { operation, after }),
            }),
        }
    }
}

async fn build_upload(
    form: &BookFormData,
    files: &[AttachedFile],
) -> Result<UploadBuffer, FormError> {
    let mut upload = UploadBuffer::new(form)?;
    for file in files {
        let bytes = file.read().await.map_err(|source| FormError::Attachment {
            file_name: file.file_name().to_string(),
            source,
        })?;
        upload.push_file(file.file_name(), file.mime_type(), bytes);
    }
    Ok(upload)
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
