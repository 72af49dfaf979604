//! Admin client core for the book store: remote gateways, the category
//! store, and the create/edit book form controller.

pub mod categories;
pub mod controller;
pub mod form;
pub mod gateway;
pub mod preview;

pub use categories::{CategorySource, CategoryStore};
pub use controller::{
    BookFormController, FormDependencies, FormError, FormMode, FormPhase, FormSettings,
    SubmitOutcome,
};
pub use form::{BookFormFields, FieldProblem, FormField, ValidationErrors};
pub use gateway::{Ack, CategoryGateway, EntityGateway, GatewayError, HttpBookGateway};
pub use preview::AttachedFile;

/// User-facing status messages (snackbar, toast, terminal line).
pub trait NotificationSink: Send + Sync {
    fn show(&self, message: &str);
}

/// Requests navigation to an application path.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

impl Navigator for tokio::sync::mpsc::UnboundedSender<String> {
    fn navigate(&self, path: &str) {
        if self.send(path.to_string()).is_err() {
            tracing::warn!(path, "navigation receiver dropped");
        }
    }
}
