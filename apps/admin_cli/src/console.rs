use client_core::NotificationSink;
use tracing::info;

/// Prints notifications on stdout, one per line.
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn show(&self, message: &str) {
        info!(message, "notification");
        println!("{message}");
    }
}
