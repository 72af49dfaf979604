use std::sync::Arc;

use anyhow::Result;
use shared::domain::Category;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::gateway::CategoryGateway;

/// Read-only view of the category list with an explicit load trigger.
pub trait CategorySource: Send + Sync {
    /// Starts loading in the background and returns immediately.
    fn load(&self);
    fn subscribe(&self) -> watch::Receiver<Vec<Category>>;
}

pub struct CategoryStore {
    gateway: Arc<dyn CategoryGateway>,
    categories: Arc<watch::Sender<Vec<Category>>>,
}

impl CategoryStore {
    pub fn new(gateway: Arc<dyn CategoryGateway>) -> Arc<Self> {
        let (categories, _) = watch::channel(Vec::new());
        Arc::new(Self {
            gateway,
            categories: Arc::new(categories),
        })
    }

    /// Loads the list and publishes it to subscribers.
    pub async fn refresh(&self) -> Result<usize> {
        publish(self.gateway.as_ref(), &self.categories).await
    }

    pub fn current(&self) -> Vec<Category> {
        self.categories.borrow().clone()
    }
}

async fn publish(
    gateway: &dyn CategoryGateway,
    categories: &watch::Sender<Vec<Category>>,
) -> Result<usize> {
    let loaded = gateway.list_categories().await?;
    let count = loaded.len();
    categories.send_replace(loaded);
    info!(count, "categories loaded");
    Ok(count)
}

impl CategorySource for CategoryStore {
    fn load(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("category load requested outside of a runtime");
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let categories = Arc::clone(&self.categories);
        runtime.spawn(async move {
            if let Err(err) = publish(gateway.as_ref(), &categories).await {
                error!(error = %err, "failed to load categories");
            }
        });
    }

    fn subscribe(&self) -> watch::Receiver<Vec<Category>> {
        self.categories.subscribe()
    }
}
