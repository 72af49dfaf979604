use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use client_core::{
    AttachedFile, BookFormController, BookFormFields, CategoryStore, FormDependencies,
    HttpBookGateway, SubmitOutcome,
};
use router::{NavigationOutcome, Router};
use shared::domain::BookId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    console::ConsoleNotifier,
    routes::{self, Role, Session, View},
};

/// Field values given on the command line; `None` keeps what the form has.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOverrides {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
}

impl FieldOverrides {
    pub fn apply(self, fields: &mut BookFormFields) {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(author) = self.author {
            fields.author = author;
        }
        if let Some(category) = self.category {
            fields.category = category;
        }
        if let Some(price) = self.price {
            fields.price = Some(price);
        }
    }
}

fn storefront_router(role: Role) -> Result<Router<View>> {
    let table = routes::storefront(Session::new(role))?;
    Ok(Router::new(table)?)
}

fn print_outcome(outcome: NavigationOutcome<View>) {
    match outcome {
        NavigationOutcome::Activated(route) => {
            let title = route.route.title.as_deref().unwrap_or("-");
            println!(
                "{} -> {} [{}] ({title})",
                route.route.path, route.view, route.route.pattern
            );
        }
        NavigationOutcome::Denied {
            path,
            guard,
            redirect: Some(redirect),
        } => println!("{path} denied by {guard}, redirect to {redirect}"),
        NavigationOutcome::Denied { path, guard, .. } => println!("{path} denied by {guard}"),
    }
}

pub async fn navigate(path: &str, role: Role) -> Result<()> {
    let router = storefront_router(role)?;
    print_outcome(router.navigate(path).await?);
    Ok(())
}

pub async fn list_categories(settings: &Settings) -> Result<()> {
    let gateway = Arc::new(HttpBookGateway::new(&settings.api_base_url)?);
    let store = CategoryStore::new(gateway);
    let count = store.refresh().await?;
    info!(count, "categories loaded");
    for category in store.current() {
        println!("{}\t{}", category.category_id, category.category_name);
    }
    Ok(())
}

/// Opens the book form through the admin routes, applies `overrides`,
/// attaches `covers` and submits.
pub async fn save_book(
    settings: &Settings,
    book_id: Option<BookId>,
    overrides: FieldOverrides,
    covers: Vec<PathBuf>,
) -> Result<()> {
    let router = storefront_router(Role::Admin)?;
    let form_path = match book_id {
        Some(id) => format!("/admin/books/{id}"),
        None => "/admin/books/new".to_string(),
    };
    let route = router
        .navigate(&form_path)
        .await?
        .activated()
        .with_context(|| format!("navigation to {form_path} was denied"))?;
    let View::BookForm { book_id } = route.view else {
        bail!("{form_path} opened {} instead of the book form", route.view);
    };

    let gateway = Arc::new(HttpBookGateway::new(&settings.api_base_url)?);
    let (navigator, mut navigations) = mpsc::unbounded_channel::<String>();
    let controller = BookFormController::new(
        FormDependencies {
            gateway: gateway.clone(),
            categories: CategoryStore::new(gateway),
            notifier: Arc::new(ConsoleNotifier),
            navigator: Arc::new(navigator),
        },
        settings.form_settings(),
    );

    let phase = controller.initialize(book_id).await;
    if let Some(error) = controller.last_error().await {
        controller.dispose();
        bail!("could not open the book form: {error}");
    }
    info!(?phase, title = controller.form_title().await, "book form ready");

    controller.update_fields(|fields| overrides.apply(fields)).await;
    let files: Vec<AttachedFile> = covers.into_iter().map(AttachedFile::from_path).collect();
    if let Some(preview) = controller.attach_files(files).await {
        if let Err(err) = preview.await {
            warn!(error = %err, "cover preview task failed");
        }
    }
    if let Some(cover) = controller.cover_image_path().await {
        debug!(bytes = cover.len(), "cover preview ready");
    }

    let outcome = controller.submit().await;
    controller.dispose();
    match outcome {
        SubmitOutcome::Saved { mode, ack } => {
            info!(?mode, status = ack.status, "book saved");
            while let Ok(path) = navigations.try_recv() {
                print_outcome(router.navigate(&path).await?);
            }
            Ok(())
        }
        SubmitOutcome::Invalid(errors) => bail!("book form is invalid: {errors}"),
        SubmitOutcome::Failed(error) => Err(error).context("book was not saved"),
        other => bail!("book was not saved: {other:?}"),
    }
}
