//! Storefront route table and the session guards protecting it.

use std::{fmt, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use clap::ValueEnum;
use router::{
    GuardDecision, NavigationRequest, PatternError, RouteEntry, RouteGuard, RouteParams,
    RouteTable, SliceProvider,
};
use shared::domain::{Book, BookId};
use url::form_urlencoded::byte_serialize;

pub const SIMILAR_BOOKS_SLICE: &str = "similarBooks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Guest,
    User,
    Admin,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub role: Role,
}

impl Session {
    pub fn new(role: Role) -> Arc<Self> {
        Arc::new(Self { role })
    }

    pub fn is_signed_in(&self) -> bool {
        self.role != Role::Guest
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Home,
    Login,
    Register,
    BookDetails { book_id: BookId },
    ShoppingCart,
    Checkout,
    MyOrders,
    Wishlist,
    ManageBooks,
    BookForm { book_id: Option<BookId> },
    NotFound,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::BookDetails { book_id } => write!(f, "book details #{book_id}"),
            View::BookForm { book_id: None } => f.write_str("book form (new)"),
            View::BookForm {
                book_id: Some(book_id),
            } => write!(f, "book form #{book_id}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Books shown next to the one being viewed; lives while the details page
/// is active.
#[derive(Debug, Default)]
pub struct SimilarBooks {
    pub books: Vec<Book>,
}

fn login_redirect(request: &NavigationRequest) -> GuardDecision {
    let return_url: String = byte_serialize(request.path.as_bytes()).collect();
    GuardDecision::Redirect(format!("/login?returnUrl={return_url}"))
}

pub struct AuthGuard {
    session: Arc<Session>,
}

#[async_trait]
impl RouteGuard for AuthGuard {
    fn name(&self) -> &str {
        "auth"
    }

    async fn check(&self, request: &NavigationRequest) -> GuardDecision {
        if self.session.is_signed_in() {
            GuardDecision::Allow
        } else {
            login_redirect(request)
        }
    }
}

pub struct AdminGuard {
    session: Arc<Session>,
}

#[async_trait]
impl RouteGuard for AdminGuard {
    fn name(&self) -> &str {
        "admin"
    }

    async fn check(&self, request: &NavigationRequest) -> GuardDecision {
        if self.session.is_admin() {
            GuardDecision::Allow
        } else {
            login_redirect(request)
        }
    }
}

fn book_id(params: &RouteParams) -> anyhow::Result<BookId> {
    let raw = params.get("id").context("route has no id parameter")?;
    let id = raw
        .parse::<i64>()
        .with_context(|| format!("'{raw}' is not a book id"))?;
    Ok(BookId(id))
}

pub fn storefront(session: Arc<Session>) -> Result<RouteTable<View>, PatternError> {
    let auth: Arc<dyn RouteGuard> = Arc::new(AuthGuard {
        session: Arc::clone(&session),
    });
    let admin: Arc<dyn RouteGuard> = Arc::new(AdminGuard { session });

    RouteTable::builder()
        .route(RouteEntry::component("", View::Home).title("Home"))
        .route(RouteEntry::component("filter", View::Home).title("Home | Filter Books"))
        .route(RouteEntry::component("search", View::Home).title("Home | Search Books"))
        .route(RouteEntry::lazy("login", |_| async { Ok(View::Login) }).title("Login"))
        .route(RouteEntry::lazy("register", |_| async { Ok(View::Register) }).title("Register"))
        .route(
            RouteEntry::lazy("books/details/:id", |params| async move {
                Ok::<_, anyhow::Error>(View::BookDetails {
                    book_id: book_id(&params)?,
                })
            })
            .slice(Arc::new(SliceProvider::new(
                SIMILAR_BOOKS_SLICE,
                SimilarBooks::default,
            )))
            .title("Book Details"),
        )
        .route(
            RouteEntry::lazy("shopping-cart", |_| async { Ok(View::ShoppingCart) })
                .title("Shopping Cart"),
        )
        .route(
            RouteEntry::lazy("checkout", |_| async { Ok(View::Checkout) })
                .guard(Arc::clone(&auth))
                .title("Checkout"),
        )
        .route(
            RouteEntry::lazy("myorders", |_| async { Ok(View::MyOrders) })
                .guard(Arc::clone(&auth))
                .title("My Order Details"),
        )
        .route(
            RouteEntry::lazy("wishlist", |_| async { Ok(View::Wishlist) })
                .guard(auth)
                .title("Wishlist"),
        )
        .route(
            RouteEntry::children("admin/books", || async {
                admin_books().map_err(anyhow::Error::from)
            })
            .guard(admin)
            .title("Admin | Books"),
        )
        .not_found(RouteEntry::component("**", View::NotFound).title("Not Found"))
        .build()
}

fn admin_books() -> Result<RouteTable<View>, PatternError> {
    RouteTable::builder()
        .route(RouteEntry::lazy("", |_| async { Ok(View::ManageBooks) }))
        .route(RouteEntry::lazy("new", |_| async {
            Ok(View::BookForm { book_id: None })
        }))
        .route(RouteEntry::lazy(":id", |params| async move {
            Ok::<_, anyhow::Error>(View::BookForm {
                book_id: Some(book_id(&params)?),
            })
        }))
        .build()
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
