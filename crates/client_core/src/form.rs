//! Book form fields and client-side validation.

use std::fmt;

use shared::{
    domain::{Book, BookId, Price, PriceError},
    protocol::BookFormData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Title,
    Author,
    Category,
    Price,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::Title => "title",
            FormField::Author => "author",
            FormField::Category => "category",
            FormField::Price => "price",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProblem {
    Required,
    BelowMinimum,
    /// Too large (or infinite) to store as a price.
    OutOfRange,
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(FormField, FieldProblem)>);

impl ValidationErrors {
    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.0.iter().map(|(field, _)| *field)
    }

    pub fn problem(&self, field: FormField) -> Option<FieldProblem> {
        self.0
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, problem)| *problem)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid book form:")?;
        for (field, problem) in &self.0 {
            match problem {
                FieldProblem::Required => write!(f, " {field} is required;")?,
                FieldProblem::BelowMinimum => write!(f, " {field} must be zero or more;")?,
                FieldProblem::OutOfRange => write!(f, " {field} is too large;")?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Field values as entered. `price` is `None` while the input is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFormFields {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: Option<f64>,
}

impl BookFormFields {
    pub fn from_book(book: &Book) -> Self {
        Self {
            book_id: book.book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            price: Some(book.price.amount()),
        }
    }

    pub fn validate(&self) -> Result<BookFormData, ValidationErrors> {
        let mut problems = Vec::new();
        for (field, value) in [
            (FormField::Title, &self.title),
            (FormField::Author, &self.author),
            (FormField::Category, &self.category),
        ] {
            if value.trim().is_empty() {
                problems.push((field, FieldProblem::Required));
            }
        }

        let price = match self.price {
            None => {
                problems.push((FormField::Price, FieldProblem::Required));
                None
            }
            Some(amount) if amount.is_nan() => {
                problems.push((FormField::Price, FieldProblem::Required));
                None
            }
            Some(amount) => match Price::from_amount(amount) {
                Ok(price) => Some(price),
                Err(err) => {
                    let problem = match err {
                        PriceError::Negative(_) => FieldProblem::BelowMinimum,
                        PriceError::NotFinite | PriceError::OutOfRange(_) => {
                            FieldProblem::OutOfRange
                        }
                    };
                    problems.push((FormField::Price, problem));
                    None
                }
            },
        };

        match price {
            Some(price) if problems.is_empty() => Ok(BookFormData {
                book_id: self.book_id,
                title: self.title.clone(),
                author: self.author.clone(),
                category: self.category.clone(),
                price,
            }),
            _ => Err(ValidationErrors(problems)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
