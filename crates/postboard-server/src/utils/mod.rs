pub mod error;
pub mod pagination;
pub mod redirect;

pub use error::AppError;
pub use pagination::{Page, PageWindow, Paginator};
pub use redirect::Found;
