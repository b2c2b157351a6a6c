//! Generic row services over the resolved model.

mod association;
mod crud;
mod validation;
pub use association::LinkService;
pub use crud::CrudService;
pub use validation::RequestValidator;
