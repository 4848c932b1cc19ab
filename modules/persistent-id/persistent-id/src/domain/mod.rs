pub mod computed;
pub mod error;
pub mod model;
pub mod repo;
pub mod store;
pub mod stored;
pub mod transient;
