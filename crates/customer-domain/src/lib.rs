mod customer;
mod customer_repository;
mod errors;
mod id_range;

pub use customer::{placeholder_name, Customer, PLACEHOLDER_PREFIX};
pub use customer_repository::{CustomerRepository, InMemoryCustomerRepository};
pub use errors::DomainError;
pub use id_range::IdRange;
