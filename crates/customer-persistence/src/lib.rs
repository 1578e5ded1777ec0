//! Persistencia Diesel de clientes. Expone el esquema y el repositorio que
//! implementa `CustomerRepository`; la implementación está en
//! `customer_persistence.rs`.

mod customer_persistence;
pub mod schema;

pub use customer_persistence::{DieselCustomerRepository, MIGRATIONS};
