use customer_domain::{Customer, CustomerRepository};
use flow::{FlowError, ItemSink};
use std::sync::Arc;

/// Escribe cada chunk con un único `save_all`, que es atómico en el
/// repositorio.
pub struct CustomerWriter {
  repo: Arc<dyn CustomerRepository>,
}

impl CustomerWriter {
  pub fn new(repo: Arc<dyn CustomerRepository>) -> Self {
    Self { repo }
  }
}

impl ItemSink<Customer> for CustomerWriter {
  fn write(&mut self, chunk: &[Customer]) -> flow::Result<()> {
    self.repo.save_all(chunk).map_err(|e| FlowError::Sink(e.to_string()))
  }
}
