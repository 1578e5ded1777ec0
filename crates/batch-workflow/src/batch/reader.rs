use customer_domain::{Customer, CustomerRepository, IdRange};
use flow::{FlowError, PageProvider, PagingItemSource};
use log::debug;
use std::sync::Arc;

/// Lector de clientes restringido a un rango de ids. Pagina por clave: cada
/// página empieza después del último id entregado, así que reescribir filas
/// ya leídas no desplaza las siguientes.
pub struct CustomerReader {
  repo: Arc<dyn CustomerRepository>,
  range: IdRange,
  last_id: Option<i64>,
}

impl CustomerReader {
  pub fn new(repo: Arc<dyn CustomerRepository>, range: IdRange) -> Self {
    Self { repo, range, last_id: None }
  }

  pub fn range(&self) -> IdRange {
    self.range
  }

  /// Envuelve el lector en un `PagingItemSource` de `page_size` filas.
  pub fn into_source(self, name: impl Into<String>, page_size: usize) -> flow::Result<PagingItemSource<Customer>> {
    PagingItemSource::new(name, page_size, Box::new(self))
  }
}

impl PageProvider<Customer> for CustomerReader {
  fn reset(&mut self) -> flow::Result<()> {
    self.last_id = None;
    Ok(())
  }

  fn next_page(&mut self, page_size: usize) -> flow::Result<Vec<Customer>> {
    let page = self.repo
                   .fetch_page(&self.range, self.last_id, page_size)
                   .map_err(|e| FlowError::Source(e.to_string()))?;
    if let Some(last) = page.last() {
      self.last_id = Some(last.id());
    }
    debug!("página [{}, {}) después de {:?}: {} clientes",
           self.range.start,
           self.range.end,
           self.last_id,
           page.len());
    Ok(page)
  }
}
