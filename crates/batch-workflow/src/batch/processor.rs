use customer_domain::Customer;
use flow::ItemTransformer;

/// Sustituye el nombre de cada cliente por un UUID v4 nuevo.
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomerProcessor;

impl ItemTransformer<Customer> for CustomerProcessor {
  fn transform(&self, mut item: Customer) -> flow::Result<Customer> {
    item.assign_fresh_name();
    Ok(item)
  }
}
