use flow::JobListener;
use log::{info, warn};

/// Listener del job de comparación: anota inicio y fin y, al terminar, una
/// línea por categoría con la duración agregada.
pub fn timing_report_listener() -> JobListener {
  JobListener::new().on_before(|e| info!("Job '{}' iniciado (ejecución {})", e.job_name, e.id))
                    .on_after(|e| {
                      info!("Job '{}' terminado con estado {:?}", e.job_name, e.status);
                      if !e.failed_steps.is_empty() {
                        warn!("steps fallidos: {}", e.failed_steps.join(", "));
                      }
                      for line in e.timing_report().lines() {
                        info!("{}", line);
                      }
                    })
}
