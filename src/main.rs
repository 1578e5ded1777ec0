//! comparison-job: siembra el almacén de clientes si está vacío y ejecuta el
//! job `comparisonJob` (flow secuencial seguido de un split paralelo),
//! mostrando al final la duración de cada categoría.
//!
//! Configuración por variables de entorno (`BATCH_*`, ver `BatchConfig`) y
//! nivel de log con `RUST_LOG` (por defecto `info`).

use anyhow::{Context, Result};
use batch_workflow::{build_customer_comparison_job, ensure_seeded, open_repository, BatchConfig};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<ExitCode> {
    // Logging: también recoge los registros de `log` de los crates del workspace
    tracing_subscriber::registry().with(fmt::layer())
                                  .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                                  .init();

    let config = BatchConfig::from_env().context("configuración inválida")?;
    tracing::info!(db = %config.db_url,
                   chunk = config.chunk_size,
                   page = config.page_size,
                   split_threads = config.split_threads,
                   "configuración cargada");

    let repo = Arc::new(open_repository(&config).context("no se pudo abrir el almacén de clientes")?);
    let total = ensure_seeded(repo.as_ref(), &config).context("fallo en el seeding inicial")?;
    tracing::info!("{} clientes listos para procesar", total);

    let job = build_customer_comparison_job(repo.clone(), &config)?;
    let execution = job.run()?;

    if config.report_json {
        println!("{}", serde_json::to_string_pretty(&execution.summary())?);
    } else {
        println!("{}", execution.timing_report());
    }

    if execution.is_failed() {
        tracing::error!("job '{}' fallido: {}",
                        execution.job_name,
                        execution.failure.as_deref().unwrap_or("sin detalle"));
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
