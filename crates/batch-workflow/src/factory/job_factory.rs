use crate::batch::{CustomerProcessor, CustomerReader, CustomerWriter};
use crate::config::BatchConfig;
use crate::errors::Result;
use crate::listener::timing_report_listener;
use customer_domain::{Customer, CustomerRepository, IdRange};
use flow::{ChunkStep, FlowBuilder, ItemSink, ItemSource, ItemTransformer, Job, JobBuilder, StepBuilder, StepCategory};
use log::info;
use rayon::ThreadPool;
use std::sync::Arc;

pub const JOB_NAME: &str = "comparisonJob";
pub const SEQUENTIAL_FLOW: &str = "sequentialFlow";
pub const PARALLEL_FLOW: &str = "parallelFlow";

/// Lector y escritor propios de un step. Cada step recibe los suyos: dos
/// steps nunca comparten cursor.
pub struct StepComponents<T> {
  pub reader: Box<dyn ItemSource<T>>,
  pub writer: Box<dyn ItemSink<T>>,
}

fn chunk_step<T: 'static>(category: StepCategory,
                          index: usize,
                          chunk_size: usize,
                          processor: &Arc<dyn ItemTransformer<T>>,
                          components: StepComponents<T>)
                          -> Result<ChunkStep<T>> {
  let name = format!("{}{}", category.step_prefix(), index);
  Ok(StepBuilder::new(name).category(category)
                           .chunk(chunk_size)
                           .boxed_reader(components.reader)
                           .shared_processor(processor.clone())
                           .boxed_writer(components.writer)
                           .build()?)
}

/// Arma `comparisonJob` a partir de componentes ya construidos:
///
/// - `sequentialFlow`: un step `sequentialStep{n}` por cada elemento de
///   `sequential`, en orden.
/// - `parallelFlow`: split sobre `executor` con una rama `flow{n}` por cada
///   elemento de `parallel`, cada una con su `parallelStep{n}`.
///
/// El job no admite reinicio y lleva el listener de tiempos.
pub fn assemble_comparison_job<T: 'static>(processor: Arc<dyn ItemTransformer<T>>,
                                           sequential: Vec<StepComponents<T>>,
                                           parallel: Vec<StepComponents<T>>,
                                           chunk_size: usize,
                                           executor: Arc<ThreadPool>)
                                           -> Result<Job> {
  let mut seq_builder = FlowBuilder::new(SEQUENTIAL_FLOW);
  for (i, components) in sequential.into_iter().enumerate() {
    seq_builder = seq_builder.next(chunk_step(StepCategory::Sequential, i + 1, chunk_size, &processor, components)?);
  }
  let sequential_flow = seq_builder.build()?;

  let mut split = FlowBuilder::new(PARALLEL_FLOW).split(executor);
  for (i, components) in parallel.into_iter().enumerate() {
    let step = chunk_step(StepCategory::Parallel, i + 1, chunk_size, &processor, components)?;
    split = split.add(FlowBuilder::new(format!("flow{}", i + 1)).start(step).build()?);
  }
  let parallel_flow = split.build()?;

  Ok(JobBuilder::new(JOB_NAME).prevent_restart()
                              .listener(timing_report_listener())
                              .start(sequential_flow)
                              .next(parallel_flow)
                              .build()?)
}

fn components_for(repo: &Arc<dyn CustomerRepository>,
                  ranges: Vec<IdRange>,
                  prefix: &str,
                  page_size: usize)
                  -> Result<Vec<StepComponents<Customer>>> {
  ranges.into_iter()
        .enumerate()
        .map(|(i, range)| -> Result<StepComponents<Customer>> {
          let source = CustomerReader::new(repo.clone(), range).into_source(format!("{}{}Reader", prefix, i + 1),
                                                                             page_size)?;
          Ok(StepComponents { reader: Box::new(source) as Box<dyn ItemSource<Customer>>,
                              writer: Box::new(CustomerWriter::new(repo.clone())) as Box<dyn ItemSink<Customer>> })
        })
        .collect()
}

/// Construye el job de comparación sobre el almacén de clientes.
///
/// Cada flow recorre la tabla entera una vez: el rango de ids actual se
/// divide en tantos tramos disjuntos como steps tenga el flow, de modo que
/// los steps concurrentes del split nunca tocan el mismo cliente.
pub fn build_customer_comparison_job(repo: Arc<dyn CustomerRepository>, config: &BatchConfig) -> Result<Job> {
  config.validate()?;
  let full = match repo.id_bounds()? {
    Some((lo, hi)) => IdRange::covering(lo, hi)?,
    None => IdRange::new(0, 0)?,
  };
  info!("rango de ids [{}, {}): {} steps secuenciales, {} paralelos sobre {} hilos",
        full.start,
        full.end,
        config.sequential_steps,
        config.parallel_steps,
        config.split_threads);
  let sequential = components_for(&repo, full.split(config.sequential_steps)?, "sequentialStep", config.page_size)?;
  let parallel = components_for(&repo, full.split(config.parallel_steps)?, "parallelStep", config.page_size)?;
  let executor = rayon::ThreadPoolBuilder::new().num_threads(config.split_threads)
                                                .thread_name(|i| format!("split-{}", i))
                                                .build()?;
  assemble_comparison_job(Arc::new(CustomerProcessor), sequential, parallel, config.chunk_size, Arc::new(executor))
}
