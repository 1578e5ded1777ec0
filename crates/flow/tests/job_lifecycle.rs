use flow::stubs::{RecordingSink, SinkLog, VecPageProvider};
use flow::{ChunkStep, FlowBuilder, FlowError, Job, JobBuilder, JobListener, JobStatus, PagingItemSource, StepBuilder,
           StepCategory, StepStatus};
use std::sync::{Arc, Mutex};

fn step(name: &str, category: StepCategory, items: u32, sink: RecordingSink<u32>) -> ChunkStep<u32> {
  let source = PagingItemSource::new(format!("{}-reader", name),
                                     10,
                                     Box::new(VecPageProvider::new((0..items).collect()))).unwrap();
  StepBuilder::new(name).category(category)
                        .chunk(4)
                        .reader(source)
                        .processor(|x: u32| -> flow::Result<u32> { Ok(x + 1) })
                        .writer(sink)
                        .build()
                        .unwrap()
}

fn comparison_job(fail_parallel: bool, hooks: Arc<Mutex<Vec<String>>>) -> (Job, Vec<SinkLog<u32>>) {
  let sinks: Vec<RecordingSink<u32>> = (0..4).map(|i| {
                                               if fail_parallel && i == 3 {
                                                 RecordingSink::failing_on(1)
                                               } else {
                                                 RecordingSink::new()
                                               }
                                             })
                                             .collect();
  let logs: Vec<SinkLog<u32>> = sinks.iter().map(|s| s.log()).collect();
  let mut sinks = sinks.into_iter();
  let sequential = FlowBuilder::new("sequentialFlow")
    .start(step("sequentialStep1", StepCategory::Sequential, 20, sinks.next().unwrap()))
    .next(step("sequentialStep2", StepCategory::Sequential, 20, sinks.next().unwrap()))
    .build()
    .unwrap();
  let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap());
  let flow1 = FlowBuilder::new("flow1").start(step("parallelStep1", StepCategory::Parallel, 20, sinks.next().unwrap()))
                                       .build()
                                       .unwrap();
  let flow2 = FlowBuilder::new("flow2").start(step("parallelStep2", StepCategory::Parallel, 20, sinks.next().unwrap()))
                                       .build()
                                       .unwrap();
  let parallel = FlowBuilder::new("parallelFlow").split(pool).add(flow1).add(flow2).build().unwrap();

  let before = hooks.clone();
  let after = hooks;
  let listener = JobListener::new().on_before(move |e| before.lock().unwrap().push(format!("before:{:?}", e.status)))
                                   .on_after(move |e| {
                                     after.lock()
                                          .unwrap()
                                          .push(format!("after:{:?}:{}", e.status, e.step_executions().len()))
                                   });
  let job = JobBuilder::new("comparisonJob").prevent_restart()
                                            .listener(listener)
                                            .start(sequential)
                                            .next(parallel)
                                            .build()
                                            .unwrap();
  (job, logs)
}

#[test]
fn job_runs_flows_in_order_and_fires_hooks() {
  let hooks = Arc::new(Mutex::new(Vec::new()));
  let (job, logs) = comparison_job(false, hooks.clone());
  let execution = job.run().expect("run");

  assert_eq!(execution.status, JobStatus::Completed);
  assert!(execution.ended_at.is_some());
  assert_eq!(*hooks.lock().unwrap(), vec!["before:Starting".to_string(), "after:Completed:4".to_string()]);
  for log in &logs {
    let chunks = log.lock().unwrap();
    assert_eq!(chunks.len(), 5);
    assert_eq!(chunks.concat(), (1..=20).collect::<Vec<u32>>());
  }

  // the parallel flow starts only after the sequential flow ended
  let records = execution.step_executions();
  let seq_end = records.iter().filter(|r| r.category == Some(StepCategory::Sequential)).filter_map(|r| r.ended_at).max();
  let par_start =
    records.iter().filter(|r| r.category == Some(StepCategory::Parallel)).filter_map(|r| r.started_at).min();
  assert!(seq_end.unwrap() <= par_start.unwrap());

  let report = execution.timing_report();
  assert!(report.duration_ms(StepCategory::Sequential).is_some());
  assert!(report.duration_ms(StepCategory::Parallel).is_some());
  assert_eq!(report.lines().len(), 2);
}

#[test]
fn failed_job_still_runs_after_hook_and_reports() {
  let hooks = Arc::new(Mutex::new(Vec::new()));
  let (job, logs) = comparison_job(true, hooks.clone());
  let execution = job.run().expect("run");

  assert!(execution.is_failed());
  assert_eq!(execution.failed_steps, vec!["parallelStep2".to_string()]);
  assert!(execution.failure.as_deref().unwrap_or_default().contains("parallelFlow"));
  assert_eq!(hooks.lock().unwrap().last().unwrap(), "after:Failed:4");
  // sibling branch completed and kept its writes
  assert_eq!(logs[2].lock().unwrap().len(), 5);
  assert!(logs[3].lock().unwrap().is_empty());

  let steps = execution.step_executions();
  let failed = steps.iter().find(|s| s.step_name == "parallelStep2").unwrap();
  assert_eq!(failed.status, StepStatus::Failed);
  // both categories still get a duration from the records that were captured
  let report = execution.timing_report();
  assert!(report.duration_ms(StepCategory::Parallel).is_some());
}

#[test]
fn restart_is_prevented() {
  let (job, logs) = comparison_job(false, Arc::new(Mutex::new(Vec::new())));
  assert!(!job.is_restartable());
  job.run().expect("first run");
  match job.run() {
    Err(FlowError::RestartPrevented(name)) => assert_eq!(name, "comparisonJob"),
    other => panic!("expected RestartPrevented, got {:?}", other.map(|e| e.status)),
  }
  // nothing ran the second time
  assert_eq!(logs[0].lock().unwrap().len(), 5);
}

#[test]
fn summary_serializes_to_json() {
  let (job, _) = comparison_job(false, Arc::new(Mutex::new(Vec::new())));
  let execution = job.run().unwrap();
  let json = serde_json::to_value(execution.summary()).expect("serialize");
  assert_eq!(json["job_name"], "comparisonJob");
  assert_eq!(json["status"], "completed");
  assert_eq!(json["steps"].as_array().unwrap().len(), 4);
  assert!(json["timing"]["categories"]["sequential"]["start_ms"].is_i64());
}

#[test]
fn job_without_flows_is_invalid() {
  assert!(matches!(JobBuilder::new("empty").build(), Err(FlowError::InvalidDefinition(_))));
}

#[test]
fn duplicate_step_names_are_rejected() {
  let sequential = FlowBuilder::new("sequentialFlow")
    .start(step("sequentialStep1", StepCategory::Sequential, 4, RecordingSink::new()))
    .next(step("sequentialStep1", StepCategory::Sequential, 4, RecordingSink::new()))
    .build()
    .unwrap();
  match JobBuilder::new("comparisonJob").start(sequential).build() {
    Err(FlowError::InvalidDefinition(msg)) => assert!(msg.contains("sequentialStep1")),
    other => panic!("expected InvalidDefinition, got ok={}", other.is_ok()),
  }

  // also across flows
  let first = FlowBuilder::new("a").start(step("parallelStep1", StepCategory::Parallel, 4, RecordingSink::new()))
                                   .build()
                                   .unwrap();
  let second = FlowBuilder::new("b").start(step("parallelStep1", StepCategory::Parallel, 4, RecordingSink::new()))
                                    .build()
                                    .unwrap();
  assert!(matches!(JobBuilder::new("j").start(first).next(second).build(), Err(FlowError::InvalidDefinition(_))));
}

#[test]
fn panicking_processor_fails_its_step_and_after_hook_still_runs() {
  let source = PagingItemSource::new("panicky-reader",
                                     10,
                                     Box::new(VecPageProvider::new((0..12).collect::<Vec<u32>>()))).unwrap();
  let broken = StepBuilder::new("parallelStep2").category(StepCategory::Parallel)
                                                .chunk(4)
                                                .reader(source)
                                                .processor(|x: u32| -> flow::Result<u32> {
                                                  if x == 5 {
                                                    panic!("defecto en el item {}", x);
                                                  }
                                                  Ok(x)
                                                })
                                                .writer(RecordingSink::new())
                                                .build()
                                                .unwrap();
  let sibling_sink = RecordingSink::new();
  let sibling_log = sibling_sink.log();
  let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap());
  let flow1 = FlowBuilder::new("flow1").start(step("parallelStep1", StepCategory::Parallel, 20, sibling_sink))
                                       .build()
                                       .unwrap();
  let flow2 = FlowBuilder::new("flow2").start(broken).build().unwrap();
  let parallel = FlowBuilder::new("parallelFlow").split(pool).add(flow1).add(flow2).build().unwrap();

  let hooks = Arc::new(Mutex::new(Vec::new()));
  let after = hooks.clone();
  let job = JobBuilder::new("comparisonJob")
    .listener(JobListener::new().on_after(move |e| after.lock().unwrap().push(format!("after:{:?}", e.status))))
    .start(parallel)
    .build()
    .unwrap();
  let execution = job.run().expect("run");

  assert!(execution.is_failed());
  assert_eq!(*hooks.lock().unwrap(), vec!["after:Failed".to_string()]);
  assert_eq!(execution.failed_steps, vec!["parallelStep2".to_string()]);
  assert!(execution.failure.as_deref().unwrap_or_default().contains("defecto en el item 5"));
  let steps = execution.step_executions();
  let failed = steps.iter().find(|s| s.step_name == "parallelStep2").unwrap();
  assert_eq!(failed.status, StepStatus::Failed);
  assert!(failed.ended_at.is_some());
  // first chunk (0..4) committed before the panic in the second one
  assert_eq!(failed.commit_count, 1);
  assert_eq!(failed.rollback_count, 1);
  assert_eq!(sibling_log.lock().unwrap().len(), 5);
}
