use flow::stubs::{RecordingSink, VecPageProvider};
use flow::{ExecutionTracker, FlowError, ItemSource, PagingItemSource, Step, StepBuilder, StepCategory, StepStatus};

fn source(items: Vec<u32>, page_size: usize) -> PagingItemSource<u32> {
  PagingItemSource::new("reader", page_size, Box::new(VecPageProvider::new(items))).expect("source")
}

fn identity(x: u32) -> flow::Result<u32> {
  Ok(x)
}

#[test]
fn commits_ceil_n_over_c_and_preserves_order() {
  for &(n, c) in &[(0usize, 1usize), (1, 1), (10, 3), (10, 5), (7, 10), (1000, 7)] {
    let items: Vec<u32> = (0..n as u32).collect();
    let sink = RecordingSink::new();
    let log = sink.log();
    let step = StepBuilder::new("sequentialStep1").chunk(c)
                                                  .reader(source(items.clone(), 4))
                                                  .processor(identity)
                                                  .writer(sink)
                                                  .build()
                                                  .expect("build");
    let tracker = ExecutionTracker::new();
    let record = step.execute(&tracker).expect("execute");

    let expected_commits = n.div_ceil(c);
    let chunks = log.lock().unwrap().clone();
    assert_eq!(chunks.len(), expected_commits, "n={} c={}", n, c);
    assert_eq!(record.commit_count as usize, expected_commits);
    assert!(chunks.iter().all(|ch| !ch.is_empty() && ch.len() <= c));
    let flattened: Vec<u32> = chunks.into_iter().flatten().collect();
    assert_eq!(flattened, items, "every item exactly once, in source order");
    assert_eq!(record.read_count as usize, n);
    assert_eq!(record.write_count as usize, n);
    assert_eq!(step.status(), StepStatus::Completed);
  }
}

#[test]
fn transformer_output_is_what_reaches_the_sink() {
  let sink = RecordingSink::new();
  let log = sink.log();
  let step = StepBuilder::new("sequentialStep1").chunk(2)
                                                .reader(source(vec![1, 2, 3], 10))
                                                .processor(|x: u32| -> flow::Result<u32> { Ok(x * 100) })
                                                .writer(sink)
                                                .build()
                                                .unwrap();
  step.execute(&ExecutionTracker::new()).unwrap();
  assert_eq!(*log.lock().unwrap(), vec![vec![100, 200], vec![300]]);
}

#[test]
fn sink_failure_keeps_previous_chunks_and_drops_the_failed_one() {
  let sink = RecordingSink::failing_on(3);
  let log = sink.log();
  let step = StepBuilder::new("parallelStep1").chunk(10)
                                              .reader(source((0..100).collect(), 25))
                                              .processor(identity)
                                              .writer(sink)
                                              .build()
                                              .unwrap();
  let tracker = ExecutionTracker::new();
  let err = step.execute(&tracker).expect_err("must fail");
  match err {
    FlowError::StepFailed { step, source } => {
      assert_eq!(step, "parallelStep1");
      assert!(matches!(*source, FlowError::Sink(_)));
    }
    other => panic!("unexpected error: {:?}", other),
  }
  let chunks = log.lock().unwrap().clone();
  assert_eq!(chunks.len(), 2);
  assert_eq!(chunks.concat(), (0..20).collect::<Vec<u32>>());
  assert_eq!(step.status(), StepStatus::Failed);

  let record = tracker.get("parallelStep1").expect("record");
  assert_eq!(record.status, StepStatus::Failed);
  assert_eq!(record.commit_count, 2);
  assert_eq!(record.rollback_count, 1);
  assert!(record.started_at.is_some() && record.ended_at.is_some());
  assert!(record.failure.is_some());
}

#[test]
fn transform_failure_aborts_before_writing_the_chunk() {
  let sink = RecordingSink::new();
  let log = sink.log();
  let step = StepBuilder::new("sequentialStep2").chunk(4)
                                                .reader(source((0..10).collect(), 3))
                                                .processor(|x: u32| -> flow::Result<u32> {
                                                  if x == 6 {
                                                    Err(FlowError::Transform(format!("item {}", x)))
                                                  } else {
                                                    Ok(x)
                                                  }
                                                })
                                                .writer(sink)
                                                .build()
                                                .unwrap();
  let err = step.execute(&ExecutionTracker::new()).unwrap_err();
  assert_eq!(err.failed_steps(), vec!["sequentialStep2".to_string()]);
  // chunk [0..4) committed, chunk [4..8) never reached the sink
  assert_eq!(*log.lock().unwrap(), vec![vec![0, 1, 2, 3]]);
}

#[test]
fn category_comes_from_tag_or_name_prefix() {
  let tagged = StepBuilder::new("anything").category(StepCategory::Parallel)
                                           .chunk(1)
                                           .reader(source(vec![], 1))
                                           .processor(identity)
                                           .writer(RecordingSink::new())
                                           .build()
                                           .unwrap();
  assert_eq!(tagged.category(), Some(StepCategory::Parallel));

  let by_prefix = StepBuilder::new("sequentialStep9").chunk(1)
                                                     .reader(source(vec![], 1))
                                                     .processor(identity)
                                                     .writer(RecordingSink::new())
                                                     .build()
                                                     .unwrap();
  assert_eq!(by_prefix.category(), Some(StepCategory::Sequential));

  let untagged = StepBuilder::new("cleanup").chunk(1)
                                            .reader(source(vec![], 1))
                                            .processor(identity)
                                            .writer(RecordingSink::new())
                                            .build()
                                            .unwrap();
  assert_eq!(untagged.category(), None);
}

#[test]
fn invalid_step_definitions_are_rejected() {
  let zero = StepBuilder::new("s").chunk(0)
                                  .reader(source(vec![], 1))
                                  .processor(identity)
                                  .writer(RecordingSink::new())
                                  .build();
  assert!(matches!(zero, Err(FlowError::InvalidDefinition(_))));

  let no_writer = StepBuilder::new("s").chunk(1).reader(source(vec![], 1)).processor(identity).build();
  assert!(matches!(no_writer, Err(FlowError::InvalidDefinition(_))));

  assert!(PagingItemSource::new("r", 0, Box::new(VecPageProvider::new(vec![1u32]))).is_err());
}

#[test]
fn paging_source_reads_page_by_page_and_requires_open() {
  let mut src = source((0..10).collect(), 4);
  assert!(matches!(src.next(), Err(FlowError::Source(_))));
  src.open().unwrap();
  let mut seen = Vec::new();
  while let Some(x) = src.next().unwrap() {
    seen.push(x);
  }
  assert_eq!(seen, (0..10).collect::<Vec<u32>>());
  // pages of 4, 4 and a short page of 2 that marks the end
  assert_eq!(src.pages_read(), 3);
  src.close().unwrap();

  // reopening starts over
  src.open().unwrap();
  assert_eq!(src.next().unwrap(), Some(0));
}

#[test]
fn step_can_run_again_after_finishing() {
  let sink = RecordingSink::new();
  let log = sink.log();
  let step = StepBuilder::new("sequentialStep1").chunk(5)
                                                .reader(source((0..5).collect(), 5))
                                                .processor(identity)
                                                .writer(sink)
                                                .build()
                                                .unwrap();
  let tracker = ExecutionTracker::new();
  step.execute(&tracker).unwrap();
  step.execute(&tracker).unwrap();
  assert_eq!(log.lock().unwrap().len(), 2);
  assert_eq!(tracker.len(), 1);
}
