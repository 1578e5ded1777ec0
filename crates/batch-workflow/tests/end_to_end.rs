use batch_workflow::{build_customer_comparison_job, ensure_seeded, open_repository, BatchConfig};
use customer_domain::{CustomerRepository, PLACEHOLDER_PREFIX};
use flow::{JobStatus, StepCategory};
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn seeds_and_processes_one_hundred_thousand_customers() {
  if cfg!(feature = "pg") {
    eprintln!("skipping sqlite end-to-end test because 'pg' feature is enabled");
    return;
  }
  let path = std::env::temp_dir().join(format!("comparison_job_{}.db", Uuid::new_v4()));
  let config = BatchConfig { db_url: path.to_str().unwrap().to_string(),
                             ..BatchConfig::default() };
  let repo = Arc::new(open_repository(&config).expect("open store"));
  assert_eq!(repo.count().unwrap(), 0);

  assert_eq!(ensure_seeded(repo.as_ref(), &config).expect("seed"), 100_000);
  assert_eq!(repo.count_with_name_prefix(PLACEHOLDER_PREFIX).unwrap(), 100_000);

  let job = build_customer_comparison_job(repo.clone(), &config).expect("job");
  let execution = job.run().expect("run");
  assert_eq!(execution.status, JobStatus::Completed, "{:?}", execution.failure);

  assert_eq!(repo.count().unwrap(), 100_000);
  assert_eq!(repo.count_with_name_prefix(PLACEHOLDER_PREFIX).unwrap(), 0);

  let report = execution.timing_report();
  let lines = report.lines();
  assert_eq!(lines.len(), 2);
  assert!(lines[0].starts_with("Procesamiento secuencial tiempo total:"));
  assert!(lines[1].starts_with("Procesamiento paralelo tiempo total:"));
  let sequential = report.duration_ms(StepCategory::Sequential).expect("sequential timing");
  let parallel = report.duration_ms(StepCategory::Parallel).expect("parallel timing");
  assert!(sequential > 0);
  assert!(parallel > 0);

  let branch_sum: i64 = execution.step_executions()
                                 .iter()
                                 .filter(|s| s.category == Some(StepCategory::Parallel))
                                 .filter_map(|s| s.duration_ms())
                                 .sum();
  assert!(parallel <= branch_sum, "span {} > sum of branches {}", parallel, branch_sum);

  let summary = serde_json::to_value(execution.summary()).unwrap();
  assert_eq!(summary["steps"].as_array().unwrap().len(), 4);

  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
  }
}
