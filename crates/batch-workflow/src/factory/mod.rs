mod job_factory;

pub use job_factory::{assemble_comparison_job, build_customer_comparison_job, StepComponents};
