pub mod extract_service;
pub mod handoff;
pub mod job_scheduler_service;
pub mod load_service;
pub mod pipeline_service;
pub mod run_tracker;
pub mod transform_service;
pub mod watermark_service;
