//! Backend adapters.

pub mod inference_backend;
pub mod job_backend;
pub mod mock_backend;

pub use inference_backend::InferenceBackend;
pub use inference_backend::InferenceParameters;
pub use job_backend::HttpJobApi;
pub use job_backend::JobApi;
pub use job_backend::JobBackend;
pub use job_backend::JobHandle;
pub use job_backend::PollPolicy;
pub use job_backend::PollResponse;
pub use job_backend::PollStatus;
pub use mock_backend::MockBackend;
