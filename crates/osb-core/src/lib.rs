//! Data model, scheduling, sampling and metrics-store core of the
//! benchmarking engine. This crate defines the seam traits
//! ([`param_source::ParamSource`], [`schedule::Scheduler`],
//! [`runner::Runner`], [`cluster_client::ClusterClient`],
//! [`metrics_store::MetricsStore`]) plus every concrete type that does not
//! need a registry or wrapper decorators — those live in `osb-runner`.

pub mod allocator;
pub mod cluster_client;
pub mod config;
pub mod error;
pub mod ids;
pub mod meta;
pub mod metrics_store;
pub mod param_source;
pub mod params;
pub mod postprocessor;
pub mod request_context;
pub mod runner;
pub mod sample;
pub mod sampler;
pub mod schedule;
pub mod task;
pub mod time;

pub use error::{BenchError, BenchResult};
pub use ids::{ClientId, JoinPointId, TaskId, WorkerId};
pub use meta::Meta;
pub use params::Params;
