pub mod model;
pub mod store;

pub use model::{Metric, MetricSample};
pub use store::{MetricStore, StoreError};
