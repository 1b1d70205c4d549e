pub mod document;
pub mod view;

pub use document::{Document, LiquidityData, MetricRecord, Scalar, Source};
pub use view::{project_view, DashboardView};
