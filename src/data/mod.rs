/// Data layer: core types, loading, caching, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .xlsx / .ods sheet  or  <subject>.csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  DataSource::load(subject) → RecordSet
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  Arc<RecordSet> per subject, reload on change
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  year range + column selections → &Record
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  gap-filled count tables, pivots, tag counts
///   └───────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
