/// Data layer: core types, parsing, and aggregation.
///
/// Architecture:
/// ```text
///  uploaded bytes (.csv and other delimited text)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → RawTable (Cell per column)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  RawTable → DatasetSummary (means, type counts)
///   └───────────┘
///        │
///        ▼
///   history::SummaryStore::insert  (may evict the oldest summary)
/// ```

pub mod aggregate;
pub mod loader;
pub mod model;
