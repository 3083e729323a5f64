pub mod dedup;
pub mod enrichment;
pub mod platforms;
pub mod raid;
pub mod scoring;
pub mod search;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
