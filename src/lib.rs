// Weftline - Versioned Workflow Template Editor Core

pub mod editing;
pub mod service;
pub mod storage;
pub mod types;
pub mod validation;
pub mod versioning;
