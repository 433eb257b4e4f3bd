use core_types::TestKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("Entity '{entity}' has {found} outcomes; one per test is required")]
    IncompleteEntity { entity: String, found: usize },

    #[error("Entity '{entity}' reports {found} where {expected} was expected")]
    OutOfOrder {
        entity: String,
        expected: TestKind,
        found: TestKind,
    },
}
