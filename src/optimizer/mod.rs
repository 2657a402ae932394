pub mod mutation;
pub mod runner;
pub mod state;

pub use self::mutation::{ErrorBand, Perturber};
pub use self::runner::{Controller, OptimizationResult};
pub use self::state::{
    CheckpointStore, FileCheckpoint, HistoryEntry, MemoryCheckpoint, OptimizationState,
    TestedSolutions,
};
