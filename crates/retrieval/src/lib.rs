mod chunking;
mod corpus;
mod executor;
pub mod plan;

pub use chunking::chunk_legal_text;
pub use corpus::load_data_dir;
pub use executor::{Execution, StrategyExecutor};
pub use plan::{plan_for, Strategy};
