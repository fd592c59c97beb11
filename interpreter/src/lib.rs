pub mod budget;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod value;

pub use budget::{Budget, Limits, Step, Unbounded};
pub use condition::evaluate_check;
pub use error::RuntimeError;
pub use evaluator::evaluate;
pub use executor::{Executor, execute, execute_with};
pub use value::{Exception, Value};
