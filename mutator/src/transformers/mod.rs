//! Concrete mutation operators.

mod add_variable;
mod lambda_identity;

pub use add_variable::AddVariable;
pub use lambda_identity::LambdaIdentity;
