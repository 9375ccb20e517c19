pub mod feedback;
pub mod oid;
pub mod query;
pub mod suggestion;

pub use feedback::*;
pub use oid::*;
pub use query::*;
pub use suggestion::*;
