pub mod connection_like;
pub mod create;
pub mod criteria;
pub mod deferred_lookup;
pub mod delete;
pub mod last;
pub mod many;
pub(crate) mod relation_fetcher;
pub mod sql;
pub mod unique;
pub mod update;
pub mod utils;

pub use connection_like::{Connection, Dialect, RowCursor, Statement};
pub use create::CreateQueryBuilder;
pub use criteria::{Combinator, Criterion, Operand, Operator};
pub use deferred_lookup::DeferredLookup;
pub use delete::DeleteQueryBuilder;
pub use last::LastQueryBuilder;
pub use many::ManyQueryBuilder;
pub use sql::QueryBuilder;
pub use unique::UniqueQueryBuilder;
pub use update::UpdateQueryBuilder;
pub use utils::Session;
