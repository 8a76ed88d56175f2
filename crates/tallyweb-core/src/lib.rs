//! Resource models and the in-process event bus that couples them
//!
//! - bus: named-event publish/subscribe with supervised handlers
//! - model: the CRUD contract and the table engine behind it
//! - transactions / categories: the two concrete resources

pub mod bus;
pub mod categories;
pub mod error;
pub mod model;
pub mod transactions;

pub use bus::{DeadLetter, PubSub, DEFAULT_DEAD_LETTER_CAPACITY};
pub use categories::Categories;
pub use error::{CoreError, CoreResult, ErrorCode, ErrorSeverity};
pub use model::{ModelRef, Query, ResourceModel, Table};
pub use transactions::{Transactions, TRANSACTION_CREATED};

pub use tallyweb_store::Record;
