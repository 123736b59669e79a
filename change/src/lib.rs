mod desc;
mod error;
mod section;
mod set;
mod spec;

pub use desc::{ChangeDesc, MapMode, Touches};
pub use error::ChangeError;
pub use set::{ChangeSet, FilterResult};
pub use spec::{ChangeInsert, ChangeSpec};
