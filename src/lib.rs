//! ctv: a terminal table viewer for a list of countries with live search,
//! paging, a single selection and a highlight color that changes with it.

pub mod color;
pub mod controller;
pub mod domain;
pub mod filter;
pub mod inputter;
pub mod logging;
pub mod model;
pub mod paginator;
pub mod record;
pub mod source;
pub mod table;
pub mod ui;

pub use domain::{CTVConfig, CTVError};
pub use paginator::GroupBy;
pub use record::Record;
pub use table::{RecordId, TableController};
