pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    code_changed, code_removed, header, info, section, status, success, summary_row, timing,
};
pub use progress::Spinner;
pub use table::{files_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
