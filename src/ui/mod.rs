pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, info, interrupted, section, success, timing, warn};
pub use progress::Monitor;
pub use table::{errors_table, summary_table};
pub use theme::{theme, Theme};
