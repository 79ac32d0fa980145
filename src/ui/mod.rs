/// Screens and widgets
///
/// - crime_list.rs: the list screen and its two row layouts
/// - crime_detail.rs: the editing screen
/// - pickers.rs: date and time pickers used by the detail screen
/// - diff.rs: row diffing between list deliveries

pub mod crime_detail;
pub mod crime_list;
pub mod diff;
pub mod pickers;
