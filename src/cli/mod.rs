pub mod calc;
pub mod history;
pub mod rates;
pub mod ui;
pub mod watch;
