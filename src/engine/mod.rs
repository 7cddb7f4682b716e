pub mod dispatch;
pub mod fees;
pub mod settlement;
