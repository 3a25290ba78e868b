pub mod health;
pub mod lifecycle;
pub mod matches;
pub mod pagination;
pub mod rescan;
