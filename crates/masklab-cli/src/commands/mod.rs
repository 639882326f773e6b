pub mod batch_import;
pub mod cases;
pub mod classroom;
pub mod dashboard;
pub mod import;
pub mod practice;
pub mod score;
pub mod session;
pub mod update;
