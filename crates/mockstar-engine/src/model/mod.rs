//! In-memory model of a scanned mocker tree.

mod mock_module;
mod mocker;

pub use mock_module::MockModule;
pub use mocker::Mocker;
