//! Application services orchestrating a harness run
//!
//! Provisioning, the concurrent locking scenario, and teardown, coordinated
//! by [`Harness`].

pub mod app;
pub mod provisioner;
pub mod scenario;
pub mod teardown;

pub use app::Harness;
pub use provisioner::Provisioner;
pub use scenario::ScenarioRunner;
pub use teardown::teardown;
