//! Log message constants for the harness
//!
//! Values that vary between lines travel as structured `tracing` fields, so
//! the messages themselves stay fixed and easy to grep in a run's output.

/// Harness lifecycle messages
pub mod harness {
    pub const STARTING: &str = "Starting lock harness";
    pub const STARTING_TEST: &str = "Starting Test";
    pub const TEST_COMPLETE: &str = "Test Complete";
    pub const TEST_PASSED: &str = "All workers completed and serialization held";
    pub const TEST_FAILED: &str = "Scenario finished with failures";
    pub const VIOLATION: &str = "Serialization property violated";
    pub const TEARDOWN_FAILED_AFTER_ERROR: &str =
        "Teardown failed while handling an earlier error";
}

/// Container runtime messages
pub mod container {
    pub const OUTPUT_TAG: &str = "docker-container";
    pub const STARTING_SERVER: &str = "Starting MySQL Server";
    pub const STOPPING_SERVER: &str = "Stopping MySQL Server";
    pub const STOPPED_SERVER: &str = "Stopped MySQL Server";
    pub const INIT_SCRIPT_WRITTEN: &str = "Init script written";
    pub const INIT_SCRIPT_REMOVE_FAILED: &str = "Failed to remove init script";
}

/// Readiness probe messages
pub mod readiness {
    pub const TRYING_TO_CONNECT: &str = "Trying to Connect to MySQL Server";
    pub const PROBE_FAILED: &str = "MySQL Server not ready yet";
    pub const PROBE_TIMED_OUT: &str = "Readiness probe timed out";
    pub const STARTED_SERVER: &str = "Started MySQL Server";
    pub const GAVE_UP: &str = "MySQL Server never became ready";
}

/// Per-worker scenario messages
pub mod worker {
    pub const TRYING_TO_LOCK: &str = "Trying to acquire write lock";
    pub const LOCK_ACQUIRED: &str = "Write lock acquired";
    pub const INITIAL_MAX: &str = "Fetched initial max ID";
    pub const ROW_INSERTED: &str = "Inserted row(s)";
    pub const FINAL_MAX: &str = "Fetched final max ID";
    pub const FINAL_MAX_NAME: &str = "Fetched final max ID name";
    pub const RELEASING_LOCK: &str = "Releasing write lock";
    pub const FAILED: &str = "Worker failed";
    pub const PANICKED: &str = "Worker task panicked";
    pub const CLOSE_FAILED: &str = "Failed to close worker connection";
}
