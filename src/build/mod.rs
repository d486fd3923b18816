pub mod readiness;
pub mod source;

pub use readiness::{
    TerminalPhase, wait_builder_assigned, wait_init_container_running, wait_pod_assigned,
    wait_terminal_phase,
};
pub use source::{PodExec, archive_source, upload_source};
