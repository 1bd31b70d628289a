pub mod bluetooth;
pub mod logging;
pub mod turn_pipe;
