//! Error types for the control layer.

use haptic_config::ConfigError;
use haptic_core::{GraphError, NodeConfigError};
use thiserror::Error;

use crate::device::{DeviceId, ProviderError};

/// Failures of the scheduling thread itself.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker has been stopped and accepts no more jobs.
    #[error("worker has stopped")]
    Stopped,

    /// The OS refused to start the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A query job was dropped or panicked before replying.
    #[error("worker dropped the query without replying")]
    NoReply,

    /// A blocking query was issued from the worker thread.
    #[error("blocking query issued from the worker thread")]
    Reentrant,
}

/// Errors surfaced by the controller and service.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Graph mutation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A node rejected its parameters.
    #[error(transparent)]
    Node(#[from] NodeConfigError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The worker is gone or misused.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// A device provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// No device with this id is registered with the controller.
    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    /// The device has fewer motors than the index requires.
    #[error("motor {motor} out of range for device {device}")]
    MotorOutOfRange {
        /// Device addressed.
        device: DeviceId,
        /// Requested motor index.
        motor: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_errors_pass_through_unchanged() {
        let err = ControlError::from(GraphError::CycleDetected);
        assert_eq!(err.to_string(), "linking would create a cycle");
    }

    #[test]
    fn motor_out_of_range_message() {
        let err = ControlError::MotorOutOfRange {
            device: DeviceId(3),
            motor: 2,
        };
        assert_eq!(err.to_string(), "motor 2 out of range for device #3");
    }
}
