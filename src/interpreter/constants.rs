// Constants for the integer machine and its orchestrators

/// Value written by an input instruction when the provider answers "no value"
pub const IDLE_INPUT: i64 = -1;

/// Reserved network address of the idle monitor
pub const MONITOR_ADDRESS: i64 = 255;

/// Number of nodes in the reference packet network
pub const NETWORK_SIZE: usize = 50;

/// Number of machines in the reference feedback loop
pub const AMPLIFIER_COUNT: usize = 5;

/// Output values below this are character codes when rendered as text
pub const ASCII_LIMIT: i64 = 256;

/// Default memory budget for the execution history (256 MB)
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 256 * 1024 * 1024;
