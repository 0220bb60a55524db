//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error
pub const DATAERR: i32 = 65;

/// Service unavailable (parameter store unreachable or empty)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error (service failed to (re)start)
pub const SOFTWARE: i32 = 70;

/// System error (service manager reload failed)
pub const OSERR: i32 = 71;

/// Can't create output file (environment file)
pub const CANTCREAT: i32 = 73;

/// Input/output error (unit file installation)
pub const IOERR: i32 = 74;

/// Temporary failure (runtime dependency installation)
pub const TEMPFAIL: i32 = 75;

/// Configuration error
pub const CONFIG: i32 = 78;
