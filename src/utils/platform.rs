//! Platform and architecture detection.

use std::fmt;

/// Represents the operating system where the program is running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    /// The Windows operating system.
    Windows,
    /// The Linux operating system.
    Linux,
    /// The macOS operating system.
    Mac,

    /// An unknown operating system.
    Unknown(String),
}

/// Represents the architecture of the CPU where the program is running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Architecture {
    /// The x86_64 architecture.
    X64,
    /// The Aarch64 (Arm64) architecture.
    Aarch64,

    /// An unknown architecture.
    Unknown(String),
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "Windows"),
            Platform::Linux => write!(f, "Linux"),
            Platform::Mac => write!(f, "MacOS"),
            Platform::Unknown(os) => write!(f, "Unknown: {}", os),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X64 => write!(f, "x64"),
            Architecture::Aarch64 => write!(f, "aarch64"),
            Architecture::Unknown(arch) => write!(f, "Unknown: {}", arch),
        }
    }
}

impl Platform {
    /// Detects the current platform where the program is running.
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            "macos" => Platform::Mac,
            os => Platform::Unknown(os.to_string()),
        }
    }

    /// The file name of the executable `name` on this platform.
    pub fn executable_name(&self, name: &str) -> String {
        match self {
            Platform::Windows => format!("{}.exe", name),
            _ => name.to_string(),
        }
    }
}

impl Architecture {
    /// Detects the current architecture of the CPU where the program is running.
    pub fn detect() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => Architecture::X64,
            "aarch64" => Architecture::Aarch64,
            arch => Architecture::Unknown(arch.to_string()),
        }
    }
}
