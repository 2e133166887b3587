//! Device and backend identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device class a model is bound to. Values follow the DLPack device codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum DeviceType {
    Cpu = 1,
    Gpu = 2,
    CpuPinned = 3,
    OpenCl = 4,
    Vulkan = 7,
    Metal = 8,
    Vpi = 9,
    Rocm = 10,
    ExtDev = 12,
}

impl DeviceType {
    /// Map a DLPack device code to a [`DeviceType`].
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::Cpu,
            2 => Self::Gpu,
            3 => Self::CpuPinned,
            4 => Self::OpenCl,
            7 => Self::Vulkan,
            8 => Self::Metal,
            9 => Self::Vpi,
            10 => Self::Rocm,
            12 => Self::ExtDev,
            _ => return None,
        })
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::CpuPinned => "cpu_pinned",
            Self::OpenCl => "opencl",
            Self::Vulkan => "vulkan",
            Self::Metal => "metal",
            Self::Vpi => "vpi",
            Self::Rocm => "rocm",
            Self::ExtDev => "ext_dev",
        };
        write!(f, "{}", s)
    }
}

/// Device a model instance is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub device_type: DeviceType,
    pub device_id: i32,
}

impl DeviceContext {
    pub fn new(device_type: DeviceType, device_id: i32) -> Self {
        Self {
            device_type,
            device_id,
        }
    }

    /// CPU device 0.
    pub fn cpu() -> Self {
        Self::new(DeviceType::Cpu, 0)
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::cpu()
    }
}

impl fmt::Display for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device_type, self.device_id)
    }
}

/// Backend engine behind a [`Model`](crate::Model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Qualcomm Hexagon DSP runtime, loaded from a `*_hexagon_model.so`.
    Hexagon,
    /// Treelite decision-tree ensemble predictor.
    Treelite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hexagon => write!(f, "Hexagon"),
            Self::Treelite => write!(f, "Treelite"),
        }
    }
}
