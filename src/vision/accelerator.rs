// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scoped access to the detector's inference device
//!
//! The device memory behind a detector session is scarce and shared by every
//! request, so callers never touch the session directly. They take an
//! [`AcceleratorLease`], which serializes use and is returned on every exit
//! path (normal return, `?` propagation, or unwinding).

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// How often a waiting [`AcceleratorContext::lease_unless`] re-checks its flag
const LEASE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Inference device selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cuda" | "gpu" => Ok(Device::Cuda),
            "cpu" => Ok(Device::Cpu),
            other => Err(format!("unknown device '{}', expected cuda or cpu", other)),
        }
    }
}

/// Exclusive owner of a device-bound resource (e.g., an ONNX session)
pub struct AcceleratorContext<T> {
    resource: Mutex<T>,
    device: Device,
    active: AtomicUsize,
    completed: AtomicU64,
}

impl<T> AcceleratorContext<T> {
    pub fn new(resource: T, device: Device) -> Self {
        Self {
            resource: Mutex::new(resource),
            device,
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Block until the resource is free and take it
    ///
    /// A lease dropped during a panic leaves the mutex poisoned; the next
    /// lease recovers it instead of failing every later request.
    pub fn lease(&self) -> AcceleratorLease<'_, T> {
        let guard = self.resource.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering {} accelerator context after a panicked inference", self.device);
            poisoned.into_inner()
        });
        self.wrap(guard)
    }

    /// Wait for the resource unless `cancelled` is raised first
    ///
    /// Returns `None` once the flag is set, whether it was raised while
    /// waiting or already set when the resource came free. Work whose caller
    /// has given up therefore never occupies the device.
    pub fn lease_unless(&self, cancelled: &AtomicBool) -> Option<AcceleratorLease<'_, T>> {
        loop {
            if cancelled.load(Ordering::SeqCst) {
                debug!("Abandoned {} accelerator lease: caller cancelled", self.device);
                return None;
            }
            let guard = match self.resource.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => {
                    warn!("Recovering {} accelerator context after a panicked inference", self.device);
                    poisoned.into_inner()
                }
                Err(TryLockError::WouldBlock) => {
                    std::thread::sleep(LEASE_POLL_INTERVAL);
                    continue;
                }
            };
            if cancelled.load(Ordering::SeqCst) {
                debug!("Abandoned {} accelerator lease: caller cancelled", self.device);
                return None;
            }
            return Some(self.wrap(guard));
        }
    }

    fn wrap<'a>(&'a self, guard: MutexGuard<'a, T>) -> AcceleratorLease<'a, T> {
        self.active.fetch_add(1, Ordering::SeqCst);
        AcceleratorLease {
            guard,
            active: &self.active,
            completed: &self.completed,
            device: self.device,
        }
    }

    /// Leases currently held (0 or 1)
    pub fn active_leases(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Leases taken and released since construction
    pub fn completed_leases(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Guard over the device resource; releases on drop
pub struct AcceleratorLease<'a, T> {
    guard: MutexGuard<'a, T>,
    active: &'a AtomicUsize,
    completed: &'a AtomicU64,
    device: Device,
}

impl<T> Deref for AcceleratorLease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for AcceleratorLease<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for AcceleratorLease<'_, T> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        trace!("Released {} accelerator lease", self.device);
    }
}
