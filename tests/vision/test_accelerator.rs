// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Accelerator lease accounting under concurrent use

use gonggu_ai_router::vision::{AcceleratorContext, Device};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_concurrent_leases_are_serialized() {
    let context = Arc::new(AcceleratorContext::new(Vec::<usize>::new(), Device::Cpu));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let context = context.clone();
            thread::spawn(move || {
                let mut lease = context.lease();
                assert_eq!(context.active_leases(), 1);
                lease.push(i);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(context.active_leases(), 0);
    assert_eq!(context.completed_leases(), 8);
    assert_eq!(context.lease().len(), 8);
}

#[test]
fn test_lease_released_when_inference_fails() {
    let context = AcceleratorContext::new(0u32, Device::Cuda);

    let run = |ctx: &AcceleratorContext<u32>| -> Result<u32, String> {
        let lease = ctx.lease();
        if *lease == 0 {
            return Err("input tensor rejected".to_string());
        }
        Ok(*lease)
    };

    assert!(run(&context).is_err());
    assert_eq!(context.active_leases(), 0);
    assert_eq!(context.completed_leases(), 1);
    assert_eq!(context.device(), Device::Cuda);
}

#[test]
fn test_cancelled_waiter_does_not_queue_behind_slow_inference() {
    let context = Arc::new(AcceleratorContext::new(0u32, Device::Cuda));
    let cancelled = Arc::new(AtomicBool::new(false));

    let slow = {
        let context = context.clone();
        thread::spawn(move || {
            let mut lease = context.lease();
            thread::sleep(Duration::from_millis(500));
            *lease += 1;
        })
    };
    thread::sleep(Duration::from_millis(20));

    let waiter = {
        let context = context.clone();
        let cancelled = cancelled.clone();
        thread::spawn(move || {
            let start = Instant::now();
            let leased = context.lease_unless(&cancelled).is_some();
            (leased, start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(30));
    cancelled.store(true, Ordering::SeqCst);

    let (leased, waited) = waiter.join().unwrap();
    assert!(!leased);
    assert!(waited < Duration::from_millis(400));

    slow.join().unwrap();
    assert_eq!(context.active_leases(), 0);
    assert_eq!(context.completed_leases(), 1);
    assert_eq!(*context.lease(), 1);
}
