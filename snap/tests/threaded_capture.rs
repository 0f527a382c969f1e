#![cfg(feature = "std")]

//! End-to-end captures with a producer thread standing in for the DMA
//! completion interrupt.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cgsnap::{
    ByteOrder, CancelStatus, CaptureRegion, Chunk, Clock, CondvarWaitHandle, CoreRegisters,
    DmaEngine, DmaError, DmaMode, SnapConfig, SnapDevice, SnapError, SnapPhase, SpinWaitHandle,
    WaitHandle,
};

const BUS: u32 = 0x2000_0000;

// ═══════════════════════════════════════════════════════════════════════════
// SIMULATED HARDWARE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct SimShared {
    programmed: Vec<Chunk>,
    stops: u32,
    requested: u32,
    remaining: u32,
}

#[derive(Clone)]
struct SimDma {
    mode: DmaMode,
    shared: Arc<Mutex<SimShared>>,
}

impl SimDma {
    fn new(mode: DmaMode) -> Self {
        Self {
            mode,
            shared: Arc::new(Mutex::new(SimShared::default())),
        }
    }
}

impl DmaEngine for SimDma {
    fn program(&mut self, chunks: &[Chunk], _channel: u8) -> Result<(), DmaError> {
        self.shared.lock().unwrap().programmed.extend_from_slice(chunks);
        Ok(())
    }

    fn start(&mut self, _channel: u8) {}

    fn stop(&mut self, _channel: u8) {
        self.shared.lock().unwrap().stops += 1;
    }

    fn requested_count(&self, _channel: u8) -> u32 {
        self.shared.lock().unwrap().requested
    }

    fn remaining_count(&self, _channel: u8) -> u32 {
        self.shared.lock().unwrap().remaining
    }

    fn mode(&self) -> DmaMode {
        self.mode
    }
}

#[derive(Default)]
struct SimRegs([u32; 8]);

impl CoreRegisters for SimRegs {
    fn read_reg(&mut self, offset: u32) -> u32 {
        self.0[(offset / 4) as usize % 8]
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        self.0[(offset / 4) as usize % 8] = value;
    }
}

struct HostClock(Instant);

impl Clock for HostClock {
    fn ticks(&self) -> u64 {
        self.0.elapsed().as_micros() as u64
    }
}

fn device<W: WaitHandle>(
    backing: &mut [u8],
    dma: SimDma,
    waiter: W,
    config: SnapConfig,
) -> SnapDevice<SimDma, SimRegs, W> {
    let region = unsafe { CaptureRegion::new(backing.as_mut_ptr(), BUS, backing.len() as u32) };
    SnapDevice::new(dma, SimRegs::default(), waiter, region, config)
}

/// Land chunk `index` of the programmed list in the capture buffer and
/// raise the completion interrupt.
fn land_chunk<W: WaitHandle>(dev: &SnapDevice<SimDma, SimRegs, W>, dma: &SimDma, index: usize, fill: u8) {
    let chunk = dma.shared.lock().unwrap().programmed[index];
    let offset = dev.region().offset_of(chunk.offset).unwrap();
    unsafe { dev.region().slice_mut(offset, chunk.length).unwrap() }.fill(fill);
    dev.on_chunk_complete();
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_consumer_follows_producer_through_ring() {
    let mut backing = vec![0u8; 2048];
    let dma = SimDma::new(DmaMode::ScatterGather);
    let dev = device(&mut backing, dma.clone(), CondvarWaitHandle::new(), SnapConfig::new());

    dev.plan(8 * 512, 512, ByteOrder::native()).unwrap();
    dev.start().unwrap();

    let (go_tx, go_rx) = mpsc::channel::<usize>();

    thread::scope(|s| {
        let (dev, dma) = (&dev, &dma);
        s.spawn(move || {
            for index in go_rx.iter() {
                thread::sleep(Duration::from_millis(2));
                land_chunk(&dev, &dma, index, index as u8 + 1);
            }
        });

        let mut out = [0u8; 512];
        for b in 0..8u32 {
            go_tx.send(b as usize).unwrap();
            let block = dev.wait_block(b, 2_000).unwrap();
            assert_eq!(block.offset, 512 * (b % 4));
            assert_eq!(dev.read_block(&block, &mut out), Ok(512));
            assert!(out.iter().all(|&x| x == b as u8 + 1));
        }
        drop(go_tx);
    });

    let status = dev.status();
    assert_eq!(status.phase, SnapPhase::Done);
    assert_eq!(status.received_bytes, 4096);
    assert_eq!(status.received_blocks, 8);
}

#[test]
fn test_rearm_engine_end_to_end() {
    let mut backing = vec![0u8; 1024];
    let dma = SimDma::new(DmaMode::RearmPerChunk);
    let dev = device(
        &mut backing,
        dma.clone(),
        CondvarWaitHandle::new(),
        SnapConfig::new().with_max_chunk_size(256),
    );

    let summary = dev.plan(2048, 1024, ByteOrder::native()).unwrap();
    assert_eq!(summary.required_chunks, 8);
    dev.start().unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..8 {
                thread::sleep(Duration::from_millis(1));
                land_chunk(&dev, &dma, i, 0xA0 + i as u8);
            }
        });

        assert!(dev.wait_block(1, 2_000).is_ok());
    });

    // One descriptor at start plus one re-arm per non-final chunk.
    assert_eq!(dma.shared.lock().unwrap().programmed.len(), 8);
    assert_eq!(dev.status().phase, SnapPhase::Done);
}

#[test]
fn test_cancel_unblocks_waiting_consumer() {
    let mut backing = vec![0u8; 4096];
    let dma = SimDma::new(DmaMode::ScatterGather);
    let dev = device(&mut backing, dma.clone(), CondvarWaitHandle::new(), SnapConfig::new());

    dev.plan(8 * 1024, 1024, ByteOrder::native()).unwrap();
    dev.start().unwrap();
    land_chunk(&dev, &dma, 0, 1);
    land_chunk(&dev, &dma, 1, 2);

    let started = Instant::now();
    thread::scope(|s| {
        let waiter = s.spawn(|| dev.wait_block(5, 10_000));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(dev.request_cancel(0), Ok(CancelStatus::Canceled));

        assert_eq!(waiter.join().unwrap(), Err(SnapError::Canceled));
    });
    assert!(started.elapsed() < Duration::from_secs(5));

    // Data that landed before the cancel stays addressable.
    assert!(dev.wait_block(1, 0).is_ok());
    assert_eq!(dma.shared.lock().unwrap().stops, 1);
}

#[test]
fn test_cutoff_bounds_received_blocks() {
    let mut backing = vec![0u8; 8192];
    let dma = SimDma::new(DmaMode::ScatterGather);
    let config = SnapConfig::new().with_cancel_calibration(1024, 2048);
    let dev = device(&mut backing, dma.clone(), CondvarWaitHandle::new(), config);

    dev.plan(8 * 1024, 1024, ByteOrder::native()).unwrap();
    dev.start().unwrap();
    land_chunk(&dev, &dma, 0, 1);
    land_chunk(&dev, &dma, 1, 2);

    // Third burst already queued in the engine.
    {
        let mut shared = dma.shared.lock().unwrap();
        shared.requested = 1024;
        shared.remaining = 0;
    }

    // 4096 - 2048 pre-roll = cutoff at 2048 bytes.
    let n = 4096;
    assert_eq!(dev.request_cancel(n), Ok(CancelStatus::Canceled));
    assert_eq!(dev.status().cancel.on_byte, 2048);

    let cutoff_block = n.div_ceil(1024);
    assert_eq!(dev.wait_block(cutoff_block - 1, 0), Err(SnapError::Canceled));

    // The queued burst still lands but is never counted.
    land_chunk(&dev, &dma, 2, 3);
    let status = dev.status();
    assert_eq!(status.received_blocks, 2);
    for b in 2..8 {
        assert_eq!(dev.wait_block(b, 0), Err(SnapError::Canceled));
    }
}

#[test]
fn test_cutoff_stops_capture_with_no_consumer() {
    let mut backing = vec![0u8; 2048];
    let dma = SimDma::new(DmaMode::ScatterGather);
    let config = SnapConfig::new().with_cancel_calibration(1024, 0);
    let dev = device(&mut backing, dma.clone(), CondvarWaitHandle::new(), config);

    dev.plan(8 * 1024, 1024, ByteOrder::native()).unwrap();
    dev.start().unwrap();
    assert_eq!(dev.request_cancel(3072), Ok(CancelStatus::Pending));

    // The engine runs until it is stopped; nobody is waiting.
    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..8 {
                if dma.shared.lock().unwrap().stops > 0 {
                    break;
                }
                land_chunk(&dev, &dma, i, i as u8 + 1);
            }
        });
    });

    let status = dev.status();
    assert_eq!(status.phase, SnapPhase::Canceled);
    assert_eq!(status.received_blocks, 3);
    assert_eq!(dma.shared.lock().unwrap().stops, 1);

    // Block 2 sits in slot 0 of the two-slot ring and is still intact.
    let block = dev.wait_block(2, 0).unwrap();
    let mut out = [0u8; 1024];
    assert_eq!(dev.read_block(&block, &mut out), Ok(1024));
    assert!(out.iter().all(|&x| x == 3));
    for b in 3..8 {
        assert_eq!(dev.wait_block(b, 0), Err(SnapError::Canceled));
    }
    assert!(dev.plan(1024, 0, ByteOrder::native()).is_ok());
}

#[test]
fn test_wait_budget_not_extended_by_other_blocks() {
    let mut backing = vec![0u8; 8192];
    let dma = SimDma::new(DmaMode::ScatterGather);
    let dev = device(&mut backing, dma.clone(), CondvarWaitHandle::new(), SnapConfig::new());

    dev.plan(8 * 1024, 1024, ByteOrder::native()).unwrap();
    dev.start().unwrap();

    thread::scope(|s| {
        // Blocks 0..6 keep arriving; block 7 never does.
        s.spawn(|| {
            for i in 0..7 {
                thread::sleep(Duration::from_millis(25));
                land_chunk(&dev, &dma, i, 0);
            }
        });

        let started = Instant::now();
        assert_eq!(dev.wait_block(7, 60), Err(SnapError::Timeout));
        assert!(started.elapsed() < Duration::from_millis(150));
    });
}

#[test]
fn test_timeout_leaves_state_untouched() {
    let mut backing = vec![0u8; 4096];
    let dma = SimDma::new(DmaMode::ScatterGather);
    let dev = device(&mut backing, dma.clone(), CondvarWaitHandle::new(), SnapConfig::new());

    dev.plan(4096, 1024, ByteOrder::native()).unwrap();
    dev.start().unwrap();

    let before = dev.status();
    assert_eq!(dev.wait_block(0, 5), Err(SnapError::Timeout));
    assert_eq!(dev.status(), before);
}

#[test]
fn test_spin_wait_handle_with_host_clock() {
    let mut backing = vec![0u8; 4096];
    let dma = SimDma::new(DmaMode::ScatterGather);
    let waiter = SpinWaitHandle::new(HostClock(Instant::now()), 1_000_000);
    let dev = device(&mut backing, dma.clone(), waiter, SnapConfig::new());

    let foreign = match ByteOrder::native() {
        ByteOrder::O4321 => ByteOrder::O2143,
        _ => ByteOrder::O3412,
    };
    dev.plan(2048, 1024, foreign).unwrap();
    dev.start().unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            thread::sleep(Duration::from_millis(5));
            let chunk = dma.shared.lock().unwrap().programmed[0];
            let offset = dev.region().offset_of(chunk.offset).unwrap();
            let bytes = unsafe { dev.region().slice_mut(offset, 4).unwrap() };
            bytes.copy_from_slice(&[1, 2, 3, 4]);
            dev.on_chunk_complete();
        });

        let block = dev.wait_block(0, 2_000).unwrap();
        let mut out = [0u8; 4];
        dev.read_block(&block, &mut out).unwrap();
        assert_eq!(out, [3, 4, 1, 2]);
    });

    assert_eq!(dev.wait_block(1, 1), Err(SnapError::Timeout));
}
