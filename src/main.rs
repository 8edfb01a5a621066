//! Loopback demo: two link endpoints wired back to back in one process.
//!
//! ```text
//! ┌────────────┐  frames (mpsc)  ┌──────────┐  bytes  ┌────────────┐
//! │ host engine│────────────────▶│ rx pump  │────────▶│ device     │
//! │            │◀────────────────│ threads  │◀────────│ engine     │
//! └────────────┘                 └──────────┘         └────────────┘
//! ```
//!
//! The device side registers a few functions; the host calls them and logs
//! each reply, then prints both sides' link counters as JSON.
//!
//! Usage: `uartrpc-loopback [config.json]`

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};

use uartrpc::{
    ByteIntake, HandlerError, HandlerResult, Reply, ReplyCallback, RpcBuilder, RpcConfig,
    Transport, callback,
};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Transmit side of an in-process wire.
struct PipeTransport(Sender<Vec<u8>>);

impl Transport for PipeTransport {
    type Error = mpsc::SendError<Vec<u8>>;

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.0.send(frame.to_vec())
    }
}

/// Receive side of an in-process wire: replays frames byte by byte, the way
/// a UART RX interrupt would.
fn spawn_rx_pump(name: &str, wire: Receiver<Vec<u8>>, mut intake: ByteIntake) -> Result<()> {
    thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            for frame in wire {
                for byte in frame {
                    intake.feed_byte(byte);
                }
            }
        })
        .with_context(|| format!("spawning {name}"))?;
    Ok(())
}

fn load_config() -> Result<RpcConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(RpcConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config: RpcConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    info!("Loaded config from {}", path);
    Ok(config)
}

type Outcome = (u32, bool, Vec<u8>);

/// Forward a reply to the waiting caller, which may have timed out already.
fn reply_sink(done: Sender<Outcome>) -> ReplyCallback {
    callback(move |reply: Reply<'_>| {
        if done
            .send((reply.id, reply.is_error, reply.data.to_vec()))
            .is_err()
        {
            debug!("id={} answered after the caller stopped waiting", reply.id);
        }
    })
}

fn sum(args: &[u8]) -> HandlerResult {
    let total: u32 = args.iter().map(|&b| u32::from(b)).sum();
    Ok(total.to_le_bytes().to_vec())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = load_config()?;

    let (to_device, device_rx) = mpsc::channel();
    let (to_host, host_rx) = mpsc::channel();

    // ── Device side ───────────────────────────────────────────
    let mut device = RpcBuilder::new(PipeTransport(to_host)).with_config(config.clone());
    device.register_function("echo", |args: &[u8]| -> HandlerResult { Ok(args.to_vec()) })?;
    device.register_function("sum", sum)?;
    device.register_function("fail", |_: &[u8]| -> HandlerResult { Err(HandlerError) })?;
    let (device, device_intake) = device.build()?;
    info!(
        "Device serves: {}",
        device.registry().names().collect::<Vec<_>>().join(", ")
    );
    let device_workers = device.spawn_workers()?;
    spawn_rx_pump("rx-device", device_rx, device_intake)?;

    // ── Host side ─────────────────────────────────────────────
    let (host, host_intake) = RpcBuilder::new(PipeTransport(to_device))
        .with_config(config)
        .build()?;
    let host_workers = host.spawn_workers()?;
    spawn_rx_pump("rx-host", host_rx, host_intake)?;

    let calls: [(&str, &[u8]); 4] = [
        ("echo", &b"hello"[..]),
        ("sum", &[1, 2, 3, 250]),
        ("fail", &[]),
        ("missing", &[0]),
    ];

    let (done_tx, done_rx) = mpsc::channel();
    for (name, args) in calls {
        let id = host.send_request(name, args, Some(reply_sink(done_tx.clone())))?;
        info!("Called '{}' as id={}", name, id);
    }
    drop(done_tx);

    for _ in 0..calls.len() {
        match done_rx.recv_timeout(REPLY_TIMEOUT) {
            Ok((id, false, data)) => info!("id={} ok: {:02X?}", id, data),
            Ok((id, true, _)) => warn!("id={} failed on the device", id),
            Err(_) => bail!(
                "timed out waiting for replies ({} still pending)",
                host.pending_count()
            ),
        }
    }

    host_workers.shutdown();
    device_workers.shutdown();

    info!("host stats: {}", serde_json::to_string(&host.stats())?);
    info!("device stats: {}", serde_json::to_string(&device.stats())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(id: u32, data: &[u8]) -> Reply<'_> {
        Reply {
            id,
            data,
            is_error: false,
        }
    }

    #[test]
    fn reply_sink_forwards_outcome() {
        let (tx, rx) = mpsc::channel();
        reply_sink(tx)(reply(3, &[9]));
        assert_eq!(rx.try_recv().unwrap(), (3, false, vec![9]));
    }

    #[test]
    fn late_reply_after_timeout_is_tolerated() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        reply_sink(tx)(reply(4, &[]));
    }

    #[test]
    fn sum_is_little_endian() {
        assert_eq!(sum(&[1, 2, 3, 250]).unwrap(), 256u32.to_le_bytes().to_vec());
    }
}
