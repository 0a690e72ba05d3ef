// ripd: a simplified RIPv2 routing daemon
// Copyright (C) 2024-2025 Roland Schmid <roschmi@ethz.ch> and Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
use std::path::PathBuf;

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};

use ripd::config::Config;
use ripd::event_loop::EventLoop;
use ripd::transport::UdpTransport;

#[derive(Parser, Debug)]
#[command(about = "A simplified RIPv2 distance-vector routing daemon.", long_about = None)]
struct Args {
    /// Path to the router configuration file.
    #[arg(default_value = "router.conf")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    log::info!(
        "router {} starting: {} input port(s), {} neighbor(s), timers ({}, {}, {})",
        config.router_id,
        config.input_ports.len(),
        config.neighbors.len(),
        config.scheduled_period,
        config.timeout_period,
        config.garbage_period,
    );

    let transport = UdpTransport::bind(&config.input_ports).await?;
    let rng = StdRng::from_entropy();

    let mut event_loop = EventLoop::new(config, transport, rng);
    event_loop.run().await;

    Ok(())
}
