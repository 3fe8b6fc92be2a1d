mod config;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use clap::{App, Arg};
use slog::info;

use cip_net::socket_factory::{self, UdpSocketKind};
use cip_net::EventLoop;
use cip_objects::{identity_class, message_router_class, DeviceHandler};

use config::DeviceConfig;

fn main() {
    let matches = App::new("CIP Device")
        .version("1.0")
        .about("An embedded CIP/EtherNet-IP device stack")
        .arg(
            Arg::with_name("CONFIG_FILE")
                .long("config")
                .short("c")
                .help("Path to the device's TOML configuration file")
                .takes_value(true),
        )
        .get_matches();

    let config = match matches.value_of("CONFIG_FILE") {
        Some(path) => DeviceConfig::load(path),
        None => DeviceConfig::default(),
    };

    let logger = config.logging.build();
    info!(logger, "starting cip-device"; "tcp_port" => config.network.tcp_port);

    let mut router = cip_core::Router::with_logger(logger.clone());
    router
        .registry_mut()
        .register(message_router_class(2))
        .expect("message router registers exactly once");
    router
        .registry_mut()
        .register(identity_class((&config.identity).into()))
        .expect("identity registers exactly once");

    let mut handler = DeviceHandler::new(router, (&config.identity).into());

    let tcp_addr: SocketAddr = format!("{}:{}", config.network.bind_address, config.network.tcp_port)
        .parse()
        .expect("invalid bind_address/tcp_port");
    let broadcast_addr: SocketAddr = format!("{}:{}", config.network.bind_address, config.network.broadcast_port)
        .parse()
        .expect("invalid bind_address/broadcast_port");

    let broadcast_socket = socket_factory::create_udp_socket(
        UdpSocketKind::Broadcast,
        broadcast_addr,
        socket_factory::DEFAULT_MULTICAST_TTL,
        None,
    )
    .expect("failed to create UDP broadcast socket");

    let tick = Duration::from_millis(config.network.tick_millis as u64);
    let mut event_loop = EventLoop::new(tcp_addr, broadcast_socket, tick, Instant::now(), logger.clone())
        .expect("failed to set up the event loop");

    info!(logger, "listening"; "addr" => %event_loop.local_tcp_addr().unwrap());

    loop {
        let result = event_loop.poll_once(
            Instant::now(),
            &mut handler,
            &mut |_connections| {
                // Periodic maintenance (session timeouts, keepalive) hooks in here.
            },
            &mut |_connection_id, _datagram| {
                // Implicit I/O data from consuming UDP sockets hooks in here.
            },
        );

        if let Err(err) = result {
            slog::error!(logger, "event loop iteration failed"; "error" => %err);
        }
    }
}
