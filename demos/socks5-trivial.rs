use socks_client::{create_connection, Command, SocksClientOptions, SocksProxy, SocksRemoteHost};
use std::net::Ipv4Addr;
use std::time::Duration;
use std::process::exit;

#[tokio::main]
async fn main() {
    // The address of the proxy server that
    // will be used to connect through.
    // (We used a random proxy from `https://hidemy.name/en/proxy-list/`)
    let proxy = SocksProxy::socks5("72.11.148.222", 56533);

    // The address of the destination service
    // that we will be connecting to through proxy.
    // (We used a tcp echo server from `http://tcpbin.org/`)
    let dest_ipaddr: Ipv4Addr = Ipv4Addr::new(52, 20, 16, 20);

    // The port of the destination service
    const DEST_PORT: u16 = 30_000;

    let destination = SocksRemoteHost::new(dest_ipaddr.to_string(), DEST_PORT);

    // Printing out information that we are starting
    // a connection to the socks5 proxy server
    println!("Starting connection to the destination `{}:{}` throught socks5 proxy `{}:{}`",
              dest_ipaddr, DEST_PORT, proxy.host, proxy.port);

    let options = SocksClientOptions::new(proxy, destination, Command::Connect)
        .with_timeout(Duration::from_secs(8));

    // Connecting to the service through proxy
    let established = match create_connection(options).await {
        Ok(established) => {
            // Successfully connected to the service
            established
        },
        Err(e) => {
            println!("Cannot connect to the service: {}", e);
            exit(1);
        }
    };

    // -- using `established.stream` -- //
    let _ = established;
}
