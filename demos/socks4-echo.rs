use socks_client::{create_connection, Command, SocksClientOptions, SocksProxy, SocksRemoteHost};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use std::process::exit;

#[tokio::main]
async fn main() {
    // The address of the proxy server that
    // will be used to connect through.
    // (We used a random proxy from `https://hidemy.name/en/proxy-list/`)
    let proxy_ipaddr: Ipv4Addr = Ipv4Addr::new(104, 248, 63, 15);

    // The port of the proxy server
    let proxy_port: u16 = 30_588;

    let proxy = SocksProxy::socks4(proxy_ipaddr.to_string(), proxy_port);

    // The address of the destination service
    // that we will be connecting to through proxy.
    // (We used a tcp echo server from `http://tcpbin.org/`)
    let dest_ipaddr: Ipv4Addr = Ipv4Addr::new(52, 20, 16, 20);

    // The port of the destination service
    let dest_port: u16 = 30_000;

    // The full `SocketAddrV4` destination service address representation
    let dest_addr: SocketAddrV4 = SocketAddrV4::new(dest_ipaddr, dest_port);
    let destination = SocksRemoteHost::new(dest_ipaddr.to_string(), dest_port);

    // Printing out information that we are starting
    // a connection to the Socks4 proxy server
    println!("Starting connection to the Socks4 proxy server `{}:{}`", proxy_ipaddr, proxy_port);
    println!("Starting connection to the destination `{}` throught socks4 proxy `{}:{}`",
              dest_addr, proxy_ipaddr, proxy_port);

    let options = SocksClientOptions::new(proxy, destination, Command::Connect)
        .with_timeout(Duration::from_secs(8));

    // Connecting to the service through proxy
    let mut established = match create_connection(options).await {
        Ok(established) => {
            println!("Successfully connected to the service through the proxy");
            established
        },
        Err(e) => {
            println!("Cannot connect to the service: {}", e);
            exit(1);
        }
    };

    // Getting a message that will be sent to the service
    println!("Please inter a message to be sent. Message: ");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)
                    .expect("Unable to read a line from stdin");

    // Sending the message to the service
    // with the timeout of 8 seconds
    let future = established.stream.write_all(input.as_bytes());
    let future = timeout(Duration::from_secs(8), future);
    future.await.expect("Timeout of 8 seconds reached")
                .expect("Unable to send the message");

    // Receiving a message from the service
    // with the timeout of 8 seconds
    let mut reply = String::new();
    let future = established.stream.read_to_string(&mut reply);
    let future = timeout(Duration::from_secs(8), future);
    future.await.expect("Timeout of 8 seconds reached")
                .expect("Unable to receive a string from the service");

    // Successfully received a message.
    // Printing it out
    println!("Received message from the service: {}", reply);
}
