// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! pagewire CLI - drive page requests through the host bridge
//!
//! Spins up a bridge, a static file host, and one page-side request.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use pagewire::{run_host, BridgeConfig, HostBridge, Interceptor, StaticFileHost, XhrEventKind};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pagewire=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "fetch" => {
            if args.len() < 4 {
                eprintln!("Usage: pagewire fetch <root> <url>");
                return ExitCode::from(1);
            }
            run_fetch(&args[2], &args[3]).await
        }
        "xhr" => {
            if args.len() < 5 {
                eprintln!("Usage: pagewire xhr <root> <method> <url> [name:value ...]");
                return ExitCode::from(1);
            }
            run_xhr(&args[2], &args[3], &args[4], &args[5..]).await
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("pagewire {}", pagewire::VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"pagewire - Page Network Interception Bridge

USAGE:
    pagewire <COMMAND> [OPTIONS]

COMMANDS:
    fetch <root> <url>                       fetch() a URL served from <root>
    xhr <root> <method> <url> [name:value]   Send an XMLHttpRequest served from <root>
    help                                     Show this help message
    version                                  Show version information

EXAMPLES:
    pagewire fetch ./dist /pkg/client_bg.wasm
    pagewire xhr ./dist GET /index.html Accept:text/html

Set RUST_LOG=pagewire=debug to see bridge traffic.
"#
    );
}

/// Bridge plus a static host serving `root`
fn start_host(root: &str) -> anyhow::Result<Interceptor> {
    let (bridge, to_host) = HostBridge::with_channel(BridgeConfig::default());
    let host = Arc::new(StaticFileHost::new(root)?);
    tokio::spawn(run_host(bridge.downgrade(), to_host, host));
    Ok(Interceptor::new(bridge))
}

async fn run_fetch(root: &str, url: &str) -> ExitCode {
    let page = match start_host(root) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Failed to start host: {}", e);
            return ExitCode::from(1);
        }
    };

    match page.fetch(url).await {
        Ok(body) => {
            println!("\n=== fetch {} ===", url);
            println!("Size: {} bytes", body.len());
            let preview: Vec<String> = body
                .iter()
                .take(16)
                .map(|b| format!("{:02x}", b))
                .collect();
            println!("Head: {}", preview.join(" "));
            print_traffic(&page);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("fetch failed: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run_xhr(root: &str, method: &str, url: &str, headers: &[String]) -> ExitCode {
    let page = match start_host(root) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Failed to start host: {}", e);
            return ExitCode::from(1);
        }
    };

    let xhr = page.xml_http_request();
    let (tx, done) = oneshot::channel();
    let tx = parking_lot::Mutex::new(Some(tx));
    xhr.add_event_listener(XhrEventKind::LoadEnd, move |_| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(());
        }
    });

    xhr.open(method, url);
    for header in headers {
        let Some((name, value)) = header.split_once(':') else {
            eprintln!("Ignoring malformed header: {}", header);
            continue;
        };
        if let Err(e) = xhr.set_request_header(name.trim(), value.trim()) {
            eprintln!("Failed to set header: {}", e);
            return ExitCode::from(1);
        }
    }

    if let Err(e) = xhr.send(None) {
        eprintln!("send failed: {}", e);
        return ExitCode::from(1);
    }
    let _ = done.await;

    if let Some(error) = xhr.error() {
        eprintln!("XHR failed: {}", error);
        return ExitCode::from(1);
    }

    println!("\n=== {} {} ===", method, url);
    println!("Status: {}", xhr.status());
    print!("{}", xhr.get_all_response_headers());
    let text = xhr.response_text();
    println!("Size: {} bytes", text.len());
    println!("\n{}", text.chars().take(500).collect::<String>());
    print_traffic(&page);

    ExitCode::SUCCESS
}

fn print_traffic(page: &Interceptor) {
    let traffic = page.bridge().traffic().entries();
    println!("\n=== Traffic ({}) ===", traffic.len());
    for exchange in traffic {
        let elapsed = exchange
            .duration()
            .map(|d| format!("{}ms", d.num_milliseconds()))
            .unwrap_or_else(|| "pending".to_string());
        println!(
            "  - [{}] {} {} ({})",
            exchange.handle, exchange.method, exchange.url, elapsed
        );
    }
}
