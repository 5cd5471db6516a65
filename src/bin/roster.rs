use std::process;

use roster::config;
use roster::ipc;
use roster::protocol::SocketMessage;

fn main() {
    let json = std::env::args().any(|arg| arg == "--json");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    match rt.block_on(stream_messages(json)) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("roster: {e}");
            process::exit(2);
        }
    }
}

/// Print every message from the daemon until it closes the stream.
async fn stream_messages(json: bool) -> std::io::Result<()> {
    let config = config::load();
    let mut stream = ipc::client::connect(&config.socket.resolve_path()).await?;

    while let Some(message) = ipc::client::read_message(&mut stream).await? {
        if json {
            print_json(&message);
        } else {
            print_text(&message);
        }
    }
    Ok(())
}

fn print_json(message: &SocketMessage) {
    let value = match message {
        SocketMessage::List(apps) => serde_json::json!({"event": "list", "apps": apps}),
        SocketMessage::Launch(app) => serde_json::json!({"event": "launch", "app": app}),
        SocketMessage::Close(app) => serde_json::json!({"event": "close", "app": app}),
        SocketMessage::Activate(app) => serde_json::json!({"event": "activate", "app": app}),
    };
    println!("{value}");
}

fn print_text(message: &SocketMessage) {
    match message {
        SocketMessage::List(apps) => {
            println!("list ({} apps)", apps.len());
            for app in apps {
                let marker = if app.active { "*" } else { " " };
                println!("  {marker} {} (pid {})", app.name, app.pid);
            }
        }
        SocketMessage::Launch(app) => println!("launch {} (pid {})", app.name, app.pid),
        SocketMessage::Close(app) => println!("close {} (pid {})", app.name, app.pid),
        SocketMessage::Activate(app) => println!("activate {} (pid {})", app.name, app.pid),
    }
}
