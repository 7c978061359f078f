use std::env;
use std::time::Duration;

use uponor_smatrix::{ConfigEntry, Integration, Settings};

#[tokio::main]
async fn main() -> uponor_smatrix::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args.get(1).expect("usage: monitor <host> [scan-secs]");
    let scan_interval_secs = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(30);

    let settings = Settings {
        scan_interval_secs,
        ..Settings::default()
    };

    println!("Connecting to {host}...");
    let integration = Integration::setup_with(ConfigEntry::new(host.as_str()), &settings, |builder| {
        builder
            .on_event(|event| println!("{event:?}"))
            .on_snapshot(|snapshot| {
                for t in snapshot.thermostats() {
                    println!(
                        "[{}] {} | current: {:?} | target: {:?} | mode: {}",
                        t.code,
                        t.name,
                        t.current_temperature,
                        t.target_temperature,
                        t.hvac_mode(),
                    );
                }
            })
    })
    .await?;
    println!(
        "Found {} thermostats. Polling every {scan_interval_secs}s, Ctrl-C to stop.",
        integration.entities().len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(300)) => {
                match integration.coordinator().client().system_status().await {
                    Ok(status) => println!("System: {} | away: {}", status.mode, status.is_away),
                    Err(e) => eprintln!("System status error: {e}"),
                }
            }
        }
    }

    integration.unload().await;
    Ok(())
}
