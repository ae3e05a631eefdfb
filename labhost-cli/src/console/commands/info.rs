use labhost_core::HostResult;

use super::Console;

/// Dump the console's shared session state.
pub async fn run(console: &Console) -> HostResult<()> {
    let snapshot = console.state.snapshot();

    println!("device images:");
    let mut images: Vec<_> = snapshot.device_images.iter().collect();
    images.sort();
    for (name, path) in images {
        println!("  {}: {}", name, path.display());
    }

    println!("test suites:");
    let mut suites: Vec<_> = snapshot.test_suites.iter().collect();
    suites.sort();
    for (name, path) in suites {
        println!("  {}: {}", name, path.display());
    }

    println!("tools:");
    let mut tools: Vec<_> = snapshot.tools.iter().collect();
    tools.sort();
    for (name, path) in tools {
        println!("  {}: {}", name, path.display());
    }

    println!(
        "fetch info: build_id={} branch={} target={}",
        snapshot.fetch_info.build_id.as_deref().unwrap_or("-"),
        snapshot.fetch_info.branch.as_deref().unwrap_or("-"),
        snapshot.fetch_info.target.as_deref().unwrap_or("-"),
    );
    println!("serials: {}", snapshot.serials.join(","));
    Ok(())
}
