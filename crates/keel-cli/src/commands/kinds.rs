//! Kinds command - list the built-in resource kinds

use console::style;
use keel_core::BUILTIN_KINDS;

pub fn run() {
    println!(
        "{:<22} {:<32} {}",
        style("KIND").bold(),
        style("API VERSION").bold(),
        style("SCOPE").bold()
    );
    for info in BUILTIN_KINDS {
        let scope = if info.namespaced { "Namespaced" } else { "Cluster" };
        println!("{:<22} {:<32} {}", info.kind, info.api_version, scope);
    }
}
