//! `vidq platforms` – list supported sites.

use anyhow::Result;
use vidq_core::platform::PlatformCatalog;

pub fn run_platforms() -> Result<()> {
    let catalog = PlatformCatalog::builtin();
    println!("{:<16} {:<18} {:<14} {}", "PLATFORM", "DOMAIN", "FORMATS", "DESCRIPTION");
    for p in catalog.platforms() {
        let mut domains = vec![p.base_url.as_str()];
        domains.extend(p.aliases.iter().map(String::as_str));
        println!(
            "{:<16} {:<18} {:<14} {}",
            p.name,
            domains.join(", "),
            p.supported_formats.join(","),
            p.description
        );
    }
    Ok(())
}
