//! List commands implementation

use pic24prog_core::chip;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for info in pic24prog_flash::available_programmers() {
        if info.aliases.is_empty() {
            println!("  {:<14} - {}", info.name, info.description);
        } else {
            println!(
                "  {:<14} - {} (aliases: {})",
                info.name,
                info.description,
                info.aliases.join(", ")
            );
        }
    }
}

/// List all supported chips
pub fn list_chips() {
    println!("Supported chips:");
    println!();
    println!(
        "{:<20} {:>8} {:>10} {:>10} {:>8}",
        "Name", "DEVID", "Flash", "RAM", "PE"
    );
    println!("{}", "-".repeat(60));

    for entry in chip::chips() {
        println!(
            "{:<20} {:>8} {:>10} {:>10} {:>8}",
            entry.name,
            format!("0x{:04X}", entry.device_id),
            format!("{} words", entry.flash_words),
            format_size(entry.ram_bytes),
            entry.pe_words
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
