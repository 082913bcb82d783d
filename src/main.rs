use mo_reader::{export_catalog, MoReader};
use std::env;
use std::fs::File;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path-to-mo-file> [--no-cache] [--export <out.json>] [message...]",
            args[0]
        );
        std::process::exit(1);
    }

    let mo_path = &args[1];
    let mut enable_cache = true;
    let mut export_path: Option<String> = None;
    let mut messages: Vec<&str> = Vec::new();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--no-cache" => enable_cache = false,
            "--export" => {
                if let Some(path) = args.get(i + 1) {
                    export_path = Some(path.clone());
                    i += 1;
                } else {
                    eprintln!("ERROR: --export flag requires an output path.");
                    std::process::exit(1);
                }
            }
            msg => messages.push(msg),
        }
        i += 1;
    }

    println!("Reading MO catalog: {}", mo_path);
    println!("{}", "=".repeat(60));

    let reader = MoReader::open_with_cache(mo_path, enable_cache);

    if let Some(err) = reader.catalog_error() {
        eprintln!("WARNING: {}", err);
        eprintln!("Running in pass-through mode; lookups return their input.");
    } else {
        println!("\nCatalog Information:");
        println!("  Byte order: {:?}", reader.endianness());
        println!("  Revision: {}", reader.revision().unwrap_or(0));
        println!("  Entries: {}", reader.total_entries());
        println!("  Plural forms: {}", reader.plural_rule().nplurals);
    }

    for msg in &messages {
        println!("{} => {}", msg, reader.translate(msg));
    }

    if let Some(path) = export_path {
        let mut out = match File::create(&path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("ERROR: Cannot create {}: {}", path, e);
                std::process::exit(1);
            }
        };
        match export_catalog(&reader, &mut out) {
            Ok(()) => println!("Exported decoded table to {}", path),
            Err(e) => {
                eprintln!("ERROR: Export failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
