//! BTEL (Balise Telegram Editing Library) Application
//!
//! Command line entry point for decoding and re-encoding balise telegrams.

use clap::Parser;

use btel_core::schema_meta::MIN_HEX_CHARS;
use btel_telegram::TelegramCodec;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Telegram as hexadecimal text
    telegram: Option<String>,

    /// Read the telegram hex text from a file instead
    #[arg(short, long)]
    file: Option<String>,

    /// Print the decoded snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Re-encode the decoded telegram and print the hex text
    #[arg(long)]
    reencode: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    println!("BTEL (Balise Telegram Editing Library) System");
    println!("=============================================");

    let hex_text = match (&args.telegram, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                eprintln!("Cannot read telegram file {path}: {err}");
                std::process::exit(1);
            }
        },
        (None, None) => {
            eprintln!("No telegram given: pass hex text or --file <path>");
            std::process::exit(1);
        }
    };

    let codec = TelegramCodec::new();
    let report = codec.decode(&hex_text);

    if args.verbose {
        println!("Input: {} hex characters", TelegramCodec::normalize_hex(&hex_text).len());
        println!("Class: {:?}", report.class);
        println!("Checksum ok: {}", report.checksum_ok);
    }
    for warning in &report.warnings {
        println!("Warning: {warning}");
    }

    let Some(mut telegram) = report.telegram else {
        println!("No decodable telegram in input (minimum {MIN_HEX_CHARS} hex characters)");
        return;
    };

    let snapshot = telegram.snapshot();
    if args.json {
        match snapshot.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("{err}"),
        }
    } else {
        print_packet_fields(&snapshot.header);
        for packet in &snapshot.packets {
            print_packet_fields(packet);
        }
    }

    if args.reencode {
        match codec.encode(&mut telegram) {
            Ok(hex) => println!("Re-encoded: {hex}"),
            Err(err) => eprintln!("Re-encode failed: {err}"),
        }
    }
}

fn print_packet_fields(packet: &btel_telegram::snapshot::PacketSnapshot) {
    match packet.packet_id {
        Some(id) => println!("--- Packet {id} ({})", packet.name),
        None => println!("--- {}", packet.name),
    }
    for field in &packet.fields {
        if field.present {
            println!("  {:<22} {:>8}  {}", field.name, field.decimal, field.label);
        } else {
            println!("  {:<22} {:>8}  {}", field.name, "-", field.label);
        }
    }
}
