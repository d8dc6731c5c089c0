use avwx_verify::cli::{args::Args, commands};
use clap::Parser;
use std::process;

fn main() {
    let args = Args::parse();

    // Without a subcommand there is nothing to verify
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(_stats) => {
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information when no subcommand is provided
fn show_help_and_commands() {
    println!("avwx-verify - Aviation Weather Forecast Verification");
    println!("====================================================");
    println!();
    println!("Score aerodrome warnings and upper-wind forecasts against observed");
    println!("surface reports and radiosonde soundings.");
    println!();
    println!("USAGE:");
    println!("    avwx-verify <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    warnings     Verify aerodrome warnings against surface observations");
    println!("    upper-air    Verify upper-wind forecasts against a sounding profile");
    println!("    help         Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Verify a month of warnings for one station:");
    println!("    avwx-verify warnings --observations metar.txt --warnings ad_warn.txt \\");
    println!("                         --station VABB --output reports/");
    println!();
    println!("    # Verify an upper-wind forecast:");
    println!("    avwx-verify upper-air --forecast forecast.txt --sounding profile.csv");
    println!();
    println!("For detailed help on any command, use:");
    println!("    avwx-verify <COMMAND> --help");
}
