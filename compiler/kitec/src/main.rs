//! Kite CLI

use kitec::commands::{check_file, decode_file, encode_file, parse_run_options, run_file};

fn main() {
    kitec::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: kite run <plan.json> [--precision=<n>] [--shares=<n>]");
                std::process::exit(1);
            }
            let options = options_or_exit(&args[3..]);
            run_file(&args[2], &options);
        }
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: kite check <plan.json>");
                std::process::exit(1);
            }
            check_file(&args[2]);
        }
        "encode" => {
            if args.len() < 4 {
                eprintln!("Usage: kite encode <plan.json> <out> [--precision=<n>] [--shares=<n>]");
                std::process::exit(1);
            }
            let options = options_or_exit(&args[4..]);
            encode_file(&args[2], &args[3], &options);
        }
        "decode" => {
            if args.len() < 3 {
                eprintln!("Usage: kite decode <file>");
                std::process::exit(1);
            }
            decode_file(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("Kite {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            {
                let options = options_or_exit(&args[2..]);
                run_file(command, &options);
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

fn options_or_exit(args: &[String]) -> kitec::commands::RunOptions {
    match parse_run_options(args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Kite plan evaluator");
    println!();
    println!("Usage: kite <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <plan.json>           Evaluate a plan and print its result");
    println!("  check <plan.json>         Report operations the registry does not know");
    println!("  encode <plan.json> <out>  Evaluate a plan and write the encoded result");
    println!("  decode <file>             Print a value written by `encode`");
    println!("  help                      Show this help message");
    println!("  version                   Show version information");
    println!();
    println!("Run options:");
    println!("  --precision=<n>   Digits after the decimal point when printing floats");
    println!("  --shares=<n>      Default worker count for pmap, pfilter and preduce");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=kite_eval=debug) to trace evaluation.");
}
