use finacrew::app::command_handlers;

fn output_header() -> &'static str {
    "FinaCrew\nVR/VA benefit calculation wizard for the FinaCrew processing backend."
}

fn print_header() {
    println!("{}\n", output_header());
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let quiet = args.first().map(String::as_str) == Some("wizard");
    if !quiet {
        print_header();
    }
    let output = command_handlers::run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
