use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("gleaner")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gleaner Contributors")
        .about("Fetch a page and extract elements by CSS selector")
        .arg(clap::arg!(--url <URL> "Page to fetch; also the base for robots.txt and relative links").required(true))
        .arg(clap::arg!(--selector <SELECTOR> "CSS selector for the elements to extract").required(true))
        .arg(clap::arg!(--attr <NAME> "Attribute to extract (text content when omitted)"))
        .arg(
            clap::arg!(--out <FILE> "Output file")
                .default_value("data/output.csv")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--format <FORMAT> "Output format (csv, json)")
                .default_value("csv")
                .value_parser(["csv", "json"]),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("15"))
        .arg(clap::arg!(--"user-agent" <UA> "User-Agent for HTTP requests and robots.txt matching"))
        .arg(clap::arg!(--strict "Fail when a matched element has no value for the attribute"))
        .arg(clap::arg!(--"require-robots" "Abort when robots.txt cannot be loaded"))
        .arg(clap::arg!(--"ignore-robots" "Do not load or apply robots.txt"))
        .arg(clap::arg!(--delay <SECS> "Minimum seconds between requests").default_value("0"))
        .arg(clap::arg!(-v --verbose "Show progress and enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "gleaner", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "gleaner", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "gleaner", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "gleaner", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
