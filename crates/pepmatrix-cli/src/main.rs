use clap::{value_parser, Arg, Command, ValueHint};
use pepmatrix_cli::input::Input;
use pepmatrix_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("PEPMATRIX_LOG", "error,pepmatrix=info"))
        .init();

    let matches = Command::new("pepmatrix")
        .version(clap::crate_version!())
        .about("Cross-sample peptide uniqueness matrices for proteomics QC")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where the matrix will be written. \
                     Overrides the directory specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(u16).range(1..))
                .help("Worker threads per matching pass (default = min(# of CPUs, 4))")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("by-group")
                .long("by-group")
                .action(clap::ArgAction::SetTrue)
                .help("Emit one row per peptide and protein group instead of one per peptide"),
        )
        .arg(
            Arg::new("keep-public-matches")
                .long("keep-public-matches")
                .action(clap::ArgAction::SetTrue)
                .help("Flag, but do not drop, peptides found in the public database"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;

    let runner = input.build().and_then(Runner::new)?;

    let summary = runner.run()?;
    log::info!(
        "samples read: {}, skipped: {}, malformed rows: {}, dropped by public database: {}, rows: {}",
        summary.samples_read,
        summary.samples_skipped,
        summary.malformed_rows,
        summary.dropped_public,
        summary.rows
    );

    Ok(())
}
